//! MySQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools that let AI
//! assistants inspect and query MySQL through a read-only SQL gate.

use clap::Parser;
use mysql_mcp_server::config::{Config, TransportMode};
use mysql_mcp_server::db::{ConnectionRegistry, QueryExecutor};
use mysql_mcp_server::mcp::MySqlService;
use mysql_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr: with the stdio transport, stdout carries the protocol.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn print_usage() {
    eprintln!("Error: At least one MySQL connection must be configured.");
    eprintln!();
    eprintln!("Usage: mysql-mcp-server --connection <dsn>");
    eprintln!("       mysql-mcp-server --connection <name>=<dsn>");
    eprintln!();
    eprintln!("DSN format: user:password@tcp(host:port)/database?param=value");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  mysql-mcp-server -c 'reader:secret@tcp(localhost:3306)/shop'");
    eprintln!("  mysql-mcp-server -c 'main=reader:secret@tcp(db:3306)/shop' \\");
    eprintln!("                   -c 'bi=reader:secret@tcp(replica:3306)/reports' --ssl true");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    if config.connections.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    info!(
        transport = %config.transport,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let connection_configs = config.connection_configs()?;

    if config.allow_writable_principal {
        warn!(
            "Connections are reported as writable. Statements are still gated, but the MySQL \
             principal should only hold SELECT and SHOW VIEW privileges"
        );
    }

    let registry = Arc::new(ConnectionRegistry::new());
    for connection in connection_configs {
        if let Err(e) = registry.add(connection).await {
            error!(error = %e, "Failed to open connection");
            registry.close().await;
            return Err(e.into());
        }
    }
    info!(count = registry.len().await, "Connections ready");

    let executor = QueryExecutor::new(config.query_timeout(), config.max_rows);
    let service = MySqlService::new(registry, executor);

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(service);
            info!(transport = transport.name(), "Using stdio transport");
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                service,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
