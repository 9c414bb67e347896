//! Configuration handling for the MySQL MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::db::dsn::{Dsn, apply_tls_mode};
use crate::models::ConnectionConfig;
use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/mcp";
pub const DEFAULT_CONNECTION_NAME: &str = "default";

// Pool configuration defaults, used when a setting is zero
pub const DEFAULT_MAX_OPEN_CONNS: u32 = 10;
pub const DEFAULT_CONN_MAX_LIFETIME_SECS: u64 = 1800;
pub const DEFAULT_CONN_MAX_IDLE_TIME_SECS: u64 = 600;
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Pool limits applied to every connection. Zero means "use the default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct PoolLimits {
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub conn_max_lifetime_secs: u64,
    pub conn_max_idle_time_secs: u64,
    pub ping_timeout_secs: u64,
}

impl PoolLimits {
    /// Get max open connections with default value.
    pub fn max_open_or_default(&self) -> u32 {
        nonzero_or(self.max_open_conns, DEFAULT_MAX_OPEN_CONNS)
    }

    /// Connections each pool keeps open while idle, never above max open.
    ///
    /// sqlx pools have no idle ceiling, only a floor, so `max_idle_conns` becomes
    /// that floor. Zero keeps nothing warm; idle connections above the floor are
    /// closed after the idle timeout.
    pub fn min_connections_or_default(&self) -> u32 {
        self.max_idle_conns.min(self.max_open_or_default())
    }

    /// Get connection max lifetime with default value.
    pub fn max_lifetime_or_default(&self) -> Duration {
        Duration::from_secs(nonzero_or(
            self.conn_max_lifetime_secs,
            DEFAULT_CONN_MAX_LIFETIME_SECS,
        ))
    }

    /// Get connection max idle time with default value.
    pub fn max_idle_time_or_default(&self) -> Duration {
        Duration::from_secs(nonzero_or(
            self.conn_max_idle_time_secs,
            DEFAULT_CONN_MAX_IDLE_TIME_SECS,
        ))
    }

    /// Get the ping deadline with default value.
    pub fn ping_timeout_or_default(&self) -> Duration {
        Duration::from_secs(nonzero_or(self.ping_timeout_secs, DEFAULT_PING_TIMEOUT_SECS))
    }
}

fn nonzero_or<T: PartialEq + Default>(value: T, default: T) -> T {
    if value == T::default() { default } else { value }
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// A `--connection` argument: `name=DSN` or a bare DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub name: String,
    pub dsn: String,
}

impl ConnectionSpec {
    /// Parse a connection argument.
    ///
    /// The text is split on the first `=` only when the left side is a plain
    /// name (`[A-Za-z0-9_-]+`); DSN query strings contain `=` as well.
    ///
    /// ```text
    /// app:secret@tcp(db:3306)/shop              # named "default"
    /// reporting=ro:secret@tcp(replica:3306)/bi  # named "reporting"
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Connection spec cannot be empty".to_string());
        }

        let (name, dsn) = match s.split_once('=') {
            Some((name, dsn)) if is_plain_name(name) => (name.to_string(), dsn.to_string()),
            _ => (DEFAULT_CONNECTION_NAME.to_string(), s.to_string()),
        };

        if dsn.trim().is_empty() {
            return Err(format!("Connection '{}' has an empty DSN", name));
        }

        Ok(Self { name, dsn })
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Configuration for the MySQL MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mysql-mcp-server",
    about = "Read-only MySQL MCP server - lets AI assistants inspect and query MySQL safely",
    version,
    author
)]
pub struct Config {
    /// MySQL connections, as "DSN" or "name=DSN".
    /// DSN format: user:password@tcp(host:port)/database?param=value
    /// Can be specified multiple times; the first becomes the active connection.
    #[arg(
        short = 'c',
        long = "connection",
        value_name = "NAME=DSN",
        env = "MYSQL_MCP_CONNECTION"
    )]
    pub connections: Vec<String>,

    /// TLS mode applied to every DSN (true, skip-verify, preferred; empty/false/0 disables)
    #[arg(long, default_value = "", env = "MYSQL_MCP_SSL")]
    pub ssl: String,

    /// Description for connections (defaults to host:port/database)
    #[arg(long, env = "MYSQL_MCP_DESCRIPTION")]
    pub description: Option<String>,

    /// Report connections as writable. The SQL gate stays on either way.
    #[arg(long, env = "MYSQL_MCP_ALLOW_WRITABLE_PRINCIPAL")]
    pub allow_writable_principal: bool,

    /// Maximum open connections per pool (0 = default)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_MAX_OPEN_CONNS")]
    pub max_open_conns: u32,

    /// Idle connections kept open per pool (0 = none)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_MAX_IDLE_CONNS")]
    pub max_idle_conns: u32,

    /// Maximum connection lifetime in seconds (0 = default)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_CONN_MAX_LIFETIME")]
    pub conn_max_lifetime: u64,

    /// Maximum connection idle time in seconds (0 = default)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_CONN_MAX_IDLE_TIME")]
    pub conn_max_idle_time: u64,

    /// Ping deadline in seconds when opening a connection (0 = default)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_PING_TIMEOUT")]
    pub ping_timeout: u64,

    /// Query timeout in seconds (0 = default)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_QUERY_TIMEOUT")]
    pub query_timeout: u64,

    /// Default maximum rows returned by run_query (0 = default)
    #[arg(long, default_value_t = 0, env = "MYSQL_MCP_MAX_ROWS")]
    pub max_rows: u32,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MYSQL_MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MYSQL_MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MYSQL_MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MYSQL_MCP_HTTP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MYSQL_MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MYSQL_MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Pool limits shared by every configured connection.
    pub fn pool_limits(&self) -> PoolLimits {
        PoolLimits {
            max_open_conns: self.max_open_conns,
            max_idle_conns: self.max_idle_conns,
            conn_max_lifetime_secs: self.conn_max_lifetime,
            conn_max_idle_time_secs: self.conn_max_idle_time,
            ping_timeout_secs: self.ping_timeout,
        }
    }

    /// Effective query timeout. Zero means the default, never "expire at once".
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(nonzero_or(self.query_timeout, DEFAULT_QUERY_TIMEOUT_SECS))
    }

    /// Build connection configs from the `--connection` arguments.
    ///
    /// TLS is applied to each DSN, the DSN is parsed once to catch mistakes
    /// before any network I/O, and names must be unique.
    pub fn connection_configs(&self) -> Result<Vec<ConnectionConfig>, String> {
        let mut configs: Vec<ConnectionConfig> = Vec::with_capacity(self.connections.len());

        for raw in &self.connections {
            let spec = ConnectionSpec::parse(raw)?;
            if configs.iter().any(|c| c.name == spec.name) {
                return Err(format!(
                    "Duplicate connection name '{}'. Use name=DSN to give each connection a unique name.",
                    spec.name
                ));
            }

            let dsn = apply_tls_mode(&spec.dsn, &self.ssl);
            let parsed = Dsn::parse(&dsn).map_err(|e| e.to_string())?;
            let description = self
                .description
                .clone()
                .unwrap_or_else(|| format!("MySQL at {}", parsed.summary()));

            configs.push(ConnectionConfig {
                name: spec.name,
                dsn,
                description,
                read_only: !self.allow_writable_principal,
                pool: self.pool_limits(),
            });
        }

        Ok(configs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(args: &[&str]) -> Config {
        let mut argv = vec!["mysql-mcp-server"];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    // =========================================================================
    // Connection spec
    // =========================================================================

    #[test]
    fn test_spec_bare_dsn() {
        let spec = ConnectionSpec::parse("app:pw@tcp(db:3306)/shop?tls=true").unwrap();
        assert_eq!(spec.name, "default");
        assert_eq!(spec.dsn, "app:pw@tcp(db:3306)/shop?tls=true");
    }

    #[test]
    fn test_spec_named() {
        let spec = ConnectionSpec::parse("reporting=ro:pw@tcp(replica:3306)/bi").unwrap();
        assert_eq!(spec.name, "reporting");
        assert_eq!(spec.dsn, "ro:pw@tcp(replica:3306)/bi");
    }

    #[test]
    fn test_spec_equals_in_password_is_not_a_name() {
        let spec = ConnectionSpec::parse("app:a=b@tcp(db:3306)/shop").unwrap();
        assert_eq!(spec.name, "default");
        assert_eq!(spec.dsn, "app:a=b@tcp(db:3306)/shop");
    }

    #[test]
    fn test_spec_errors() {
        assert!(ConnectionSpec::parse("").is_err());
        assert!(ConnectionSpec::parse("name=").is_err());
    }

    // =========================================================================
    // Pool limits
    // =========================================================================

    #[test]
    fn test_pool_limits_zero_means_default() {
        let limits = PoolLimits::default();
        assert_eq!(limits.max_open_or_default(), DEFAULT_MAX_OPEN_CONNS);
        // Nothing is kept warm unless asked for.
        assert_eq!(limits.min_connections_or_default(), 0);
        assert_eq!(
            limits.max_lifetime_or_default(),
            Duration::from_secs(DEFAULT_CONN_MAX_LIFETIME_SECS)
        );
        assert_eq!(
            limits.max_idle_time_or_default(),
            Duration::from_secs(DEFAULT_CONN_MAX_IDLE_TIME_SECS)
        );
        assert_eq!(
            limits.ping_timeout_or_default(),
            Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_pool_limits_explicit_values() {
        let limits = PoolLimits {
            max_open_conns: 3,
            max_idle_conns: 8,
            conn_max_lifetime_secs: 60,
            conn_max_idle_time_secs: 30,
            ping_timeout_secs: 2,
        };
        assert_eq!(limits.max_open_or_default(), 3);
        // The warm floor is capped by open.
        assert_eq!(limits.min_connections_or_default(), 3);
        assert_eq!(limits.max_lifetime_or_default(), Duration::from_secs(60));
        assert_eq!(limits.ping_timeout_or_default(), Duration::from_secs(2));
    }

    // =========================================================================
    // CLI
    // =========================================================================

    #[test]
    fn test_config_defaults() {
        let config = parse_args(&[]);
        assert!(config.connections.is_empty());
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.mcp_endpoint, DEFAULT_MCP_ENDPOINT);
        assert_eq!(
            config.query_timeout(),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
        assert!(!config.json_logs);
    }

    #[test]
    fn test_connection_configs() {
        let config = parse_args(&[
            "-c",
            "a=u:p@tcp(h1:3306)/one",
            "-c",
            "b=u:p@tcp(h2:3306)/two",
            "--ssl",
            "skip-verify",
            "--max-open-conns",
            "4",
        ]);
        let configs = config.connection_configs().unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name, "a");
        assert_eq!(configs[0].dsn, "u:p@tcp(h1:3306)/one?tls=skip-verify");
        assert_eq!(configs[0].description, "MySQL at h1:3306/one");
        assert!(configs[0].read_only);
        assert_eq!(configs[1].pool.max_open_or_default(), 4);
    }

    #[test]
    fn test_connection_configs_duplicate_name() {
        let config = parse_args(&["-c", "u:p@tcp(h1:3306)/one", "-c", "u:p@tcp(h2:3306)/two"]);
        let err = config.connection_configs().unwrap_err();
        assert!(err.contains("Duplicate connection name 'default'"));
    }

    #[test]
    fn test_connection_configs_invalid_dsn() {
        let config = parse_args(&["-c", "x=not-a-dsn"]);
        assert!(config.connection_configs().is_err());
    }

    #[test]
    fn test_writable_flag() {
        let config = parse_args(&[
            "-c",
            "u:p@tcp(h:3306)/d",
            "--allow-writable-principal",
            "--description",
            "primary",
        ]);
        let configs = config.connection_configs().unwrap();
        assert!(!configs[0].read_only);
        assert_eq!(configs[0].description, "primary");
    }
}
