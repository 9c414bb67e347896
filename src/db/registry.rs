//! Named MySQL connection pools and the active-connection pointer.
//!
//! One readers-writer lock guards both the pools and the active name, so a
//! `set_active` is visible to every `active()` that starts after it returns.
//! `active()` and `list()` take the read lock and do no I/O.

use crate::db::dsn::Dsn;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionConfig, ConnectionSummary};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{Connection, MySqlPool};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info};

#[derive(Debug)]
struct RegistryEntry {
    config: ConnectionConfig,
    pool: MySqlPool,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Insertion order; the first entry is the initial active connection.
    entries: Vec<RegistryEntry>,
    active: Option<String>,
    closed: bool,
}

impl RegistryState {
    fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.config.name == name)
    }

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a pool for `config`, ping it, and register it.
    ///
    /// The first connection added becomes the active one. On a failed ping the
    /// pool is closed and nothing is registered.
    pub async fn add(&self, config: ConnectionConfig) -> DbResult<()> {
        // Early check for existing connection
        {
            let state = self.state.read().await;
            if state.contains(&config.name) {
                return Err(duplicate_error(&config.name));
            }
        }

        info!(
            connection = %config.name,
            dsn = %config.masked_dsn(),
            "Connecting to MySQL"
        );

        let pool = build_pool(&config)?;
        if let Err(e) = ping(&pool, config.pool.ping_timeout_or_default()).await {
            pool.close().await;
            return Err(e);
        }

        self.add_pool(config, pool).await
    }

    /// Register an already-built pool under `config.name`.
    ///
    /// No ping is performed. If the name is taken or the registry is closed,
    /// the pool is closed and an error returned.
    pub async fn add_pool(&self, config: ConnectionConfig, pool: MySqlPool) -> DbResult<()> {
        let name = config.name.clone();

        // Hand the pool back on failure so it is closed outside the lock
        let rejected: Option<(MySqlPool, DbError)> = {
            let mut state = self.state.write().await;
            if state.closed {
                Some((pool, closed_error()))
            } else if state.contains(&name) {
                Some((pool, duplicate_error(&name)))
            } else {
                state.entries.push(RegistryEntry { config, pool });
                if state.active.is_none() {
                    state.active = Some(name.clone());
                }
                None
            }
        };

        if let Some((pool, err)) = rejected {
            pool.close().await;
            return Err(err);
        }

        info!(connection = %name, "Connection registered");
        Ok(())
    }

    /// The active connection's pool and name.
    pub async fn active(&self) -> DbResult<(MySqlPool, String)> {
        let state = self.state.read().await;
        if state.closed {
            return Err(closed_error());
        }
        let name = state.active.as_deref().ok_or_else(|| {
            DbError::connection(
                "No active connection",
                "Start the server with at least one --connection",
            )
        })?;
        let entry = state
            .get(name)
            .ok_or_else(|| DbError::unknown_connection(name))?;
        Ok((entry.pool.clone(), name.to_string()))
    }

    /// Make `name` the active connection.
    pub async fn set_active(&self, name: &str) -> DbResult<()> {
        let previous = {
            let mut state = self.state.write().await;
            if !state.contains(name) {
                return Err(DbError::unknown_connection(name));
            }
            state.active.replace(name.to_string())
        };

        info!(
            connection = %name,
            previous = ?previous,
            "Active connection changed"
        );
        Ok(())
    }

    /// Registered connections with masked DSNs, in registration order.
    pub async fn list(&self) -> Vec<ConnectionSummary> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .map(|entry| ConnectionSummary {
                name: entry.config.name.clone(),
                dsn: entry.config.masked_dsn(),
                description: entry.config.description.clone(),
                read_only: entry.config.read_only,
                active: state.active.as_deref() == Some(entry.config.name.as_str()),
            })
            .collect()
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Close every pool. Later calls are no-ops, and `active()` fails afterwards.
    pub async fn close(&self) {
        let entries = {
            let mut state = self.state.write().await;
            if state.closed {
                return;
            }
            state.closed = true;
            state.active = None;
            std::mem::take(&mut state.entries)
        };

        for entry in entries {
            entry.pool.close().await;
            debug!(connection = %entry.config.name, "Pool closed");
        }
        info!("All connections closed");
    }
}

/// Build a lazily-connecting pool with the configured limits.
///
/// No connection is opened until the pool is first used.
pub fn build_pool(config: &ConnectionConfig) -> DbResult<MySqlPool> {
    let options = Dsn::parse(&config.dsn)?.connect_options();
    let limits = &config.pool;

    Ok(MySqlPoolOptions::new()
        .max_connections(limits.max_open_or_default())
        .min_connections(limits.min_connections_or_default())
        .max_lifetime(limits.max_lifetime_or_default())
        .idle_timeout(limits.max_idle_time_or_default())
        .acquire_timeout(limits.ping_timeout_or_default())
        .connect_lazy_with(options))
}

/// Lease one connection and ping it, bounded by `deadline`.
async fn ping(pool: &MySqlPool, deadline: Duration) -> DbResult<()> {
    let attempt = async {
        let mut conn = pool.acquire().await?;
        conn.ping().await?;
        Ok::<(), sqlx::Error>(())
    };

    match timeout(deadline, attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(DbError::connection(
            format!("Ping failed: {}", e),
            connection_suggestion(&e),
        )),
        Err(_) => Err(DbError::connection(
            format!("Ping timed out after {}s", deadline.as_secs()),
            "Check that the MySQL server is running and reachable",
        )),
    }
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(error: &sqlx::Error) -> &'static str {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("timed out") {
        return "Check that the MySQL server is running and reachable";
    }
    if error_str.contains("access denied") || error_str.contains("password") {
        return "Verify the username and password in the DSN";
    }
    if error_str.contains("unknown database") {
        return "Check that the database name in the DSN exists";
    }
    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check the --ssl mode or the tls= DSN parameter";
    }
    "Verify the DSN format: user:password@tcp(host:port)/database"
}

fn duplicate_error(name: &str) -> DbError {
    DbError::connection(
        format!("Connection '{}' already exists", name),
        "Use name=DSN to give each connection a unique name",
    )
}

fn closed_error() -> DbError {
    DbError::connection("Connection registry is closed", "Restart the server")
}
