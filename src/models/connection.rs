//! Connection-related data models.
//!
//! This module defines types for connection configuration and the summaries
//! reported by `list_connections`.

use crate::config::PoolLimits;
use crate::db::dsn::mask_dsn;
use schemars::JsonSchema;
use serde::Serialize;

/// Configuration for one named MySQL connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub name: String,
    /// DSN with the TLS mode already applied. Contains credentials - never log.
    pub dsn: String,
    pub description: String,
    /// Whether the configured principal is declared read-only.
    pub read_only: bool,
    pub pool: PoolLimits,
}

impl ConnectionConfig {
    /// Create a configuration with default pool limits.
    pub fn new(name: impl Into<String>, dsn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dsn: dsn.into(),
            description: String::new(),
            read_only: true,
            pool: PoolLimits::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Get a display-safe version of the DSN (password masked).
    pub fn masked_dsn(&self) -> String {
        mask_dsn(&self.dsn)
    }
}

/// Connection information returned by list_connections (no secrets exposed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ConnectionSummary {
    /// Connection name. Pass it to use_connection to make it active.
    pub name: String,
    /// DSN with the password replaced by ***.
    pub dsn: String,
    pub description: String,
    /// True if the configured MySQL principal is declared read-only.
    pub read_only: bool,
    /// True for the connection every tool currently runs against.
    pub active: bool,
}
