//! Database access layer.
//!
//! This module provides MySQL access functionality:
//! - DSN parsing, masking and TLS configuration
//! - The named connection registry
//! - Query execution with limits and timeouts
//! - Schema introspection
//! - Row normalisation

pub mod dsn;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod types;

pub use dsn::{Dsn, apply_tls_mode, mask_dsn};
pub use executor::QueryExecutor;
pub use registry::ConnectionRegistry;
pub use schema::SchemaInspector;
