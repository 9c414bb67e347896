//! MySQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to inspect and query MySQL. Every statement passes a read-only SQL gate
//! (see [`validation`]) before it reaches the database.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;
pub mod validation;

pub use config::Config;
pub use error::{DbError, DbResult};
pub use mcp::MySqlService;
