//! Relational store access.
//!
//! The platform database is only touched through [`SqlStore`]:
//! - `fetch_text` / `fetch_count` for feed probes and size queries
//! - `execute` for VACUUM, ANALYZE and REINDEX
//!
//! Callers bound every call with their own timeout.

mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The server rejected or failed the statement
    Statement(String),

    /// No usable connection to the server
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Statement(msg) => write!(f, "Statement failed: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

#[async_trait]
pub trait SqlStore: Send + Sync {
    /// First column of the first row, if any row came back.
    async fn fetch_text(&self, sql: &str) -> Result<Option<String>, StoreError>;

    /// Single `COUNT(*)`-style value.
    async fn fetch_count(&self, sql: &str) -> Result<i64, StoreError>;

    /// Runs a statement through the simple query protocol, outside any
    /// transaction block.
    async fn execute(&self, sql: &str) -> Result<(), StoreError>;
}
