//! Management protocol access.
//!
//! The protocol itself is not reimplemented: reports go through the
//! official `gvm-cli` client over TLS, scanners through `gvmd --get-scanners`.

pub mod client;
pub mod xml;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::GvmCliClient;

/// One report as listed by `get_reports`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub id: String,
    /// `None` when absent or unparseable; such reports are never deleted
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerInfo {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[async_trait]
pub trait ManagementClient: Send + Sync {
    /// One page of reports, `page` counted from zero.
    async fn list_reports(&self, page: u32) -> Result<Vec<ReportSummary>>;

    async fn delete_report(&self, id: &str) -> Result<()>;

    async fn list_scanners(&self) -> Result<Vec<ScannerInfo>>;
}
