//! The run report: every stage appends to it, the orchestrator persists it
//! once at the end.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::ReportError;
use crate::feeds::{FeedCategory, FeedState, FeedStatus};
use crate::gmp::ScannerInfo;

const RULE: &str = "============================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Failed,
    Timeout,
    Error,
    Stopped,
    Started,
    Restarted,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Ok => "ok",
            ServiceStatus::Failed => "failed",
            ServiceStatus::Timeout => "timeout",
            ServiceStatus::Error => "error",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Started => "started",
            ServiceStatus::Restarted => "restarted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub status: ServiceStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupKind {
    Reports,
    CsvFiles,
    LogFiles,
    TempFiles,
}

impl CleanupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupKind::Reports => "reports",
            CleanupKind::CsvFiles => "csv_files",
            CleanupKind::LogFiles => "log_files",
            CleanupKind::TempFiles => "temp_files",
        }
    }
}

/// Only ever grows within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupCounter {
    pub count: u64,
    pub bytes_freed: u64,
}

impl CleanupCounter {
    pub fn megabytes_freed(&self) -> f64 {
        self.bytes_freed as f64 / (1024.0 * 1024.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskSnapshot {
    pub path: String,
    pub available_gb: f64,
    pub min_required_gb: f64,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Ok,
    Failed,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub status: DatabaseStatus,
    pub size_before: Option<String>,
    pub size_after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CertificateStatus {
    Ok { expiry: String },
    Error { message: String },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerCheck {
    Ok,
    Warning,
    Error,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerSnapshot {
    pub status: ScannerCheck,
    pub scanners: Vec<ScannerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub run_id: Uuid,
    pub timestamp: NaiveDateTime,
    pub dry_run: bool,
    pub services: BTreeMap<String, ServiceRecord>,
    pub feeds: BTreeMap<FeedCategory, FeedState>,
    pub cleanup: BTreeMap<CleanupKind, CleanupCounter>,
    pub disk_space: Option<DiskSnapshot>,
    pub database: Option<DatabaseSnapshot>,
    pub certificates: BTreeMap<String, CertificateStatus>,
    pub scanners: Option<ScannerSnapshot>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Where a persisted report landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedReport {
    pub json_path: PathBuf,
    pub text_path: PathBuf,
}

impl MaintenanceReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Local::now().naive_local(),
            dry_run,
            services: BTreeMap::new(),
            feeds: BTreeMap::new(),
            cleanup: BTreeMap::new(),
            disk_space: None,
            database: None,
            certificates: BTreeMap::new(),
            scanners: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_service(&mut self, name: &str, status: ServiceStatus, message: impl Into<String>) {
        self.services.insert(
            name.to_string(),
            ServiceRecord {
                status,
                message: message.into(),
            },
        );
    }

    pub fn record_feed(&mut self, state: FeedState) {
        self.feeds.insert(state.category, state);
    }

    pub fn add_cleanup(&mut self, kind: CleanupKind, count: u64, bytes_freed: u64) {
        let counter = self.cleanup.entry(kind).or_default();
        counter.count += count;
        counter.bytes_freed += bytes_freed;
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.errors.push(message);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Errors fail the run; warnings alone do not.
    pub fn exit_code(&self) -> u8 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }

    pub fn total_megabytes_freed(&self) -> f64 {
        self.cleanup.values().map(CleanupCounter::megabytes_freed).sum()
    }

    pub fn render_summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push(RULE.to_string());
        lines.push("GVM MAINTENANCE REPORT".to_string());
        lines.push(RULE.to_string());
        lines.push(format!("Date: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S")));
        lines.push(format!("Run: {}{}", self.run_id, if self.dry_run { " (dry-run)" } else { "" }));
        lines.push(String::new());

        lines.push("SERVICES:".to_string());
        for (name, record) in &self.services {
            let icon = match record.status {
                ServiceStatus::Ok | ServiceStatus::Started | ServiceStatus::Restarted => "✓",
                _ => "✗",
            };
            lines.push(format!("  {} {}: {}", icon, name, record.status.as_str()));
            if !record.message.is_empty() {
                lines.push(format!("    {}", record.message));
            }
        }
        lines.push(String::new());

        lines.push("FEEDS:".to_string());
        for (category, state) in &self.feeds {
            let icon = match state.status {
                FeedStatus::Ok | FeedStatus::Skipped | FeedStatus::Simulated => "✓",
                _ => "✗",
            };
            lines.push(format!("  {} {}: {}", icon, category, state.status.as_str()));
            if !state.message.is_empty() {
                lines.push(format!("    {}", state.message));
            }
        }
        lines.push(String::new());

        lines.push("CLEANUP:".to_string());
        for (kind, counter) in &self.cleanup {
            lines.push(format!(
                "  {}: {} items, {:.2} MB freed",
                kind.as_str(),
                counter.count,
                counter.megabytes_freed()
            ));
        }
        lines.push(format!("  Total freed: {:.2} MB", self.total_megabytes_freed()));
        lines.push(String::new());

        if !self.errors.is_empty() {
            lines.push("ERRORS:".to_string());
            for message in &self.errors {
                lines.push(format!("  ✗ {}", message));
            }
            lines.push(String::new());
        }

        if !self.warnings.is_empty() {
            lines.push("WARNINGS:".to_string());
            for message in &self.warnings {
                lines.push(format!("  ⚠ {}", message));
            }
            lines.push(String::new());
        }

        lines.push(RULE.to_string());
        lines.join("\n")
    }

    /// Writes `maintenance_report_<stamp>.json` and `.txt` into `dir`.
    pub async fn persist(&self, dir: &Path) -> Result<PersistedReport, ReportError> {
        let write_failed = |path: &Path, e: std::io::Error| ReportError::WriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| write_failed(dir, e))?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let json_path = dir.join(format!("maintenance_report_{}.json", stamp));
        let text_path = dir.join(format!("maintenance_report_{}.txt", stamp));

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ReportError::SerializationError {
                reason: e.to_string(),
            }
        })?;

        tokio::fs::write(&json_path, json)
            .await
            .map_err(|e| write_failed(&json_path, e))?;
        tokio::fs::write(&text_path, self.render_summary())
            .await
            .map_err(|e| write_failed(&text_path, e))?;

        info!("Report saved to {}", json_path.display());

        Ok(PersistedReport {
            json_path,
            text_path,
        })
    }
}
