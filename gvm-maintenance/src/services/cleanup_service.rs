use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{CleanupSettings, MaintenanceConfig};
use crate::gmp::{ManagementClient, ReportSummary};
use crate::report::{CleanupKind, MaintenanceReport};

const SECONDS_PER_DAY: u64 = 86_400;

/// Result of one filesystem sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Sweep {
    pub count: u64,
    pub bytes: u64,
    pub failures: Vec<String>,
}

impl Sweep {
    fn remove(&mut self, path: &Path, size: u64, dry_run: bool) {
        if dry_run {
            debug!("[dry-run] Would remove {}", path.display());
            self.count += 1;
            self.bytes += size;
            return;
        }

        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                self.count += 1;
                self.bytes += size;
            }
            Err(e) => self
                .failures
                .push(format!("Could not remove {}: {}", path.display(), e)),
        }
    }
}

/// Files directly under `dir` matching `*.csv`.
pub fn sweep_csv_exports(dir: &Path, dry_run: bool) -> Sweep {
    let mut sweep = Sweep::default();
    let pattern = format!("{}/*.csv", glob::Pattern::escape(&dir.to_string_lossy()));

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            sweep.failures.push(format!("Invalid export pattern {}: {}", pattern, e));
            return sweep;
        }
    };

    for path in entries.flatten() {
        let Ok(metadata) = std::fs::metadata(&path) else {
            continue;
        };
        if metadata.is_file() {
            sweep.remove(&path, metadata.len(), dry_run);
        }
    }
    sweep
}

/// `*.log` files directly inside each directory, last modified before
/// `cutoff`. Subdirectories are not entered and missing directories are
/// skipped.
pub fn sweep_old_logs(dirs: &[PathBuf], cutoff: SystemTime, dry_run: bool) -> Sweep {
    let mut sweep = Sweep::default();

    for dir in dirs {
        if !dir.is_dir() {
            debug!("Log directory {} not present, skipping", dir.display());
            continue;
        }

        for entry in WalkDir::new(dir).max_depth(1).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file()
                || entry.path().extension().and_then(|ext| ext.to_str()) != Some("log")
            {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < cutoff {
                sweep.remove(entry.path(), metadata.len(), dry_run);
            }
        }
    }
    sweep
}

/// Fixed scratch files, whatever their age.
pub fn sweep_temp_files(paths: &[PathBuf], dry_run: bool) -> Sweep {
    let mut sweep = Sweep::default();
    for path in paths {
        if let Ok(metadata) = std::fs::metadata(path) {
            if metadata.is_file() {
                sweep.remove(path, metadata.len(), dry_run);
            }
        }
    }
    sweep
}

pub fn log_cutoff(now: SystemTime, retention_days: i64) -> SystemTime {
    let age = Duration::from_secs(retention_days.max(0) as u64 * SECONDS_PER_DAY);
    now.checked_sub(age).unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Deletes old scan reports and stale files.
pub struct CleanupService {
    config: Arc<MaintenanceConfig>,
    client: Arc<dyn ManagementClient>,
}

impl CleanupService {
    pub fn new(config: Arc<MaintenanceConfig>, client: Arc<dyn ManagementClient>) -> Self {
        Self { config, client }
    }

    /// Every report the manager knows about, across all pages.
    async fn collect_reports(&self) -> anyhow::Result<Vec<ReportSummary>> {
        let page_size = self.config.gmp.page_size as usize;
        let mut seen = HashSet::new();
        let mut reports = Vec::new();
        let mut page = 0;

        loop {
            let batch = self.client.list_reports(page).await?;
            let batch_len = batch.len();
            let mut new_ids = 0;

            for summary in batch {
                if seen.insert(summary.id.clone()) {
                    new_ids += 1;
                    reports.push(summary);
                }
            }

            // A page with nothing new means the server ignored the offset
            if batch_len < page_size || new_ids == 0 {
                break;
            }
            page += 1;
        }

        Ok(reports)
    }

    pub async fn clean_reports(&self, report: &mut MaintenanceReport, dry_run: bool) {
        let retention_days = self.config.cleanup.report_retention_days;
        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::days(retention_days);

        let reports = match self.collect_reports().await {
            Ok(reports) => reports,
            Err(e) => {
                report.add_error(format!("Failed to clean up reports: {:#}", e));
                return;
            }
        };

        let expired: Vec<&ReportSummary> = reports
            .iter()
            .filter(|summary| summary.timestamp.is_some_and(|ts| ts < cutoff))
            .collect();

        info!(
            "{} of {} reports older than {} days",
            expired.len(),
            reports.len(),
            retention_days
        );

        let mut deleted = 0;
        for summary in expired {
            if dry_run {
                debug!("[dry-run] Would delete report {}", summary.id);
                deleted += 1;
                continue;
            }
            match self.client.delete_report(&summary.id).await {
                Ok(()) => deleted += 1,
                Err(e) => report.add_warning(format!("Failed to delete report {}: {:#}", summary.id, e)),
            }
        }

        report.add_cleanup(CleanupKind::Reports, deleted, 0);
    }

    pub async fn clean_files(&self, report: &mut MaintenanceReport, dry_run: bool) {
        let settings: CleanupSettings = self.config.cleanup.clone();
        let cutoff = log_cutoff(SystemTime::now(), settings.log_retention_days);

        let sweeps = tokio::task::spawn_blocking(move || {
            [
                (CleanupKind::CsvFiles, sweep_csv_exports(&settings.exports_dir, dry_run)),
                (CleanupKind::LogFiles, sweep_old_logs(&settings.log_dirs, cutoff, dry_run)),
                (CleanupKind::TempFiles, sweep_temp_files(&settings.temp_files, dry_run)),
            ]
        })
        .await;

        let sweeps = match sweeps {
            Ok(sweeps) => sweeps,
            Err(e) => {
                report.add_error(format!("File cleanup failed: {}", e));
                return;
            }
        };

        for (kind, sweep) in sweeps {
            for failure in sweep.failures {
                report.add_warning(failure);
            }
            if sweep.count > 0 {
                info!("Removed {} {} ({} bytes)", sweep.count, kind.as_str(), sweep.bytes);
            }
            report.add_cleanup(kind, sweep.count, sweep.bytes);
        }

        if dry_run {
            warn!("[dry-run] No files were removed");
        }
    }
}
