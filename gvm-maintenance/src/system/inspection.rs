//! Disk space and TLS certificate checks.

use chrono::{NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::CommandRunner;
use crate::config::InspectionSettings;
use crate::report::{CertificateStatus, DiskSnapshot, MaintenanceReport};

const KB_PER_GB: f64 = 1024.0 * 1024.0;

pub struct HostInspector {
    runner: Arc<dyn CommandRunner>,
    settings: InspectionSettings,
}

/// Available space in GB from `df -Pk` output (fourth column of the first
/// data line, in 1K blocks).
pub fn parse_df_available_gb(output: &str) -> Option<f64> {
    let line = output.lines().nth(1)?;
    let available_kb: f64 = line.split_whitespace().nth(3)?.parse().ok()?;
    Some(available_kb / KB_PER_GB)
}

/// `notAfter=Mar  3 12:00:00 2034 GMT` as a UTC timestamp.
pub fn parse_not_after(output: &str) -> Option<NaiveDateTime> {
    let value = output.trim().strip_prefix("notAfter=")?;
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%b %d %H:%M:%S %Y GMT").ok()
}

impl HostInspector {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: InspectionSettings) -> Self {
        Self { runner, settings }
    }

    pub async fn check_disk_space(&self, report: &mut MaintenanceReport) {
        let path = self.settings.disk_path.display().to_string();
        let args = vec!["-Pk".to_string(), path.clone()];

        let output = match self.runner.run("df", &args, self.settings.timeout()).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                report.add_error(format!(
                    "Disk space check failed: df exited with {:?}: {}",
                    output.code,
                    output.stderr.trim()
                ));
                return;
            }
            Err(e) => {
                report.add_error(format!("Disk space check failed: {}", e));
                return;
            }
        };

        let Some(available_gb) = parse_df_available_gb(&output.stdout) else {
            report.add_error(format!("Disk space check failed: unexpected df output for {}", path));
            return;
        };

        let min_required_gb = self.settings.min_disk_space_gb;
        let low = available_gb < min_required_gb;
        report.disk_space = Some(DiskSnapshot {
            path,
            available_gb,
            min_required_gb,
            status: if low { "warning" } else { "ok" }.to_string(),
        });

        if low {
            report.add_warning(format!(
                "Low disk space: {:.2} GB available (minimum {} GB)",
                available_gb, min_required_gb
            ));
        } else {
            info!("Disk space available: {:.2} GB", available_gb);
        }
    }

    pub async fn check_certificates(&self, report: &mut MaintenanceReport) {
        let now = Utc::now().naive_utc();

        for cert in &self.settings.certificate_paths {
            let key = cert.display().to_string();

            if !tokio::fs::try_exists(cert).await.unwrap_or(false) {
                report.certificates.insert(key, CertificateStatus::NotFound);
                continue;
            }

            let args = vec![
                "x509".to_string(),
                "-in".to_string(),
                key.clone(),
                "-noout".to_string(),
                "-enddate".to_string(),
            ];

            let status = match self.runner.run("openssl", &args, self.settings.timeout()).await {
                Ok(output) if output.success() => {
                    let expiry = output.stdout.trim().to_string();
                    if let Some(not_after) = parse_not_after(&expiry) {
                        if not_after <= now {
                            report.add_warning(format!("Certificate {} expired ({})", key, expiry));
                        }
                    }
                    CertificateStatus::Ok { expiry }
                }
                Ok(output) => CertificateStatus::Error {
                    message: output.stderr.trim().to_string(),
                },
                Err(e) => CertificateStatus::Error {
                    message: e.to_string(),
                },
            };
            report.certificates.insert(key, status);
        }

        info!("Certificates checked: {}", self.settings.certificate_paths.len());
    }
}
