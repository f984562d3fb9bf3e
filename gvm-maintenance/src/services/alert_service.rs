use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::report::{MaintenanceReport, PersistedReport};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl AlertSeverity {
    pub fn for_report(report: &MaintenanceReport) -> Self {
        if report.has_errors() {
            AlertSeverity::Critical
        } else if !report.warnings.is_empty() {
            AlertSeverity::Warning
        } else {
            AlertSeverity::Info
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub timestamp: DateTime<Utc>,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub host: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl AlertPayload {
    pub fn from_report(report: &MaintenanceReport, host: &str, persisted: Option<&PersistedReport>) -> Self {
        let severity = AlertSeverity::for_report(report);
        let message = match severity {
            AlertSeverity::Critical => format!(
                "GVM maintenance finished with {} error(s) and {} warning(s)",
                report.errors.len(),
                report.warnings.len()
            ),
            AlertSeverity::Warning => format!(
                "GVM maintenance finished with {} warning(s)",
                report.warnings.len()
            ),
            AlertSeverity::Info => "GVM maintenance finished successfully".to_string(),
        };

        Self {
            timestamp: Utc::now(),
            alert_type: AlertType::Maintenance,
            severity,
            host: host.to_string(),
            message,
            details: Some(json!({
                "run_id": report.run_id,
                "dry_run": report.dry_run,
                "errors": report.errors,
                "warnings": report.warnings,
                "megabytes_freed": report.total_megabytes_freed(),
                "report_file": persisted.map(|p| p.json_path.display().to_string()),
            })),
        }
    }
}

/// Posts the run outcome to a webhook. Delivery problems are logged and
/// never affect the run.
#[derive(Clone)]
pub struct AlertService {
    webhook_url: String,
    client: Client,
    host: String,
}

pub fn local_hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

impl AlertService {
    pub fn new(webhook_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("Failed to create HTTP client for AlertService")?;

        Ok(Self {
            webhook_url,
            client,
            host: local_hostname(),
        })
    }

    pub async fn send_run_summary(&self, report: &MaintenanceReport, persisted: Option<&PersistedReport>) {
        let payload = AlertPayload::from_report(report, &self.host, persisted);
        self.send_webhook(&payload).await;
    }

    async fn send_webhook(&self, payload: &AlertPayload) {
        if self.webhook_url.is_empty() {
            debug!("No webhook URL configured, skipping alert");
            return;
        }

        match timeout(
            WEBHOOK_TIMEOUT,
            self.client.post(&self.webhook_url).json(payload).send(),
        )
        .await
        {
            Ok(Ok(response)) => {
                if response.status().is_success() {
                    info!("Maintenance alert sent ({:?})", payload.severity);
                } else {
                    warn!("Alert webhook returned status: {}", response.status());
                }
            }
            Ok(Err(e)) => warn!("Failed to send maintenance alert: {}", e),
            Err(_) => warn!("Alert webhook timeout"),
        }
    }
}
