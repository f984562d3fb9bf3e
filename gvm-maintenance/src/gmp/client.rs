use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use quick_xml::escape::escape;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::xml::{check_status, parse_reports};
use super::{ManagementClient, ReportSummary, ScannerInfo};
use crate::config::{GmpCredentials, MaintenanceConfig};
use crate::system::CommandRunner;

const GVM_CLI: &str = "gvm-cli";
const GVMD: &str = "gvmd";

/// `gvm-cli` over TLS for reports, `gvmd --get-scanners` for scanners.
pub struct GvmCliClient {
    runner: Arc<dyn CommandRunner>,
    host: String,
    port: u16,
    page_size: u32,
    credentials: GmpCredentials,
    gmp_timeout: Duration,
    scanner_user: String,
    listing_timeout: Duration,
}

impl GvmCliClient {
    pub fn new(config: &MaintenanceConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            host: config.gmp.host.clone(),
            port: config.gmp.port,
            page_size: config.gmp.page_size,
            credentials: config.credentials.clone(),
            gmp_timeout: config.gmp.timeout(),
            scanner_user: config.feeds.sync_user.clone(),
            listing_timeout: config.scanner.listing_timeout(),
        }
    }

    fn cli_args(&self, request: &str) -> Vec<String> {
        vec![
            "--gmp-username".to_string(),
            self.credentials.user.clone(),
            "--gmp-password".to_string(),
            self.credentials.password.clone(),
            "tls".to_string(),
            "--hostname".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--xml".to_string(),
            request.to_string(),
        ]
    }

    async fn request(&self, request: &str) -> Result<String> {
        debug!("GMP request: {}", request);
        let output = self
            .runner
            .run(GVM_CLI, &self.cli_args(request), self.gmp_timeout)
            .await
            .map_err(|e| anyhow!("gvm-cli {}", redact(&e.to_string(), &self.credentials.password)))?;

        if !output.success() {
            let detail = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            bail!("gvm-cli exited with {:?}: {}", output.code, detail);
        }
        Ok(output.stdout)
    }
}

fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "***")
    }
}

/// `get_reports` filter for a zero-based page. GMP counts `first` from 1.
pub fn reports_filter(page: u32, rows: u32) -> String {
    format!("first={} rows={} sort=date", page * rows + 1, rows)
}

/// Scanner lines are whitespace separated `id name status ...`; lines with
/// fewer fields are ignored.
pub fn parse_scanner_listing(output: &str) -> Vec<ScannerInfo> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let id = parts.next()?;
            let name = parts.next()?;
            let status = parts.next()?;
            Some(ScannerInfo {
                id: id.to_string(),
                name: name.to_string(),
                status: status.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl ManagementClient for GvmCliClient {
    async fn list_reports(&self, page: u32) -> Result<Vec<ReportSummary>> {
        let request = format!(
            r#"<get_reports filter="{}" details="0" ignore_pagination="0"/>"#,
            reports_filter(page, self.page_size)
        );
        let response = self.request(&request).await?;
        parse_reports(&response)
    }

    async fn delete_report(&self, id: &str) -> Result<()> {
        let request = format!(r#"<delete_report report_id="{}"/>"#, escape(id));
        let response = self.request(&request).await?;
        check_status(&response)
    }

    async fn list_scanners(&self) -> Result<Vec<ScannerInfo>> {
        let output = self
            .runner
            .run_as(
                &self.scanner_user,
                GVMD,
                &["--get-scanners".to_string()],
                self.listing_timeout,
            )
            .await?
            .into_checked()?;
        Ok(parse_scanner_listing(&output.stdout))
    }
}
