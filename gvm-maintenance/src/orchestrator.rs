//! Runs the maintenance stages in order under the maintenance lock.
//!
//! Stages never abort the run: they record errors and warnings in the
//! report. Only a held lock or a report that cannot be written makes
//! [`MaintenanceOrchestrator::run`] return an error.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MaintenanceConfig;
use crate::database::SqlStore;
use crate::errors::MaintenanceError;
use crate::feeds::{FeedActivityMonitor, FreshnessPoller};
use crate::gmp::ManagementClient;
use crate::health::ServiceHealthChecker;
use crate::lock::{LockGuard, LockManager};
use crate::report::{MaintenanceReport, PersistedReport};
use crate::services::{AlertService, CleanupService, DatabaseService, FeedService};
use crate::system::inspection::HostInspector;
use crate::system::{CommandRunner, ServiceControl};

/// Host-facing dependencies shared by the stages.
#[derive(Clone)]
pub struct Collaborators {
    pub runner: Arc<dyn CommandRunner>,
    pub services: Arc<dyn ServiceControl>,
    pub store: Arc<dyn SqlStore>,
    pub client: Arc<dyn ManagementClient>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: MaintenanceReport,
    pub persisted: PersistedReport,
    pub exit_code: u8,
}

pub struct MaintenanceOrchestrator {
    config: Arc<MaintenanceConfig>,
    lock: LockManager,
    health: ServiceHealthChecker,
    feeds: FeedService,
    cleanup: CleanupService,
    database: DatabaseService,
    inspector: HostInspector,
    alerts: Option<AlertService>,
}

impl MaintenanceOrchestrator {
    pub fn new(config: Arc<MaintenanceConfig>, collaborators: Collaborators) -> Self {
        let freshness = FreshnessPoller::standard(
            &config,
            collaborators.runner.clone(),
            collaborators.store.clone(),
        );
        let activity = FeedActivityMonitor::standard(
            collaborators.store.clone(),
            collaborators.runner.clone(),
            config.feeds.probe_timeout(),
        );

        let alerts = match config.alarm_webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => match AlertService::new(url.to_string()) {
                Ok(service) => Some(service),
                Err(e) => {
                    warn!("Alerting disabled: {:#}", e);
                    None
                }
            },
            _ => None,
        };

        Self {
            lock: LockManager::new(config.lock_file.clone()),
            health: ServiceHealthChecker::new(collaborators.services.clone(), config.clone()),
            feeds: FeedService::new(config.clone(), collaborators.runner.clone(), freshness, activity),
            cleanup: CleanupService::new(config.clone(), collaborators.client.clone()),
            database: DatabaseService::new(
                config.clone(),
                collaborators.services,
                collaborators.store,
                collaborators.client,
            ),
            inspector: HostInspector::new(collaborators.runner, config.inspection.clone()),
            alerts,
            config,
        }
    }

    /// Replaces the default feed probes.
    pub fn with_feed_probes(
        mut self,
        runner: Arc<dyn CommandRunner>,
        freshness: FreshnessPoller,
        activity: FeedActivityMonitor,
    ) -> Self {
        self.feeds = FeedService::new(self.config.clone(), runner, freshness, activity);
        self
    }

    pub async fn run(&mut self, dry_run: bool) -> Result<RunOutcome, MaintenanceError> {
        let guard: Option<LockGuard> = if dry_run {
            info!("[dry-run] Skipping maintenance lock");
            None
        } else {
            Some(self.lock.acquire()?)
        };

        info!(
            "Starting GVM maintenance{}",
            if dry_run { " (dry-run)" } else { "" }
        );

        let mut report = MaintenanceReport::new(dry_run);
        self.run_stages(&mut report, dry_run).await;

        info!("\n{}", report.render_summary());

        let persisted = report.persist(&self.config.report_dir).await?;

        if let Some(alerts) = &self.alerts {
            alerts.send_run_summary(&report, Some(&persisted)).await;
        }

        drop(guard);

        let exit_code = report.exit_code();
        info!(
            "Maintenance finished: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );

        Ok(RunOutcome {
            report,
            persisted,
            exit_code,
        })
    }

    async fn run_stages(&mut self, report: &mut MaintenanceReport, dry_run: bool) {
        info!("[1/7] Checking services");
        self.health.check_all(report, dry_run).await;

        info!("[2/7] Updating feeds");
        self.feeds.update_all(report, dry_run).await;

        info!("[3/7] Cleaning up old reports");
        self.cleanup.clean_reports(report, dry_run).await;

        info!("[4/7] Cleaning up files");
        self.cleanup.clean_files(report, dry_run).await;

        info!("[5/7] Checking disk space");
        self.inspector.check_disk_space(report).await;

        if self.config.verify_feeds_before_db_maintenance && !dry_run {
            info!("Verifying that no feed is still importing");
            if !self.feeds.verify_all_quiescent(report).await {
                report.add_warning("Some feeds are still updating; continuing with database maintenance");
            }
        }

        info!("[6/7] Database maintenance");
        if let Err(e) = self.database.run(report, dry_run).await {
            report.add_error(format!("Database maintenance failed: {}", e));
        }

        info!("[7/7] Checking certificates");
        self.inspector.check_certificates(report).await;
    }
}
