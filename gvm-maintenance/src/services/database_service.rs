use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::MaintenanceConfig;
use crate::constants::{services, SCANNER_UNAVAILABLE};
use crate::database::{SqlStore, StoreError};
use crate::errors::DatabaseError;
use crate::gmp::ManagementClient;
use crate::report::{
    DatabaseSnapshot, DatabaseStatus, MaintenanceReport, ScannerCheck, ScannerSnapshot, ServiceStatus,
};
use crate::system::ServiceControl;

const SIZE_UNKNOWN: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenancePhase {
    Idle,
    ServicesStopping,
    Vacuuming,
    ServicesStarting,
    ScannerVerifying,
    Done,
}

/// Stops the platform, vacuums the database and brings everything back up.
pub struct DatabaseService {
    config: Arc<MaintenanceConfig>,
    services: Arc<dyn ServiceControl>,
    store: Arc<dyn SqlStore>,
    client: Arc<dyn ManagementClient>,
    phases: Vec<MaintenancePhase>,
}

impl DatabaseService {
    pub fn new(
        config: Arc<MaintenanceConfig>,
        services: Arc<dyn ServiceControl>,
        store: Arc<dyn SqlStore>,
        client: Arc<dyn ManagementClient>,
    ) -> Self {
        Self {
            config,
            services,
            store,
            client,
            phases: vec![MaintenancePhase::Idle],
        }
    }

    pub fn phase(&self) -> MaintenancePhase {
        self.phases.last().copied().unwrap_or(MaintenancePhase::Idle)
    }

    /// Every phase entered so far, starting with `Idle`.
    pub fn phase_history(&self) -> &[MaintenancePhase] {
        &self.phases
    }

    fn enter(&mut self, phase: MaintenancePhase) {
        debug!("Database maintenance: {:?} -> {:?}", self.phase(), phase);
        self.phases.push(phase);
    }

    pub async fn run(&mut self, report: &mut MaintenanceReport, dry_run: bool) -> Result<(), DatabaseError> {
        if dry_run {
            info!("[dry-run] Would stop services, run VACUUM/ANALYZE/REINDEX and restart services");
            report.database = Some(DatabaseSnapshot {
                status: DatabaseStatus::Simulated,
                size_before: None,
                size_after: None,
            });
            report.scanners = Some(ScannerSnapshot {
                status: ScannerCheck::Simulated,
                scanners: Vec::new(),
            });
            self.enter(MaintenancePhase::Done);
            return Ok(());
        }

        let manage_services = self.config.stop_services_for_db_maintenance;
        let stopped = if manage_services {
            self.enter(MaintenancePhase::ServicesStopping);
            self.stop_services(report).await
        } else {
            info!("Service stop disabled, running maintenance against live services");
            Vec::new()
        };

        if !stopped.is_empty() {
            sleep(self.config.database.connection_drain()).await;
        }

        self.enter(MaintenancePhase::Vacuuming);
        let size_before = self.database_size().await;

        if let Err(err) = self.vacuum(report).await {
            error!("Database maintenance aborted: {}", err);
            report.database = Some(DatabaseSnapshot {
                status: DatabaseStatus::Failed,
                size_before: Some(size_before),
                size_after: None,
            });
            self.recover(&stopped, report).await;
            self.enter(MaintenancePhase::Done);
            return Err(err);
        }

        let size_after = self.database_size().await;
        info!("Database size: {} -> {}", size_before, size_after);
        report.database = Some(DatabaseSnapshot {
            status: DatabaseStatus::Ok,
            size_before: Some(size_before),
            size_after: Some(size_after),
        });

        if !stopped.is_empty() {
            self.enter(MaintenancePhase::ServicesStarting);
            self.start_services(&stopped, report, false).await;
            sleep(self.config.scanner.stabilization()).await;

            self.enter(MaintenancePhase::ScannerVerifying);
            self.ensure_scanners(report).await;
        }

        self.enter(MaintenancePhase::Done);
        Ok(())
    }

    /// Stops services in stop order and returns the ones that stopped.
    async fn stop_services(&self, report: &mut MaintenanceReport) -> Vec<String> {
        let limit = self.config.services.control_timeout();
        let mut stopped = Vec::new();

        for name in services::STOP_ORDER {
            match self.services.stop(name, limit).await {
                Ok(()) => {
                    info!("Stopped {}", name);
                    report.record_service(name, ServiceStatus::Stopped, "Stopped for database maintenance");
                    stopped.push(name.to_string());
                }
                Err(e) => {
                    report.add_warning(format!("Could not stop {} ({}), continuing", name, e));
                }
            }
        }

        stopped
    }

    /// Starts the stopped services in start order. During recovery failures
    /// are only logged.
    async fn start_services(&self, stopped: &[String], report: &mut MaintenanceReport, recovering: bool) {
        let limit = self.config.services.control_timeout();

        for name in services::START_ORDER {
            if !stopped.iter().any(|s| s == name) {
                continue;
            }

            if name == services::MANAGER {
                let socket = &self.config.scanner.socket_path;
                if !tokio::fs::try_exists(socket).await.unwrap_or(false) {
                    let message = format!("Scanner socket {} not found before starting {}", socket.display(), name);
                    if recovering {
                        warn!("{}", message);
                    } else {
                        report.add_warning(message);
                    }
                }
            }

            match self.services.start(name, limit).await {
                Ok(()) => {
                    info!("Started {}", name);
                    report.record_service(name, ServiceStatus::Started, "Started after database maintenance");
                    sleep(self.config.scanner.start_spacing()).await;
                }
                Err(e) if recovering => error!("Could not restart {} during recovery: {}", name, e),
                Err(e) => report.add_error(format!("Critical: could not restart {}: {}", name, e)),
            }
        }
    }

    async fn database_size(&self) -> String {
        let sql = format!(
            "SELECT pg_size_pretty(pg_database_size('{}'))",
            self.config.database.name
        );

        match timeout(self.config.feeds.probe_timeout(), self.store.fetch_text(&sql)).await {
            Ok(Ok(Some(size))) => size,
            Ok(Ok(None)) => SIZE_UNKNOWN.to_string(),
            Ok(Err(e)) => {
                warn!("Could not read database size: {}", e);
                SIZE_UNKNOWN.to_string()
            }
            Err(_) => {
                warn!("Timed out reading database size");
                SIZE_UNKNOWN.to_string()
            }
        }
    }

    async fn vacuum(&self, report: &mut MaintenanceReport) -> Result<(), DatabaseError> {
        let db = &self.config.database;
        let statements = [
            ("VACUUM", "VACUUM".to_string(), db.vacuum_timeout()),
            ("ANALYZE", "ANALYZE".to_string(), db.analyze_timeout()),
            ("REINDEX", format!("REINDEX DATABASE {}", db.name), db.reindex_timeout()),
        ];

        for (operation, sql, limit) in statements {
            info!("Running {}", operation);
            match timeout(limit, self.store.execute(&sql)).await {
                Ok(Ok(())) => info!("{} completed", operation),
                Ok(Err(StoreError::Statement(msg))) => {
                    let msg: String = msg.chars().take(200).collect();
                    report.add_warning(format!("{} completed with warnings: {}", operation, msg));
                }
                Ok(Err(StoreError::Unavailable(reason))) => {
                    return Err(DatabaseError::Unavailable {
                        operation: operation.to_string(),
                        reason,
                    });
                }
                Err(_) => {
                    return Err(DatabaseError::Timeout {
                        operation: operation.to_string(),
                        limit,
                    });
                }
            }
        }

        Ok(())
    }

    async fn recover(&mut self, stopped: &[String], report: &mut MaintenanceReport) {
        if stopped.is_empty() {
            return;
        }

        warn!("Restoring services after failed database maintenance");
        self.enter(MaintenancePhase::ServicesStarting);
        self.start_services(stopped, report, true).await;
        sleep(self.config.scanner.remediation_delay()).await;

        self.enter(MaintenancePhase::ScannerVerifying);
        self.verify_scanners(report, self.config.scanner.remediation_attempts).await;
    }

    /// Verifies scanners and restarts the manager once if any stays down.
    async fn ensure_scanners(&self, report: &mut MaintenanceReport) -> bool {
        let scanner = &self.config.scanner;
        if self.verify_scanners(report, scanner.verify_attempts).await {
            return true;
        }

        info!("Restarting {} to recover scanners", services::MANAGER);
        if let Err(e) = self
            .services
            .restart(services::MANAGER, self.config.services.control_timeout())
            .await
        {
            report.add_error(format!("Failed to restart {}: {}", services::MANAGER, e));
            return false;
        }

        sleep(scanner.remediation_delay()).await;
        self.verify_scanners(report, scanner.remediation_attempts).await
    }

    async fn verify_scanners(&self, report: &mut MaintenanceReport, attempts: u32) -> bool {
        let attempts = attempts.max(1);
        let delay = self.config.scanner.verify_delay();

        for attempt in 1..=attempts {
            let last = attempt == attempts;

            match self.client.list_scanners().await {
                Ok(scanners) => {
                    let unavailable: Vec<&str> = scanners
                        .iter()
                        .filter(|s| s.status == SCANNER_UNAVAILABLE)
                        .map(|s| s.name.as_str())
                        .collect();

                    if unavailable.is_empty() {
                        info!("All {} scanners available", scanners.len());
                        report.scanners = Some(ScannerSnapshot {
                            status: ScannerCheck::Ok,
                            scanners,
                        });
                        return true;
                    }

                    debug!(
                        "Attempt {}/{}: scanners unavailable: {}",
                        attempt,
                        attempts,
                        unavailable.join(", ")
                    );
                    if last {
                        report.add_warning(format!(
                            "Scanners still unavailable after {} attempts: {}",
                            attempts,
                            unavailable.join(", ")
                        ));
                        report.scanners = Some(ScannerSnapshot {
                            status: ScannerCheck::Warning,
                            scanners,
                        });
                        return false;
                    }
                }
                Err(e) if last => {
                    report.add_error(format!("Failed to list scanners: {:#}", e));
                    report.scanners = Some(ScannerSnapshot {
                        status: ScannerCheck::Error,
                        scanners: Vec::new(),
                    });
                    return false;
                }
                Err(e) => debug!("Attempt {}/{}: scanner listing failed: {:#}", attempt, attempts, e),
            }

            sleep(delay).await;
        }

        false
    }
}
