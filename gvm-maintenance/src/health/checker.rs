use std::sync::Arc;
use tracing::info;

use crate::config::MaintenanceConfig;
use crate::report::{MaintenanceReport, ServiceStatus};
use crate::system::ServiceControl;

/// Outcome of one pass over the monitored services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    pub checked: usize,
    pub failed: Vec<String>,
    pub restarted: Vec<String>,
}

pub struct ServiceHealthChecker {
    services: Arc<dyn ServiceControl>,
    config: Arc<MaintenanceConfig>,
}

impl ServiceHealthChecker {
    pub fn new(services: Arc<dyn ServiceControl>, config: Arc<MaintenanceConfig>) -> Self {
        Self { services, config }
    }

    /// Checks every monitored service in order. One service's failure never
    /// stops the others from being checked or restarted.
    pub async fn check_all(&self, report: &mut MaintenanceReport, dry_run: bool) -> HealthSummary {
        let settings = &self.config.services;
        let mut summary = HealthSummary::default();

        for name in &settings.monitored {
            summary.checked += 1;
            if !self.check_service(name, report).await {
                summary.failed.push(name.clone());
            }
        }

        if self.config.restart_failed_services && !dry_run && !summary.failed.is_empty() {
            info!("Restarting failed services: {}", summary.failed.join(", "));
            for name in &summary.failed {
                match self.services.restart(name, settings.restart_timeout()).await {
                    Ok(()) => {
                        report.record_service(name, ServiceStatus::Restarted, "Service restarted");
                        summary.restarted.push(name.clone());
                    }
                    Err(e) => report.add_error(format!("Failed to restart {}: {}", name, e)),
                }
            }
        }

        info!(
            "Services checked: {}, failed: {}",
            summary.checked,
            summary.failed.len()
        );
        summary
    }

    async fn check_service(&self, name: &str, report: &mut MaintenanceReport) -> bool {
        match self
            .services
            .state(name, self.config.services.check_timeout())
            .await
        {
            Ok(state) if state == "active" => {
                report.record_service(name, ServiceStatus::Ok, "Service active");
                true
            }
            Ok(state) => {
                report.record_service(
                    name,
                    ServiceStatus::Failed,
                    format!("Service not active: {}", state),
                );
                report.add_error(format!("Service {} is not active", name));
                false
            }
            Err(e) if e.is_timeout() => {
                report.record_service(name, ServiceStatus::Timeout, "Timed out checking service");
                report.add_warning(format!("Timed out checking service {}", name));
                false
            }
            Err(e) => {
                report.record_service(name, ServiceStatus::Error, e.to_string());
                report.add_error(format!("Error checking service {}: {}", name, e));
                false
            }
        }
    }
}
