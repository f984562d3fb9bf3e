pub mod credentials;
pub mod manager;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{defaults, services, timeouts};
use crate::errors::ConfigError;

pub use credentials::{CredentialsLoader, GmpCredentials};
pub use manager::ConfigManager;

/// Settings for one maintenance run. Every field has a default, so an empty
/// file (or no file at all) yields the stock platform layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub lock_file: PathBuf,
    pub report_dir: PathBuf,
    pub credentials_file: PathBuf,
    pub alarm_webhook_url: Option<String>,
    pub restart_failed_services: bool,
    pub stop_services_for_db_maintenance: bool,
    pub verify_feeds_before_db_maintenance: bool,
    pub services: ServiceSettings,
    pub feeds: FeedSettings,
    pub cleanup: CleanupSettings,
    pub database: DatabaseSettings,
    pub scanner: ScannerSettings,
    pub gmp: GmpSettings,
    pub inspection: InspectionSettings,
    // Populated from the platform credentials file
    #[serde(skip)]
    pub credentials: GmpCredentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub monitored: Vec<String>,
    pub check_timeout_seconds: u64,
    pub restart_timeout_seconds: u64,
    pub control_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub max_age_days: i64,
    pub sync_user: String,
    pub sync_timeout_minutes: u64,
    pub verification_timeout_minutes: u64,
    pub poll_interval_seconds: u64,
    pub quiet_polls_required: u32,
    pub probe_file_cap: usize,
    pub describe_timeout_seconds: u64,
    pub probe_timeout_seconds: u64,
    pub nvt_dir: PathBuf,
    pub scap_dir: PathBuf,
    pub cert_dir: PathBuf,
    pub gvmd_data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    pub report_retention_days: i64,
    pub log_retention_days: i64,
    pub exports_dir: PathBuf,
    pub log_dirs: Vec<PathBuf>,
    pub temp_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub connection_drain_seconds: u64,
    pub vacuum_timeout_minutes: u64,
    pub analyze_timeout_minutes: u64,
    pub reindex_timeout_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub socket_path: PathBuf,
    pub start_spacing_seconds: u64,
    pub stabilization_seconds: u64,
    pub verify_attempts: u32,
    pub verify_delay_seconds: u64,
    pub remediation_attempts: u32,
    pub remediation_delay_seconds: u64,
    pub listing_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmpSettings {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionSettings {
    pub disk_path: PathBuf,
    pub min_disk_space_gb: f64,
    pub certificate_paths: Vec<PathBuf>,
    pub timeout_seconds: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            lock_file: PathBuf::from(defaults::LOCK_FILE),
            report_dir: PathBuf::from(defaults::REPORT_DIR),
            credentials_file: PathBuf::from(defaults::CREDENTIALS_PATH),
            alarm_webhook_url: None,
            restart_failed_services: false,
            stop_services_for_db_maintenance: true,
            verify_feeds_before_db_maintenance: true,
            services: ServiceSettings::default(),
            feeds: FeedSettings::default(),
            cleanup: CleanupSettings::default(),
            database: DatabaseSettings::default(),
            scanner: ScannerSettings::default(),
            gmp: GmpSettings::default(),
            inspection: InspectionSettings::default(),
            credentials: GmpCredentials::default(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            monitored: services::MONITORED.iter().map(|s| s.to_string()).collect(),
            check_timeout_seconds: timeouts::SERVICE_CHECK_SECONDS,
            restart_timeout_seconds: timeouts::SERVICE_RESTART_SECONDS,
            control_timeout_seconds: timeouts::SERVICE_CONTROL_SECONDS,
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_age_days: defaults::FEED_MAX_AGE_DAYS,
            sync_user: defaults::FEED_USER.to_string(),
            sync_timeout_minutes: timeouts::FEED_SYNC_MINUTES,
            verification_timeout_minutes: timeouts::FEED_VERIFICATION_MINUTES,
            poll_interval_seconds: defaults::FEED_POLL_INTERVAL_SECONDS,
            quiet_polls_required: defaults::FEED_QUIET_POLLS,
            probe_file_cap: defaults::FEED_PROBE_FILE_CAP,
            describe_timeout_seconds: timeouts::DESCRIBE_SECONDS,
            probe_timeout_seconds: timeouts::PROBE_SECONDS,
            nvt_dir: PathBuf::from("/var/lib/openvas/plugins"),
            scap_dir: PathBuf::from("/var/lib/gvm/scap-data"),
            cert_dir: PathBuf::from("/var/lib/gvm/cert-data"),
            gvmd_data_dir: PathBuf::from("/var/lib/gvm/data-objects"),
        }
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            report_retention_days: defaults::REPORT_RETENTION_DAYS,
            log_retention_days: defaults::LOG_RETENTION_DAYS,
            exports_dir: PathBuf::from("/opt/gvm/Reports/exports"),
            log_dirs: vec![PathBuf::from("/var/log/gvm"), PathBuf::from("/opt/gvm")],
            temp_files: vec![
                PathBuf::from("/opt/gvm/tasksend.txt"),
                PathBuf::from("/opt/gvm/taskslog.txt"),
                PathBuf::from("/opt/gvm/logbalbix.txt"),
            ],
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_string(),
            name: defaults::DATABASE_NAME.to_string(),
            connection_drain_seconds: defaults::CONNECTION_DRAIN_SECONDS,
            vacuum_timeout_minutes: timeouts::VACUUM_MINUTES,
            analyze_timeout_minutes: timeouts::ANALYZE_MINUTES,
            reindex_timeout_minutes: timeouts::REINDEX_MINUTES,
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(defaults::SCANNER_SOCKET),
            start_spacing_seconds: defaults::SERVICE_START_SPACING_SECONDS,
            stabilization_seconds: defaults::SERVICE_STABILIZATION_SECONDS,
            verify_attempts: defaults::SCANNER_VERIFY_ATTEMPTS,
            verify_delay_seconds: defaults::SCANNER_VERIFY_DELAY_SECONDS,
            remediation_attempts: defaults::SCANNER_REMEDIATION_ATTEMPTS,
            remediation_delay_seconds: defaults::SCANNER_REMEDIATION_DELAY_SECONDS,
            listing_timeout_seconds: timeouts::SCANNER_LISTING_SECONDS,
        }
    }
}

impl Default for GmpSettings {
    fn default() -> Self {
        Self {
            host: defaults::GMP_HOST.to_string(),
            port: defaults::GMP_PORT,
            timeout_seconds: timeouts::GMP_SECONDS,
            page_size: defaults::REPORT_PAGE_SIZE,
        }
    }
}

impl Default for InspectionSettings {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from("/"),
            min_disk_space_gb: defaults::MIN_DISK_SPACE_GB,
            certificate_paths: vec![
                PathBuf::from("/var/lib/gvm/CA/cacert.pem"),
                PathBuf::from("/var/lib/gvm/CA/servercert.pem"),
            ],
            timeout_seconds: timeouts::INSPECTION_SECONDS,
        }
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value * 60)
}

impl MaintenanceConfig {
    /// Rejects values that would make a stage loop forever or never succeed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &str, reason: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.feeds.max_age_days < 0 {
            return Err(invalid("feeds.max_age_days", "must not be negative"));
        }
        if self.feeds.quiet_polls_required == 0 {
            return Err(invalid("feeds.quiet_polls_required", "must be at least 1"));
        }
        if self.feeds.probe_file_cap == 0 {
            return Err(invalid("feeds.probe_file_cap", "must be at least 1"));
        }
        if self.scanner.verify_attempts == 0 || self.scanner.remediation_attempts == 0 {
            return Err(invalid("scanner", "verification attempts must be at least 1"));
        }
        if self.gmp.page_size == 0 {
            return Err(invalid("gmp.page_size", "must be at least 1"));
        }
        if self.cleanup.report_retention_days < 0 || self.cleanup.log_retention_days < 0 {
            return Err(invalid("cleanup", "retention must not be negative"));
        }
        // Interpolated into REINDEX and size queries
        let name = &self.database.name;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("database.name", "must be a plain identifier"));
        }
        Ok(())
    }
}

impl ServiceSettings {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_seconds)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_secs(self.restart_timeout_seconds)
    }

    pub fn control_timeout(&self) -> Duration {
        Duration::from_secs(self.control_timeout_seconds)
    }
}

impl FeedSettings {
    pub fn sync_timeout(&self) -> Duration {
        minutes(self.sync_timeout_minutes)
    }

    pub fn verification_timeout(&self) -> Duration {
        minutes(self.verification_timeout_minutes)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn describe_timeout(&self) -> Duration {
        Duration::from_secs(self.describe_timeout_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

impl DatabaseSettings {
    pub fn connection_drain(&self) -> Duration {
        Duration::from_secs(self.connection_drain_seconds)
    }

    pub fn vacuum_timeout(&self) -> Duration {
        minutes(self.vacuum_timeout_minutes)
    }

    pub fn analyze_timeout(&self) -> Duration {
        minutes(self.analyze_timeout_minutes)
    }

    pub fn reindex_timeout(&self) -> Duration {
        minutes(self.reindex_timeout_minutes)
    }
}

impl ScannerSettings {
    pub fn start_spacing(&self) -> Duration {
        Duration::from_secs(self.start_spacing_seconds)
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_secs(self.stabilization_seconds)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_secs(self.verify_delay_seconds)
    }

    pub fn remediation_delay(&self) -> Duration {
        Duration::from_secs(self.remediation_delay_seconds)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_seconds)
    }
}

impl GmpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl InspectionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
