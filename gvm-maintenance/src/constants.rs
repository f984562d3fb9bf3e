//! Fixed platform facts and default thresholds
//!
//! Service names, feed locations and command names are facts about the
//! platform installation. Thresholds here only seed the configuration
//! defaults; stages read them from `MaintenanceConfig`.

/// Platform service names
pub mod services {
    /// Web front end
    pub const FRONTEND: &str = "gsad";

    /// Manager daemon
    pub const MANAGER: &str = "gvmd";

    /// Scanner daemon
    pub const SCANNER: &str = "ospd-openvas";

    /// Services checked at the start of every run, in order
    pub const MONITORED: [&str; 7] = [
        "gvmd",
        "ospd-openvas",
        "gsad",
        "notus-scanner",
        "postgresql",
        "redis-server@openvas",
        "mosquitto",
    ];

    /// Stop order around database maintenance
    pub const STOP_ORDER: [&str; 3] = [FRONTEND, MANAGER, SCANNER];

    /// Start order: the scanner must be up before the manager, the manager
    /// before the front end
    pub const START_ORDER: [&str; 3] = [SCANNER, MANAGER, FRONTEND];
}

/// Feed sync tooling
pub mod feeds {
    /// Generic sync tool
    pub const FEED_SYNC: &str = "greenbone-feed-sync";

    /// Legacy NVT sync tool
    pub const NVT_SYNC: &str = "greenbone-nvt-sync";

    /// Preferred over `greenbone-feed-sync --type SCAP` when installed
    pub const SCAPDATA_SYNC: &str = "greenbone-scapdata-sync";

    /// Preferred over `greenbone-feed-sync --type CERT` when installed
    pub const CERTDATA_SYNC: &str = "greenbone-certdata-sync";

    /// Process name fragments of running sync tools
    pub const SYNC_PROCESS_FRAGMENTS: [&str; 4] =
        ["feed-sync", "nvt-sync", "scapdata-sync", "certdata-sync"];
}

/// Per-call time budgets (seconds unless stated)
pub mod timeouts {
    pub const SERVICE_CHECK_SECONDS: u64 = 5;
    pub const SERVICE_RESTART_SECONDS: u64 = 30;
    pub const SERVICE_CONTROL_SECONDS: u64 = 60;
    pub const DESCRIBE_SECONDS: u64 = 30;
    pub const PROBE_SECONDS: u64 = 10;
    pub const FEED_SYNC_MINUTES: u64 = 480;
    pub const FEED_VERIFICATION_MINUTES: u64 = 480;
    pub const VACUUM_MINUTES: u64 = 60;
    pub const ANALYZE_MINUTES: u64 = 30;
    pub const REINDEX_MINUTES: u64 = 60;
    pub const SCANNER_LISTING_SECONDS: u64 = 30;
    pub const GMP_SECONDS: u64 = 120;
    pub const INSPECTION_SECONDS: u64 = 15;
}

/// Default configuration values
pub mod defaults {
    pub const CONFIG_PATH: &str = "/opt/gvm/Config/maintenance.toml";
    pub const CREDENTIALS_PATH: &str = "/opt/gvm/Config/config.json";
    pub const LOCK_FILE: &str = "/opt/gvm/.maintenance.lock";
    pub const REPORT_DIR: &str = "/opt/gvm/logs/maintenance";

    pub const REPORT_RETENTION_DAYS: i64 = 90;
    pub const LOG_RETENTION_DAYS: i64 = 30;
    pub const MIN_DISK_SPACE_GB: f64 = 10.0;

    pub const FEED_MAX_AGE_DAYS: i64 = 30;
    pub const FEED_POLL_INTERVAL_SECONDS: u64 = 30;
    pub const FEED_QUIET_POLLS: u32 = 3;
    pub const FEED_PROBE_FILE_CAP: usize = 500;
    pub const FEED_USER: &str = "gvm";

    pub const CONNECTION_DRAIN_SECONDS: u64 = 5;
    pub const SERVICE_START_SPACING_SECONDS: u64 = 5;
    pub const SERVICE_STABILIZATION_SECONDS: u64 = 15;
    pub const SCANNER_SOCKET: &str = "/run/ospd/ospd-openvas.sock";
    pub const SCANNER_VERIFY_ATTEMPTS: u32 = 5;
    pub const SCANNER_VERIFY_DELAY_SECONDS: u64 = 5;
    pub const SCANNER_REMEDIATION_ATTEMPTS: u32 = 3;
    pub const SCANNER_REMEDIATION_DELAY_SECONDS: u64 = 10;

    pub const DATABASE_URL: &str = "postgres://postgres@%2Fvar%2Frun%2Fpostgresql/gvmd";
    pub const DATABASE_NAME: &str = "gvmd";

    pub const GMP_HOST: &str = "127.0.0.1";
    pub const GMP_PORT: u16 = 9390;
    pub const GMP_USER: &str = "admin";
    pub const GMP_PASSWORD: &str = "admin";
    pub const REPORT_PAGE_SIZE: u32 = 100;
}

/// Scanner status code meaning "not available"
pub const SCANNER_UNAVAILABLE: &str = "0";
