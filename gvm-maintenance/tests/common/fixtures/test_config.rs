//! Test configuration builder
//!
//! Every path points into a private temp directory and every fixed delay is
//! zero, so stages run instantly against the scripted doubles.

use gvm_maintenance::config::MaintenanceConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config: MaintenanceConfig,
}

impl TestEnv {
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    pub fn shared(&self) -> Arc<MaintenanceConfig> {
        Arc::new(self.config.clone())
    }
}

pub struct TestConfigBuilder {
    temp_dir: TempDir,
    config: MaintenanceConfig,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();
        let mut config = MaintenanceConfig::default();

        config.lock_file = root.join("maintenance.lock");
        config.report_dir = root.join("reports");
        config.credentials_file = root.join("config.json");

        config.feeds.nvt_dir = root.join("feeds/plugins");
        config.feeds.scap_dir = root.join("feeds/scap-data");
        config.feeds.cert_dir = root.join("feeds/cert-data");
        config.feeds.gvmd_data_dir = root.join("feeds/data-objects");
        config.feeds.poll_interval_seconds = 0;
        config.feeds.verification_timeout_minutes = 1;

        config.cleanup.exports_dir = root.join("exports");
        config.cleanup.log_dirs = vec![root.join("logs")];
        config.cleanup.temp_files = vec![root.join("tasksend.txt"), root.join("taskslog.txt")];

        config.database.connection_drain_seconds = 0;
        config.scanner.socket_path = root.join("ospd-openvas.sock");
        config.scanner.start_spacing_seconds = 0;
        config.scanner.stabilization_seconds = 0;
        config.scanner.verify_delay_seconds = 0;
        config.scanner.remediation_delay_seconds = 0;

        config.inspection.disk_path = root.to_path_buf();
        config.inspection.certificate_paths = vec![root.join("CA/cacert.pem")];

        Self { temp_dir, config }
    }

    pub fn with_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut MaintenanceConfig),
    {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> TestEnv {
        TestEnv {
            temp_dir: self.temp_dir,
            config: self.config,
        }
    }
}
