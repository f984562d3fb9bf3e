use super::{CredentialsLoader, MaintenanceConfig};
use crate::errors::ConfigError;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub struct ConfigManager {
    current_config: Arc<MaintenanceConfig>,
}

impl ConfigManager {
    pub async fn new(config_path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_configuration(config_path).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<MaintenanceConfig> {
        self.current_config.clone()
    }

    async fn load_configuration(config_path: &Path) -> Result<MaintenanceConfig, ConfigError> {
        let path_display = config_path.display().to_string();

        let mut config = match fs::read_to_string(config_path).await {
            Ok(content) => {
                debug!("Parsing maintenance config {}", path_display);
                toml::from_str::<MaintenanceConfig>(&content).map_err(|e| {
                    ConfigError::ParseError {
                        path: path_display.clone(),
                        reason: e.to_string(),
                    }
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using built-in defaults", path_display);
                MaintenanceConfig::default()
            }
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path_display,
                    reason: e.to_string(),
                })
            }
        };

        config.validate()?;
        config.credentials = CredentialsLoader::load(&config.credentials_file);

        info!(
            "Loaded maintenance config: {} monitored services, feed max age {} days, reports in {}",
            config.services.monitored.len(),
            config.feeds.max_age_days,
            config.report_dir.display()
        );

        Ok(config)
    }
}
