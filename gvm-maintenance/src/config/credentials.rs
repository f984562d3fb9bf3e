//! Management protocol credentials.
//!
//! The platform keeps them in its own JSON config, shared with the other
//! operational scripts:
//! ```json
//! { "user": "admin", "password": "secret" }
//! ```
//! Unrelated keys in that file are ignored.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::constants::defaults;

#[derive(Clone, Deserialize)]
pub struct GmpCredentials {
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_user() -> String {
    defaults::GMP_USER.to_string()
}

fn default_password() -> String {
    defaults::GMP_PASSWORD.to_string()
}

impl Default for GmpCredentials {
    fn default() -> Self {
        Self {
            user: default_user(),
            password: default_password(),
        }
    }
}

impl std::fmt::Debug for GmpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmpCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct CredentialsLoader;

impl CredentialsLoader {
    /// Reads credentials from `path`. A missing or malformed file falls back
    /// to the stock `admin`/`admin` account with a warning.
    pub fn load(path: &Path) -> GmpCredentials {
        match Self::read(path) {
            Ok(Some(credentials)) => {
                info!("Loaded management credentials for '{}' from {:?}", credentials.user, path);
                credentials
            }
            Ok(None) => {
                warn!("Credentials file not found at {:?}, using default account", path);
                GmpCredentials::default()
            }
            Err(e) => {
                warn!("{:#}, using default account", e);
                GmpCredentials::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Option<GmpCredentials>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {:?}", path))?;

        let credentials: GmpCredentials = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credentials file {:?}", path))?;

        Ok(Some(credentials))
    }
}
