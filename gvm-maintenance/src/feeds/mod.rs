//! Feed categories and their per-run state.

pub mod activity;
pub mod freshness;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::config::FeedSettings;
use crate::constants::feeds::{CERTDATA_SYNC, FEED_SYNC, NVT_SYNC, SCAPDATA_SYNC};

pub use activity::FeedActivityMonitor;
pub use freshness::{FreshnessPoller, FreshnessProbe};

/// Declaration order is the update order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedCategory {
    Nvt,
    GvmdData,
    Scap,
    Cert,
}

/// Command used to sync one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub program: &'static str,
    pub args: Vec<String>,
    /// Dedicated tool preferred over `program` when installed
    pub alternate: Option<&'static str>,
}

impl FeedCategory {
    pub const UPDATE_ORDER: [FeedCategory; 4] = [
        FeedCategory::Nvt,
        FeedCategory::GvmdData,
        FeedCategory::Scap,
        FeedCategory::Cert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedCategory::Nvt => "NVT",
            FeedCategory::GvmdData => "GVMD_DATA",
            FeedCategory::Scap => "SCAP",
            FeedCategory::Cert => "CERT",
        }
    }

    /// Name used for the category in the `info` table and in query text.
    pub fn db_name(&self) -> &'static str {
        match self {
            FeedCategory::Nvt => "nvt",
            FeedCategory::GvmdData => "gvmd_data",
            FeedCategory::Scap => "scap",
            FeedCategory::Cert => "cert",
        }
    }

    pub fn file_patterns(&self) -> &'static [&'static str] {
        match self {
            FeedCategory::Nvt => &["*.nasl"],
            _ => &["*.xml", "*.gz"],
        }
    }

    /// Lowercase words that identify this category in process lists and
    /// query text.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            FeedCategory::Nvt => &["nvt", "nvts"],
            FeedCategory::GvmdData => &["gvmd_data", "port_list", "scan_config", "report_format"],
            FeedCategory::Scap => &["scap", "cve", "cpe"],
            FeedCategory::Cert => &["cert", "advisory"],
        }
    }

    pub fn directory<'a>(&self, settings: &'a FeedSettings) -> &'a Path {
        match self {
            FeedCategory::Nvt => &settings.nvt_dir,
            FeedCategory::GvmdData => &settings.gvmd_data_dir,
            FeedCategory::Scap => &settings.scap_dir,
            FeedCategory::Cert => &settings.cert_dir,
        }
    }

    /// `--type` value for `greenbone-feed-sync`. NVTs go through the legacy
    /// tool, which has no describe mode.
    pub fn feed_sync_type(&self) -> Option<&'static str> {
        match self {
            FeedCategory::Nvt => None,
            other => Some(other.as_str()),
        }
    }

    pub fn sync_command(&self) -> SyncCommand {
        match self.feed_sync_type() {
            None => SyncCommand {
                program: NVT_SYNC,
                args: Vec::new(),
                alternate: None,
            },
            Some(kind) => SyncCommand {
                program: FEED_SYNC,
                args: vec!["--type".to_string(), kind.to_string()],
                alternate: match self {
                    FeedCategory::Scap => Some(SCAPDATA_SYNC),
                    FeedCategory::Cert => Some(CERTDATA_SYNC),
                    _ => None,
                },
            },
        }
    }
}

impl fmt::Display for FeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Ok,
    Skipped,
    Warning,
    Error,
    Timeout,
    Simulated,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Ok => "ok",
            FeedStatus::Skipped => "skipped",
            FeedStatus::Warning => "warning",
            FeedStatus::Error => "error",
            FeedStatus::Timeout => "timeout",
            FeedStatus::Simulated => "simulated",
        }
    }
}

/// Outcome for one category. `age_days` is only set when `last_update` was
/// resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedState {
    pub category: FeedCategory,
    pub last_update: Option<NaiveDateTime>,
    pub age_days: Option<i64>,
    pub status: FeedStatus,
    pub message: String,
}

impl FeedState {
    pub fn new(category: FeedCategory, status: FeedStatus, message: impl Into<String>) -> Self {
        Self {
            category,
            last_update: None,
            age_days: None,
            status,
            message: message.into(),
        }
    }

    pub fn with_age(mut self, last_update: Option<NaiveDateTime>, age_days: Option<i64>) -> Self {
        self.last_update = last_update;
        self.age_days = age_days;
        self
    }
}
