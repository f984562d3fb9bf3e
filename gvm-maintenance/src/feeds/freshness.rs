//! Last-update resolution for feed categories.
//!
//! Probes are tried in order and the first one that yields a timestamp wins:
//! feed files on disk, the sync tool's describe output, then the version
//! recorded in the `info` table. All timestamps are naive local time.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::FeedCategory;
use crate::config::MaintenanceConfig;
use crate::constants::feeds::FEED_SYNC;
use crate::database::SqlStore;
use crate::system::CommandRunner;

#[async_trait]
pub trait FreshnessProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn last_update(&self, category: FeedCategory) -> Option<NaiveDateTime>;
}

/// Age and staleness of one category at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Freshness {
    pub last_update: Option<NaiveDateTime>,
    pub age_days: Option<i64>,
    pub stale: bool,
}

pub struct FreshnessPoller {
    probes: Vec<Box<dyn FreshnessProbe>>,
    max_age_days: i64,
}

impl FreshnessPoller {
    pub fn new(probes: Vec<Box<dyn FreshnessProbe>>, max_age_days: i64) -> Self {
        Self {
            probes,
            max_age_days,
        }
    }

    /// Filesystem, describe command, store version: the production order.
    pub fn standard(
        config: &MaintenanceConfig,
        runner: Arc<dyn CommandRunner>,
        store: Arc<dyn SqlStore>,
    ) -> Self {
        let feeds = &config.feeds;
        let probes: Vec<Box<dyn FreshnessProbe>> = vec![
            Box::new(FilesystemProbe::new(
                [
                    (FeedCategory::Nvt, feeds.nvt_dir.clone()),
                    (FeedCategory::GvmdData, feeds.gvmd_data_dir.clone()),
                    (FeedCategory::Scap, feeds.scap_dir.clone()),
                    (FeedCategory::Cert, feeds.cert_dir.clone()),
                ],
                feeds.probe_file_cap,
            )),
            Box::new(DescribeCommandProbe::new(
                runner,
                feeds.sync_user.clone(),
                feeds.describe_timeout(),
            )),
            Box::new(StoreVersionProbe::new(store, feeds.probe_timeout())),
        ];
        Self::new(probes, feeds.max_age_days)
    }

    pub async fn last_update(&self, category: FeedCategory) -> Option<NaiveDateTime> {
        for probe in &self.probes {
            if let Some(timestamp) = probe.last_update(category).await {
                debug!("{} last update resolved by {} probe: {}", category, probe.name(), timestamp);
                return Some(timestamp);
            }
            debug!("{} probe found nothing for {}", probe.name(), category);
        }
        None
    }

    pub fn is_stale(&self, last_update: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
        is_stale(last_update, now, self.max_age_days)
    }

    pub async fn assess(&self, category: FeedCategory) -> Freshness {
        let last_update = self.last_update(category).await;
        let now = Local::now().naive_local();
        let age_days = last_update.map(|ts| (now - ts).num_days());
        let stale = self.is_stale(last_update, now);

        match (last_update, age_days) {
            (Some(ts), Some(age)) => info!(
                "Feed {} last updated {} ({} days old, max {})",
                category, ts, age, self.max_age_days
            ),
            _ => warn!("Could not resolve last update of feed {}", category),
        }

        Freshness {
            last_update,
            age_days,
            stale,
        }
    }
}

/// Unknown timestamps are always stale.
pub fn is_stale(last_update: Option<NaiveDateTime>, now: NaiveDateTime, max_age_days: i64) -> bool {
    match last_update {
        None => true,
        Some(ts) => (now - ts).num_days() >= max_age_days,
    }
}

fn to_local(mtime: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(mtime).naive_local()
}

// === FILESYSTEM ===

pub struct FilesystemProbe {
    directories: Vec<(FeedCategory, PathBuf)>,
    file_cap: usize,
}

impl FilesystemProbe {
    pub fn new(directories: impl IntoIterator<Item = (FeedCategory, PathBuf)>, file_cap: usize) -> Self {
        Self {
            directories: directories.into_iter().collect(),
            file_cap,
        }
    }
}

/// Newest mtime among files matching `patterns` under `dir`, or among all
/// files when nothing matches. Each set stops growing at `cap` files.
pub fn newest_file_mtime(dir: &Path, patterns: &[&str], cap: usize) -> Option<NaiveDateTime> {
    if !dir.is_dir() {
        return None;
    }

    let patterns: Vec<glob::Pattern> = patterns
        .iter()
        .filter_map(|p| glob::Pattern::new(p).ok())
        .collect();

    let mut matched: Vec<SystemTime> = Vec::new();
    let mut any: Vec<SystemTime> = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(mtime) = metadata.modified() else {
            continue;
        };

        let name = entry.file_name().to_string_lossy();
        if patterns.iter().any(|p| p.matches(&name)) {
            matched.push(mtime);
            if matched.len() >= cap {
                break;
            }
        } else if matched.is_empty() && any.len() < cap {
            any.push(mtime);
        }
    }

    let pool = if matched.is_empty() { any } else { matched };
    pool.into_iter().max().map(to_local)
}

#[async_trait]
impl FreshnessProbe for FilesystemProbe {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn last_update(&self, category: FeedCategory) -> Option<NaiveDateTime> {
        let dir = self
            .directories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, d)| d.clone())?;
        let cap = self.file_cap;

        tokio::task::spawn_blocking(move || newest_file_mtime(&dir, category.file_patterns(), cap))
            .await
            .unwrap_or_else(|e| {
                warn!("Filesystem probe for {} panicked: {}", category, e);
                None
            })
    }
}

// === DESCRIBE COMMAND ===

pub struct DescribeCommandProbe {
    runner: Arc<dyn CommandRunner>,
    user: String,
    limit: Duration,
}

impl DescribeCommandProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, user: String, limit: Duration) -> Self {
        Self { runner, user, limit }
    }
}

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"))
}

fn us_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid regex"))
}

/// First parseable `YYYY-MM-DD` in `text`, then the first `MM/DD/YYYY`.
pub fn parse_describe_date(text: &str) -> Option<NaiveDateTime> {
    iso_date_pattern()
        .find_iter(text)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
        .or_else(|| {
            us_date_pattern()
                .find_iter(text)
                .find_map(|m| NaiveDate::parse_from_str(m.as_str(), "%m/%d/%Y").ok())
        })
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[async_trait]
impl FreshnessProbe for DescribeCommandProbe {
    fn name(&self) -> &'static str {
        "describe"
    }

    async fn last_update(&self, category: FeedCategory) -> Option<NaiveDateTime> {
        let kind = category.feed_sync_type()?;
        let args = vec!["--type".to_string(), kind.to_string(), "--describe".to_string()];

        match self.runner.run_as(&self.user, FEED_SYNC, &args, self.limit).await {
            Ok(output) if output.success() => parse_describe_date(&output.stdout),
            Ok(output) => {
                debug!("Describe for {} exited with {:?}", category, output.code);
                None
            }
            Err(e) => {
                debug!("Describe for {} failed: {}", category, e);
                None
            }
        }
    }
}

// === STORE VERSION ===

pub struct StoreVersionProbe {
    store: Arc<dyn SqlStore>,
    limit: Duration,
}

impl StoreVersionProbe {
    pub fn new(store: Arc<dyn SqlStore>, limit: Duration) -> Self {
        Self { store, limit }
    }
}

/// Candidate `info` queries for a category, most specific first.
pub fn version_queries(db_name: &str) -> [String; 3] {
    [
        format!(
            "SELECT value FROM info WHERE name = '{0}_version' OR name = '{0}_feed_version' LIMIT 1",
            db_name
        ),
        format!(
            "SELECT value FROM info WHERE name LIKE '%{}%version%' ORDER BY name LIMIT 1",
            db_name
        ),
        format!(
            "SELECT value FROM info WHERE name LIKE '%feed%{}%' AND name LIKE '%version%' LIMIT 1",
            db_name
        ),
    ]
}

/// Versions look like `20240126T0719`; the leading 8 digits are the date.
pub fn parse_feed_version(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let prefix = value.get(..8)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[async_trait]
impl FreshnessProbe for StoreVersionProbe {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn last_update(&self, category: FeedCategory) -> Option<NaiveDateTime> {
        for query in version_queries(category.db_name()) {
            match timeout(self.limit, self.store.fetch_text(&query)).await {
                Ok(Ok(Some(value))) => {
                    if let Some(timestamp) = parse_feed_version(&value) {
                        return Some(timestamp);
                    }
                    debug!("Unrecognised {} feed version '{}'", category, value);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => debug!("Version query for {} failed: {}", category, e),
                Err(_) => debug!("Version query for {} timed out", category),
            }
        }
        None
    }
}
