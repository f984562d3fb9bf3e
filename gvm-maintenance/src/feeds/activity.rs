//! "Update in progress" detection for a feed category.
//!
//! Three tiers, each consulted only when the previous one saw nothing:
//! sync-related queries in `pg_stat_activity`, sync tools in the process
//! list, then any non-SELECT query mentioning the category. A probe that
//! fails counts as no activity.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use super::FeedCategory;
use crate::constants::feeds::SYNC_PROCESS_FRAGMENTS;
use crate::database::SqlStore;
use crate::system::CommandRunner;

#[async_trait]
pub trait ActivityProbe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn is_active(&self, category: FeedCategory) -> bool;
}

pub struct FeedActivityMonitor {
    tiers: Vec<Box<dyn ActivityProbe>>,
}

impl FeedActivityMonitor {
    pub fn new(tiers: Vec<Box<dyn ActivityProbe>>) -> Self {
        Self { tiers }
    }

    pub fn standard(
        store: Arc<dyn SqlStore>,
        runner: Arc<dyn CommandRunner>,
        limit: Duration,
    ) -> Self {
        Self::new(vec![
            Box::new(SyncQueryProbe::new(store.clone(), limit)),
            Box::new(ProcessListProbe::new(runner, limit)),
            Box::new(KeywordQueryProbe::new(store, limit)),
        ])
    }

    pub async fn is_active(&self, category: FeedCategory) -> bool {
        for tier in &self.tiers {
            if tier.is_active(category).await {
                debug!("{} activity detected by {} probe", category, tier.name());
                return true;
            }
        }
        false
    }
}

async fn count_active(store: &dyn SqlStore, sql: &str, limit: Duration) -> bool {
    match timeout(limit, store.fetch_count(sql)).await {
        Ok(Ok(count)) => count > 0,
        Ok(Err(e)) => {
            debug!("Activity query failed: {}", e);
            false
        }
        Err(_) => {
            debug!("Activity query timed out");
            false
        }
    }
}

// === TIER A ===

pub fn sync_activity_query(db_name: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM pg_stat_activity \
         WHERE state = 'active' \
         AND (query ILIKE '%{0}%update%' OR query ILIKE '%{0}%sync%' OR query ILIKE '%feed%{0}%') \
         AND query NOT ILIKE '%pg_stat_activity%'",
        db_name
    )
}

pub struct SyncQueryProbe {
    store: Arc<dyn SqlStore>,
    limit: Duration,
}

impl SyncQueryProbe {
    pub fn new(store: Arc<dyn SqlStore>, limit: Duration) -> Self {
        Self { store, limit }
    }
}

#[async_trait]
impl ActivityProbe for SyncQueryProbe {
    fn name(&self) -> &'static str {
        "sync-query"
    }

    async fn is_active(&self, category: FeedCategory) -> bool {
        count_active(self.store.as_ref(), &sync_activity_query(category.db_name()), self.limit).await
    }
}

// === TIER B ===

/// True when a single `ps` line names a sync tool together with one of the
/// category keywords.
pub fn process_list_shows_sync(ps_output: &str, keywords: &[&str]) -> bool {
    ps_output.lines().any(|line| {
        let line = line.to_lowercase();
        SYNC_PROCESS_FRAGMENTS.iter().any(|f| line.contains(f))
            && keywords.iter().any(|k| line.contains(k))
    })
}

pub struct ProcessListProbe {
    runner: Arc<dyn CommandRunner>,
    limit: Duration,
}

impl ProcessListProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, limit: Duration) -> Self {
        Self { runner, limit }
    }
}

#[async_trait]
impl ActivityProbe for ProcessListProbe {
    fn name(&self) -> &'static str {
        "process-list"
    }

    async fn is_active(&self, category: FeedCategory) -> bool {
        match self.runner.run("ps", &["aux".to_string()], self.limit).await {
            Ok(output) if output.success() => {
                process_list_shows_sync(&output.stdout, category.keywords())
            }
            Ok(output) => {
                debug!("ps exited with {:?}", output.code);
                false
            }
            Err(e) => {
                debug!("ps failed: {}", e);
                false
            }
        }
    }
}

// === TIER C ===

pub fn keyword_activity_query(keywords: &[&str]) -> String {
    let matches = keywords
        .iter()
        .map(|k| format!("query ILIKE '%{}%'", k))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(
        "SELECT COUNT(*) FROM pg_stat_activity \
         WHERE state = 'active' \
         AND ({}) \
         AND query NOT ILIKE '%pg_stat_activity%' \
         AND query NOT ILIKE '%SELECT%'",
        matches
    )
}

pub struct KeywordQueryProbe {
    store: Arc<dyn SqlStore>,
    limit: Duration,
}

impl KeywordQueryProbe {
    pub fn new(store: Arc<dyn SqlStore>, limit: Duration) -> Self {
        Self { store, limit }
    }
}

#[async_trait]
impl ActivityProbe for KeywordQueryProbe {
    fn name(&self) -> &'static str {
        "keyword-query"
    }

    async fn is_active(&self, category: FeedCategory) -> bool {
        count_active(self.store.as_ref(), &keyword_activity_query(category.keywords()), self.limit)
            .await
    }
}
