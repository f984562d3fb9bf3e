//! Fixed feed probes
//!
//! Stand-ins for the filesystem/describe/store probes and the activity
//! tiers, so feed stages can be driven without a platform.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use gvm_maintenance::feeds::activity::ActivityProbe;
use gvm_maintenance::feeds::{FeedActivityMonitor, FeedCategory, FreshnessPoller, FreshnessProbe};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Reports each category as last updated `days` ago; unknown categories
/// resolve to nothing.
#[derive(Default)]
pub struct FixedFreshness {
    ages: HashMap<FeedCategory, i64>,
}

impl FixedFreshness {
    pub fn all(days: i64) -> Self {
        Self {
            ages: FeedCategory::UPDATE_ORDER.iter().map(|c| (*c, days)).collect(),
        }
    }

    pub fn with_age(mut self, category: FeedCategory, days: i64) -> Self {
        self.ages.insert(category, days);
        self
    }

    pub fn poller(self, max_age_days: i64) -> FreshnessPoller {
        FreshnessPoller::new(vec![Box::new(self)], max_age_days)
    }
}

#[async_trait]
impl FreshnessProbe for FixedFreshness {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn last_update(&self, category: FeedCategory) -> Option<NaiveDateTime> {
        self.ages
            .get(&category)
            .map(|days| Local::now().naive_local() - ChronoDuration::days(*days))
    }
}

/// Same answer for every sample; counts samples.
pub struct FixedActivity {
    active: bool,
    samples: Arc<AtomicUsize>,
}

impl FixedActivity {
    pub fn monitor(active: bool) -> (FeedActivityMonitor, Arc<AtomicUsize>) {
        let samples = Arc::new(AtomicUsize::new(0));
        let probe = FixedActivity {
            active,
            samples: samples.clone(),
        };
        (FeedActivityMonitor::new(vec![Box::new(probe)]), samples)
    }
}

#[async_trait]
impl ActivityProbe for FixedActivity {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn is_active(&self, _category: FeedCategory) -> bool {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.active
    }
}
