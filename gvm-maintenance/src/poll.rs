//! Bounded quiescence polling.
//!
//! A single quiet sample can be a false negative (a sync between two
//! queries), so quiescence needs `quiet_threshold` consecutive quiet samples.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Quiescent { samples: u32, elapsed: Duration },
    TimedOut { samples: u32, elapsed: Duration },
}

impl PollOutcome {
    pub fn is_quiescent(&self) -> bool {
        matches!(self, PollOutcome::Quiescent { .. })
    }
}

/// Consecutive quiet samples, reset by any active one.
#[derive(Debug, Clone)]
pub struct QuietCounter {
    threshold: u32,
    consecutive: u32,
}

impl QuietCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    /// Records a sample; returns true once the threshold is reached.
    pub fn observe(&mut self, active: bool) -> bool {
        if active {
            self.consecutive = 0;
        } else {
            self.consecutive += 1;
        }
        self.consecutive >= self.threshold
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundedPoll {
    pub interval: Duration,
    pub max_duration: Duration,
    pub quiet_threshold: u32,
}

impl BoundedPoll {
    pub fn new(interval: Duration, max_duration: Duration, quiet_threshold: u32) -> Self {
        Self {
            interval,
            max_duration,
            quiet_threshold,
        }
    }

    /// Samples `is_active` every `interval` until quiescent or until
    /// `max_duration` has elapsed.
    pub async fn run<F, Fut>(&self, mut is_active: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let started = Instant::now();
        let mut counter = QuietCounter::new(self.quiet_threshold);
        let mut samples = 0;

        while started.elapsed() < self.max_duration {
            samples += 1;
            let active = is_active().await;
            if counter.observe(active) {
                return PollOutcome::Quiescent {
                    samples,
                    elapsed: started.elapsed(),
                };
            }
            tracing::debug!(
                "Poll sample {}: active={} quiet streak {}/{}",
                samples,
                active,
                counter.consecutive(),
                self.quiet_threshold
            );
            sleep(self.interval).await;
        }

        PollOutcome::TimedOut {
            samples,
            elapsed: started.elapsed(),
        }
    }
}
