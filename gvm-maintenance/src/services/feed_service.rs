use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::MaintenanceConfig;
use crate::feeds::{FeedActivityMonitor, FeedCategory, FeedState, FeedStatus, FreshnessPoller};
use crate::poll::{BoundedPoll, PollOutcome};
use crate::report::MaintenanceReport;
use crate::system::CommandRunner;

const STDERR_EXCERPT_CHARS: usize = 200;

fn excerpt(text: &str) -> String {
    text.trim().chars().take(STDERR_EXCERPT_CHARS).collect()
}

fn describe_wait(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

/// Syncs stale feeds and waits for the manager to finish importing them.
pub struct FeedService {
    config: Arc<MaintenanceConfig>,
    runner: Arc<dyn CommandRunner>,
    freshness: FreshnessPoller,
    activity: FeedActivityMonitor,
}

impl FeedService {
    pub fn new(
        config: Arc<MaintenanceConfig>,
        runner: Arc<dyn CommandRunner>,
        freshness: FreshnessPoller,
        activity: FeedActivityMonitor,
    ) -> Self {
        Self {
            config,
            runner,
            freshness,
            activity,
        }
    }

    /// Resolves the program and arguments for a category, preferring the
    /// dedicated sync tool when it is installed.
    async fn resolve_command(&self, category: FeedCategory) -> (String, Vec<String>) {
        let command = category.sync_command();
        if let Some(alternate) = command.alternate {
            if self.runner.is_available(alternate).await {
                info!("Using '{}' instead of '{}' for {}", alternate, command.program, category);
                return (alternate.to_string(), Vec::new());
            }
        }
        (command.program.to_string(), command.args)
    }

    pub async fn update_all(&self, report: &mut MaintenanceReport, dry_run: bool) {
        for category in FeedCategory::UPDATE_ORDER {
            self.update_feed(category, report, dry_run).await;
        }
    }

    pub async fn update_feed(&self, category: FeedCategory, report: &mut MaintenanceReport, dry_run: bool) {
        let feeds = &self.config.feeds;
        let (program, args) = self.resolve_command(category).await;
        let rendered = gvm_host::services::commands::render_command(&program, &args);

        if dry_run {
            info!("[dry-run] Would run: sudo -u {} {}", feeds.sync_user, rendered);
            report.record_feed(FeedState::new(
                category,
                FeedStatus::Simulated,
                format!("Would run: {}", rendered),
            ));
            return;
        }

        let freshness = self.freshness.assess(category).await;
        if freshness.last_update.is_none() {
            report.add_warning(format!(
                "Could not resolve last update of feed {}, updating to be safe",
                category
            ));
        }

        if !freshness.stale {
            let age = freshness.age_days.unwrap_or_default();
            report.record_feed(
                FeedState::new(
                    category,
                    FeedStatus::Skipped,
                    format!("Feed is {} days old (max {}), no update needed", age, feeds.max_age_days),
                )
                .with_age(freshness.last_update, freshness.age_days),
            );
            return;
        }

        info!("Syncing feed {}: {}", category, rendered);
        let state = match self
            .runner
            .run_as(&feeds.sync_user, &program, &args, feeds.sync_timeout())
            .await
        {
            Ok(output) if output.success() => {
                info!("{} synced, waiting for import to finish", category);
                match self.wait_for_quiescence(category, feeds.verification_timeout()).await {
                    PollOutcome::Quiescent { .. } => {
                        FeedState::new(category, FeedStatus::Ok, "Sync and import completed")
                    }
                    PollOutcome::TimedOut { elapsed, .. } => {
                        report.add_warning(format!(
                            "Feed {} synced but import verification timed out after {}",
                            category,
                            describe_wait(elapsed)
                        ));
                        FeedState::new(
                            category,
                            FeedStatus::Warning,
                            "Sync completed but import still in progress",
                        )
                    }
                }
            }
            Ok(output) => {
                report.add_warning(format!("Error updating feed {}", category));
                FeedState::new(category, FeedStatus::Error, excerpt(&output.stderr))
            }
            Err(e) if e.is_timeout() => {
                report.add_warning(format!(
                    "Timed out updating feed {} after {}",
                    category,
                    describe_wait(feeds.sync_timeout())
                ));
                FeedState::new(category, FeedStatus::Timeout, "Sync timed out")
            }
            Err(e) => {
                report.add_error(format!("Failed to update feed {}: {}", category, e));
                FeedState::new(category, FeedStatus::Error, e.to_string())
            }
        };

        report.record_feed(state.with_age(freshness.last_update, freshness.age_days));
    }

    pub async fn wait_for_quiescence(&self, category: FeedCategory, max_duration: Duration) -> PollOutcome {
        let feeds = &self.config.feeds;
        let poll = BoundedPoll::new(feeds.poll_interval(), max_duration, feeds.quiet_polls_required);
        let activity = &self.activity;

        let outcome = poll.run(|| activity.is_active(category)).await;
        match outcome {
            PollOutcome::Quiescent { samples, elapsed } => info!(
                "{} quiescent after {}s ({} samples)",
                category,
                elapsed.as_secs(),
                samples
            ),
            PollOutcome::TimedOut { samples, .. } => {
                warn!("{} still active after {} samples", category, samples)
            }
        }
        outcome
    }

    /// Final check before database maintenance. Returns false if any
    /// category was still busy when its wait ran out.
    pub async fn verify_all_quiescent(&self, report: &mut MaintenanceReport) -> bool {
        let limit = self.config.feeds.verification_timeout();
        let mut all_quiet = true;

        for category in FeedCategory::UPDATE_ORDER {
            if let PollOutcome::TimedOut { elapsed, .. } = self.wait_for_quiescence(category, limit).await {
                report.add_warning(format!(
                    "Timed out verifying feed {} after {}",
                    category,
                    describe_wait(elapsed)
                ));
                all_quiet = false;
            }
        }

        all_quiet
    }
}
