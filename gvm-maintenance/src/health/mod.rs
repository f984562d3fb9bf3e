//! Service health checking
//!
//! This module checks the platform's systemd units at the start of a run.

pub mod checker;

pub use checker::{HealthSummary, ServiceHealthChecker};
