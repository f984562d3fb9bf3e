//! This module provides reusable test utilities:
//! - Scripted collaborator doubles (services, store, management client, commands)
//! - Mock webhook server
//! - Test configuration builder
//! - Common test data

// Not every suite uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_gmp;
pub mod mock_probes;
pub mod mock_runner;
pub mod mock_services;
pub mod mock_store;
pub mod mock_webhook;
pub mod test_config;
pub mod test_data;

// Re-export commonly used items
pub use mock_gmp::MockManagementClient;
pub use mock_probes::{FixedActivity, FixedFreshness};
pub use mock_runner::{MockCommandRunner, RecordedCommand, RunnerResponse};
pub use mock_services::{MockServiceControl, ServiceCall};
pub use mock_store::{ExecuteBehavior, MockStore};
pub use mock_webhook::MockWebhookServer;
pub use test_config::{TestConfigBuilder, TestEnv};
pub use test_data::*;
