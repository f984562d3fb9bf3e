pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod feeds;
pub mod gmp;
pub mod health;
pub mod lock;
pub mod orchestrator;
pub mod poll;
pub mod report;
pub mod services;
pub mod system;

// Re-export commonly used types
pub use config::{ConfigManager, MaintenanceConfig};
pub use database::{PgStore, SqlStore};
pub use errors::MaintenanceError;
pub use gmp::{GvmCliClient, ManagementClient};
pub use lock::LockManager;
pub use orchestrator::{Collaborators, MaintenanceOrchestrator, RunOutcome};
pub use report::MaintenanceReport;
pub use system::{CommandRunner, ServiceControl, SystemCommandRunner, SystemdServices};
