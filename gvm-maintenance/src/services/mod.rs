pub mod alert_service;
pub mod cleanup_service;
pub mod database_service;
pub mod feed_service;

pub use alert_service::AlertService;
pub use cleanup_service::CleanupService;
pub use database_service::{DatabaseService, MaintenancePhase};
pub use feed_service::FeedService;
