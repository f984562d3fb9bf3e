//! Integration tests for the database maintenance coordinator
//!
//! Service control, the store and the scanner listing are all scripted, so
//! these tests check ordering, recovery and the recorded outcome.

mod common;

use common::fixtures::*;
use gvm_maintenance::errors::DatabaseError;
use gvm_maintenance::report::{DatabaseStatus, MaintenanceReport, ScannerCheck, ServiceStatus};
use gvm_maintenance::services::{DatabaseService, MaintenancePhase};
use std::fs;
use std::sync::Arc;

struct Harness {
    env: TestEnv,
    services: Arc<MockServiceControl>,
    store: Arc<MockStore>,
    client: Arc<MockManagementClient>,
}

impl Harness {
    fn new(services: MockServiceControl, store: MockStore, client: MockManagementClient) -> Self {
        Self::with_env(TestConfigBuilder::new().build(), services, store, client)
    }

    fn with_env(env: TestEnv, services: MockServiceControl, store: MockStore, client: MockManagementClient) -> Self {
        fs::write(&env.config.scanner.socket_path, "").unwrap();
        Self {
            env,
            services: Arc::new(services),
            store: Arc::new(store),
            client: Arc::new(client),
        }
    }

    fn coordinator(&self) -> DatabaseService {
        DatabaseService::new(
            self.env.shared(),
            self.services.clone(),
            self.store.clone(),
            self.client.clone(),
        )
    }
}

fn sized_store() -> MockStore {
    MockStore::new().with_text("pg_database_size", "1843 MB")
}

fn healthy_client() -> MockManagementClient {
    MockManagementClient::new().with_scanner_listing(healthy_scanners())
}

#[tokio::test]
async fn test_full_sequence_in_order() {
    let harness = Harness::new(MockServiceControl::new(), sized_store(), healthy_client());
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(harness.services.stopped(), vec!["gsad", "gvmd", "ospd-openvas"]);
    assert_eq!(harness.services.started(), vec!["ospd-openvas", "gvmd", "gsad"]);
    assert_eq!(
        harness.store.executed(),
        vec!["VACUUM", "ANALYZE", "REINDEX DATABASE gvmd"]
    );

    let database = report.database.clone().unwrap();
    assert_eq!(database.status, DatabaseStatus::Ok);
    assert_eq!(database.size_before.as_deref(), Some("1843 MB"));
    assert_eq!(database.size_after.as_deref(), Some("1843 MB"));
    assert_eq!(report.scanners.as_ref().unwrap().status, ScannerCheck::Ok);
    assert_eq!(report.services["gsad"].status, ServiceStatus::Started);

    assert_eq!(
        coordinator.phase_history(),
        &[
            MaintenancePhase::Idle,
            MaintenancePhase::ServicesStopping,
            MaintenancePhase::Vacuuming,
            MaintenancePhase::ServicesStarting,
            MaintenancePhase::ScannerVerifying,
            MaintenancePhase::Done,
        ]
    );
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_stop_failure_excludes_service_from_restart() {
    let harness = Harness::new(
        MockServiceControl::new().failing_stop("gvmd"),
        sized_store(),
        healthy_client(),
    );
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(harness.services.started(), vec!["ospd-openvas", "gsad"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Could not stop gvmd"));
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_missing_scanner_socket_is_a_warning() {
    let harness = Harness::new(MockServiceControl::new(), sized_store(), healthy_client());
    fs::remove_file(&harness.env.config.scanner.socket_path).unwrap();
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(harness.services.started(), vec!["ospd-openvas", "gvmd", "gsad"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("not found before starting gvmd"));
}

#[tokio::test]
async fn test_statement_error_is_a_warning() {
    let store = sized_store().with_statement(
        "ANALYZE",
        ExecuteBehavior::StatementError("permission denied for table nvts".to_string()),
    );
    let harness = Harness::new(MockServiceControl::new(), store, healthy_client());
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(harness.store.executed().len(), 3);
    assert_eq!(report.database.unwrap().status, DatabaseStatus::Ok);
    assert!(report.warnings[0].starts_with("ANALYZE completed with warnings"));
}

#[tokio::test(start_paused = true)]
async fn test_vacuum_timeout_restores_services() {
    let store = sized_store().with_statement("VACUUM", ExecuteBehavior::Hang);
    let harness = Harness::new(MockServiceControl::new(), store, healthy_client());
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    let err = coordinator.run(&mut report, false).await.unwrap_err();

    match err {
        DatabaseError::Timeout { operation, .. } => assert_eq!(operation, "VACUUM"),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(harness.store.executed(), vec!["VACUUM"]);
    assert_eq!(harness.services.started(), vec!["ospd-openvas", "gvmd", "gsad"]);
    assert_eq!(harness.client.scanner_calls(), 1);

    let database = report.database.unwrap();
    assert_eq!(database.status, DatabaseStatus::Failed);
    assert_eq!(database.size_after, None);
    assert_eq!(
        coordinator.phase_history(),
        &[
            MaintenancePhase::Idle,
            MaintenancePhase::ServicesStopping,
            MaintenancePhase::Vacuuming,
            MaintenancePhase::ServicesStarting,
            MaintenancePhase::ScannerVerifying,
            MaintenancePhase::Done,
        ]
    );
}

#[tokio::test]
async fn test_store_loss_aborts_and_recovers_quietly() {
    let store = sized_store().with_statement(
        "REINDEX",
        ExecuteBehavior::Unavailable("server closed the connection unexpectedly".to_string()),
    );
    let harness = Harness::new(
        MockServiceControl::new().failing_start("gsad"),
        store,
        healthy_client(),
    );
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    let err = coordinator.run(&mut report, false).await.unwrap_err();

    assert!(matches!(err, DatabaseError::Unavailable { .. }));
    assert!(err.to_string().contains("REINDEX"));
    assert_eq!(harness.services.started(), vec!["ospd-openvas", "gvmd", "gsad"]);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_failed_start_is_critical() {
    let harness = Harness::new(
        MockServiceControl::new().failing_start("gsad"),
        sized_store(),
        healthy_client(),
    );
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Critical: could not restart gsad"));
}

#[tokio::test]
async fn test_unavailable_scanner_triggers_manager_restart() {
    let mut client = MockManagementClient::new();
    for _ in 0..5 {
        client = client.with_scanner_listing(broken_scanners());
    }
    let client = client.with_scanner_listing(healthy_scanners());
    let harness = Harness::new(MockServiceControl::new(), sized_store(), client);
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(harness.client.scanner_calls(), 6);
    assert_eq!(harness.services.restarted(), vec!["gvmd"]);
    assert_eq!(report.scanners.unwrap().status, ScannerCheck::Ok);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Scanners still unavailable after 5 attempts: OpenVAS"));
}

#[tokio::test]
async fn test_scanner_never_recovering_is_a_warning() {
    let client = MockManagementClient::new().with_scanner_listing(broken_scanners());
    let harness = Harness::new(MockServiceControl::new(), sized_store(), client);
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(harness.client.scanner_calls(), 8);
    assert_eq!(report.scanners.unwrap().status, ScannerCheck::Warning);
    assert_eq!(report.warnings.len(), 2);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn test_scanner_listing_error_on_last_attempt() {
    let client = MockManagementClient::new().with_scanner_error("gvmd: Failed to open lock file");
    let harness = Harness::new(MockServiceControl::new(), sized_store(), client);
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert_eq!(report.scanners.unwrap().status, ScannerCheck::Error);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].starts_with("Failed to list scanners"));
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let harness = Harness::new(MockServiceControl::new(), sized_store(), healthy_client());
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(true);
    coordinator.run(&mut report, true).await.unwrap();

    assert!(harness.services.calls().is_empty());
    assert!(harness.store.executed().is_empty());
    assert_eq!(harness.client.scanner_calls(), 0);
    assert_eq!(report.database.unwrap().status, DatabaseStatus::Simulated);
}

#[tokio::test]
async fn test_live_maintenance_when_stop_disabled() {
    let env = TestConfigBuilder::new()
        .with_config(|c| c.stop_services_for_db_maintenance = false)
        .build();
    let harness = Harness::with_env(env, MockServiceControl::new(), sized_store(), healthy_client());
    let mut coordinator = harness.coordinator();

    let mut report = MaintenanceReport::new(false);
    coordinator.run(&mut report, false).await.unwrap();

    assert!(harness.services.calls().is_empty());
    assert_eq!(harness.store.executed().len(), 3);
    assert_eq!(harness.client.scanner_calls(), 0);
    assert_eq!(coordinator.phase(), MaintenancePhase::Done);
}
