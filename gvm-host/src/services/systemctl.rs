use std::time::Duration;
use tracing::{debug, info};

use super::commands::{run_checked, run_command};
use crate::types::CommandError;

/// Returns the raw `systemctl is-active` answer (`active`, `inactive`, `failed`, ...).
/// `is-active` exits non-zero for anything but `active`, so the exit code is ignored.
pub async fn get_service_status(service_name: &str, limit: Duration) -> Result<String, CommandError> {
    debug!("Checking service status: {}", service_name);

    let output = run_command(
        "systemctl",
        &["is-active".to_string(), service_name.to_string()],
        limit,
    )
    .await?;

    Ok(output.stdout.trim().to_string())
}

pub async fn start_service(service_name: &str, limit: Duration) -> Result<(), CommandError> {
    control_service("start", service_name, limit).await
}

pub async fn stop_service(service_name: &str, limit: Duration) -> Result<(), CommandError> {
    control_service("stop", service_name, limit).await
}

pub async fn restart_service(service_name: &str, limit: Duration) -> Result<(), CommandError> {
    control_service("restart", service_name, limit).await
}

async fn control_service(action: &str, service_name: &str, limit: Duration) -> Result<(), CommandError> {
    info!("Running systemctl {} {}", action, service_name);

    run_checked(
        "sudo",
        &[
            "systemctl".to_string(),
            action.to_string(),
            service_name.to_string(),
        ],
        limit,
    )
    .await?;

    info!("systemctl {} {} succeeded", action, service_name);
    Ok(())
}
