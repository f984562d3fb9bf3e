//! Host collaborators: subprocess execution and service control.
//!
//! Stages talk to the host only through these traits so tests can swap in
//! scripted doubles.

pub mod inspection;

use async_trait::async_trait;
use gvm_host::services::{self, systemctl};
use gvm_host::{CommandError, CommandOutput};
use std::time::Duration;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` under `limit`. A non-zero exit is still `Ok`.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError>;

    /// Runs `program` as `user`.
    async fn run_as(
        &self,
        user: &str,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError>;

    async fn is_available(&self, name: &str) -> bool;
}

#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Raw unit state such as `active`, `inactive` or `failed`.
    async fn state(&self, name: &str, limit: Duration) -> Result<String, CommandError>;
    async fn start(&self, name: &str, limit: Duration) -> Result<(), CommandError>;
    async fn stop(&self, name: &str, limit: Duration) -> Result<(), CommandError>;
    async fn restart(&self, name: &str, limit: Duration) -> Result<(), CommandError>;
}

/// Real subprocesses through `gvm_host`.
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        services::run_command(program, args, limit).await
    }

    async fn run_as(
        &self,
        user: &str,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let mut command = Vec::with_capacity(args.len() + 1);
        command.push(program.to_string());
        command.extend_from_slice(args);
        services::run_as_user(user, &command, limit).await
    }

    async fn is_available(&self, name: &str) -> bool {
        services::command_available(name).await
    }
}

/// systemd units through `systemctl`.
#[derive(Debug, Default, Clone)]
pub struct SystemdServices;

#[async_trait]
impl ServiceControl for SystemdServices {
    async fn state(&self, name: &str, limit: Duration) -> Result<String, CommandError> {
        systemctl::get_service_status(name, limit).await
    }

    async fn start(&self, name: &str, limit: Duration) -> Result<(), CommandError> {
        systemctl::start_service(name, limit).await
    }

    async fn stop(&self, name: &str, limit: Duration) -> Result<(), CommandError> {
        systemctl::stop_service(name, limit).await
    }

    async fn restart(&self, name: &str, limit: Duration) -> Result<(), CommandError> {
        systemctl::restart_service(name, limit).await
    }
}
