//! Scripted systemd double
//!
//! Every unit reports `active` and every control call succeeds unless the
//! test says otherwise. All calls are recorded in order.

use async_trait::async_trait;
use gvm_host::CommandError;
use gvm_maintenance::system::ServiceControl;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    State(String),
    Start(String),
    Stop(String),
    Restart(String),
}

#[derive(Default)]
pub struct MockServiceControl {
    states: HashMap<String, Result<String, CommandError>>,
    failing_stops: HashSet<String>,
    failing_starts: HashSet<String>,
    failing_restarts: HashSet<String>,
    calls: Mutex<Vec<ServiceCall>>,
}

fn job_failed(verb: &str, name: &str) -> CommandError {
    CommandError::Failed {
        command: format!("systemctl {} {}", verb, name),
        code: Some(1),
        stderr: format!("Job for {}.service failed", name),
    }
}

impl MockServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, name: &str, state: &str) -> Self {
        self.states.insert(name.to_string(), Ok(state.to_string()));
        self
    }

    pub fn with_state_timeout(mut self, name: &str) -> Self {
        self.states.insert(
            name.to_string(),
            Err(CommandError::Timeout {
                command: format!("systemctl is-active {}", name),
                limit: Duration::from_secs(5),
            }),
        );
        self
    }

    pub fn with_state_error(mut self, name: &str) -> Self {
        self.states.insert(
            name.to_string(),
            Err(CommandError::Spawn {
                command: format!("systemctl is-active {}", name),
                reason: "No such file or directory".to_string(),
            }),
        );
        self
    }

    pub fn failing_stop(mut self, name: &str) -> Self {
        self.failing_stops.insert(name.to_string());
        self
    }

    pub fn failing_start(mut self, name: &str) -> Self {
        self.failing_starts.insert(name.to_string());
        self
    }

    pub fn failing_restart(mut self, name: &str) -> Self {
        self.failing_restarts.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    fn names(&self, pick: fn(&ServiceCall) -> Option<&String>) -> Vec<String> {
        self.calls().iter().filter_map(|c| pick(c).cloned()).collect()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.names(|c| match c {
            ServiceCall::Stop(n) => Some(n),
            _ => None,
        })
    }

    pub fn started(&self) -> Vec<String> {
        self.names(|c| match c {
            ServiceCall::Start(n) => Some(n),
            _ => None,
        })
    }

    pub fn restarted(&self) -> Vec<String> {
        self.names(|c| match c {
            ServiceCall::Restart(n) => Some(n),
            _ => None,
        })
    }

    fn record(&self, call: ServiceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ServiceControl for MockServiceControl {
    async fn state(&self, name: &str, _limit: Duration) -> Result<String, CommandError> {
        self.record(ServiceCall::State(name.to_string()));
        self.states
            .get(name)
            .cloned()
            .unwrap_or_else(|| Ok("active".to_string()))
    }

    async fn start(&self, name: &str, _limit: Duration) -> Result<(), CommandError> {
        self.record(ServiceCall::Start(name.to_string()));
        if self.failing_starts.contains(name) {
            return Err(job_failed("start", name));
        }
        Ok(())
    }

    async fn stop(&self, name: &str, _limit: Duration) -> Result<(), CommandError> {
        self.record(ServiceCall::Stop(name.to_string()));
        if self.failing_stops.contains(name) {
            return Err(job_failed("stop", name));
        }
        Ok(())
    }

    async fn restart(&self, name: &str, _limit: Duration) -> Result<(), CommandError> {
        self.record(ServiceCall::Restart(name.to_string()));
        if self.failing_restarts.contains(name) {
            return Err(job_failed("restart", name));
        }
        Ok(())
    }
}
