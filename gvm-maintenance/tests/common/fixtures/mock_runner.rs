//! Scripted subprocess runner
//!
//! Responses are keyed by program name. Anything unscripted exits 0 with no
//! output.

use async_trait::async_trait;
use gvm_host::services::commands::render_command;
use gvm_host::{CommandError, CommandOutput};
use gvm_maintenance::system::CommandRunner;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum RunnerResponse {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    Timeout,
    SpawnFailure,
}

impl RunnerResponse {
    pub fn ok(stdout: &str) -> Self {
        RunnerResponse::Exit {
            code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: &str) -> Self {
        RunnerResponse::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub user: Option<String>,
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Default)]
pub struct MockCommandRunner {
    responses: HashMap<String, RunnerResponse>,
    available: HashSet<String>,
    calls: Mutex<Vec<RecordedCommand>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, program: &str, response: RunnerResponse) -> Self {
        self.responses.insert(program.to_string(), response);
        self
    }

    pub fn with_available(mut self, program: &str) -> Self {
        self.available.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls of `program`, excluding `--describe` probes.
    pub fn sync_calls(&self, program: &str) -> Vec<RecordedCommand> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program && !c.args.iter().any(|a| a == "--describe"))
            .collect()
    }

    fn answer(
        &self,
        user: Option<&str>,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(RecordedCommand {
            user: user.map(str::to_string),
            program: program.to_string(),
            args: args.to_vec(),
        });

        let command = render_command(program, args);
        match self
            .responses
            .get(program)
            .cloned()
            .unwrap_or_else(|| RunnerResponse::ok(""))
        {
            RunnerResponse::Exit {
                code,
                stdout,
                stderr,
            } => Ok(CommandOutput {
                command,
                code: Some(code),
                stdout,
                stderr,
            }),
            RunnerResponse::Timeout => Err(CommandError::Timeout { command, limit }),
            RunnerResponse::SpawnFailure => Err(CommandError::Spawn {
                command,
                reason: "No such file or directory (os error 2)".to_string(),
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.answer(None, program, args, limit)
    }

    async fn run_as(
        &self,
        user: &str,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.answer(Some(user), program, args, limit)
    }

    async fn is_available(&self, name: &str) -> bool {
        self.available.contains(name)
    }
}
