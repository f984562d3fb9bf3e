use std::fmt;
use std::process::Output;
use std::time::Duration;

// === COMMAND RESULTS ===

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn from_output(command: String, output: Output) -> Self {
        Self {
            command,
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a non-zero exit into `CommandError::Failed`.
    pub fn into_checked(self) -> Result<CommandOutput, CommandError> {
        if self.success() {
            Ok(self)
        } else {
            let detail = if self.stderr.trim().is_empty() {
                self.stdout
            } else {
                self.stderr
            };
            Err(CommandError::Failed {
                command: self.command,
                code: self.code,
                stderr: detail.trim().to_string(),
            })
        }
    }
}

// === ERRORS ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The process could not be started or awaited
    Spawn { command: String, reason: String },

    /// The process exceeded its time budget and was killed
    Timeout { command: String, limit: Duration },

    /// The process ran and exited unsuccessfully
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }

    pub fn command(&self) -> &str {
        match self {
            CommandError::Spawn { command, .. }
            | CommandError::Timeout { command, .. }
            | CommandError::Failed { command, .. } => command,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Spawn { command, reason } => {
                write!(f, "Failed to run '{}': {}", command, reason)
            }
            CommandError::Timeout { command, limit } => {
                write!(f, "'{}' timed out after {}s", command, limit.as_secs())
            }
            CommandError::Failed {
                command,
                code,
                stderr,
            } => match code {
                Some(code) => write!(f, "'{}' exited with code {}: {}", command, code, stderr),
                None => write!(f, "'{}' was terminated by a signal: {}", command, stderr),
            },
        }
    }
}

impl std::error::Error for CommandError {}
