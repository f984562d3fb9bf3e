use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::types::{CommandError, CommandOutput};

/// Bound for quick lookups such as `command -v`.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub fn render_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runs `program` with `args`, capturing both streams. The child is killed if
/// `limit` elapses before it exits. A non-zero exit is still `Ok`; callers that
/// need success use [`CommandOutput::into_checked`].
pub async fn run_command(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<CommandOutput, CommandError> {
    let rendered = render_command(program, args);
    debug!("Executing command (limit {}s): {}", limit.as_secs(), rendered);

    let mut command = AsyncCommand::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| CommandError::Spawn {
        command: rendered.clone(),
        reason: e.to_string(),
    })?;

    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let output = CommandOutput::from_output(rendered, output);
            debug!("Command '{}' exited with {:?}", output.command, output.code);
            Ok(output)
        }
        Ok(Err(e)) => Err(CommandError::Spawn {
            command: rendered,
            reason: e.to_string(),
        }),
        Err(_) => {
            warn!("Command '{}' exceeded {}s, killing it", rendered, limit.as_secs());
            Err(CommandError::Timeout {
                command: rendered,
                limit,
            })
        }
    }
}

/// Like [`run_command`] but a non-zero exit becomes `CommandError::Failed`.
pub async fn run_checked(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<CommandOutput, CommandError> {
    run_command(program, args, limit).await?.into_checked()
}

/// Runs `command` as `user` through `sudo -u`.
pub async fn run_as_user(
    user: &str,
    command: &[String],
    limit: Duration,
) -> Result<CommandOutput, CommandError> {
    let mut args = vec!["-u".to_string(), user.to_string()];
    args.extend_from_slice(command);
    run_command("sudo", &args, limit).await
}

/// True when `name` resolves on the PATH (`command -v`, a shell builtin).
pub async fn command_available(name: &str) -> bool {
    let args = [
        "-c".to_string(),
        "command -v \"$1\"".to_string(),
        "sh".to_string(),
        name.to_string(),
    ];
    match run_command("sh", &args, LOOKUP_TIMEOUT).await {
        Ok(output) => output.success(),
        Err(e) => {
            debug!("Lookup of '{}' failed: {}", name, e);
            false
        }
    }
}
