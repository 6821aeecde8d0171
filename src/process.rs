//! External command execution with a mandatory timeout.
use log::*;
use std::{path::Path, process::Stdio, time::Duration};
use tokio::{process::Command, time::timeout};

use crate::error::{DepsaurusError, Result};

/// Captured result of a finished external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, None when terminated by a signal
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run `program args...` in `cwd`, waiting at most `limit`.
///
/// The child is killed when the timeout elapses. A non-zero exit status is
/// not an error; callers inspect [`CommandOutput::success`].
pub async fn run_command(
    program: &str,
    args: &[&str],
    cwd: &Path,
    limit: Duration,
) -> Result<CommandOutput> {
    let command_line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<&str>>()
        .join(" ");

    debug!("running `{command_line}` in {}", cwd.display());

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DepsaurusError::process(&command_line, e.to_string()))?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(output) => output.map_err(|e| {
            DepsaurusError::process(&command_line, e.to_string())
        })?,
        Err(_) => {
            warn!("`{command_line}` timed out after {}s", limit.as_secs());
            return Err(DepsaurusError::Timeout {
                command: command_line,
                seconds: limit.as_secs(),
            });
        }
    };

    Ok(CommandOutput {
        code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
