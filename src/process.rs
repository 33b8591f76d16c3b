//! External command execution
//!
//! Every child is spawned with `kill_on_drop`, so abandoning the returned
//! future (timeout, task abort) also kills the process.

use std::fs::File;
use std::process::Stdio;

use tokio::process::Command;

use crate::{Error, Result};

/// Run a command to completion and return its stdout
///
/// `stdin` attaches a file as the child's standard input; otherwise stdin is
/// closed.
///
/// # Errors
///
/// Returns `Error::Io` if the command cannot be spawned and `Error::Command`
/// (carrying captured stderr) if it exits unsuccessfully
pub async fn run_command<S: AsRef<str>>(
    program: &str,
    args: &[S],
    stdin: Option<File>,
) -> Result<String> {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    tracing::debug!(program, ?args, "running command");

    let stdin = stdin.map_or_else(Stdio::null, Stdio::from);
    let child = Command::new(program)
        .args(&args)
        .stdin(stdin)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = child.wait_with_output().await?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(Error::Command {
            program: program.to_string(),
            status: output.status,
            stderr,
        });
    }

    if !stderr.is_empty() {
        tracing::trace!(program, stderr = %stderr, "command stderr");
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
