//! Child process plumbing shared by the session backend and the page driver.

use anyhow::{Context, Result};
use lra_core::AppError;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Longest stderr excerpt kept in a failure description.
const MAX_FAILURE_CHARS: usize = 2000;

/// A spawned child leading its own process group.
///
/// Dropping it sends SIGKILL to the whole group, so helpers the child
/// started (tool subprocesses, browsers) go down with it.
pub struct ToolChild {
    child: Child,
    pgid: Option<i32>,
}

impl ToolChild {
    /// Send `signal` to every process in the child's group.
    pub fn signal_group(&self, signal: i32) {
        if let Some(pgid) = self.pgid {
            signal_group(pgid, signal);
        }
    }
}

impl Deref for ToolChild {
    type Target = Child;

    fn deref(&self) -> &Child {
        &self.child
    }
}

impl DerefMut for ToolChild {
    fn deref_mut(&mut self) -> &mut Child {
        &mut self.child
    }
}

impl Drop for ToolChild {
    fn drop(&mut self) {
        self.signal_group(libc::SIGKILL);
    }
}

#[cfg(unix)]
fn signal_group(pgid: i32, signal: i32) {
    // Never 0 or 1: kill(0) and kill(-1) would hit the harness itself.
    if pgid <= 1 {
        return;
    }
    // SAFETY: kill() has no memory-safety preconditions. The negative pid
    // targets the group created by setsid() in spawn_tool.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            debug!(pgid, signal, error = %err, "Failed to signal process group");
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_pgid: i32, _signal: i32) {}

/// Spawn a child with all three stdio handles piped.
///
/// The child runs in its own session (via setsid), so its pid is also the id
/// of a process group holding everything it starts. Terminal signals aimed
/// at the harness do not reach that group directly.
pub fn spawn_tool(mut cmd: Command) -> Result<ToolChild> {
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    // SAFETY: setsid() is async-signal-safe and runs before exec, so no Rust
    // runtime state exists in the child yet.
    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let child = cmd.spawn().context("Failed to spawn command")?;
    let pgid = child.id().and_then(|pid| i32::try_from(pid).ok());
    Ok(ToolChild { child, pgid })
}

/// Drain a stderr handle on a background task and return everything it wrote.
///
/// Each line is also logged at debug level as it arrives.
pub fn collect_stderr<R>(stderr: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut collected = String::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    debug!(line = line.trim_end(), "child stderr");
                    collected.push_str(&line);
                }
            }
        }
        collected
    })
}

/// Turn a non-zero exit into a single failure description.
///
/// Stderr wins when it has content, since that is where backends print
/// throttling notices; otherwise the exit code is reported.
pub fn failure_description(stderr: &str, status: Option<ExitStatus>) -> String {
    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        return tail_chars(trimmed, MAX_FAILURE_CHARS);
    }
    match status.and_then(|s| s.code()) {
        Some(code) => format!("Process exited with code {code}"),
        None => "Process terminated by signal".to_string(),
    }
}

/// Keep the last `max` characters of `text`, prefixed with "..." when cut.
fn tail_chars(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - max).collect();
    format!("...{tail}")
}

/// Locate `executable` on PATH.
pub fn check_tool_installed(executable: &str) -> Result<PathBuf> {
    which::which(executable)
        .map_err(|_| AppError::BackendNotInstalled(executable.to_string()).into())
}

/// Stop a child and everything in its process group.
///
/// Waits up to `grace` for a voluntary exit (callers close stdin first),
/// then sends SIGTERM to the group and waits `grace` again before SIGKILL.
/// Processes the child left behind in its group are killed when the handle
/// drops on return.
pub async fn shutdown_child(mut child: ToolChild, grace: Duration) -> Result<ExitStatus> {
    if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
        let status = status.context("Failed to wait for child")?;
        debug!(?status, "Child exited");
        return Ok(status);
    }

    let grace_ms = grace.as_millis() as u64;
    warn!(grace_ms, "Child did not exit in time, sending SIGTERM to its process group");
    child.signal_group(libc::SIGTERM);
    if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
        return status.context("Failed to wait for child after SIGTERM");
    }

    warn!(grace_ms, "Child ignored SIGTERM, killing its process group");
    child.signal_group(libc::SIGKILL);
    child.wait().await.context("Failed to wait for child after SIGKILL")
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
