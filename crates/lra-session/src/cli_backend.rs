//! [`SessionBackend`] backed by a coding CLI speaking stream-json on stdout.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use lra_process::{ToolChild, collect_stderr, failure_description, shutdown_child, spawn_tool};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::SessionBackend;
use crate::event::{BackendEvent, StreamLine, parse_stream_line};

const EXIT_GRACE: Duration = Duration::from_secs(5);

/// How to launch the backend CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Flag preceding the model name; empty to omit the model.
    pub model_flag: String,
    pub env: HashMap<String, String>,
    pub work_dir: PathBuf,
}

/// One CLI process per session. The prompt goes in on stdin.
pub struct CliBackend {
    command: CliCommand,
    model: String,
    child: Option<ToolChild>,
    stdout: Option<Lines<BufReader<ChildStdout>>>,
    stderr: Option<JoinHandle<String>>,
    pending: VecDeque<BackendEvent>,
    finished: bool,
}

impl CliBackend {
    pub fn new(command: CliCommand, model: impl Into<String>) -> Self {
        Self {
            command,
            model: model.into(),
            child: None,
            stdout: None,
            stderr: None,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub(crate) fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        if !self.command.model_flag.is_empty() {
            cmd.arg(&self.command.model_flag).arg(&self.model);
        }
        cmd.current_dir(&self.command.work_dir);
        cmd.envs(&self.command.env);
        cmd
    }

    /// Wait for the process after its last line and return stderr.
    async fn reap(&mut self) -> Result<(Option<std::process::ExitStatus>, String)> {
        self.finished = true;
        self.stdout = None;
        let status = match self.child.take() {
            Some(child) => Some(shutdown_child(child, EXIT_GRACE).await?),
            None => None,
        };
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        Ok((status, stderr))
    }
}

#[async_trait]
impl SessionBackend for CliBackend {
    async fn send(&mut self, prompt: &str) -> Result<()> {
        if self.child.is_some() || self.finished {
            bail!("Session already started");
        }
        let mut child = spawn_tool(self.build_command()).with_context(|| {
            format!("Failed to start backend '{}'", self.command.program)
        })?;
        info!(
            program = %self.command.program,
            model = %self.model,
            pid = child.id(),
            "Backend session started"
        );

        // Readers first: a backend that rejects the request early reports why
        // on stderr, and that text must survive a failed prompt write.
        let stdout = child.stdout.take().context("Backend stdout not piped")?;
        self.stdout = Some(BufReader::new(stdout).lines());
        self.stderr = child.stderr.take().map(collect_stderr);

        let mut stdin = child.stdin.take().context("Backend stdin not piped")?;
        match stdin.write_all(prompt.as_bytes()).await {
            Ok(()) => {}
            // The backend exited without reading the whole prompt; its exit
            // status and stderr are picked up from the event stream.
            Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
                warn!("Backend closed stdin before reading the full prompt");
            }
            Err(err) => return Err(err).context("Failed to write prompt to backend"),
        }
        // EOF tells the CLI the prompt is complete.
        drop(stdin);

        self.child = Some(child);
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<BackendEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }
            let Some(lines) = self.stdout.as_mut() else {
                bail!("Session not started");
            };

            let line = lines
                .next_line()
                .await
                .context("Failed to read backend output")?;
            match line {
                Some(line) => match parse_stream_line(&line) {
                    StreamLine::Events(events) => self.pending.extend(events),
                    StreamLine::Completed => {
                        self.reap().await?;
                    }
                    StreamLine::Failed(description) => {
                        self.reap().await?;
                        bail!(description);
                    }
                    StreamLine::Ignored => debug!(line = %line, "Skipping backend line"),
                },
                None => {
                    let (status, stderr) = self.reap().await?;
                    if status.is_some_and(|s| s.success()) {
                        return Ok(None);
                    }
                    bail!(failure_description(&stderr, status));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "cli_backend_tests.rs"]
mod tests;
