//! [`PageAutomation`] backed by an external page driver process.
//!
//! The driver reads one JSON object per line on stdin, tagged by `op`
//! (`execute`, `set_viewport`, `close`), and answers each of the first two
//! with one [`ActionOutput`] line on stdout.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use lra_process::{ToolChild, collect_stderr, failure_description, shutdown_child, spawn_tool};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::automation::{ActionOutput, ActionRequest, PageAutomation};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
/// Default bound on one driver exchange. Navigation can be slow.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCommand {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverMessage<'a> {
    Execute { request: &'a ActionRequest },
    SetViewport { width: u32, height: u32 },
    Close,
}

struct DriverProcess {
    child: ToolChild,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr: JoinHandle<String>,
}

pub struct DriverAutomation {
    command: DriverCommand,
    viewport: (u32, u32),
    reply_timeout: Duration,
    process: Option<DriverProcess>,
}

impl DriverAutomation {
    /// Nothing is spawned until the first action.
    pub fn new(command: DriverCommand, viewport: [u32; 2]) -> Self {
        Self {
            command,
            viewport: (viewport[0], viewport[1]),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            process: None,
        }
    }

    /// A driver that does not answer within `timeout` is killed; the next
    /// action starts a fresh one.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Spawn the driver if needed. Returns true when it was started now.
    async fn ensure_started(&mut self) -> Result<bool> {
        if self.process.is_some() {
            return Ok(false);
        }
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args);
        let mut child = spawn_tool(cmd)
            .with_context(|| format!("Failed to start page driver '{}'", self.command.program))?;
        info!(program = %self.command.program, pid = child.id(), "Page driver started");

        let stdin = child.stdin.take().context("Driver stdin not piped")?;
        let stdout = child.stdout.take().context("Driver stdout not piped")?;
        let stderr = child.stderr.take().context("Driver stderr not piped")?;
        self.process = Some(DriverProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            stderr: collect_stderr(stderr),
        });

        let (width, height) = self.viewport;
        self.apply_viewport(width, height).await?;
        Ok(true)
    }

    async fn apply_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        let reply = self
            .round_trip(&DriverMessage::SetViewport { width, height })
            .await?;
        if let Some(error) = reply.error.filter(|e| !e.is_empty()) {
            bail!("Driver rejected viewport {width}x{height}: {error}");
        }
        Ok(())
    }

    async fn round_trip(&mut self, message: &DriverMessage<'_>) -> Result<ActionOutput> {
        let process = self.process.as_mut().context("Page driver not running")?;
        let mut frame = serde_json::to_string(message).context("Failed to encode driver message")?;
        frame.push('\n');
        debug!(frame = frame.trim_end(), "-> driver");

        let exchange = async {
            process.stdin.write_all(frame.as_bytes()).await?;
            process.stdin.flush().await?;
            process.stdout.next_line().await
        };
        let reply = tokio::time::timeout(self.reply_timeout, exchange).await;
        let line = match reply {
            Ok(Ok(Some(line))) => line,
            Ok(_) => {
                // Driver is gone; forget it so the next action respawns.
                let Some(mut dead) = self.process.take() else {
                    bail!("Page driver exited");
                };
                drop(dead.stdin);
                let status = dead.child.wait().await.ok();
                let stderr = dead.stderr.await.unwrap_or_default();
                bail!("Page driver exited: {}", failure_description(&stderr, status));
            }
            Err(_) => {
                let secs = self.reply_timeout.as_secs_f64();
                warn!(timeout_secs = secs, "Page driver did not reply, killing it");
                if let Some(hung) = self.process.take() {
                    drop(hung.stdin);
                    if let Err(e) = shutdown_child(hung.child, Duration::ZERO).await {
                        warn!(error = %e, "Failed to reap hung page driver");
                    }
                }
                bail!("Page driver did not reply within {secs}s");
            }
        };
        serde_json::from_str(&line).with_context(|| format!("Malformed driver reply: {line}"))
    }
}

#[async_trait]
impl PageAutomation for DriverAutomation {
    async fn execute(&mut self, request: &ActionRequest) -> Result<ActionOutput> {
        self.ensure_started().await?;
        self.round_trip(&DriverMessage::Execute { request }).await
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<()> {
        self.viewport = (width, height);
        if !self.ensure_started().await? {
            self.apply_viewport(width, height).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut process) = self.process.take() else {
            return Ok(());
        };
        if let Ok(mut frame) = serde_json::to_string(&DriverMessage::Close) {
            frame.push('\n');
            let _ = process.stdin.write_all(frame.as_bytes()).await;
            let _ = process.stdin.flush().await;
        }
        drop(process.stdin);
        shutdown_child(process.child, SHUTDOWN_GRACE).await?;
        info!("Page driver stopped");
        Ok(())
    }
}
