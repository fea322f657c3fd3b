use anyhow::Result;
use async_trait::async_trait;

use crate::event::BackendEvent;

/// A coding backend driven for exactly one session.
///
/// `send` submits the prompt; `next_event` then yields events until the
/// backend reports completion (`Ok(None)`) or failure (`Err`). The error's
/// display text is the failure description handed to the rate-limit
/// classifier.
#[async_trait]
pub trait SessionBackend: Send {
    async fn send(&mut self, prompt: &str) -> Result<()>;

    async fn next_event(&mut self) -> Result<Option<BackendEvent>>;
}
