//! Reduce one backend session to a [`SessionOutcome`].

use anyhow::Result;
use lra_core::SessionOutcome;
use lra_scheduler::{RateLimitClass, classify_failure};
use tracing::{debug, warn};

use crate::backend::SessionBackend;
use crate::event::BackendEvent;

/// Send `prompt`, consume events until completion, and classify any failure.
///
/// Assistant text is concatenated into the `Continue` payload. Every event is
/// passed to `on_event` for display. Failures never escape: they come back as
/// `RateLimited` or `Error`.
pub async fn run_session<B, F>(backend: &mut B, prompt: &str, mut on_event: F) -> SessionOutcome
where
    B: SessionBackend + ?Sized,
    F: FnMut(&BackendEvent) + Send,
{
    match drive(backend, prompt, &mut on_event).await {
        Ok(response) => {
            debug!(response_chars = response.len(), "Session completed");
            SessionOutcome::Continue { response }
        }
        Err(err) => outcome_from_failure(format!("{err:#}")),
    }
}

async fn drive<B, F>(backend: &mut B, prompt: &str, on_event: &mut F) -> Result<String>
where
    B: SessionBackend + ?Sized,
    F: FnMut(&BackendEvent) + Send,
{
    backend.send(prompt).await?;
    let mut response = String::new();
    while let Some(event) = backend.next_event().await? {
        on_event(&event);
        if let BackendEvent::AssistantText(text) = &event {
            response.push_str(text);
        }
    }
    Ok(response)
}

/// Classify a failure description into `RateLimited` or `Error`.
pub fn outcome_from_failure(description: String) -> SessionOutcome {
    match classify_failure(&description) {
        RateLimitClass::RateLimited { retry_after_secs } => {
            warn!(?retry_after_secs, "Session hit a rate limit");
            SessionOutcome::RateLimited {
                retry_after_secs,
                description,
            }
        }
        RateLimitClass::NotRateLimited => {
            warn!(error = %description, "Session failed");
            SessionOutcome::Error {
                message: description,
            }
        }
    }
}
