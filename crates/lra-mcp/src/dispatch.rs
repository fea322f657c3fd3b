//! Route one `tools/call` to the automation and normalize its result.

use lra_core::ContentBlock;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::automation::{ActionOutput, ActionRequest, PageAutomation};
use crate::tool::{DEFAULT_ACTION, SET_VIEWPORT, is_known_action};

/// Argument problems caught before anything reaches the automation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Tool arguments must be a JSON object")]
    ArgumentsNotObject,

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("viewport must be [width, height] with positive integers, got {0}")]
    InvalidViewport(String),

    #[error("Invalid arguments for action '{action}': {source}")]
    InvalidArguments {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct ToolDispatcher<A> {
    automation: A,
    default_viewport: (u32, u32),
}

impl<A: PageAutomation> ToolDispatcher<A> {
    pub fn new(automation: A, default_viewport: [u32; 2]) -> Self {
        Self {
            automation,
            default_viewport: (default_viewport[0], default_viewport[1]),
        }
    }

    /// Run one action. The returned sequence is never empty.
    pub async fn dispatch(&mut self, arguments: Value) -> Result<Vec<ContentBlock>, DispatchError> {
        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(DispatchError::ArgumentsNotObject),
        };
        let action = match args.get("action") {
            None | Some(Value::Null) => DEFAULT_ACTION.to_string(),
            Some(Value::String(action)) => action.clone(),
            Some(other) => return Err(DispatchError::UnknownAction(other.to_string())),
        };
        if !is_known_action(&action) {
            return Err(DispatchError::UnknownAction(action));
        }
        debug!(action = %action, "Dispatching browser action");

        if action == SET_VIEWPORT {
            let (width, height) = match args.get("viewport") {
                None | Some(Value::Null) => self.default_viewport,
                Some(value) => parse_viewport(value)?,
            };
            return Ok(match self.automation.set_viewport(width, height).await {
                Ok(()) => vec![ContentBlock::text(format!(
                    "Viewport set to {width}x{height}"
                ))],
                Err(e) => action_failed(&e),
            });
        }

        let mut args = args;
        args.insert("action".to_string(), Value::String(action.clone()));
        let request: ActionRequest = serde_json::from_value(Value::Object(args))
            .map_err(|source| DispatchError::InvalidArguments { action, source })?;

        Ok(match self.automation.execute(&request).await {
            Ok(output) => normalize_output(output),
            Err(e) => action_failed(&e),
        })
    }

    /// Release the automation.
    pub async fn close(&mut self) {
        if let Err(e) = self.automation.close().await {
            warn!(error = %e, "Failed to close browser automation");
        }
    }
}

fn action_failed(err: &anyhow::Error) -> Vec<ContentBlock> {
    warn!(error = %err, "Browser action failed");
    vec![ContentBlock::text(format!("Browser action failed: {err:#}"))]
}

fn parse_viewport(value: &Value) -> Result<(u32, u32), DispatchError> {
    let invalid = || DispatchError::InvalidViewport(value.to_string());
    let items = value.as_array().ok_or_else(invalid)?;
    if items.len() < 2 {
        return Err(invalid());
    }
    let dim = |v: &Value| {
        v.as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
    };
    match (dim(&items[0]), dim(&items[1])) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(invalid()),
    }
}

/// Text, then image, then error; nothing at all becomes "Action completed".
pub fn normalize_output(output: ActionOutput) -> Vec<ContentBlock> {
    let mut content = Vec::new();
    if let Some(text) = output.output.filter(|s| !s.is_empty()) {
        content.push(ContentBlock::text(text));
    }
    if let Some(image) = output.base64_image.filter(|s| !s.is_empty()) {
        content.push(ContentBlock::png(image));
    }
    if let Some(error) = output.error.filter(|s| !s.is_empty()) {
        content.push(ContentBlock::text(format!("Error: {error}")));
    }
    if content.is_empty() {
        content.push(ContentBlock::text("Action completed"));
    }
    content
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
