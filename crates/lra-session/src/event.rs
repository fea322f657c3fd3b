//! Backend events and the stream-json line decoder.
//!
//! The coding CLI prints one JSON object per line. Three line types matter:
//! `assistant` (text and tool calls), `user` (tool results echoed back) and
//! `result` (end of session, possibly with an error). Everything else is
//! bookkeeping and ignored.

use serde::Deserialize;
use serde_json::Value;

/// One event surfaced by a session backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    AssistantText(String),
    ToolUse { name: String, input: Value },
    ToolResult { content: String, is_error: bool },
}

/// What a single stdout line means for the session.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamLine {
    Events(Vec<BackendEvent>),
    Completed,
    Failed(String),
    Ignored,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawLine {
    Assistant {
        message: RawMessage,
    },
    User {
        message: RawMessage,
    },
    Result {
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        result: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    content: RawContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Blocks(Vec<RawBlock>),
    Text(String),
}

impl Default for RawContent {
    fn default() -> Self {
        Self::Blocks(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

/// Decode one stdout line. Lines that are not JSON are ignored.
pub fn parse_stream_line(line: &str) -> StreamLine {
    let line = line.trim();
    if line.is_empty() {
        return StreamLine::Ignored;
    }
    let Ok(raw) = serde_json::from_str::<RawLine>(line) else {
        return StreamLine::Ignored;
    };

    match raw {
        RawLine::Assistant { message } => events_from(message.content, true),
        RawLine::User { message } => events_from(message.content, false),
        RawLine::Result {
            is_error: false, ..
        } => StreamLine::Completed,
        RawLine::Result {
            is_error: true,
            subtype,
            result,
        } => StreamLine::Failed(
            result
                .filter(|r| !r.trim().is_empty())
                .or(subtype)
                .unwrap_or_else(|| "Session ended with an error".to_string()),
        ),
        RawLine::Other => StreamLine::Ignored,
    }
}

fn events_from(content: RawContent, from_assistant: bool) -> StreamLine {
    let blocks = match content {
        RawContent::Blocks(blocks) => blocks,
        // Plain-string user content is the prompt echo, not a tool result.
        RawContent::Text(text) if from_assistant => {
            return StreamLine::Events(vec![BackendEvent::AssistantText(text)]);
        }
        RawContent::Text(_) => return StreamLine::Ignored,
    };

    let events: Vec<BackendEvent> = blocks
        .into_iter()
        .filter_map(|block| match block {
            RawBlock::Text { text } if from_assistant => Some(BackendEvent::AssistantText(text)),
            RawBlock::ToolUse { name, input } => Some(BackendEvent::ToolUse { name, input }),
            RawBlock::ToolResult { content, is_error } => Some(BackendEvent::ToolResult {
                content: flatten_tool_content(&content),
                is_error,
            }),
            _ => None,
        })
        .collect();

    if events.is_empty() {
        StreamLine::Ignored
    } else {
        StreamLine::Events(events)
    }
}

/// Tool result content is either a string or a list of `{type: text}` parts.
fn flatten_tool_content(content: &Value) -> String {
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
