//! Newline-delimited JSON-RPC server exposing the browser tool.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::automation::PageAutomation;
use crate::dispatch::ToolDispatcher;
use crate::protocol::{INTERNAL_ERROR, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND};
use crate::tool::{self, TOOL_NAME};

pub struct McpServer<A> {
    dispatcher: ToolDispatcher<A>,
}

impl<A: PageAutomation> McpServer<A> {
    pub fn new(automation: A, default_viewport: [u32; 2]) -> Self {
        Self {
            dispatcher: ToolDispatcher::new(automation, default_viewport),
        }
    }

    /// Serve until `reader` hits end of stream or `cancel` fires, then close
    /// the automation.
    ///
    /// Requests are handled one at a time, in order. A request in flight when
    /// `cancel` fires is abandoned without a response.
    pub async fn serve<R, W>(
        mut self,
        reader: R,
        mut writer: W,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Browser tool server starting");
        let result = tokio::select! {
            result = self.serve_lines(reader, &mut writer) => result,
            () = cancel.cancelled() => {
                info!("Browser tool server interrupted");
                Ok(())
            }
        };
        self.dispatcher.close().await;
        info!("Browser tool server stopped");
        result
    }

    async fn serve_lines<R, W>(&mut self, mut reader: R, writer: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .await
                .context("Failed to read from stdin")?;
            if n == 0 {
                return Ok(());
            }
            let Ok(line) = std::str::from_utf8(&buf) else {
                debug!(len = buf.len(), "Dropping line that is not valid UTF-8");
                continue;
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            debug!(line = trimmed, "Received");

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(request) => request,
                Err(e) => {
                    debug!(error = %e, "Dropping malformed line");
                    continue;
                }
            };

            if let Some(response) = self.handle_request(request).await {
                write_response(writer, &response).await?;
            }
        }
    }

    /// Handle one request. Notifications never produce a response.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        let result = match method.as_str() {
            "initialize" => Ok(tool::server_info()),
            "tools/list" => Ok(json!({ "tools": [tool::descriptor()] })),
            "tools/call" => self.handle_tool_call(params).await,
            "notifications/initialized" => {
                debug!("Client initialized");
                return None;
            }
            _ => Err((METHOD_NOT_FOUND, format!("Method not found: {method}"))),
        };

        let Some(id) = id else {
            debug!(method = %method, "Notification handled without response");
            return None;
        };
        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    async fn handle_tool_call(&mut self, params: Option<Value>) -> Result<Value, (i32, String)> {
        let params = params.unwrap_or(Value::Null);
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        if name != TOOL_NAME {
            return Err((METHOD_NOT_FOUND, format!("Unknown tool: {name}")));
        }
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.dispatcher.dispatch(arguments).await {
            Ok(content) => Ok(json!({ "content": content })),
            Err(e) => {
                warn!(error = %e, "tools/call failed");
                Err((INTERNAL_ERROR, e.to_string()))
            }
        }
    }
}

/// Write one response frame: JSON, newline, flush.
async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = serde_json::to_string(response).context("Failed to serialize response")?;
    frame.push('\n');
    writer
        .write_all(frame.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.flush().await.context("Failed to flush stdout")?;
    Ok(())
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
