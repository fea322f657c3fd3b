//! Stdio JSON-RPC (MCP) server exposing page/viewport automation as one tool.

pub mod automation;
pub mod dispatch;
pub mod driver;
pub mod protocol;
pub mod server;
pub mod tool;

#[cfg(test)]
mod test_support;

pub use automation::{ActionOutput, ActionRequest, PageAutomation};
pub use dispatch::{DispatchError, ToolDispatcher};
pub use driver::{DriverAutomation, DriverCommand};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::McpServer;
