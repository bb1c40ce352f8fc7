//! The tool dispatcher seam.
//!
//! The MCP request handler — the thing that actually implements `tools/list`
//! and `tools/call` — is an external collaborator the coordination core
//! receives as an opaque dispatcher. [`ToolDispatcher`] is that seam; both the
//! primary's HTTP server ([`crate::mcp_http`]) and the Stdio Bridge
//! ([`crate::stdio_bridge`], when it is itself primary-side) hand requests to
//! one.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Error returned by a [`ToolDispatcher::call`] implementation.
#[derive(Error, Debug)]
#[error("tool call failed: {message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// List and invoke MCP tools. Implementations own schema validation and the
/// actual tool bodies; this crate only needs something to hand requests to.
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    /// Returns the `tools/list` result body, e.g. `{"tools": [...]}`.
    async fn list(&self) -> Value;

    /// Returns the `tools/call` result body for `name` with `arguments`, or
    /// an error describing why the call could not be completed.
    async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;
}

/// Trivial dispatcher exposing a single `echo` tool. Used when no richer
/// dispatcher is wired in, and by the integration tests that exercise the
/// request path end to end without depending on a real tool implementation.
pub struct EchoToolDispatcher;

#[async_trait]
impl ToolDispatcher for EchoToolDispatcher {
    async fn list(&self) -> Value {
        serde_json::json!({
            "tools": [{
                "name": "echo",
                "description": "Returns its input unchanged",
                "inputSchema": {
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"],
                },
            }]
        })
    }

    async fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        if name != "echo" {
            return Err(ToolError::new(format!("unknown tool: {name}")));
        }
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::new("missing required argument: text"))?;
        Ok(serde_json::json!({
            "content": [{ "type": "text", "text": text }],
            "isError": false,
        }))
    }
}
