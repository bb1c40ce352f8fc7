//! JSON-RPC 2.0 envelope helpers for the Stdio Bridge and the primary's
//! `/mcp` endpoint.
//!
//! Only the two methods this toolkit cares about are modeled explicitly
//! (`tools/list`, `tools/call`); anything else is passed through as an
//! opaque `method`/`params` pair and rejected with `ERR_METHOD_NOT_FOUND`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ERR_METHOD_NOT_FOUND: i64 = -32601;
pub const ERR_INTERNAL: i64 = -32603;
pub const ERR_UPSTREAM_UNREACHABLE: i64 = -32005;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

fn jsonrpc_version() -> &'static str {
    "2.0"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Name of the `name` field inside `tools/call` params.
pub const TOOLS_LIST_METHOD: &str = "tools/list";
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// Extract `{name, arguments}` from a `tools/call` request's params.
pub fn parse_call_params(params: &Value) -> Option<(String, Value)> {
    let name = params.get("name")?.as_str()?.to_string();
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    Some((name, arguments))
}
