//! Stdio façade for a secondary instance: presents an MCP server over
//! stdin/stdout whose `tools/list` and `tools/call` handlers delegate to the
//! primary's `/mcp` HTTP endpoint.
//!
//! stdout is reserved for MCP framing; every diagnostic goes through
//! `tracing` to stderr, never `println!`.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::framing::{self, UpstreamReader};
use crate::rpc::{self, RpcRequest, RpcResponse};

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(2);

/// Proxies stdio MCP frames to a primary listening on `main_port` over HTTP.
pub struct StdioBridge {
    http: reqwest::Client,
    main_port: u16,
}

impl StdioBridge {
    pub fn new(main_port: u16) -> Self {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .expect("loopback-only HTTP client must always build");
        Self { http, main_port }
    }

    /// Read frames from `input` until EOF or a shutdown signal, forwarding
    /// each to the primary and writing its response to `output`. Returns
    /// normally (never an `Err`) on a clean EOF or on SIGINT/SIGTERM.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = UpstreamReader::new(input);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_signal() => {
                    info!("stdio bridge received shutdown signal, closing upstream client");
                    return Ok(());
                }
                message = reader.next_message() => {
                    let Some(raw) = message? else {
                        return Ok(());
                    };
                    let response = self.handle_line(&raw).await;
                    if let Some(response) = response {
                        let encoded = serde_json::to_string(&response)
                            .unwrap_or_else(|_| invalid_json_response());
                        framing::write_content_length(&mut output, &encoded).await?;
                    }
                }
            }
        }
    }

    async fn handle_line(&self, raw: &str) -> Option<RpcResponse> {
        let req: RpcRequest = match serde_json::from_str(raw) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "malformed stdio frame");
                return Some(RpcResponse::failure(Value::Null, rpc::ERR_INTERNAL, e.to_string()));
            }
        };
        Some(self.forward(req).await)
    }

    async fn forward(&self, req: RpcRequest) -> RpcResponse {
        let id = req.id.clone();
        let is_tool_call = req.method == rpc::TOOLS_CALL_METHOD;
        let url = format!("http://127.0.0.1:{}/mcp", self.main_port);

        let send_result = self.http.post(&url).json(&req).send().await;
        match send_result {
            Ok(resp) => match resp.json::<RpcResponse>().await {
                Ok(upstream) => upstream,
                Err(e) => self.upstream_error(id, is_tool_call, e.to_string()),
            },
            Err(e) => self.upstream_error(id, is_tool_call, e.to_string()),
        }
    }

    /// `call-tool` degrades to an `isError: true` tool result rather than
    /// failing the stdio session; every other method surfaces the failure as
    /// a JSON-RPC error.
    fn upstream_error(&self, id: Value, is_tool_call: bool, message: String) -> RpcResponse {
        warn!(main_port = self.main_port, error = %message, "upstream proxy call failed");
        if is_tool_call {
            RpcResponse::success(
                id,
                serde_json::json!({
                    "content": [{ "type": "text", "text": format!("Proxy error: {message}") }],
                    "isError": true,
                }),
            )
        } else {
            RpcResponse::failure(id, rpc::ERR_UPSTREAM_UNREACHABLE, format!("Proxy error: {message}"))
        }
    }
}

fn invalid_json_response() -> String {
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"internal encoding error"}}"#
        .to_string()
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
