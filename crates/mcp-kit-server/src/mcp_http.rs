//! The primary's HTTP surface: the `/mcp` JSON-RPC endpoint plus the three
//! control-plane endpoints the election protocol depends on.
//!
//! Bound to loopback only by the caller (see [`crate::commands::serve`]); the
//! control endpoints carry no authentication of their own, matching the
//! non-goal that the control plane trusts the local host.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::dispatcher::ToolDispatcher;
use crate::rpc::{self, RpcRequest, RpcResponse};

/// Signals the control endpoints raise for [`crate::commands::serve`] to act
/// on. Notification, not a response body: the HTTP handler replies 200
/// immediately and the actual shutdown/transition happens on the caller's own
/// schedule, matching the protocol's "reply 200, then release the lock
/// promptly" obligation.
#[derive(Clone, Default)]
pub struct ControlSignals {
    pub shutdown: Arc<Notify>,
    pub transition: Arc<Notify>,
}

struct AppState {
    dispatcher: Arc<dyn ToolDispatcher>,
    version: String,
    signals: ControlSignals,
}

/// Build the primary's router: `/mcp`, `/__version`, `/__shutdown`,
/// `/__transition`.
pub fn build_router(
    dispatcher: Arc<dyn ToolDispatcher>,
    version: String,
    signals: ControlSignals,
) -> Router {
    let state = Arc::new(AppState {
        dispatcher,
        version,
        signals,
    });
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/__version", get(handle_version))
        .route("/__shutdown", post(handle_shutdown))
        .route("/__transition", post(handle_transition))
        .with_state(state)
}

async fn handle_version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "version": state.version }))
}

async fn handle_shutdown(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("received /__shutdown request");
    state.signals.shutdown.notify_one();
    StatusCode::OK
}

async fn handle_transition(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("received /__transition request");
    state.signals.transition.notify_one();
    StatusCode::OK
}

async fn handle_mcp(State(state): State<Arc<AppState>>, Json(req): Json<RpcRequest>) -> impl IntoResponse {
    let response = dispatch(&state, req).await;
    Json(response)
}

async fn dispatch(state: &AppState, req: RpcRequest) -> RpcResponse {
    match req.method.as_str() {
        rpc::TOOLS_LIST_METHOD => {
            let tools = state.dispatcher.list().await;
            RpcResponse::success(req.id, tools)
        }
        rpc::TOOLS_CALL_METHOD => match rpc::parse_call_params(&req.params) {
            Some((name, arguments)) => match state.dispatcher.call(&name, arguments).await {
                Ok(result) => RpcResponse::success(req.id, result),
                Err(e) => {
                    warn!(tool = %name, error = %e, "tool call failed");
                    RpcResponse::failure(req.id, rpc::ERR_INTERNAL, e.to_string())
                }
            },
            None => RpcResponse::failure(
                req.id,
                rpc::ERR_INTERNAL,
                "tools/call requires a string `name` field",
            ),
        },
        other => RpcResponse::failure(
            req.id,
            rpc::ERR_METHOD_NOT_FOUND,
            format!("unknown method: {other}"),
        ),
    }
}
