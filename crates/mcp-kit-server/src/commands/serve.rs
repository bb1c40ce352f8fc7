//! `serve` subcommand — runs the MCP server, optionally behind the local
//! coordination core.

use std::path::PathBuf;
use std::sync::Arc;

use mcp_kit_core::{
    elect, home, port, CoordinatorConfig, CoreError, InstanceManager, PrimaryReason,
    RoleTransitionEvent,
};
use tokio::io::{stdin, stdout};
use tracing::info;

use crate::cli::ServeArgs;
use crate::config::{self, Mode, ServerConfig};
use crate::dispatcher::{EchoToolDispatcher, ToolDispatcher};
use crate::mcp_http::{self, ControlSignals};
use crate::stdio_bridge::StdioBridge;

/// Run the `serve` subcommand.
///
/// # Errors
///
/// Returns an error for any fatal startup failure in the error taxonomy
/// (`PortStillInUse`, `TransitionDenied`, `TransitionRaceLost`, I/O errors on
/// the lock file); `main` maps these to exit code 1.
pub async fn run(config_path: &Option<PathBuf>, args: ServeArgs) -> anyhow::Result<()> {
    let cfg = config::resolve_config(config_path.as_deref(), &args)?;
    let dispatcher: Arc<dyn ToolDispatcher> = Arc::new(EchoToolDispatcher);

    if !cfg.local {
        return run_direct(&cfg, dispatcher).await;
    }

    let lock_dir = cfg.lock_dir.clone().unwrap_or_else(home::default_lock_dir);
    let lock_path = lock_dir.join(format!("mcp-kit-{}.lock", cfg.port));
    let instance = InstanceManager::new(cfg.port, lock_path, cfg.desired_version.clone());
    let coordinator_config = CoordinatorConfig {
        desired_version: cfg.desired_version.clone(),
        wait_for_port_timeout_ms: cfg.wait_for_port_timeout_ms,
        remove_stale_lock: true,
    };

    let event = elect(&instance, &coordinator_config).await?;

    match event {
        RoleTransitionEvent::Primary {
            reason,
            previous_version,
        } => {
            log_became_primary(reason, previous_version.as_deref());
            // Only the process that just won the election evicts whatever
            // is still bound to the shared port — a crashed prior primary's
            // listener can outlive its lock file. A secondary never reaches
            // this branch, so it never kills a live peer out from under it.
            if !port::ensure_port_available(cfg.port, !cfg.no_kill).await {
                return Err(CoreError::PortStillInUse {
                    port: cfg.port,
                    no_kill: cfg.no_kill,
                }
                .into());
            }
            run_primary(&cfg, &instance, dispatcher).await
        }
        RoleTransitionEvent::Secondary { main_version } => {
            info!(main_version = ?main_version, "became secondary");
            match cfg.mode {
                Mode::Http => run_secondary_proxy(&instance).await,
                Mode::Stdio => run_secondary_stdio(&instance).await,
            }
        }
    }
}

fn log_became_primary(reason: PrimaryReason, previous_version: Option<&str>) {
    match reason {
        PrimaryReason::Initial => info!("became primary: no prior lock"),
        PrimaryReason::LockMissing => info!("became primary: lock file absent or corrupt"),
        PrimaryReason::StaleLock => info!("became primary: reclaimed stale lock"),
        PrimaryReason::VersionTransition => {
            info!(previous_version, "became primary: version transition completed")
        }
    }
}

/// `local=false`: run the MCP handler directly, no election, no lock file.
async fn run_direct(cfg: &ServerConfig, dispatcher: Arc<dyn ToolDispatcher>) -> anyhow::Result<()> {
    match cfg.mode {
        Mode::Http => {
            let router = mcp_http::build_router(
                dispatcher,
                cfg.desired_version.clone(),
                ControlSignals::default(),
            );
            let listener = tokio::net::TcpListener::bind(("127.0.0.1", cfg.port)).await?;
            info!(port = cfg.port, "listening (direct mode, no coordination)");
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            Ok(())
        }
        Mode::Stdio => run_local_stdio(dispatcher).await,
    }
}

/// Stdio mode with no primary to proxy to: dispatch directly in-process.
async fn run_local_stdio(dispatcher: Arc<dyn ToolDispatcher>) -> anyhow::Result<()> {
    use crate::framing::{self, UpstreamReader};
    use crate::rpc::{self, RpcRequest, RpcResponse};

    let mut reader = UpstreamReader::new(stdin());
    let mut out = stdout();
    loop {
        tokio::select! {
            biased;
            _ = shutdown_signal() => return Ok(()),
            message = reader.next_message() => {
                let Some(raw) = message? else { return Ok(()) };
                let req: RpcRequest = match serde_json::from_str(&raw) {
                    Ok(req) => req,
                    Err(e) => {
                        let resp = RpcResponse::failure(serde_json::Value::Null, rpc::ERR_INTERNAL, e.to_string());
                        framing::write_content_length(&mut out, &serde_json::to_string(&resp)?).await?;
                        continue;
                    }
                };
                let resp = match req.method.as_str() {
                    rpc::TOOLS_LIST_METHOD => RpcResponse::success(req.id, dispatcher.list().await),
                    rpc::TOOLS_CALL_METHOD => match rpc::parse_call_params(&req.params) {
                        Some((name, arguments)) => match dispatcher.call(&name, arguments).await {
                            Ok(result) => RpcResponse::success(req.id, result),
                            Err(e) => RpcResponse::success(req.id, serde_json::json!({
                                "content": [{ "type": "text", "text": format!("Proxy error: {e}") }],
                                "isError": true,
                            })),
                        },
                        None => RpcResponse::failure(req.id, rpc::ERR_INTERNAL, "tools/call requires a string `name` field"),
                    },
                    other => RpcResponse::failure(req.id, rpc::ERR_METHOD_NOT_FOUND, format!("unknown method: {other}")),
                };
                framing::write_content_length(&mut out, &serde_json::to_string(&resp)?).await?;
            }
        }
    }
}

async fn run_primary(
    cfg: &ServerConfig,
    instance: &InstanceManager,
    dispatcher: Arc<dyn ToolDispatcher>,
) -> anyhow::Result<()> {
    let signals = ControlSignals::default();
    let router = mcp_http::build_router(dispatcher, cfg.desired_version.clone(), signals.clone());
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", cfg.port)).await?;
    info!(port = cfg.port, "primary listening");

    let shutdown_signals = signals.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = shutdown_signals.shutdown.notified() => {}
                _ = shutdown_signals.transition.notified() => {}
            }
        })
        .await?;

    instance.remove_lock().await?;
    info!("primary lock released");
    Ok(())
}

async fn run_secondary_proxy(instance: &InstanceManager) -> anyhow::Result<()> {
    let handle = instance.start_proxy(0, None).await?;
    info!(listen_addr = %handle.local_addr(), "secondary reverse proxy listening");
    shutdown_signal().await;
    handle.stop().await;
    Ok(())
}

async fn run_secondary_stdio(instance: &InstanceManager) -> anyhow::Result<()> {
    let bridge = StdioBridge::new(instance.target_port());
    bridge.run(stdin(), stdout()).await?;
    Ok(())
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
