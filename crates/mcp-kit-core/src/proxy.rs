//! Accepts HTTP on a secondary's listen port and forwards every request
//! byte-faithfully to the primary's loopback port.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::model::ProxyMetadata;

/// Shared state for the forwarding handler.
struct ProxyState {
    http: reqwest::Client,
    main_port: u16,
    metadata: Option<ProxyMetadata>,
}

/// Build the router that forwards every method/path to
/// `http://127.0.0.1:<main_port>`, optionally annotating outgoing requests
/// with the fixed `X-Proxy-*` metadata headers.
pub fn build_router(main_port: u16, metadata: Option<ProxyMetadata>) -> Router {
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("loopback-only HTTP client must always build");
    let state = Arc::new(ProxyState {
        http,
        main_port,
        metadata,
    });
    Router::new().fallback(any(forward)).with_state(state)
}

/// A running Reverse Proxy. Dropping this without calling [`ProxyHandle::stop`]
/// leaves the listener running until the process exits; callers that care
/// about a clean shutdown window should call `stop` explicitly.
pub struct ProxyHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl ProxyHandle {
    /// The address the proxy ended up bound to (useful when `listen_port` was
    /// 0 and the kernel assigned one).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close the listener and let in-flight requests drain. Idempotent: a
    /// second call is a no-op.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

/// Bind `listen_port` (0 for kernel-assigned) and start forwarding to
/// `main_port`. Idempotent in the sense that each call produces an
/// independent listener; callers own exactly one `ProxyHandle` per secondary
/// instance.
pub async fn start(
    listen_port: u16,
    main_port: u16,
    metadata: Option<ProxyMetadata>,
) -> std::io::Result<ProxyHandle> {
    let router = build_router(main_port, metadata);
    let listener = TcpListener::bind(("127.0.0.1", listen_port)).await?;
    let local_addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            warn!(error = %e, "reverse proxy listener terminated with an error");
        }
    });

    Ok(ProxyHandle {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        join,
    })
}

#[derive(Serialize)]
struct UpstreamErrorBody<'a> {
    error: &'a str,
    message: String,
}

async fn forward(State(state): State<Arc<ProxyState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://127.0.0.1:{}{}", state.main_port, path_and_query);

    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return upstream_error(format!("failed to read request body: {e}"));
        }
    };

    let mut upstream_req = state.http.request(parts.method.clone(), &url);
    for (name, value) in parts.headers.iter() {
        upstream_req = upstream_req.header(name, value);
    }
    if let Some(metadata) = &state.metadata {
        for (name, value) in metadata.header_pairs() {
            upstream_req = upstream_req.header(name, value);
        }
    }
    upstream_req = upstream_req.body(body_bytes);

    // The client is built with `redirect::Policy::none()`, so a redirect
    // response from upstream comes back here unfollowed and is translated
    // straight through to the downstream client.
    match upstream_req.send().await {
        Ok(upstream_resp) => translate_response(upstream_resp).await,
        Err(e) => {
            warn!(error = %e, main_port = state.main_port, "upstream request failed");
            upstream_error(e.to_string())
        }
    }
}

async fn translate_response(upstream_resp: reqwest::Response) -> Response {
    let status = upstream_resp.status();
    let mut headers = HeaderMap::new();
    for (name, value) in upstream_resp.headers().iter() {
        headers.insert(name.clone(), value.clone());
    }
    let body = match upstream_resp.bytes().await {
        Ok(bytes) => Body::from(bytes),
        Err(e) => return upstream_error(format!("failed to read upstream body: {e}")),
    };
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn upstream_error(message: String) -> Response {
    let body = UpstreamErrorBody {
        error: "bad_gateway",
        message,
    };
    (StatusCode::BAD_GATEWAY, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use tokio::net::TcpListener;

    async fn spawn_router(router: Router) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn forwards_method_path_and_body_verbatim() {
        let upstream = Router::new().route(
            "/tools/call",
            post(|body: String| async move { format!("echo:{body}") }),
        );
        let main_port = spawn_router(upstream).await;

        let proxy_router = build_router(main_port, None);
        let proxy_port = spawn_router(proxy_router).await;

        let client = reqwest::Client::new();
        let resp = client
            .post(format!("http://127.0.0.1:{proxy_port}/tools/call"))
            .body("payload")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "echo:payload");
    }

    #[tokio::test]
    async fn annotates_with_metadata_headers() {
        let upstream = Router::new().route(
            "/__version",
            get(|headers: HeaderMap| async move {
                let main_version = headers
                    .get("X-Proxy-Main-Version")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_string();
                main_version
            }),
        );
        let main_port = spawn_router(upstream).await;

        let metadata = ProxyMetadata {
            main_version: "1.0.0".to_string(),
            instance_id: "abc123".to_string(),
            start_time: "2026-01-01T00:00:00Z".to_string(),
            main_port,
        };
        let proxy_router = build_router(main_port, Some(metadata));
        let proxy_port = spawn_router(proxy_router).await;

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://127.0.0.1:{proxy_port}/__version"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.text().await.unwrap(), "1.0.0");
    }

    #[tokio::test]
    async fn returns_502_when_upstream_unreachable() {
        // Bind then drop to get a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_port = listener.local_addr().unwrap().port();
        drop(listener);

        let proxy_router = build_router(dead_port, None);
        let proxy_port = spawn_router(proxy_router).await;

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://127.0.0.1:{proxy_port}/anything"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 502);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "bad_gateway");
    }

    #[tokio::test]
    async fn does_not_follow_upstream_redirects() {
        use axum::http::header::LOCATION;
        use axum::response::Redirect;

        let upstream = Router::new().route("/old", get(|| async { Redirect::to("/new") }));
        let main_port = spawn_router(upstream).await;

        let proxy_router = build_router(main_port, None);
        let proxy_port = spawn_router(proxy_router).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let resp = client
            .get(format!("http://127.0.0.1:{proxy_port}/old"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 303);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/new");
    }

    #[tokio::test]
    async fn start_and_stop_is_idempotent_lifecycle() {
        let upstream = Router::new().route("/ping", get(|| async { "pong" }));
        let main_port = spawn_router(upstream).await;

        let handle = start(0, main_port, None).await.unwrap();
        let proxy_port = handle.local_addr().port();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://127.0.0.1:{proxy_port}/ping"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.text().await.unwrap(), "pong");

        handle.stop().await;

        // Listener is gone; a new bind on the same port should now succeed.
        assert!(TcpListener::bind(("127.0.0.1", proxy_port)).await.is_ok());
    }
}
