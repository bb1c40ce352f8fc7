//! Loopback HTTP client for the primary's control-plane endpoints.
//!
//! Scoped to `127.0.0.1` only, matching the non-goal that the control plane
//! trusts the local host and nothing else. Every call carries a hard 2-second
//! timeout; a transport error, a non-200 status, or a malformed body are all
//! folded into `None`/`false` rather than propagated — the Coordinator treats
//! an unreachable primary the same as a dead one.

use std::time::Duration;

use serde::Deserialize;

/// Per-request timeout for every control-plane call.
const CONTROL_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Loopback HTTP client for `/__version`, `/__shutdown`, `/__transition`.
#[derive(Debug, Clone)]
pub struct ControlClient {
    http: reqwest::Client,
}

impl ControlClient {
    /// Build a client with the fixed 2-second timeout. Construction only
    /// fails if the underlying TLS backend cannot initialize, which never
    /// happens for a loopback-only, non-TLS client.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(CONTROL_TIMEOUT)
            .build()
            .expect("loopback-only HTTP client must always build");
        Self { http }
    }

    fn base_url(port: u16) -> String {
        format!("http://127.0.0.1:{port}")
    }

    /// `GET /__version`. Returns `None` on any transport error, non-200
    /// status, malformed JSON, or a missing `version` field. `fetchVersion`
    /// deliberately does not check the response's `Content-Type` — see the
    /// open question in the design notes.
    pub async fn fetch_version(&self, port: u16) -> Option<String> {
        let url = format!("{}/__version", Self::base_url(port));
        let resp = self.http.get(&url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: VersionResponse = resp.json().await.ok()?;
        Some(body.version)
    }

    /// `POST /__shutdown`. Returns `true` iff the response status is 200.
    pub async fn request_shutdown(&self, port: u16) -> bool {
        let url = format!("{}/__shutdown", Self::base_url(port));
        matches!(self.http.post(&url).send().await, Ok(resp) if resp.status().is_success())
    }

    /// `POST /__transition`. Returns `true` iff the response status is 200.
    pub async fn request_transition(&self, port: u16) -> bool {
        let url = format!("{}/__transition", Self::base_url(port));
        matches!(self.http.post(&url).send().await, Ok(resp) if resp.status().is_success())
    }
}

impl Default for ControlClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::Router;
    use tokio::net::TcpListener;

    async fn spawn_test_server(router: Router) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    #[tokio::test]
    async fn fetch_version_returns_version_on_200() {
        let router = Router::new()
            .route("/__version", get(|| async { r#"{"version":"1.2.3"}"# }));
        let port = spawn_test_server(router).await;
        let client = ControlClient::new();
        assert_eq!(client.fetch_version(port).await, Some("1.2.3".to_string()));
    }

    #[tokio::test]
    async fn fetch_version_none_on_malformed_json() {
        let router = Router::new().route("/__version", get(|| async { "not json" }));
        let port = spawn_test_server(router).await;
        let client = ControlClient::new();
        assert_eq!(client.fetch_version(port).await, None);
    }

    #[tokio::test]
    async fn fetch_version_none_on_missing_field() {
        let router = Router::new().route("/__version", get(|| async { r#"{"other":1}"# }));
        let port = spawn_test_server(router).await;
        let client = ControlClient::new();
        assert_eq!(client.fetch_version(port).await, None);
    }

    #[tokio::test]
    async fn fetch_version_none_on_unreachable_port() {
        let client = ControlClient::new();
        // Port 1 is privileged and essentially never has a loopback listener
        // in a test sandbox; any connection-refused/timeout path is fine.
        assert_eq!(client.fetch_version(1).await, None);
    }

    #[tokio::test]
    async fn request_shutdown_true_on_200() {
        let router = Router::new().route("/__shutdown", post(|| async { "" }));
        let port = spawn_test_server(router).await;
        let client = ControlClient::new();
        assert!(client.request_shutdown(port).await);
    }

    #[tokio::test]
    async fn request_shutdown_false_on_unreachable() {
        let client = ControlClient::new();
        assert!(!client.request_shutdown(1).await);
    }

    #[tokio::test]
    async fn request_transition_true_on_200() {
        let router = Router::new().route("/__transition", post(|| async { "" }));
        let port = spawn_test_server(router).await;
        let client = ControlClient::new();
        assert!(client.request_transition(port).await);
    }

    #[tokio::test]
    async fn request_transition_false_on_non_200() {
        use axum::http::StatusCode;
        let router = Router::new()
            .route("/__transition", post(|| async { StatusCode::FORBIDDEN }));
        let port = spawn_test_server(router).await;
        let client = ControlClient::new();
        assert!(!client.request_transition(port).await);
    }
}
