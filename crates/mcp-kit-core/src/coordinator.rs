//! The election state machine: decides, once per process startup, whether
//! this process becomes primary or secondary.

use crate::error::CoreError;
use crate::instance::InstanceManager;
use crate::model::{PrimaryReason, RoleTransitionEvent};

/// Inputs that parameterize one run of the algorithm.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// This process's own version string, used both to persist into the lock
    /// record and to compare against a competing primary's reported version.
    pub desired_version: String,
    /// Timeout for `waitForPort` during a version-transition handoff.
    pub wait_for_port_timeout_ms: u64,
    /// Whether a lock observed as stale (corrupt, absent, or dead PID) should
    /// be reclaimed and retried before falling through to version
    /// comparison. Disabling this is only useful for diagnostics.
    pub remove_stale_lock: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            desired_version: env!("CARGO_PKG_VERSION").to_string(),
            wait_for_port_timeout_ms: 10_000,
            remove_stale_lock: true,
        }
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Run the election algorithm exactly once against `instance`, returning the
/// role this process settled into.
pub async fn elect(
    instance: &InstanceManager,
    config: &CoordinatorConfig,
) -> Result<RoleTransitionEvent, CoreError> {
    // Step 1: initial attempt.
    if instance.try_become_main(now_millis()).await? {
        return Ok(RoleTransitionEvent::primary(PrimaryReason::Initial, None));
    }

    // Self-owned lock: this process is already primary from an earlier
    // `elect` call. Re-running the algorithm must be idempotent rather than
    // fall through to comparing this process's version against its own
    // control plane, which would otherwise flip it to secondary.
    if let Some(record) = instance.read_lock().await {
        if record.pid == std::process::id() {
            return Ok(RoleTransitionEvent::primary(PrimaryReason::Initial, None));
        }
    }

    // Step 2: stale-lock reclaim.
    if config.remove_stale_lock {
        let existing = instance.read_lock().await;
        let is_stale = match &existing {
            None => true,
            Some(record) => !InstanceManager::is_pid_alive(record.pid as i64),
        };
        if is_stale {
            instance.remove_lock().await?;
            if instance.try_become_main(now_millis()).await? {
                let reason = if existing.is_some() {
                    PrimaryReason::StaleLock
                } else {
                    PrimaryReason::LockMissing
                };
                return Ok(RoleTransitionEvent::primary(reason, None));
            }
            // Another process won the race between reclaim and retry; fall
            // through to version comparison against the new holder.
        }
    }

    // Step 3: version comparison.
    let main_version = instance.fetch_main_version().await;

    // Step 4: equal versions -> commit to secondary.
    if main_version.as_deref() == Some(config.desired_version.as_str()) {
        return Ok(RoleTransitionEvent::secondary(main_version));
    }

    // Step 5: version transition. A `None` main_version (unreachable primary)
    // is treated as "different" and also drives the transition path.
    if !instance.request_main_transition().await {
        return Err(CoreError::TransitionDenied {
            port: instance.target_port(),
        });
    }

    // waitForPort timing out is not fatal; the following tryBecomeMain
    // decides the outcome.
    let _ = instance.wait_for_port(config.wait_for_port_timeout_ms).await;

    // Defensive removal: the departing primary should have removed its own
    // lock, but we may observe the window where it has not yet.
    instance.remove_lock().await?;

    if instance.try_become_main(now_millis()).await? {
        return Ok(RoleTransitionEvent::primary(
            PrimaryReason::VersionTransition,
            main_version,
        ));
    }

    Err(CoreError::TransitionRaceLost {
        port: instance.target_port(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::Router;
    use tempfile::TempDir;
    use tokio::net::TcpListener;

    fn manager(dir: &TempDir, port: u16, version: &str) -> InstanceManager {
        InstanceManager::new(port, dir.path().join("mcp-kit.lock"), version.to_string())
    }

    fn config(version: &str) -> CoordinatorConfig {
        CoordinatorConfig {
            desired_version: version.to_string(),
            wait_for_port_timeout_ms: 500,
            remove_stale_lock: true,
        }
    }

    #[tokio::test]
    async fn initial_attempt_wins_empty_lock_dir() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir, 18989, "1.0.0");
        let event = elect(&mgr, &config("1.0.0")).await.unwrap();
        assert_eq!(
            event,
            RoleTransitionEvent::primary(PrimaryReason::Initial, None)
        );
    }

    #[tokio::test]
    async fn stale_lock_with_dead_pid_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir, 18990, "1.0.0");
        let stale = crate::model::LockRecord {
            pid: 4_194_304, // not a real pid
            version: "0.9.0".to_string(),
            timestamp: 1,
        };
        mgr.write_lock(&stale).await.unwrap();

        let event = elect(&mgr, &config("1.0.0")).await.unwrap();
        assert_eq!(
            event,
            RoleTransitionEvent::primary(PrimaryReason::StaleLock, None)
        );
    }

    #[tokio::test]
    async fn corrupt_lock_is_reclaimed_as_lock_missing() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("mcp-kit.lock");
        tokio::fs::write(&lock_path, b"not-json").await.unwrap();
        let mgr = InstanceManager::new(18991, lock_path, "1.0.0".to_string());

        let event = elect(&mgr, &config("1.0.0")).await.unwrap();
        assert_eq!(
            event,
            RoleTransitionEvent::primary(PrimaryReason::LockMissing, None)
        );
    }

    #[tokio::test]
    async fn live_lock_with_matching_version_becomes_secondary() {
        let router = Router::new()
            .route("/__version", get(|| async { r#"{"version":"1.0.0"}"# }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir, port, "1.0.0");
        let live = crate::model::LockRecord {
            pid: std::process::id(),
            version: "1.0.0".to_string(),
            timestamp: 1,
        };
        mgr.write_lock(&live).await.unwrap();

        let event = elect(&mgr, &config("1.0.0")).await.unwrap();
        assert_eq!(
            event,
            RoleTransitionEvent::secondary(Some("1.0.0".to_string()))
        );
    }

    #[tokio::test]
    async fn mismatched_version_requests_transition_and_fails_when_denied() {
        let router = Router::new()
            .route("/__version", get(|| async { r#"{"version":"0.9.0"}"# }));
        // No /__transition route registered -> 404, request_main_transition
        // returns false, so the election must report TransitionDenied.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir, port, "1.0.0");
        let live = crate::model::LockRecord {
            pid: std::process::id(),
            version: "0.9.0".to_string(),
            timestamp: 1,
        };
        mgr.write_lock(&live).await.unwrap();

        let err = elect(&mgr, &config("1.0.0")).await.unwrap_err();
        assert!(matches!(err, CoreError::TransitionDenied { .. }));
    }

    #[tokio::test]
    async fn unreachable_primary_is_treated_as_different_version() {
        // No server listening at all on this port: fetch_main_version will be
        // None, and request_main_transition will also fail (connection
        // refused), so this must surface TransitionDenied rather than
        // silently treating the primary as matching.
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir, 18992, "1.0.0");
        let live = crate::model::LockRecord {
            pid: std::process::id(),
            version: "1.0.0".to_string(),
            timestamp: 1,
        };
        mgr.write_lock(&live).await.unwrap();

        let err = elect(&mgr, &config("1.0.0")).await.unwrap_err();
        assert!(matches!(err, CoreError::TransitionDenied { .. }));
    }

    #[tokio::test]
    async fn electing_twice_in_the_same_process_stays_primary() {
        // No server listening on this port: if the self-owned-lock short
        // circuit were missing, the second `elect` would fetch_main_version
        // against nothing, get None, and incorrectly chase a transition
        // against itself instead of recognizing it already holds the lock.
        let dir = TempDir::new().unwrap();
        let mgr = manager(&dir, 18993, "1.0.0");

        let first = elect(&mgr, &config("1.0.0")).await.unwrap();
        assert_eq!(
            first,
            RoleTransitionEvent::primary(PrimaryReason::Initial, None)
        );

        let second = elect(&mgr, &config("1.0.0")).await.unwrap();
        assert!(second.is_primary());
    }
}
