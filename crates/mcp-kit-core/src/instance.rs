//! Composes the Lock Store, Control Client, and Port Manager into the
//! operations the Coordinator drives the election algorithm with.

use std::path::PathBuf;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{interval, timeout};

use crate::control::ControlClient;
use crate::error::CoreError;
use crate::lock;
use crate::model::{LockRecord, ProxyMetadata};
use crate::proxy::{self, ProxyHandle};

/// Poll interval used by `wait_for_port`.
const WAIT_FOR_PORT_POLL: Duration = Duration::from_millis(300);

/// Everything the Coordinator needs to drive one process's election.
pub struct InstanceManager {
    target_port: u16,
    lock_path: PathBuf,
    control: ControlClient,
    pid: u32,
    version: String,
}

impl InstanceManager {
    pub fn new(target_port: u16, lock_path: PathBuf, version: String) -> Self {
        Self {
            target_port,
            lock_path,
            control: ControlClient::new(),
            pid: std::process::id(),
            version,
        }
    }

    pub fn target_port(&self) -> u16 {
        self.target_port
    }

    pub fn lock_path(&self) -> &std::path::Path {
        &self.lock_path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Attempt to atomically win the lock as this process. Timestamps are
    /// supplied by the caller rather than sampled here, so the Coordinator
    /// (and its tests) control wall-clock dependence explicitly.
    pub async fn try_become_main(&self, timestamp_ms: u64) -> Result<bool, CoreError> {
        let record = LockRecord {
            pid: self.pid,
            version: self.version.clone(),
            timestamp: timestamp_ms,
        };
        lock::try_create(&self.lock_path, &record).await
    }

    pub async fn read_lock(&self) -> Option<LockRecord> {
        lock::read(&self.lock_path).await
    }

    pub async fn write_lock(&self, record: &LockRecord) -> Result<(), CoreError> {
        lock::overwrite(&self.lock_path, record).await
    }

    pub async fn remove_lock(&self) -> Result<(), CoreError> {
        lock::remove(&self.lock_path).await
    }

    pub async fn fetch_main_version(&self) -> Option<String> {
        self.control.fetch_version(self.target_port).await
    }

    pub async fn request_main_shutdown(&self) -> bool {
        self.control.request_shutdown(self.target_port).await
    }

    pub async fn request_main_transition(&self) -> bool {
        self.control.request_transition(self.target_port).await
    }

    /// Poll for `target_port` becoming bindable by attempting a real ephemeral
    /// bind every 300ms, succeeding as soon as the bind succeeds (the bound
    /// listener is dropped immediately so a subsequent `tryBecomeMain`-style
    /// bind can take its place). Returns `false` if `timeout_ms` elapses
    /// first.
    pub async fn wait_for_port(&self, timeout_ms: u64) -> bool {
        let addr = format!("127.0.0.1:{}", self.target_port);
        let probe = async {
            let mut ticker = interval(WAIT_FOR_PORT_POLL);
            loop {
                ticker.tick().await;
                if TcpListener::bind(&addr).await.is_ok() {
                    return;
                }
            }
        };
        timeout(Duration::from_millis(timeout_ms), probe)
            .await
            .is_ok()
    }

    pub fn is_pid_alive(pid: i64) -> bool {
        lock::is_pid_alive(pid)
    }

    /// Start the Reverse Proxy for a secondary instance: bind `listen_port`
    /// (0 for kernel-assigned) and forward every request to `target_port`.
    pub async fn start_proxy(
        &self,
        listen_port: u16,
        metadata: Option<ProxyMetadata>,
    ) -> std::io::Result<ProxyHandle> {
        proxy::start(listen_port, self.target_port, metadata).await
    }
}
