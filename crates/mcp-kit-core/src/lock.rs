//! Atomic create/read/remove of the single-file Lock Record.
//!
//! `try_create` is the only operation used by election: it uses the
//! filesystem's atomic create-exclusive open mode, so at most one process can
//! observe its own `try_create` as successful for a given path and generation
//! of the file. `overwrite` and `remove` are only ever invoked by the owning
//! primary or by the stale-lock reclaim path in [`crate::coordinator`].

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::CoreError;
use crate::model::LockRecord;

/// Compute the default lock file path for `port`: `<lock_dir>/mcp-kit-
/// <port>.lock`, where `lock_dir` defaults to the OS temp directory.
pub fn default_lock_path(port: u16) -> PathBuf {
    crate::home::default_lock_dir().join(format!("mcp-kit-{port}.lock"))
}

/// Attempt to atomically create the lock file with `record`.
///
/// Returns `Ok(false)` iff the failure is specifically "already exists" —
/// that is signalled as a plain `false`, not an error, matching the
/// lock-contended case callers are expected to treat as routine. Any other
/// failure (permissions, path is a directory, disk full) is reported as
/// `Err(CoreError::LockIoError)`.
pub async fn try_create(path: &Path, record: &LockRecord) -> Result<bool, CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| CoreError::LockIoError {
                path: path.to_path_buf(),
                source,
            })?;
    }

    let json = serde_json::to_string(record).expect("LockRecord always serializes");

    match fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .await
    {
        Ok(mut file) => {
            let write_result = async {
                file.write_all(json.as_bytes()).await?;
                file.flush().await
            }
            .await;
            if let Err(source) = write_result {
                let _ = fs::remove_file(path).await;
                return Err(CoreError::LockIoError {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(source) => Err(CoreError::LockIoError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read and validate the Lock Record at `path`.
///
/// Returns `None` when the file is absent, when its content does not parse,
/// or when required fields are missing or of the wrong type. Never returns
/// an error for corrupt content — corruption is folded into `None` so the
/// Coordinator can treat it as a stale lock.
pub async fn read(path: &Path) -> Option<LockRecord> {
    let contents = fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&contents).ok()
}

/// Write `record` unconditionally, overwriting any existing content. Used
/// only when a primary rotates its own record.
pub async fn overwrite(path: &Path, record: &LockRecord) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| CoreError::LockIoError {
                path: path.to_path_buf(),
                source,
            })?;
    }
    let json = serde_json::to_string(record).expect("LockRecord always serializes");
    fs::write(path, json)
        .await
        .map_err(|source| CoreError::LockIoError {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove the lock file. Idempotent: absence is success.
pub async fn remove(path: &Path) -> Result<(), CoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CoreError::LockIoError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Returns `true` iff a null-signal probe to `pid` succeeds. `pid <= 0` is
/// always `false`.
pub fn is_pid_alive(pid: i64) -> bool {
    if pid <= 0 {
        return false;
    }
    #[cfg(unix)]
    {
        // SAFETY: kill(pid, 0) delivers no signal; it only probes whether the
        // calling process may signal `pid`, which implies the process exists.
        let result = unsafe { libc::kill(pid as i32, 0) };
        result == 0
    }
    #[cfg(not(unix))]
    {
        false
    }
}
