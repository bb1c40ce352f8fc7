//! Error taxonomy for the coordination core.
//!
//! Most of the taxonomy is recovered from internally by the
//! [`crate::coordinator::Coordinator`] and never reaches a caller as an
//! `Err` — lock contention and an unreadable lock file collapse into
//! `Option`/`bool` returns by design (see [`crate::lock`] and
//! [`crate::control`]). `CoreError` carries only the variants that are meant
//! to surface: the ones the coordination algorithm treats as fatal, plus the
//! request-path errors that are reported to a caller rather than raised.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the coordination core as fatal startup failures.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The lock file exists, is not a directory, and is otherwise
    /// inaccessible for reasons other than contention (permissions, disk
    /// full, path component is not a directory).
    #[error("lock I/O error on {path}: {source}")]
    LockIoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `requestTransition` against the current primary returned anything
    /// other than HTTP 200.
    #[error("primary on port {port} denied the transition request")]
    TransitionDenied { port: u16 },

    /// The departing primary released the port, but `tryBecomeMain` lost the
    /// race to reclaim it afterward.
    #[error("lost the race to become primary on port {port} after transition")]
    TransitionRaceLost { port: u16 },

    /// `ensurePortAvailable` could not free the port. `no_kill` records
    /// whether the caller had forbidden killing holders (`--no-kill`) or a
    /// kill pass ran and the port was still occupied afterward.
    #[error("port {port} still in use (no_kill={no_kill})")]
    PortStillInUse { port: u16, no_kill: bool },

    /// `findAvailablePort` exhausted its retry budget without finding a free
    /// port.
    #[error("no free port found starting at {start} within {max_retries} attempts")]
    NoFreePort { start: u16, max_retries: u32 },
}

/// Error returned to a downstream client when the Reverse Proxy cannot reach
/// the primary. Never fatal to the proxy itself — request-path errors are
/// reported, not raised.
#[derive(Error, Debug)]
#[error("proxy upstream error: {message}")]
pub struct ProxyUpstreamError {
    pub message: String,
}

/// Error surfaced as an `isError: true` MCP tool result when the Stdio
/// Bridge's upstream call fails. Never fatal to the stdio session.
#[derive(Error, Debug)]
#[error("tool proxy error: {message}")]
pub struct ToolProxyError {
    pub message: String,
}
