//! The data model shared by every component: the persisted Lock Record, the
//! per-process Instance State, the Proxy Metadata headers, and the Role
//! Transition Event the Coordinator produces exactly once per startup.

use serde::{Deserialize, Serialize};

/// A small descriptor persisted in a single file at a deterministic path
/// (default: `<os-tempdir>/mcp-kit-<port>.lock`).
///
/// Extra fields are permitted and ignored on read — byte-exact format is not
/// required for interop, but readers MUST treat parse failure as "stale".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Process identifier of the primary. Always positive.
    pub pid: u32,
    /// Semantic version string of the primary.
    pub version: String,
    /// Creation timestamp, milliseconds since epoch.
    pub timestamp: u64,
}

/// The role a process has settled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unknown,
    Primary,
    Secondary,
}

/// Per-process record of coordination state.
#[derive(Debug, Clone)]
pub struct InstanceState {
    pub role: Role,
    /// The well-known shared port all instances compete for.
    pub target_port: u16,
    /// Non-`None` only for `Secondary` in HTTP mode: the kernel-assigned (or
    /// configured) port the Reverse Proxy listens on.
    pub proxy_listen_port: Option<u16>,
    /// Non-`None` only for `Primary`: the lock record this process holds.
    pub held_lock: Option<LockRecord>,
}

impl InstanceState {
    pub fn new(target_port: u16) -> Self {
        Self {
            role: Role::Unknown,
            target_port,
            proxy_listen_port: None,
            held_lock: None,
        }
    }
}

/// Optional annotations the Reverse Proxy attaches to forwarded requests as
/// headers. Purely informational — clients do not require them.
#[derive(Debug, Clone)]
pub struct ProxyMetadata {
    pub main_version: String,
    pub instance_id: String,
    pub start_time: String,
    pub main_port: u16,
}

impl ProxyMetadata {
    /// Header name / value pairs in the fixed order the Reverse Proxy
    /// attaches them to every forwarded response.
    pub fn header_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("X-Proxy-Main-Version", self.main_version.clone()),
            ("X-Proxy-Instance-Id", self.instance_id.clone()),
            ("X-Proxy-Start-Time", self.start_time.clone()),
            ("X-Proxy-Main-Port", self.main_port.to_string()),
        ]
    }
}

/// Why a process committed to `Primary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryReason {
    Initial,
    LockMissing,
    StaleLock,
    VersionTransition,
}

/// Tagged value the Coordinator returns, produced exactly once per process
/// startup and never mutated thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleTransitionEvent {
    Primary {
        reason: PrimaryReason,
        previous_version: Option<String>,
    },
    Secondary {
        main_version: Option<String>,
    },
}

impl RoleTransitionEvent {
    pub fn primary(reason: PrimaryReason, previous_version: Option<String>) -> Self {
        Self::Primary {
            reason,
            previous_version,
        }
    }

    pub fn secondary(main_version: Option<String>) -> Self {
        Self::Secondary { main_version }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Primary { .. })
    }
}
