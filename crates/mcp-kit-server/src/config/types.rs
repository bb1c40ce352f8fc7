//! Configuration types for `mcp-kit-server`.
//!
//! [`ServerConfig`] is deserialized from an optional `config.toml`, then
//! layered with CLI overrides in [`super::resolve`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Transport the server speaks to its own MCP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Http,
    Stdio,
}

fn default_port() -> u16 {
    8989
}

fn default_desired_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_wait_for_port_timeout_ms() -> u64 {
    10_000
}

/// Resolved `mcp-kit-server` configuration.
///
/// All fields have defaults so an absent or minimal `config.toml` produces a
/// fully functional configuration.
///
/// # Example `config.toml`
///
/// ```toml
/// port = 8989
/// mode = "http"
/// local = true
/// no_kill = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Shared port instances compete for (default: `8989`)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Transport mode (default: `http`)
    #[serde(default)]
    pub mode: Mode,

    /// Enable the coordination core and control endpoints (default: `false`,
    /// meaning run the MCP handler directly with no election)
    #[serde(default)]
    pub local: bool,

    /// Forbid the Port Manager from terminating processes holding the shared
    /// port (default: `false`)
    #[serde(default)]
    pub no_kill: bool,

    /// This process's own version, persisted into the lock record and
    /// compared against a competing primary's (default: `CARGO_PKG_VERSION`)
    #[serde(default = "default_desired_version")]
    pub desired_version: String,

    /// Override for the Lock Store's directory (default: platform temp dir,
    /// resolved by `mcp_kit_core::home`)
    #[serde(default)]
    pub lock_dir: Option<PathBuf>,

    /// `waitForPort` timeout during a version-transition handoff (default:
    /// `10_000`)
    #[serde(default = "default_wait_for_port_timeout_ms")]
    pub wait_for_port_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            mode: Mode::default(),
            local: false,
            no_kill: false,
            desired_version: default_desired_version(),
            lock_dir: None,
            wait_for_port_timeout_ms: default_wait_for_port_timeout_ms(),
        }
    }
}
