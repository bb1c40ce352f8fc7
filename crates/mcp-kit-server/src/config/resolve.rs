//! Config resolution for `mcp-kit-server`.
//!
//! Priority (highest to lowest):
//!
//! 1. CLI flags on the `serve` subcommand
//! 2. `STDIO_MODE=1` environment variable (forces stdio mode unconditionally)
//! 3. An explicit `--config <path>` TOML file, or the platform config
//!    directory's `config.toml` (see [`mcp_kit_core::home::default_config_dir`])
//! 4. Compiled-in defaults (via [`ServerConfig::default`])

use std::path::Path;

use super::types::{Mode, ServerConfig};
use crate::cli::ServeArgs;

/// Resolve the complete configuration for `mcp-kit serve`.
///
/// Reads an optional TOML file (explicit `config_path`, else the platform
/// config directory), then applies `args` on top. A missing config file is
/// not an error; an unreadable or malformed one is.
pub fn resolve_config(config_path: Option<&Path>, args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut cfg = load_file(config_path)?;
    apply_cli_overrides(&mut cfg, args);
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn load_file(config_path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => mcp_kit_core::home::default_config_dir().join("config.toml"),
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let cfg: ServerConfig = toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}

fn apply_cli_overrides(cfg: &mut ServerConfig, args: &ServeArgs) {
    if let Some(port) = args.port {
        cfg.port = port;
    }
    if args.stdio {
        cfg.mode = Mode::Stdio;
    } else if args.http || args.sse {
        cfg.mode = Mode::Http;
    }
    if args.local {
        cfg.local = true;
    }
    if args.no_kill {
        cfg.no_kill = true;
    }
}

/// `STDIO_MODE=1` forces stdio mode regardless of everything else, matching
/// the environment override the control endpoints' callers rely on.
fn apply_env_overrides(cfg: &mut ServerConfig) {
    if std::env::var("STDIO_MODE").as_deref() == Ok("1") {
        cfg.mode = Mode::Stdio;
    }
}
