//! `config` subcommand — show the resolved configuration.

use std::path::PathBuf;

use crate::cli::{ConfigArgs, ServeArgs};
use crate::config::{self, Mode};

/// Run the `config` subcommand.
///
/// # Errors
///
/// Returns an error if config resolution fails (malformed TOML file).
pub async fn run(config_path: &Option<PathBuf>, args: ConfigArgs) -> anyhow::Result<()> {
    let cfg = config::resolve_config(config_path.as_deref(), &ServeArgs::default())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
    } else {
        println!("mcp-kit configuration:");
        println!("  port                     = {}", cfg.port);
        println!(
            "  mode                     = {}",
            match cfg.mode {
                Mode::Http => "http",
                Mode::Stdio => "stdio",
            }
        );
        println!("  local                    = {}", cfg.local);
        println!("  no_kill                  = {}", cfg.no_kill);
        println!("  desired_version          = {}", cfg.desired_version);
        println!(
            "  lock_dir                 = {}",
            cfg.lock_dir
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<default>".to_string())
        );
        println!(
            "  wait_for_port_timeout_ms = {}",
            cfg.wait_for_port_timeout_ms
        );
    }

    Ok(())
}
