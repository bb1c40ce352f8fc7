//! CLI argument types for `mcp-kit`.
//!
//! Flag parsing semantics (error text, abbreviation rules) are left to
//! clap's own defaults; only the surface — the flags themselves and their
//! defaults — is specified.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Toolkit binary for running an MCP server with the local coordination core.
#[derive(Parser, Debug)]
#[command(name = "mcp-kit", version, about)]
pub struct Cli {
    /// Path to a config.toml override (default: platform config dir resolution)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server
    Serve(ServeArgs),
    /// Print the resolved configuration
    Config(ConfigArgs),
}

/// Arguments for the `serve` subcommand.
#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Shared port the coordination core elects a primary for
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Speak MCP over stdio, bridging to a primary over HTTP when secondary
    #[arg(long, conflicts_with_all = ["http", "sse"])]
    pub stdio: bool,

    /// Speak MCP over HTTP directly (default)
    #[arg(long, conflicts_with = "stdio")]
    pub http: bool,

    /// Legacy alias for --http
    #[arg(long, conflicts_with = "stdio")]
    pub sse: bool,

    /// Enable the coordination core and control endpoints
    #[arg(long)]
    pub local: bool,

    /// Never terminate processes holding the shared port
    #[arg(long)]
    pub no_kill: bool,
}

/// Arguments for the `config` subcommand.
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// Print the resolved configuration as JSON instead of a human-readable form
    #[arg(long)]
    pub json: bool,
}
