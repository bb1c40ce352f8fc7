//! `mcp-kit` — a toolkit binary for running MCP servers behind the local
//! coordination core.
//!
//! # Subcommands
//!
//! - `serve`  — run the MCP server, electing a primary when `--local` is set
//! - `config` — print the resolved configuration

use clap::Parser;

use mcp_kit_core::logging;
use mcp_kit_server::cli::{Cli, Commands};
use mcp_kit_server::commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(&cli.config, args).await,
        Commands::Config(args) => commands::config_cmd::run(&cli.config, args).await,
    };

    if let Err(e) = &result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    result
}
