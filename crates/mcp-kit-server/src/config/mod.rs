//! Configuration resolution for `mcp-kit-server`.
//!
//! The entry point is [`resolve_config`]: defaults, an optional `config.toml`,
//! then CLI flags, in that order. See [`types`] for [`ServerConfig`] itself.

mod resolve;
mod types;

pub use resolve::resolve_config;
pub use types::{Mode, ServerConfig};
