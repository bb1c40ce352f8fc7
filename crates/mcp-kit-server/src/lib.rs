//! `mcp-kit-server` library crate.
//!
//! Wires `mcp-kit-core`'s coordination primitives to a CLI, a configuration
//! layer, and an example tool dispatcher. Exposed as a library so the
//! binary's integration tests can drive it directly via `assert_cmd` without
//! losing type-level access to its pieces.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod framing;
pub mod mcp_http;
pub mod rpc;
pub mod stdio_bridge;
