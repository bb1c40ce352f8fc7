//! Local Coordination Core for `mcp-kit`.
//!
//! Lets multiple independently launched processes of the same MCP server
//! share one well-known port: elect a primary, forward work to it when
//! secondary, swap primaries when a newer version appears, and reclaim the
//! port after crashes.
//!
//! [`coordinator::elect`] is the entry point most callers want; it composes
//! every other module in this crate into the state machine described in
//! [`coordinator`]'s docs.

pub mod control;
pub mod coordinator;
pub mod error;
pub mod home;
pub mod instance;
pub mod lock;
pub mod logging;
pub mod model;
pub mod port;
pub mod proxy;

pub use coordinator::{elect, CoordinatorConfig};
pub use error::CoreError;
pub use instance::InstanceManager;
pub use model::{InstanceState, LockRecord, PrimaryReason, ProxyMetadata, Role, RoleTransitionEvent};
