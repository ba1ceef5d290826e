//! # Hub Registry - Local Connection State
//!
//! ## Purpose
//!
//! The only shared mutable state in the messaging core: the per-process
//! mapping of connection id → connection, group name → local members, and
//! user id → local connections. Every server in a cluster holds exactly the
//! connections it accepted; global group membership is never materialized
//! anywhere, it is the implicit union of every server's local table.
//!
//! ## Concurrency
//!
//! All maps are sharded concurrent maps; mutation never blocks unrelated
//! connections' delivery beyond a bounded shard critical section. A
//! broadcast racing a removal may or may not reach the removed connection,
//! but it can never write to a closed sink — the connection's closed flag
//! is checked inside `write_raw`.

pub mod connection;
pub mod error;
pub mod registry;
pub mod test_utils;

pub use connection::{ConnectionSink, HubConnection};
pub use error::{SinkError, SinkResult};
pub use registry::{ConnectionRegistry, GroupUpdate, RemovedConnection};
