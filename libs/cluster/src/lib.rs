//! # Hub Cluster - Routing and Distributed Lifetime Management
//!
//! ## Purpose
//!
//! Resolves logical send targets to concrete recipients and keeps that
//! resolution correct when connections for the same logical target are
//! spread across server processes that share nothing but a pub/sub
//! backplane.
//!
//! ## Architecture Role
//!
//! ```text
//! application code
//!       │ send(SendTarget, HubMessage)
//!       ▼
//! HubLifetimeManager ── LocalLifetimeManager   (single process)
//!       │           └── ClusterLifetimeManager (backplane-backed)
//!       ▼                      │ publish/subscribe
//! ConnectionRegistry           ▼
//! (local delivery)        Backplane channels:
//!                          all │ connection.<id> │ group.<name>
//!                          user.<id> │ ack.<token>
//! ```
//!
//! Every server resolves each envelope against its own registry and writes
//! only to connections it owns, so a cluster-wide send delivers at most
//! once per physical connection. Origin servers deliver locally before
//! publishing and ignore their own envelopes coming back.
//!
//! ## Group Membership Protocol
//!
//! Membership changes for non-local connections are synchronous-looking
//! calls layered on the asynchronous backplane: the initiator mints an ack
//! token, publishes a command on the connection's channel, and awaits the
//! ack on `ack.<token>` with a timeout. A timeout means "outcome unknown",
//! not "failed".

pub mod backplane;
pub mod channels;
pub mod clients;
pub mod cluster;
pub mod config;
pub mod envelope;
pub mod error;
pub mod lifecycle;
pub mod lifetime;
pub mod memory;
pub mod router;

pub use backplane::{Backplane, Subscription};
pub use channels::ChannelNames;
pub use clients::{CallerClients, CallerScoped, Clients, HubClients};
pub use cluster::ClusterLifetimeManager;
pub use config::ClusterConfig;
pub use envelope::{BroadcastEnvelope, ChannelMessage, GroupAck, GroupCommand, GroupOp, TargetKind};
pub use error::{BackplaneError, ClusterError, ClusterResult};
pub use lifetime::{HubLifetimeManager, SendOutcome};
pub use memory::InMemoryBackplane;
pub use router::LocalLifetimeManager;
