//! # Hub Types - Message Model and Targeting Expressions
//!
//! ## Purpose
//!
//! Pure data structures shared by every layer of the messaging core:
//! the closed set of hub message variants exchanged with clients, the
//! handshake messages that precede them, and the immutable targeting
//! expressions application code uses to address connections.
//!
//! ## Architecture Role
//!
//! ```text
//! hub-types → hub-codec → hub-registry → hub-cluster
//!     ↑           ↓            ↓             ↓
//! Pure Data   Wire Format  Local State   Cluster Fan-Out
//! HubMessage  Framing      Connections   Backplane Routing
//! SendTarget  Parsing      Groups        Envelopes
//! ```
//!
//! This crate performs no I/O and holds no state. Everything here is a
//! value type constructed per call and passed by reference or clone.

pub mod handshake;
pub mod message;
pub mod target;

pub use handshake::{HandshakeRequest, HandshakeResponse};
pub use message::{HubMessage, MessageType};
pub use target::SendTarget;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a client connection.
///
/// Globally unique, generated by the accepting server at connect time.
/// Never reused within a cluster's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
