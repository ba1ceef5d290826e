//! The lifetime-manager trait: connection lifecycle, send fan-out, and
//! group membership, behind one seam so single-process and clustered
//! deployments are interchangeable.

use crate::error::ClusterResult;
use async_trait::async_trait;
use hub_registry::HubConnection;
use hub_types::{ConnectionId, HubMessage, SendTarget};
use std::sync::Arc;
use std::time::Duration;

/// Aggregate result of one send fan-out.
///
/// Reports whether any per-connection writes failed without naming which;
/// individual failures never abort delivery to the remaining recipients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOutcome {
    pub delivered: usize,
    pub failed: usize,
}

impl SendOutcome {
    pub fn record_success(&mut self) {
        self.delivered += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn recipients(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Manages connection lifetime, message fan-out, and group membership for
/// one server process.
#[async_trait]
pub trait HubLifetimeManager: Send + Sync {
    /// Register a newly accepted connection.
    async fn on_connected(&self, connection: Arc<HubConnection>) -> ClusterResult<()>;

    /// Remove a disconnected connection and purge its memberships.
    async fn on_disconnected(&self, id: &ConnectionId) -> ClusterResult<()>;

    /// Deliver `message` to every connection the target resolves to.
    ///
    /// The outcome covers local recipients only; remote delivery happens
    /// asynchronously on the servers owning the remote connections.
    async fn send(&self, target: &SendTarget, message: &HubMessage) -> ClusterResult<SendOutcome>;

    /// Add a connection (local or remote) to a group.
    ///
    /// Local connections complete immediately; remote ones are ack-
    /// correlated and bounded by `timeout`.
    async fn add_to_group(
        &self,
        id: &ConnectionId,
        group: &str,
        timeout: Duration,
    ) -> ClusterResult<()>;

    /// Remove a connection from a group; a non-member remove succeeds as a
    /// no-op.
    async fn remove_from_group(
        &self,
        id: &ConnectionId,
        group: &str,
        timeout: Duration,
    ) -> ClusterResult<()>;
}
