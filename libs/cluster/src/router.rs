//! Local target resolution and single-process fan-out.
//!
//! Resolution rules here are the observable contract for every deployment
//! shape; the cluster manager reuses them verbatim when it re-delivers a
//! relayed envelope against its own registry.

use crate::error::ClusterResult;
use crate::lifetime::{HubLifetimeManager, SendOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use hub_codec::HubProtocol;
use hub_registry::{ConnectionRegistry, HubConnection};
use hub_types::{ConnectionId, HubMessage, SendTarget};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolve a target expression to the matching local connections.
///
/// Unknown connection ids are silently skipped: a connection may have
/// disconnected between target construction and delivery, and in a
/// cluster its matches may simply live on another server.
pub fn resolve_local(
    registry: &ConnectionRegistry,
    target: &SendTarget,
) -> Vec<Arc<HubConnection>> {
    match target {
        SendTarget::All => registry.all_connections(),
        SendTarget::AllExcept(excluded) => {
            let excluded: HashSet<_> = excluded.iter().collect();
            registry
                .all_connections()
                .into_iter()
                .filter(|conn| !excluded.contains(conn.id()))
                .collect()
        }
        SendTarget::Connection(id) => registry.get(id).into_iter().collect(),
        SendTarget::Connections(ids) => {
            ids.iter().filter_map(|id| registry.get(id)).collect()
        }
        SendTarget::Group(name) => connections_by_id(registry, registry.members_of(name)),
        SendTarget::Groups(names) => {
            let mut ids = HashSet::new();
            for name in names {
                ids.extend(registry.members_of(name));
            }
            connections_by_id(registry, ids)
        }
        SendTarget::GroupExcept(name, excluded) => {
            let excluded: HashSet<_> = excluded.iter().collect();
            let members = registry
                .members_of(name)
                .into_iter()
                .filter(|id| !excluded.contains(id));
            connections_by_id(registry, members)
        }
        SendTarget::User(user) => connections_by_id(registry, registry.connections_for_user(user)),
        SendTarget::Users(users) => {
            let mut ids = HashSet::new();
            for user in users {
                ids.extend(registry.connections_for_user(user));
            }
            connections_by_id(registry, ids)
        }
        SendTarget::Caller(id) => registry.get(id).into_iter().collect(),
        SendTarget::Others(caller) => registry
            .all_connections()
            .into_iter()
            .filter(|conn| conn.id() != caller)
            .collect(),
        SendTarget::OthersInGroup(name, caller) => {
            let members = registry
                .members_of(name)
                .into_iter()
                .filter(|id| id != caller);
            connections_by_id(registry, members)
        }
    }
}

fn connections_by_id(
    registry: &ConnectionRegistry,
    ids: impl IntoIterator<Item = ConnectionId>,
) -> Vec<Arc<HubConnection>> {
    ids.into_iter().filter_map(|id| registry.get(&id)).collect()
}

/// Write one serialized message to every connection concurrently.
///
/// Writes are independent: a slow or broken sink neither delays nor
/// aborts delivery to the other recipients.
pub async fn deliver(connections: &[Arc<HubConnection>], payload: Bytes) -> SendOutcome {
    let writes = connections
        .iter()
        .map(|conn| conn.write_raw(payload.clone()));
    let mut outcome = SendOutcome::default();
    for (conn, result) in connections.iter().zip(join_all(writes).await) {
        match result {
            Ok(()) => outcome.record_success(),
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "delivery failed");
                outcome.record_failure();
            }
        }
    }
    outcome
}

/// Lifetime manager for a single-process deployment: no backplane, every
/// target resolves entirely against the local registry.
pub struct LocalLifetimeManager {
    registry: Arc<ConnectionRegistry>,
    protocol: Arc<dyn HubProtocol>,
}

impl LocalLifetimeManager {
    pub fn new(registry: Arc<ConnectionRegistry>, protocol: Arc<dyn HubProtocol>) -> Self {
        Self { registry, protocol }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

#[async_trait]
impl HubLifetimeManager for LocalLifetimeManager {
    async fn on_connected(&self, connection: Arc<HubConnection>) -> ClusterResult<()> {
        self.registry.add(connection);
        Ok(())
    }

    async fn on_disconnected(&self, id: &ConnectionId) -> ClusterResult<()> {
        self.registry.remove(id);
        Ok(())
    }

    async fn send(&self, target: &SendTarget, message: &HubMessage) -> ClusterResult<SendOutcome> {
        let payload = self.protocol.to_bytes(message)?;
        let recipients = resolve_local(&self.registry, target);
        debug!(
            target = %target.target_string(),
            recipients = recipients.len(),
            "local send"
        );
        Ok(deliver(&recipients, payload).await)
    }

    async fn add_to_group(
        &self,
        id: &ConnectionId,
        group: &str,
        _timeout: Duration,
    ) -> ClusterResult<()> {
        self.registry.add_to_group(id, group);
        Ok(())
    }

    async fn remove_from_group(
        &self,
        id: &ConnectionId,
        group: &str,
        _timeout: Duration,
    ) -> ClusterResult<()> {
        self.registry.remove_from_group(id, group);
        Ok(())
    }
}
