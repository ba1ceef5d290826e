//! Backplane-backed lifetime manager.
//!
//! Each server resolves every send against its own registry and writes
//! only to connections it owns; the backplane relays envelopes so peers
//! do the same. Group-membership changes for non-local connections are
//! ack-correlated commands on the owning connection's channel.
//!
//! Subscription map invariants: one task per channel; `connection.<id>`
//! lives exactly as long as the local connection, `group.<name>` while the
//! group has local members, `user.<id>` while the user has local
//! connections, and `all` for the manager's lifetime.

use crate::backplane::{Backplane, Subscription};
use crate::channels::ChannelNames;
use crate::config::ClusterConfig;
use crate::envelope::{
    BroadcastEnvelope, ChannelMessage, GroupAck, GroupCommand, GroupOp, TargetKind,
};
use crate::error::{BackplaneError, ClusterError, ClusterResult};
use crate::lifecycle::Lifecycle;
use crate::lifetime::{HubLifetimeManager, SendOutcome};
use crate::router::{deliver, resolve_local};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use hub_codec::HubProtocol;
use hub_registry::{ConnectionRegistry, HubConnection};
use hub_types::{ConnectionId, HubMessage, SendTarget};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct ClusterLifetimeManager {
    server_id: String,
    registry: Arc<ConnectionRegistry>,
    protocol: Arc<dyn HubProtocol>,
    backplane: Arc<dyn Backplane>,
    channels: ChannelNames,
    ack_timeout: Duration,
    max_message_size: usize,
    ack_seq: AtomicU64,
    /// channel name → subscriber task.
    subscriptions: DashMap<String, JoinHandle<()>>,
    /// Couples every registry mutation to its subscription update: a
    /// membership change and the subscribe/unsubscribe it implies commit
    /// together, so the subscription map never lags the registry. Rare,
    /// never on the per-message path.
    sub_lock: Mutex<()>,
    lifecycle: Lifecycle,
    /// Weak self-handle captured by subscriber tasks, so tasks never keep
    /// a disposed manager alive.
    self_ref: OnceLock<Weak<ClusterLifetimeManager>>,
}

impl ClusterLifetimeManager {
    /// Construct the manager and subscribe to the all-servers channel.
    pub async fn start(
        config: &ClusterConfig,
        registry: Arc<ConnectionRegistry>,
        protocol: Arc<dyn HubProtocol>,
        backplane: Arc<dyn Backplane>,
    ) -> ClusterResult<Arc<Self>> {
        let manager = Arc::new(Self {
            server_id: config.generate_server_id(),
            registry,
            protocol,
            backplane,
            channels: config.channel_names(),
            ack_timeout: config.ack_timeout(),
            max_message_size: config.max_message_size,
            ack_seq: AtomicU64::new(0),
            subscriptions: DashMap::new(),
            sub_lock: Mutex::new(()),
            lifecycle: Lifecycle::new(),
            self_ref: OnceLock::new(),
        });
        let _ = manager.self_ref.set(Arc::downgrade(&manager));
        manager.subscribe_channel(manager.channels.all()).await?;
        info!(server_id = %manager.server_id, "cluster lifetime manager started");
        Ok(manager)
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Record the authenticated user for a local connection, subscribing
    /// the user channel on the user's first local connection.
    pub async fn set_user(&self, id: &ConnectionId, user: &str) -> ClusterResult<()> {
        self.lifecycle.ensure_active()?;
        let _guard = self.sub_lock.lock().await;
        if self.registry.set_user(id, user) {
            self.subscribe_channel(self.channels.user(user)).await?;
        }
        Ok(())
    }

    /// Re-establish every tracked channel subscription.
    ///
    /// Must run after a backplane outage ends, before ack-correlated
    /// operations resume; subscriptions on the old transport session are
    /// gone even though the channel names are unchanged.
    pub async fn resubscribe_all(&self) -> ClusterResult<()> {
        self.lifecycle.ensure_active()?;
        let _guard = self.sub_lock.lock().await;
        let channels: Vec<String> = self
            .subscriptions
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for channel in &channels {
            if let Some((_, task)) = self.subscriptions.remove(channel) {
                task.abort();
            }
            self.subscribe_channel(channel.clone()).await?;
        }
        info!(count = channels.len(), "resubscribed backplane channels");
        Ok(())
    }

    /// Stop all subscriber tasks; every later operation fails with
    /// `Disposed`.
    pub fn dispose(&self) {
        if !self.lifecycle.dispose() {
            return;
        }
        for entry in self.subscriptions.iter() {
            entry.value().abort();
        }
        self.subscriptions.clear();
        info!(server_id = %self.server_id, "cluster lifetime manager disposed");
    }

    async fn subscribe_channel(&self, channel: String) -> ClusterResult<()> {
        if self.subscriptions.contains_key(&channel) {
            return Ok(());
        }
        let subscription = self.backplane.subscribe(&channel).await?;
        debug!(channel = %channel, "subscribed backplane channel");
        let task = self.spawn_subscriber(subscription);
        self.subscriptions.insert(channel, task);
        Ok(())
    }

    fn unsubscribe_channel(&self, channel: &str) {
        if let Some((_, task)) = self.subscriptions.remove(channel) {
            task.abort();
            debug!(channel, "unsubscribed backplane channel");
        }
    }

    fn spawn_subscriber(&self, mut subscription: Subscription) -> JoinHandle<()> {
        let weak = self
            .self_ref
            .get()
            .cloned()
            .unwrap_or_else(Weak::new);
        tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                let Some(manager) = weak.upgrade() else { break };
                manager.handle_channel_payload(&payload).await;
            }
        })
    }

    async fn handle_channel_payload(&self, payload: &Bytes) {
        match ChannelMessage::decode(payload) {
            Ok(ChannelMessage::Broadcast(envelope)) => {
                self.handle_broadcast(envelope).await;
            }
            Ok(ChannelMessage::Group(command)) => {
                self.handle_group_command(command).await;
            }
            Err(e) => warn!(error = %e, "dropping undecodable backplane message"),
        }
    }

    async fn handle_broadcast(&self, envelope: BroadcastEnvelope) {
        if envelope.origin == self.server_id {
            // Already delivered locally before publishing.
            return;
        }
        if envelope.payload.len() > self.max_message_size {
            warn!(
                origin = %envelope.origin,
                size = envelope.payload.len(),
                "dropping oversized relayed payload"
            );
            return;
        }
        let Some(target) = envelope_target(&envelope) else {
            warn!(origin = %envelope.origin, "broadcast envelope missing target key");
            return;
        };
        let recipients = resolve_local(&self.registry, &target);
        if recipients.is_empty() {
            return;
        }
        let outcome = deliver(&recipients, Bytes::from(envelope.payload)).await;
        debug!(
            origin = %envelope.origin,
            target = %target.target_string(),
            delivered = outcome.delivered,
            failed = outcome.failed,
            "relayed broadcast delivered"
        );
    }

    async fn handle_group_command(&self, command: GroupCommand) {
        // Commands arrive on connection channels, so a non-local id means
        // the connection disconnected after the command was published.
        if !self.registry.contains(&command.connection_id) {
            debug!(connection = %command.connection_id, "group command for departed connection");
            return;
        }
        let result = match command.op {
            GroupOp::Add => {
                self.apply_local_add(&command.connection_id, &command.group)
                    .await
            }
            GroupOp::Remove => {
                self.apply_local_remove(&command.connection_id, &command.group)
                    .await
            }
        };
        if let Err(e) = result {
            warn!(error = %e, group = %command.group, "group command failed");
            return;
        }
        let ack = GroupAck {
            token: command.token.clone(),
            success: true,
        };
        let publish = async {
            self.backplane
                .publish(&self.channels.ack(&command.token), ack.encode()?)
                .await
                .map_err(ClusterError::from)
        };
        if let Err(e) = publish.await {
            warn!(error = %e, token = %command.token, "failed to publish group ack");
        }
    }

    async fn apply_local_add(&self, id: &ConnectionId, group: &str) -> ClusterResult<()> {
        let _guard = self.sub_lock.lock().await;
        let update = self.registry.add_to_group(id, group);
        if update.applied && update.local_members == 1 {
            self.subscribe_channel(self.channels.group(group)).await?;
        }
        Ok(())
    }

    async fn apply_local_remove(&self, id: &ConnectionId, group: &str) -> ClusterResult<()> {
        let _guard = self.sub_lock.lock().await;
        let update = self.registry.remove_from_group(id, group);
        if update.applied && update.local_members == 0 {
            self.unsubscribe_channel(&self.channels.group(group));
        }
        Ok(())
    }

    /// Ack-correlated group operation for a connection owned elsewhere.
    async fn remote_group_op(
        &self,
        id: &ConnectionId,
        group: &str,
        op: GroupOp,
        timeout: Duration,
    ) -> ClusterResult<()> {
        let token = format!(
            "{}-{}",
            self.server_id,
            self.ack_seq.fetch_add(1, Ordering::Relaxed)
        );
        // Subscribe the ack channel before publishing so the ack cannot
        // slip past us.
        let mut acks = self.backplane.subscribe(&self.channels.ack(&token)).await?;
        let command = ChannelMessage::Group(GroupCommand {
            token: token.clone(),
            connection_id: id.clone(),
            group: group.to_string(),
            op,
        });
        self.backplane
            .publish(&self.channels.connection(id), command.encode()?)
            .await?;

        match tokio::time::timeout(timeout, acks.recv()).await {
            Err(_) => {
                debug!(token = %token, "group operation ack timed out");
                Err(ClusterError::AckTimeout { timeout })
            }
            Ok(None) => Err(BackplaneError::Closed.into()),
            Ok(Some(payload)) => {
                let ack = GroupAck::decode(&payload)?;
                if ack.success {
                    Ok(())
                } else {
                    Err(ClusterError::envelope("group operation rejected by owner"))
                }
            }
        }
    }

    async fn publish_broadcast(
        &self,
        channel: String,
        target: TargetKind,
        key: Option<String>,
        excluded: Vec<ConnectionId>,
        payload: &Bytes,
    ) -> ClusterResult<()> {
        let envelope = ChannelMessage::Broadcast(BroadcastEnvelope {
            origin: self.server_id.clone(),
            target,
            key,
            keys: vec![],
            excluded,
            payload: payload.to_vec(),
        });
        self.backplane
            .publish(&channel, envelope.encode()?)
            .await
            .map_err(ClusterError::from)
    }

    /// Relay a multi-group send as one envelope on the all channel. Per-group
    /// channel publishes would hand a member of two targeted groups two
    /// copies; a single envelope lets every server run the same union dedup
    /// as a local resolve.
    async fn publish_groups(&self, names: &[String], payload: &Bytes) -> ClusterResult<()> {
        let envelope = ChannelMessage::Broadcast(BroadcastEnvelope {
            origin: self.server_id.clone(),
            target: TargetKind::Groups,
            key: None,
            keys: names.to_vec(),
            excluded: vec![],
            payload: payload.to_vec(),
        });
        self.backplane
            .publish(&self.channels.all(), envelope.encode()?)
            .await
            .map_err(ClusterError::from)
    }

    /// Relay a send to the rest of the cluster on the channel(s) its
    /// target derives to. `Caller` never leaves this process.
    async fn publish_for_target(&self, target: &SendTarget, payload: &Bytes) -> ClusterResult<()> {
        match target {
            SendTarget::All => {
                self.publish_broadcast(self.channels.all(), TargetKind::All, None, vec![], payload)
                    .await
            }
            SendTarget::AllExcept(excluded) => {
                self.publish_broadcast(
                    self.channels.all(),
                    TargetKind::All,
                    None,
                    excluded.clone(),
                    payload,
                )
                .await
            }
            SendTarget::Connection(id) => self.publish_connection(id, payload).await,
            SendTarget::Connections(ids) => {
                for id in ids {
                    self.publish_connection(id, payload).await?;
                }
                Ok(())
            }
            SendTarget::Group(name) => self.publish_group(name, vec![], payload).await,
            SendTarget::Groups(names) => match names.as_slice() {
                [name] => self.publish_group(name, vec![], payload).await,
                names => self.publish_groups(names, payload).await,
            },
            SendTarget::GroupExcept(name, excluded) => {
                self.publish_group(name, excluded.clone(), payload).await
            }
            SendTarget::User(user) => self.publish_user(user, payload).await,
            SendTarget::Users(users) => {
                // A connection carries at most one user identifier, so
                // per-user publishes never overlap.
                for user in users {
                    self.publish_user(user, payload).await?;
                }
                Ok(())
            }
            SendTarget::Caller(_) => Ok(()),
            SendTarget::Others(caller) => {
                self.publish_broadcast(
                    self.channels.all(),
                    TargetKind::All,
                    None,
                    vec![caller.clone()],
                    payload,
                )
                .await
            }
            SendTarget::OthersInGroup(name, caller) => {
                self.publish_group(name, vec![caller.clone()], payload).await
            }
        }
    }

    async fn publish_connection(&self, id: &ConnectionId, payload: &Bytes) -> ClusterResult<()> {
        // A locally-owned connection was already written to directly; the
        // owner is the only subscriber of its channel, so publishing would
        // only echo back to us.
        if self.registry.contains(id) {
            return Ok(());
        }
        self.publish_broadcast(
            self.channels.connection(id),
            TargetKind::Connection,
            Some(id.to_string()),
            vec![],
            payload,
        )
        .await
    }

    async fn publish_group(
        &self,
        name: &str,
        excluded: Vec<ConnectionId>,
        payload: &Bytes,
    ) -> ClusterResult<()> {
        self.publish_broadcast(
            self.channels.group(name),
            TargetKind::Group,
            Some(name.to_string()),
            excluded,
            payload,
        )
        .await
    }

    async fn publish_user(&self, user: &str, payload: &Bytes) -> ClusterResult<()> {
        self.publish_broadcast(
            self.channels.user(user),
            TargetKind::User,
            Some(user.to_string()),
            vec![],
            payload,
        )
        .await
    }
}

/// Translate a broadcast envelope back into a local target expression.
fn envelope_target(envelope: &BroadcastEnvelope) -> Option<SendTarget> {
    match envelope.target {
        TargetKind::All => Some(if envelope.excluded.is_empty() {
            SendTarget::All
        } else {
            SendTarget::AllExcept(envelope.excluded.clone())
        }),
        TargetKind::Connection => envelope
            .key
            .as_ref()
            .map(|key| SendTarget::Connection(ConnectionId::from(key.clone()))),
        TargetKind::Group => envelope.key.as_ref().map(|key| {
            SendTarget::GroupExcept(key.clone(), envelope.excluded.clone())
        }),
        TargetKind::Groups => Some(SendTarget::Groups(envelope.keys.clone())),
        TargetKind::User => envelope.key.as_ref().map(|key| SendTarget::User(key.clone())),
    }
}

#[async_trait]
impl HubLifetimeManager for ClusterLifetimeManager {
    async fn on_connected(&self, connection: Arc<HubConnection>) -> ClusterResult<()> {
        self.lifecycle.ensure_active()?;
        let id = connection.id().clone();
        let user = connection.user_identifier();

        // Register and subscribe under the same guard: a concurrent
        // disconnect must not observe the connection without its channels.
        let _guard = self.sub_lock.lock().await;
        self.registry.add(connection);
        self.subscribe_channel(self.channels.connection(&id)).await?;
        if let Some(user) = user {
            // Atomic under sub_lock: every user-index mutation holds it.
            if self.registry.connections_for_user(&user).len() == 1 {
                self.subscribe_channel(self.channels.user(&user)).await?;
            }
        }
        Ok(())
    }

    async fn on_disconnected(&self, id: &ConnectionId) -> ClusterResult<()> {
        self.lifecycle.ensure_active()?;
        let _guard = self.sub_lock.lock().await;
        let Some(removed) = self.registry.remove(id) else {
            return Ok(());
        };
        self.unsubscribe_channel(&self.channels.connection(id));
        for group in &removed.emptied_groups {
            self.unsubscribe_channel(&self.channels.group(group));
        }
        if let Some(user) = &removed.emptied_user {
            self.unsubscribe_channel(&self.channels.user(user));
        }
        Ok(())
    }

    async fn send(&self, target: &SendTarget, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.lifecycle.ensure_active()?;
        let payload = self.protocol.to_bytes(message)?;
        if payload.len() > self.max_message_size {
            return Err(ClusterError::MessageTooLarge {
                size: payload.len(),
                limit: self.max_message_size,
            });
        }
        let recipients = resolve_local(&self.registry, target);
        let outcome = deliver(&recipients, payload.clone()).await;
        if !target.is_local_only() {
            self.publish_for_target(target, &payload).await?;
        }
        Ok(outcome)
    }

    async fn add_to_group(
        &self,
        id: &ConnectionId,
        group: &str,
        timeout: Duration,
    ) -> ClusterResult<()> {
        self.lifecycle.ensure_active()?;
        if self.registry.contains(id) {
            return self.apply_local_add(id, group).await;
        }
        self.remote_group_op(id, group, GroupOp::Add, timeout).await
    }

    async fn remove_from_group(
        &self,
        id: &ConnectionId,
        group: &str,
        timeout: Duration,
    ) -> ClusterResult<()> {
        self.lifecycle.ensure_active()?;
        if self.registry.contains(id) {
            return self.apply_local_remove(id, group).await;
        }
        self.remote_group_op(id, group, GroupOp::Remove, timeout)
            .await
    }
}

impl std::fmt::Debug for ClusterLifetimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterLifetimeManager")
            .field("server_id", &self.server_id)
            .field("connections", &self.registry.len())
            .field("subscriptions", &self.subscriptions.len())
            .field("disposed", &self.lifecycle.is_disposed())
            .finish()
    }
}
