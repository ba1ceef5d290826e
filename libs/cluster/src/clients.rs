//! Client-addressing capabilities layered over a lifetime manager.
//!
//! Two capabilities, composed rather than inherited: `HubClients` can
//! address connections, groups, and users; `CallerClients` adds the
//! caller-relative targets and only exists while handling an invocation
//! from a known connection.

use crate::error::ClusterResult;
use crate::lifetime::{HubLifetimeManager, SendOutcome};
use async_trait::async_trait;
use hub_types::{ConnectionId, HubMessage, SendTarget};
use std::sync::Arc;

/// Capability to address connections, groups, and users.
#[async_trait]
pub trait HubClients: Send + Sync {
    /// Deliver `message` to every connection `target` resolves to.
    async fn send_to(&self, target: SendTarget, message: &HubMessage)
        -> ClusterResult<SendOutcome>;

    async fn all(&self, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::All, message).await
    }

    async fn all_except(
        &self,
        excluded: Vec<ConnectionId>,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::AllExcept(excluded), message).await
    }

    async fn client(
        &self,
        id: ConnectionId,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::Connection(id), message).await
    }

    async fn clients(
        &self,
        ids: Vec<ConnectionId>,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::Connections(ids), message).await
    }

    async fn group(&self, name: &str, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::group(name), message).await
    }

    async fn groups(&self, names: Vec<String>, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::Groups(names), message).await
    }

    async fn group_except(
        &self,
        name: &str,
        excluded: Vec<ConnectionId>,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::group_except(name, excluded), message)
            .await
    }

    async fn user(&self, id: &str, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::user(id), message).await
    }

    async fn users(&self, ids: Vec<String>, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::Users(ids), message).await
    }
}

/// Caller-scoped capability: everything `HubClients` can do, plus the
/// targets defined relative to the invoking connection.
#[async_trait]
pub trait CallerClients: HubClients {
    fn caller_id(&self) -> &ConnectionId;

    async fn caller(&self, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::Caller(self.caller_id().clone()), message)
            .await
    }

    async fn others(&self, message: &HubMessage) -> ClusterResult<SendOutcome> {
        self.send_to(SendTarget::Others(self.caller_id().clone()), message)
            .await
    }

    async fn others_in_group(
        &self,
        name: &str,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.send_to(
            SendTarget::others_in_group(name, self.caller_id().clone()),
            message,
        )
        .await
    }
}

/// `HubClients` over any lifetime manager.
pub struct Clients<M: HubLifetimeManager + ?Sized> {
    manager: Arc<M>,
}

impl<M: HubLifetimeManager + ?Sized> Clients<M> {
    pub fn new(manager: Arc<M>) -> Self {
        Self { manager }
    }

    /// Scope this capability to the connection handling an invocation.
    pub fn for_caller(&self, caller: ConnectionId) -> CallerScoped<M> {
        CallerScoped {
            manager: Arc::clone(&self.manager),
            caller,
        }
    }
}

#[async_trait]
impl<M: HubLifetimeManager + ?Sized> HubClients for Clients<M> {
    async fn send_to(
        &self,
        target: SendTarget,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.manager.send(&target, message).await
    }
}

/// `CallerClients` bound to one invoking connection.
pub struct CallerScoped<M: HubLifetimeManager + ?Sized> {
    manager: Arc<M>,
    caller: ConnectionId,
}

#[async_trait]
impl<M: HubLifetimeManager + ?Sized> HubClients for CallerScoped<M> {
    async fn send_to(
        &self,
        target: SendTarget,
        message: &HubMessage,
    ) -> ClusterResult<SendOutcome> {
        self.manager.send(&target, message).await
    }
}

#[async_trait]
impl<M: HubLifetimeManager + ?Sized> CallerClients for CallerScoped<M> {
    fn caller_id(&self) -> &ConnectionId {
        &self.caller
    }
}
