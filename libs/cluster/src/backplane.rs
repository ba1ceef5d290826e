//! The backplane abstraction consumed by the cluster lifetime manager.
//!
//! At-least-once delivery per channel is assumed; ordering is only
//! per-channel, per-publisher. Implementations own reconnection of the
//! physical transport; the lifetime manager owns re-establishing its
//! channel subscriptions afterwards (`resubscribe_all`).

use crate::error::BackplaneError;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use tokio::sync::mpsc;

/// A live subscription to one channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    receiver: mpsc::UnboundedReceiver<Bytes>,
}

impl Subscription {
    pub fn new(channel: impl Into<String>, receiver: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            receiver,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Next payload on the channel, or `None` once the backplane drops the
    /// subscription.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }
}

/// Shared pub/sub transport connecting the servers of a cluster.
#[async_trait]
pub trait Backplane: Send + Sync + Debug {
    /// Publish one payload to every current subscriber of `channel`.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BackplaneError>;

    /// Subscribe to `channel`.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, BackplaneError>;
}
