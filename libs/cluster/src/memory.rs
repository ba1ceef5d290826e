//! In-memory backplane.
//!
//! Fan-out over unbounded channels, suitable for single-process
//! deployments spanning multiple lifetime managers and for tests. A fault
//! toggle simulates an outage so callers can exercise the
//! fail-fast-then-resubscribe path.

use crate::backplane::{Backplane, Subscription};
use crate::error::BackplaneError;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryBackplane {
    channels: DashMap<String, Vec<mpsc::UnboundedSender<Bytes>>>,
    down: AtomicBool,
}

impl InMemoryBackplane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every publish/subscribe fails until restored.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::Release);
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::Acquire)
    }

    /// Number of live subscribers on a channel (dead ones pruned).
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get_mut(channel)
            .map(|mut senders| {
                senders.retain(|s| !s.is_closed());
                senders.len()
            })
            .unwrap_or(0)
    }

    fn check_up(&self) -> Result<(), BackplaneError> {
        if self.is_down() {
            return Err(BackplaneError::unavailable("in-memory backplane is down"));
        }
        Ok(())
    }
}

#[async_trait]
impl Backplane for InMemoryBackplane {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BackplaneError> {
        self.check_up()?;
        if let Some(mut senders) = self.channels.get_mut(channel) {
            senders.retain(|sender| sender.send(payload.clone()).is_ok());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BackplaneError> {
        self.check_up()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.entry(channel.to_string()).or_default().push(tx);
        debug!(channel, "backplane subscription added");
        Ok(Subscription::new(channel, rx))
    }
}
