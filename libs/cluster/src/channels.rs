//! Backplane channel naming.
//!
//! A small fixed set of logical channels, each with a name any server can
//! compute from the target kind and key alone — no directory lookups. The
//! prefix isolates clusters that share one physical backplane.

use hub_types::ConnectionId;

/// Deterministic channel-name builder.
#[derive(Debug, Clone)]
pub struct ChannelNames {
    prefix: String,
}

impl ChannelNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Channel every server subscribes to.
    pub fn all(&self) -> String {
        format!("{}:all", self.prefix)
    }

    /// Channel owned by the server holding `id`.
    pub fn connection(&self, id: &ConnectionId) -> String {
        format!("{}:connection.{}", self.prefix, id)
    }

    /// Channel subscribed by every server with local members of the group.
    pub fn group(&self, name: &str) -> String {
        format!("{}:group.{}", self.prefix, name)
    }

    /// Channel subscribed by every server with local connections of the user.
    pub fn user(&self, id: &str) -> String {
        format!("{}:user.{}", self.prefix, id)
    }

    /// Per-token ack channel, subscribed only by the operation initiator.
    pub fn ack(&self, token: &str) -> String {
        format!("{}:ack.{}", self.prefix, token)
    }
}
