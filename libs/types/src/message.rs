//! Hub message model.
//!
//! The closed set of message variants a hub protocol frames onto the wire.
//! Wire representation (field names, numeric type tags, framing) is owned
//! by `hub-codec`; these types only carry the decoded content.
//!
//! Invariant: `invocation_id`, where present, is unique per outstanding
//! call on a given connection for the lifetime of that call.

use serde_json::Value;

/// Numeric message type tags, stable across protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Invocation = 1,
    StreamItem = 2,
    Completion = 3,
    StreamInvocation = 4,
    CancelInvocation = 5,
    Ping = 6,
    Close = 7,
}

impl MessageType {
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            1 => Some(Self::Invocation),
            2 => Some(Self::StreamItem),
            3 => Some(Self::Completion),
            4 => Some(Self::StreamInvocation),
            5 => Some(Self::CancelInvocation),
            6 => Some(Self::Ping),
            7 => Some(Self::Close),
            _ => None,
        }
    }
}

/// A single protocol-level message exchanged with a client.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Invoke a method on the receiver, optionally expecting a completion.
    Invocation {
        /// Absent for fire-and-forget invocations.
        invocation_id: Option<String>,
        /// Target method name.
        target: String,
        /// Ordered, protocol-encoded argument values.
        arguments: Vec<Value>,
        /// Ids of client-to-server streams feeding this invocation.
        stream_ids: Vec<String>,
    },

    /// Invoke a streaming method; results arrive as `StreamItem`s.
    StreamInvocation {
        invocation_id: String,
        target: String,
        arguments: Vec<Value>,
        stream_ids: Vec<String>,
    },

    /// One item produced by an active stream invocation.
    StreamItem { invocation_id: String, item: Value },

    /// Terminates an invocation, carrying either an error or a result.
    ///
    /// `result: Some(Value::Null)` is a present-but-null result;
    /// `result: None` means the invocation completed without one.
    /// `error` and `result` are never both set.
    Completion {
        invocation_id: String,
        error: Option<String>,
        result: Option<Value>,
    },

    /// Cancels an in-flight stream invocation.
    CancelInvocation { invocation_id: String },

    /// Keep-alive, no payload.
    Ping,

    /// Terminates the connection.
    Close {
        error: Option<String>,
        /// Whether the client should attempt to reconnect.
        allow_reconnect: bool,
    },
}

impl HubMessage {
    /// Wire-level type tag for this variant.
    pub fn message_type(&self) -> MessageType {
        match self {
            HubMessage::Invocation { .. } => MessageType::Invocation,
            HubMessage::StreamItem { .. } => MessageType::StreamItem,
            HubMessage::Completion { .. } => MessageType::Completion,
            HubMessage::StreamInvocation { .. } => MessageType::StreamInvocation,
            HubMessage::CancelInvocation { .. } => MessageType::CancelInvocation,
            HubMessage::Ping => MessageType::Ping,
            HubMessage::Close { .. } => MessageType::Close,
        }
    }

    /// Build a fire-and-forget invocation (no completion expected).
    pub fn invocation(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        HubMessage::Invocation {
            invocation_id: None,
            target: target.into(),
            arguments,
            stream_ids: Vec::new(),
        }
    }

    /// Build a completion carrying a result value.
    pub fn completion_result(invocation_id: impl Into<String>, result: Value) -> Self {
        HubMessage::Completion {
            invocation_id: invocation_id.into(),
            error: None,
            result: Some(result),
        }
    }

    /// Build a completion carrying an error description.
    pub fn completion_error(invocation_id: impl Into<String>, error: impl Into<String>) -> Self {
        HubMessage::Completion {
            invocation_id: invocation_id.into(),
            error: Some(error.into()),
            result: None,
        }
    }

    /// Whether a completion carries a result value (including null).
    pub fn has_result(&self) -> bool {
        matches!(
            self,
            HubMessage::Completion {
                result: Some(_),
                ..
            }
        )
    }
}
