//! Backplane wire envelopes.
//!
//! Everything that crosses the backplane is one of these serde structs,
//! encoded as JSON. `ChannelMessage` travels on the all/connection/group/
//! user channels; `GroupAck` travels on per-token ack channels.

use crate::error::{ClusterError, ClusterResult};
use bytes::Bytes;
use hub_types::ConnectionId;
use serde::{Deserialize, Serialize};

/// Which recipient set a broadcast envelope addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    All,
    Connection,
    Group,
    /// Union of several groups, carried in `keys`; resolved with the same
    /// per-connection dedup as a local multi-group send.
    Groups,
    User,
}

/// A relayed send: every receiving server resolves this against its own
/// registry and writes only to its own matching connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEnvelope {
    /// Server id of the publisher; the publisher ignores its own envelopes
    /// because it already delivered locally.
    pub origin: String,
    pub target: TargetKind,
    /// Group name, user id, or connection id; absent for `All` and `Groups`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key: Option<String>,
    /// Group names for a `Groups` envelope; empty for every other kind.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keys: Vec<String>,
    /// Connection ids excluded from delivery on every server.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub excluded: Vec<ConnectionId>,
    /// The serialized hub message, written to matching sinks verbatim.
    #[serde(with = "payload_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOp {
    Add,
    Remove,
}

/// Group-membership change request, published on the target connection's
/// channel so only the owning server acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCommand {
    /// Ack-correlation token minted by the initiating server.
    pub token: String,
    pub connection_id: ConnectionId,
    pub group: String,
    pub op: GroupOp,
}

/// A message on a broadcast-capable channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelMessage {
    Broadcast(BroadcastEnvelope),
    Group(GroupCommand),
}

/// Ack published on `ack.<token>` by the server that applied a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAck {
    pub token: String,
    pub success: bool,
}

impl ChannelMessage {
    pub fn encode(&self) -> ClusterResult<Bytes> {
        encode(self)
    }

    pub fn decode(bytes: &[u8]) -> ClusterResult<Self> {
        decode(bytes)
    }
}

impl GroupAck {
    pub fn encode(&self) -> ClusterResult<Bytes> {
        encode(self)
    }

    pub fn decode(bytes: &[u8]) -> ClusterResult<Self> {
        decode(bytes)
    }
}

fn encode<T: Serialize>(value: &T) -> ClusterResult<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| ClusterError::envelope(format!("encode failed: {}", e)))
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> ClusterResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| ClusterError::envelope(format!("decode failed: {}", e)))
}

/// Compact base64-free byte encoding: JSON array of integers is wasteful
/// for large payloads, so payload bytes travel as a string of raw latin-1
/// code points.
mod payload_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let as_string: String = bytes.iter().map(|&b| b as char).collect();
        serializer.serialize_str(&as_string)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let as_string = String::deserialize(deserializer)?;
        as_string
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c))
                    .map_err(|_| serde::de::Error::custom("payload code point out of range"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_envelope_round_trips() {
        let envelope = ChannelMessage::Broadcast(BroadcastEnvelope {
            origin: "srv-1".into(),
            target: TargetKind::Group,
            key: Some("g".into()),
            keys: vec![],
            excluded: vec![ConnectionId::from("c1")],
            payload: vec![0x7b, 0x1e, 0xff, 0x00],
        });
        let bytes = envelope.encode().unwrap();
        assert_eq!(ChannelMessage::decode(&bytes).unwrap(), envelope);
    }

    #[test]
    fn multi_group_envelope_carries_the_name_list() {
        let envelope = ChannelMessage::Broadcast(BroadcastEnvelope {
            origin: "srv-1".into(),
            target: TargetKind::Groups,
            key: None,
            keys: vec!["g1".into(), "g2".into()],
            excluded: vec![],
            payload: vec![1],
        });
        let bytes = envelope.encode().unwrap();
        assert_eq!(ChannelMessage::decode(&bytes).unwrap(), envelope);
    }

    #[test]
    fn group_command_round_trips() {
        let command = ChannelMessage::Group(GroupCommand {
            token: "srv-1-7".into(),
            connection_id: ConnectionId::from("c9"),
            group: "traders".into(),
            op: GroupOp::Remove,
        });
        let bytes = command.encode().unwrap();
        assert_eq!(ChannelMessage::decode(&bytes).unwrap(), command);
    }

    #[test]
    fn ack_round_trips() {
        let ack = GroupAck {
            token: "srv-2-3".into(),
            success: true,
        };
        assert_eq!(GroupAck::decode(&ack.encode().unwrap()).unwrap(), ack);
    }

    #[test]
    fn garbage_is_an_envelope_error() {
        assert!(matches!(
            ChannelMessage::decode(b"not json"),
            Err(ClusterError::Envelope { .. })
        ));
    }

    #[test]
    fn all_broadcast_omits_key() {
        let envelope = ChannelMessage::Broadcast(BroadcastEnvelope {
            origin: "srv-1".into(),
            target: TargetKind::All,
            key: None,
            keys: vec![],
            excluded: vec![],
            payload: vec![1],
        });
        let text = String::from_utf8(envelope.encode().unwrap().to_vec()).unwrap();
        assert!(!text.contains("\"key\""));
        assert!(!text.contains("\"excluded\""));
    }
}
