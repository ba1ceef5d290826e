//! Handshake messages exchanged before any hub message.
//!
//! The client opens with a `HandshakeRequest` naming the protocol it wants
//! to speak; the server answers with a `HandshakeResponse` that is empty on
//! success or carries an error description on rejection. Framing is the
//! same record framing the negotiated protocol uses and lives in
//! `hub-codec`.

use serde::{Deserialize, Serialize};

/// Client request to negotiate a hub protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Protocol name, e.g. `"json"`.
    pub protocol: String,
    /// Protocol version the client intends to speak.
    pub version: i32,
}

/// Server reply to a handshake request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Populated when negotiation failed; the connection closes after.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandshakeRequest {
    pub fn new(protocol: impl Into<String>, version: i32) -> Self {
        Self {
            protocol: protocol.into(),
            version,
        }
    }
}

impl HandshakeResponse {
    /// Successful negotiation: empty response.
    pub fn ok() -> Self {
        Self { error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
