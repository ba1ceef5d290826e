//! Protocol resolution at handshake time.

use crate::error::{CodecError, CodecResult};
use crate::protocol::HubProtocol;
use hub_types::HandshakeRequest;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of wire codecs, keyed by protocol name.
///
/// The transport layer hands the parsed handshake request here and writes
/// back a success or error response depending on the outcome.
#[derive(Default)]
pub struct ProtocolResolver {
    protocols: HashMap<&'static str, Arc<dyn HubProtocol>>,
}

impl ProtocolResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: Arc<dyn HubProtocol>) -> Self {
        self.protocols.insert(protocol.name(), protocol);
        self
    }

    /// Resolve the codec for a handshake request.
    ///
    /// Unknown names and unsupported versions are distinct failures so the
    /// handshake response can say which was wrong.
    pub fn resolve(&self, request: &HandshakeRequest) -> CodecResult<Arc<dyn HubProtocol>> {
        let protocol = self
            .protocols
            .get(request.protocol.as_str())
            .ok_or_else(|| {
                CodecError::handshake(format!("unknown protocol '{}'", request.protocol))
            })?;
        if !protocol.is_version_supported(request.version) {
            return Err(CodecError::unsupported_version(request.version));
        }
        debug!(
            protocol = protocol.name(),
            version = request.version,
            "resolved hub protocol"
        );
        Ok(Arc::clone(protocol))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.protocols.keys().copied().collect()
    }
}
