//! The `HubProtocol` trait: the contract every wire codec implements.

use crate::binder::InvocationBinder;
use crate::error::CodecResult;
use bytes::{Bytes, BytesMut};
use hub_types::HubMessage;

/// Whether a protocol's wire form is text or binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFormat {
    Text,
    Binary,
}

/// A wire codec for hub messages.
///
/// Implementations must be stateless with respect to the byte stream: all
/// buffering is the caller's, and `try_parse` reports consumed length so
/// the caller can advance its buffer.
pub trait HubProtocol: Send + Sync + std::fmt::Debug {
    /// Stable protocol name used during handshake resolution.
    fn name(&self) -> &'static str;

    /// Protocol version this codec speaks.
    fn version(&self) -> i32;

    fn transfer_format(&self) -> TransferFormat;

    fn is_version_supported(&self, version: i32) -> bool;

    /// Parse at most one message from the front of `input`.
    ///
    /// Returns `Ok(Some((message, consumed)))` on success, `Ok(None)` when
    /// no complete record is buffered yet, and `Err` on malformed input.
    /// `consumed` counts every byte of the record including its framing.
    fn try_parse(
        &self,
        input: &[u8],
        binder: &dyn InvocationBinder,
    ) -> CodecResult<Option<(HubMessage, usize)>>;

    /// Append the framed wire form of `message` to `output`.
    ///
    /// Must be deterministic: the same message always yields the same
    /// bytes, so conformance tests can compare encodings directly.
    fn write_message(&self, message: &HubMessage, output: &mut BytesMut) -> CodecResult<()>;

    /// Convenience: the framed wire form as a standalone buffer.
    fn to_bytes(&self, message: &HubMessage) -> CodecResult<Bytes> {
        let mut buf = BytesMut::new();
        self.write_message(message, &mut buf)?;
        Ok(buf.freeze())
    }
}
