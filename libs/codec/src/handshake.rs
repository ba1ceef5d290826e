//! Handshake framing.
//!
//! Handshake records use the same 0x1e record framing as the text protocol
//! and are exchanged before any hub message. The server parses exactly one
//! request off the front of the connection's buffer, resolves a protocol,
//! and writes one response.

use crate::error::{CodecError, CodecResult};
use crate::json::split_record;
use crate::RECORD_SEPARATOR;
use bytes::{BufMut, BytesMut};
use hub_types::{HandshakeRequest, HandshakeResponse};

/// Parse one handshake request, reporting consumed length.
///
/// `Ok(None)` means the record is not complete yet.
pub fn parse_handshake_request(input: &[u8]) -> CodecResult<Option<(HandshakeRequest, usize)>> {
    let Some((record, consumed)) = split_record(input) else {
        return Ok(None);
    };
    let request: HandshakeRequest = serde_json::from_slice(record)
        .map_err(|e| CodecError::handshake(format!("invalid handshake request: {}", e)))?;
    Ok(Some((request, consumed)))
}

/// Parse one handshake response (client side of the exchange).
pub fn parse_handshake_response(input: &[u8]) -> CodecResult<Option<(HandshakeResponse, usize)>> {
    let Some((record, consumed)) = split_record(input) else {
        return Ok(None);
    };
    let response: HandshakeResponse = serde_json::from_slice(record)
        .map_err(|e| CodecError::handshake(format!("invalid handshake response: {}", e)))?;
    Ok(Some((response, consumed)))
}

/// Append the framed wire form of a handshake response.
pub fn write_handshake_response(
    response: &HandshakeResponse,
    output: &mut BytesMut,
) -> CodecResult<()> {
    let encoded = serde_json::to_vec(response)
        .map_err(|e| CodecError::handshake(format!("serialization failed: {}", e)))?;
    output.reserve(encoded.len() + 1);
    output.put_slice(&encoded);
    output.put_u8(RECORD_SEPARATOR);
    Ok(())
}
