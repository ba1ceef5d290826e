//! # Hub Codec - Wire Protocol Framing and Parsing
//!
//! ## Purpose
//!
//! This crate is the "rules" layer between raw transport bytes and the
//! typed message model in `hub-types`:
//! - Protocol encoding/decoding behind the `HubProtocol` trait
//! - Incremental parsing over growing buffers (partial network reads)
//! - Invocation argument binding against declared method signatures
//! - Handshake framing and protocol negotiation
//!
//! ## Parsing Contract
//!
//! `HubProtocol::try_parse` consumes exactly one logical message per call
//! and reports how many bytes it consumed, so a read loop can feed an
//! accumulating buffer without re-parsing. "Need more data" is `Ok(None)`,
//! never an error; a hard parse failure is a `CodecError` and should close
//! the offending connection.
//!
//! ## What This Crate Contains
//! - **JsonHubProtocol**: text protocol, 0x1e-delimited JSON records
//! - **InvocationBinder**: method-name → parameter-type lookup
//! - **ProtocolResolver**: handshake-time (name, version) → codec
//! - **CodecError**: parse/version/binding error taxonomy

pub mod binder;
pub mod error;
pub mod handshake;
pub mod json;
pub mod protocol;
pub mod resolver;

pub use binder::{InvocationBinder, NullBinder, ParameterType, StaticBinder};
pub use error::{CodecError, CodecResult};
pub use handshake::{parse_handshake_request, parse_handshake_response, write_handshake_response};
pub use json::JsonHubProtocol;
pub use protocol::{HubProtocol, TransferFormat};
pub use resolver::ProtocolResolver;

/// Record separator byte terminating every text-protocol record.
pub const RECORD_SEPARATOR: u8 = 0x1e;
