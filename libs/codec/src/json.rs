//! JSON text protocol.
//!
//! Each message is one JSON object terminated by the 0x1e record separator.
//! The object carries a numeric `type` tag (see `MessageType`) plus the
//! variant's fields; optional fields are omitted entirely rather than
//! written as null, which keeps `write_message` deterministic.

use crate::binder::InvocationBinder;
use crate::error::{CodecError, CodecResult};
use crate::protocol::{HubProtocol, TransferFormat};
use crate::RECORD_SEPARATOR;
use bytes::{BufMut, BytesMut};
use hub_types::{HubMessage, MessageType};
use serde_json::{Map, Value};

/// Split one separator-terminated record off the front of `input`.
///
/// Returns the record body (without separator) and the total consumed
/// length, or `None` when no separator is buffered yet.
pub(crate) fn split_record(input: &[u8]) -> Option<(&[u8], usize)> {
    let pos = input.iter().position(|&b| b == RECORD_SEPARATOR)?;
    Some((&input[..pos], pos + 1))
}

/// The `"json"` hub protocol, version 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHubProtocol;

impl JsonHubProtocol {
    pub fn new() -> Self {
        Self
    }
}

impl HubProtocol for JsonHubProtocol {
    fn name(&self) -> &'static str {
        "json"
    }

    fn version(&self) -> i32 {
        1
    }

    fn transfer_format(&self) -> TransferFormat {
        TransferFormat::Text
    }

    fn is_version_supported(&self, version: i32) -> bool {
        version == 1
    }

    fn try_parse(
        &self,
        input: &[u8],
        binder: &dyn InvocationBinder,
    ) -> CodecResult<Option<(HubMessage, usize)>> {
        let Some((record, consumed)) = split_record(input) else {
            return Ok(None);
        };

        let value: Value = serde_json::from_slice(record)
            .map_err(|e| CodecError::malformed(format!("invalid JSON record: {}", e)))?;
        let map = value
            .as_object()
            .ok_or_else(|| CodecError::malformed("record is not a JSON object"))?;

        let tag = map
            .get("type")
            .and_then(Value::as_u64)
            .ok_or_else(|| CodecError::malformed("missing or non-numeric 'type'"))?;
        let message_type = MessageType::from_tag(tag)
            .ok_or_else(|| CodecError::malformed(format!("unknown message type tag {}", tag)))?;

        let message = match message_type {
            MessageType::Invocation => {
                let target = required_str(map, "target")?;
                let arguments = arguments_field(map)?;
                bind_arguments(binder, &target, &arguments)?;
                HubMessage::Invocation {
                    invocation_id: optional_str(map, "invocationId")?,
                    target,
                    arguments,
                    stream_ids: string_list(map, "streamIds")?,
                }
            }
            MessageType::StreamInvocation => {
                let target = required_str(map, "target")?;
                let arguments = arguments_field(map)?;
                bind_arguments(binder, &target, &arguments)?;
                HubMessage::StreamInvocation {
                    invocation_id: required_str(map, "invocationId")?,
                    target,
                    arguments,
                    stream_ids: string_list(map, "streamIds")?,
                }
            }
            MessageType::StreamItem => HubMessage::StreamItem {
                invocation_id: required_str(map, "invocationId")?,
                item: map
                    .get("item")
                    .cloned()
                    .ok_or_else(|| CodecError::malformed("StreamItem missing 'item'"))?,
            },
            MessageType::Completion => {
                let invocation_id = required_str(map, "invocationId")?;
                let error = optional_str(map, "error")?;
                let result = map.get("result").cloned();
                if error.is_some() && result.is_some() {
                    return Err(CodecError::malformed(
                        "Completion carries both 'error' and 'result'",
                    ));
                }
                if let (Some(expected), Some(value)) =
                    (binder.return_type(&invocation_id), result.as_ref())
                {
                    if !value.is_null() && !expected.matches_value(value) {
                        return Err(CodecError::binding(
                            &invocation_id,
                            format!("result {:?} does not match expected {:?}", value, expected),
                        ));
                    }
                }
                HubMessage::Completion {
                    invocation_id,
                    error,
                    result,
                }
            }
            MessageType::CancelInvocation => HubMessage::CancelInvocation {
                invocation_id: required_str(map, "invocationId")?,
            },
            MessageType::Ping => HubMessage::Ping,
            MessageType::Close => HubMessage::Close {
                error: optional_str(map, "error")?,
                allow_reconnect: map
                    .get("allowReconnect")
                    .map(|v| {
                        v.as_bool().ok_or_else(|| {
                            CodecError::malformed("'allowReconnect' is not a boolean")
                        })
                    })
                    .transpose()?
                    .unwrap_or(false),
            },
        };

        Ok(Some((message, consumed)))
    }

    fn write_message(&self, message: &HubMessage, output: &mut BytesMut) -> CodecResult<()> {
        let mut map = Map::new();
        map.insert("type".into(), Value::from(message.message_type() as u8));

        match message {
            HubMessage::Invocation {
                invocation_id,
                target,
                arguments,
                stream_ids,
            } => {
                if let Some(id) = invocation_id {
                    map.insert("invocationId".into(), Value::from(id.clone()));
                }
                write_invocation_fields(&mut map, target, arguments, stream_ids);
            }
            HubMessage::StreamInvocation {
                invocation_id,
                target,
                arguments,
                stream_ids,
            } => {
                map.insert("invocationId".into(), Value::from(invocation_id.clone()));
                write_invocation_fields(&mut map, target, arguments, stream_ids);
            }
            HubMessage::StreamItem {
                invocation_id,
                item,
            } => {
                map.insert("invocationId".into(), Value::from(invocation_id.clone()));
                map.insert("item".into(), item.clone());
            }
            HubMessage::Completion {
                invocation_id,
                error,
                result,
            } => {
                map.insert("invocationId".into(), Value::from(invocation_id.clone()));
                if let Some(error) = error {
                    map.insert("error".into(), Value::from(error.clone()));
                }
                if let Some(result) = result {
                    map.insert("result".into(), result.clone());
                }
            }
            HubMessage::CancelInvocation { invocation_id } => {
                map.insert("invocationId".into(), Value::from(invocation_id.clone()));
            }
            HubMessage::Ping => {}
            HubMessage::Close {
                error,
                allow_reconnect,
            } => {
                if let Some(error) = error {
                    map.insert("error".into(), Value::from(error.clone()));
                }
                if *allow_reconnect {
                    map.insert("allowReconnect".into(), Value::from(true));
                }
            }
        }

        let encoded = serde_json::to_vec(&Value::Object(map))
            .map_err(|e| CodecError::malformed(format!("serialization failed: {}", e)))?;
        output.reserve(encoded.len() + 1);
        output.put_slice(&encoded);
        output.put_u8(RECORD_SEPARATOR);
        Ok(())
    }
}

fn write_invocation_fields(
    map: &mut Map<String, Value>,
    target: &str,
    arguments: &[Value],
    stream_ids: &[String],
) {
    map.insert("target".into(), Value::from(target));
    map.insert("arguments".into(), Value::Array(arguments.to_vec()));
    if !stream_ids.is_empty() {
        map.insert(
            "streamIds".into(),
            Value::Array(stream_ids.iter().cloned().map(Value::from).collect()),
        );
    }
}

fn required_str(map: &Map<String, Value>, key: &str) -> CodecResult<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CodecError::malformed(format!("missing or non-string '{}'", key)))
}

fn optional_str(map: &Map<String, Value>, key: &str) -> CodecResult<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CodecError::malformed(format!("'{}' is not a string", key))),
    }
}

fn arguments_field(map: &Map<String, Value>) -> CodecResult<Vec<Value>> {
    match map.get("arguments") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(CodecError::malformed("'arguments' is not an array")),
    }
}

fn string_list(map: &Map<String, Value>, key: &str) -> CodecResult<Vec<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| CodecError::malformed(format!("'{}' entry is not a string", key)))
            })
            .collect(),
        Some(_) => Err(CodecError::malformed(format!("'{}' is not an array", key))),
    }
}

/// Check decoded arguments against the binder's declared signature.
///
/// A binder miss leaves the arguments untouched (raw passthrough); a hit
/// enforces arity and per-position type compatibility.
fn bind_arguments(
    binder: &dyn InvocationBinder,
    target: &str,
    arguments: &[Value],
) -> CodecResult<()> {
    let Some(expected) = binder.parameter_types(target) else {
        return Ok(());
    };
    if expected.len() != arguments.len() {
        return Err(CodecError::binding(
            target,
            format!("expected {} arguments, got {}", expected.len(), arguments.len()),
        ));
    }
    for (index, (ty, value)) in expected.iter().zip(arguments).enumerate() {
        if !ty.matches_value(value) {
            return Err(CodecError::binding(
                target,
                format!("argument {} does not match expected {:?}", index, ty),
            ));
        }
    }
    Ok(())
}
