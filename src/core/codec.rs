//! # Message Codec
//!
//! Encoding and decoding of the UTF-8 JSON wire envelopes.
//!
//! Encoding enforces the datagram size bound: anything over
//! [`MAX_DATAGRAM_SIZE`](crate::config::MAX_DATAGRAM_SIZE) bytes is refused
//! before it can reach the socket. Decoding is total and side-effect-free:
//! every malformed input maps to an error, never a panic, and a version
//! mismatch is reported as its own condition rather than a generic parse
//! failure.

use crate::config::{MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use crate::core::message::{Message, ModuleType, Response};
use crate::error::{constants, ModuleError, Result};
use serde_json::Value;

/// Encode a message as compact JSON, refusing oversized payloads.
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(message)
        .map_err(|e| ModuleError::Internal(format!("failed to serialize message: {e}")))?;
    check_datagram_size(bytes.len())?;
    Ok(bytes)
}

/// Decode and validate a message envelope.
pub fn decode_message(data: &[u8]) -> Result<Message> {
    let value = parse_object(data)?;

    match value.get("version") {
        None => return Err(ModuleError::MalformedMessage(constants::ERR_MISSING_VERSION.into())),
        Some(Value::String(version)) if version == PROTOCOL_VERSION => {}
        Some(Value::String(version)) => {
            return Err(ModuleError::UnsupportedVersion(version.clone()));
        }
        Some(other) => return Err(ModuleError::UnsupportedVersion(other.to_string())),
    }

    if value.get("timestamp").and_then(Value::as_u64).is_none() {
        return Err(ModuleError::MalformedMessage(constants::ERR_BAD_TIMESTAMP.into()));
    }

    let commands = value
        .get("commands")
        .and_then(Value::as_array)
        .ok_or_else(|| ModuleError::MalformedMessage(constants::ERR_BAD_COMMANDS.into()))?;

    for (index, command) in commands.iter().enumerate() {
        validate_command_value(index, command)?;
    }

    serde_json::from_value(value)
        .map_err(|e| ModuleError::MalformedMessage(format!("invalid message envelope: {e}")))
}

/// Encode a response as compact JSON, refusing oversized payloads.
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(response)
        .map_err(|e| ModuleError::Internal(format!("failed to serialize response: {e}")))?;
    check_datagram_size(bytes.len())?;
    Ok(bytes)
}

/// Decode and validate a response envelope.
pub fn decode_response(data: &[u8]) -> Result<Response> {
    let value = parse_object(data)?;

    if value.get("status").and_then(Value::as_u64).is_none() {
        return Err(ModuleError::MalformedMessage(
            "response status must be an integer".into(),
        ));
    }
    require_string(&value, "message", "response message must be a string")?;
    require_string(&value, "module_id", "response module_id must be a string")?;
    if value.get("timestamp").and_then(Value::as_u64).is_none() {
        return Err(ModuleError::MalformedMessage(
            "response timestamp must be an integer".into(),
        ));
    }
    if let Some(data) = value.get("data") {
        if !data.is_object() {
            return Err(ModuleError::MalformedMessage(
                "response data must be an object".into(),
            ));
        }
    }

    serde_json::from_value(value)
        .map_err(|e| ModuleError::MalformedMessage(format!("invalid response envelope: {e}")))
}

fn check_datagram_size(len: usize) -> Result<()> {
    if len > MAX_DATAGRAM_SIZE {
        return Err(ModuleError::OversizedMessage(len));
    }
    Ok(())
}

fn parse_object(data: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(data)
        .map_err(|e| ModuleError::MalformedMessage(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(ModuleError::MalformedMessage("payload must be a JSON object".into()));
    }
    Ok(value)
}

fn require_string(value: &Value, field: &str, error: &str) -> Result<()> {
    match value.get(field) {
        Some(Value::String(_)) => Ok(()),
        _ => Err(ModuleError::MalformedMessage(error.into())),
    }
}

fn validate_command_value(index: usize, command: &Value) -> Result<()> {
    let object = command.as_object().ok_or_else(|| {
        ModuleError::MalformedMessage(format!("command {index} must be an object"))
    })?;

    match object.get("module_id") {
        Some(Value::String(id)) if !id.is_empty() => {}
        _ => {
            return Err(ModuleError::MalformedMessage(format!(
                "command {index}: module_id must be a non-empty string"
            )))
        }
    }

    match object.get("module_type").and_then(Value::as_str) {
        Some(kind) if serde_json::from_value::<ModuleType>(Value::String(kind.into())).is_ok() => {}
        Some(kind) => {
            return Err(ModuleError::MalformedMessage(format!(
                "command {index}: invalid module_type: {kind}"
            )))
        }
        None => {
            return Err(ModuleError::MalformedMessage(format!(
                "command {index}: module_type must be a string"
            )))
        }
    }

    match object.get("action") {
        Some(Value::String(action)) if !action.is_empty() => {}
        _ => {
            return Err(ModuleError::MalformedMessage(format!(
                "command {index}: action must be a non-empty string"
            )))
        }
    }

    match object.get("params") {
        Some(Value::Object(_)) => Ok(()),
        _ => Err(ModuleError::MalformedMessage(format!(
            "command {index}: params must be an object"
        ))),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::core::message::Command;
    use serde_json::{json, Map};

    fn sample_message() -> Message {
        let mut params = Map::new();
        params.insert("angle".to_string(), json!(90));
        Message {
            version: PROTOCOL_VERSION.to_string(),
            timestamp: 1_700_000_000_000,
            sequence: Some(7),
            commands: vec![Command {
                module_id: "arm-1".to_string(),
                module_type: ModuleType::Actuator,
                action: "set_servo".to_string(),
                params,
            }],
        }
    }

    /// Message with a single custom command whose one string param pads the
    /// encoding to exactly `target` bytes.
    fn padded_message(target: usize) -> Message {
        let mut message = Message {
            version: PROTOCOL_VERSION.to_string(),
            timestamp: 1_700_000_000_000,
            sequence: None,
            commands: vec![Command {
                module_id: "m".to_string(),
                module_type: ModuleType::Custom,
                action: "blob".to_string(),
                params: Map::new(),
            }],
        };
        message.commands[0]
            .params
            .insert("pad".to_string(), json!(""));
        let base = serde_json::to_vec(&message).unwrap().len();
        let filler = "x".repeat(target - base);
        message.commands[0]
            .params
            .insert("pad".to_string(), json!(filler));
        message
    }

    #[test]
    fn round_trip_preserves_message() {
        let message = sample_message();
        let bytes = encode_message(&message).unwrap();
        let decoded = decode_message(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn encode_honours_exact_size_boundary() {
        let at_limit = padded_message(MAX_DATAGRAM_SIZE);
        let bytes = encode_message(&at_limit).unwrap();
        assert_eq!(bytes.len(), MAX_DATAGRAM_SIZE);

        let over_limit = padded_message(MAX_DATAGRAM_SIZE + 1);
        match encode_message(&over_limit) {
            Err(ModuleError::OversizedMessage(len)) => assert_eq!(len, MAX_DATAGRAM_SIZE + 1),
            other => panic!("expected OversizedMessage, got {other:?}"),
        }
    }

    #[test]
    fn version_mismatch_is_distinct() {
        let raw = json!({
            "version": "2.0",
            "timestamp": 1,
            "commands": [],
        });
        let result = decode_message(raw.to_string().as_bytes());
        match result {
            Err(ModuleError::UnsupportedVersion(found)) => assert_eq!(found, "2.0"),
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn missing_version_is_malformed() {
        let raw = json!({"timestamp": 1, "commands": []});
        assert!(matches!(
            decode_message(raw.to_string().as_bytes()),
            Err(ModuleError::MalformedMessage(_))
        ));
    }

    #[test]
    fn timestamp_must_be_numeric() {
        let raw = json!({"version": "1.0", "timestamp": "now", "commands": []});
        assert!(matches!(
            decode_message(raw.to_string().as_bytes()),
            Err(ModuleError::MalformedMessage(_))
        ));
    }

    #[test]
    fn commands_must_be_an_array() {
        let raw = json!({"version": "1.0", "timestamp": 1, "commands": {}});
        assert!(matches!(
            decode_message(raw.to_string().as_bytes()),
            Err(ModuleError::MalformedMessage(_))
        ));
    }

    #[test]
    fn command_fields_are_validated_individually() {
        let cases = [
            json!({"module_id": "", "module_type": "actuator", "action": "a", "params": {}}),
            json!({"module_id": "m", "module_type": "toaster", "action": "a", "params": {}}),
            json!({"module_id": "m", "module_type": "actuator", "action": "", "params": {}}),
            json!({"module_id": "m", "module_type": "actuator", "action": "a", "params": []}),
            json!({"module_id": "m", "module_type": "actuator", "action": "a"}),
        ];
        for command in cases {
            let raw = json!({"version": "1.0", "timestamp": 1, "commands": [command]});
            let result = decode_message(raw.to_string().as_bytes());
            assert!(
                matches!(result, Err(ModuleError::MalformedMessage(_))),
                "command {command} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn empty_command_list_is_allowed() {
        let raw = json!({"version": "1.0", "timestamp": 1, "commands": []});
        let message = decode_message(raw.to_string().as_bytes()).unwrap();
        assert!(message.commands.is_empty());
    }

    #[test]
    fn garbage_input_is_rejected_not_panicked() {
        for bytes in [&b"not json"[..], &[0xFF, 0xFE][..], &b"[1,2,3]"[..], &b"42"[..]] {
            assert!(decode_message(bytes).is_err());
            assert!(decode_response(bytes).is_err());
        }
    }

    #[test]
    fn response_round_trip() {
        let mut data = Map::new();
        data.insert("sequence".to_string(), json!(9));
        let response = Response {
            status: 200,
            message: "OK".to_string(),
            module_id: "arm-1".to_string(),
            timestamp: 5,
            data: Some(data),
        };
        let bytes = encode_response(&response).unwrap();
        assert_eq!(decode_response(&bytes).unwrap(), response);
    }

    #[test]
    fn response_requires_envelope_fields() {
        let cases = [
            json!({"message": "hi", "module_id": "m", "timestamp": 1}),
            json!({"status": "ok", "message": "hi", "module_id": "m", "timestamp": 1}),
            json!({"status": 200, "module_id": "m", "timestamp": 1}),
            json!({"status": 200, "message": "hi", "timestamp": 1}),
            json!({"status": 200, "message": "hi", "module_id": "m"}),
            json!({"status": 200, "message": "hi", "module_id": "m", "timestamp": 1, "data": 3}),
        ];
        for raw in cases {
            assert!(
                decode_response(raw.to_string().as_bytes()).is_err(),
                "{raw} should be rejected"
            );
        }
    }
}
