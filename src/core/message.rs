//! # Message Envelopes
//!
//! The typed wire envelopes: [`Message`] (controller → module, carrying one
//! or more [`Command`]s) and [`Response`] (module → controller). Module
//! kinds form a closed set modeled as the [`ModuleType`] enum so that
//! dispatch over them is exhaustive at compile time rather than a runtime
//! string comparison.

use crate::config::PROTOCOL_VERSION;
use crate::utils::time::unix_timestamp_ms;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// `module_id` value addressing every peer that hears the message.
pub const WILDCARD_ID: &str = "*";

/// Reserved action of the discovery sub-protocol. Answered by the peer
/// core itself, never routed to a user handler.
pub const DISCOVER_ACTION: &str = "discover";

/// Key under which a peer echoes the request sequence in response `data`.
pub const SEQUENCE_KEY: &str = "sequence";

/// The closed set of module kinds addressable by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Actuator,
    Display,
    Mobile,
    Sensor,
    Custom,
}

impl ModuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Actuator => "actuator",
            ModuleType::Display => "display",
            ModuleType::Mobile => "mobile",
            ModuleType::Sensor => "sensor",
            ModuleType::Custom => "custom",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single action directed at one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub module_id: String,
    pub module_type: ModuleType,
    pub action: String,
    pub params: Map<String, Value>,
}

impl Command {
    /// Whether a peer with the given id should act on this command.
    pub fn is_addressed_to(&self, module_id: &str) -> bool {
        self.module_id == module_id || self.module_id == WILDCARD_ID
    }
}

/// The transport envelope carrying one or more commands plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub version: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    pub commands: Vec<Command>,
}

impl Message {
    /// Build a canonical envelope around `commands`, stamped with the
    /// supported protocol version and the current time.
    pub fn new(commands: Vec<Command>, sequence: Option<u32>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            timestamp: unix_timestamp_ms(),
            sequence,
            commands,
        }
    }
}

/// A module's answer to one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub message: String,
    pub module_id: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Response {
    /// Whether the status falls in the 2xx success class.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The correlating request sequence, echoed by the peer under
    /// `data["sequence"]`. The response envelope itself has no top-level
    /// sequence field.
    pub fn sequence(&self) -> Option<u32> {
        self.data
            .as_ref()?
            .get(SEQUENCE_KEY)?
            .as_u64()
            .and_then(|seq| u32::try_from(seq).ok())
    }
}

/// Named status codes used by the peer side when shaping replies.
/// The wire carries a raw integer; peers may answer with any code in the
/// 2xx/4xx/5xx classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    InternalError,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::InternalError => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn module_type_wire_names() {
        for (kind, name) in [
            (ModuleType::Actuator, "\"actuator\""),
            (ModuleType::Display, "\"display\""),
            (ModuleType::Mobile, "\"mobile\""),
            (ModuleType::Sensor, "\"sensor\""),
            (ModuleType::Custom, "\"custom\""),
        ] {
            let encoded = serde_json::to_string(&kind).unwrap();
            assert_eq!(encoded, name);
            let decoded: ModuleType = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded, kind);
        }
    }

    #[test]
    fn wildcard_addressing() {
        let cmd = Command {
            module_id: WILDCARD_ID.to_string(),
            module_type: ModuleType::Custom,
            action: "ping".to_string(),
            params: Map::new(),
        };
        assert!(cmd.is_addressed_to("anything"));

        let cmd = Command {
            module_id: "arm-1".to_string(),
            ..cmd
        };
        assert!(cmd.is_addressed_to("arm-1"));
        assert!(!cmd.is_addressed_to("arm-2"));
    }

    #[test]
    fn response_sequence_lives_in_data() {
        let mut data = Map::new();
        data.insert(SEQUENCE_KEY.to_string(), json!(42));
        let response = Response {
            status: 200,
            message: "OK".to_string(),
            module_id: "arm-1".to_string(),
            timestamp: 1,
            data: Some(data),
        };
        assert_eq!(response.sequence(), Some(42));

        let bare = Response { data: None, ..response };
        assert_eq!(bare.sequence(), None);
    }

    #[test]
    fn status_classes() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::BadRequest.code(), 400);
        assert_eq!(Status::NotFound.code(), 404);
        assert_eq!(Status::MethodNotAllowed.code(), 405);
        assert_eq!(Status::InternalError.code(), 500);

        let ok = Response {
            status: 204,
            message: String::new(),
            module_id: "m".to_string(),
            timestamp: 0,
            data: None,
        };
        assert!(ok.is_success());
        let err = Response { status: 300, ..ok };
        assert!(!err.is_success());
    }
}
