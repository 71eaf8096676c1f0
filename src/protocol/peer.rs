//! # Module Peer
//!
//! The module side of the protocol: a UDP listener that decodes inbound
//! messages, routes commands addressed to this module (or the wildcard) to
//! the registered handler, and unicasts one response per accepted command
//! back to the address the datagram arrived from, never to a remembered
//! session address, so peers keep working behind NAT or multi-homed hosts.
//!
//! There is no peer-type hierarchy. One [`Peer`] is parameterized by its
//! [`ModuleIdentity`] (id plus module-type variant); what differs between an
//! actuator and a display is only the [`Reply`] shapes its handler returns.
//!
//! ## Handler contract
//!
//! The handler returns the one [`Reply`] for each command it is given; the
//! peer core turns it into a response envelope and sends it. Intake is
//! strictly sequential: a slow handler stalls every other peer duty, so
//! handlers must be fast and non-blocking. This is a contract, not an
//! enforcement.

use crate::command::Expression;
use crate::config::PeerConfig;
use crate::core::codec;
use crate::core::message::{
    Command, ModuleType, Response, Status, DISCOVER_ACTION, SEQUENCE_KEY, WILDCARD_ID,
};
use crate::error::{constants, ModuleError, Result};
use crate::utils::time::unix_timestamp_ms;
use serde_json::{json, Map, Value};
use std::io::ErrorKind;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, info, instrument, warn};

/// What a module is on the command plane: its addressable id and the
/// capability it advertises during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    pub id: String,
    pub module_type: ModuleType,
}

impl ModuleIdentity {
    pub fn new(id: impl Into<String>, module_type: ModuleType) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ModuleError::invalid("id", "must be a non-empty string"));
        }
        if id == WILDCARD_ID {
            return Err(ModuleError::invalid("id", "the wildcard cannot be a module id"));
        }
        Ok(Self { id, module_type })
    }
}

/// The single response a handler emits for a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub message: String,
    pub data: Option<Map<String, Value>>,
}

impl Reply {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            data: None,
        }
    }

    pub fn ok_with(message: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    // Shaped success replies mirroring the module capabilities. Device code
    // picks the shape matching the command it just executed.

    pub fn servo_position(angle: i64, speed: Option<i64>) -> Self {
        let mut data = Map::new();
        data.insert("angle".to_string(), json!(angle));
        if let Some(speed) = speed {
            data.insert("speed".to_string(), json!(speed));
        }
        Self::ok_with("Servo position set", data)
    }

    pub fn position(x: f64, y: f64, z: f64) -> Self {
        let mut data = Map::new();
        data.insert("x".to_string(), json!(x));
        data.insert("y".to_string(), json!(y));
        data.insert("z".to_string(), json!(z));
        Self::ok_with("Position set", data)
    }

    pub fn eyes(left_x: i64, left_y: i64, right_x: i64, right_y: i64, blink: bool) -> Self {
        let mut data = Map::new();
        data.insert("left_eye".to_string(), json!({"x": left_x, "y": left_y}));
        data.insert("right_eye".to_string(), json!({"x": right_x, "y": right_y}));
        if blink {
            data.insert("blink".to_string(), json!(true));
        }
        Self::ok_with("Eyes position set", data)
    }

    pub fn expression(expression: Expression, intensity: Option<i64>) -> Self {
        let mut data = Map::new();
        data.insert("expression".to_string(), json!(expression.as_str()));
        if let Some(intensity) = intensity {
            data.insert("intensity".to_string(), json!(intensity));
        }
        Self::ok_with("Expression set", data)
    }

    pub fn movement(velocity: f64, direction: f64) -> Self {
        let mut data = Map::new();
        data.insert("velocity".to_string(), json!(velocity));
        data.insert("direction".to_string(), json!(direction));
        Self::ok_with("Movement command executed", data)
    }

    pub fn location(x: f64, y: f64, heading: f64) -> Self {
        let mut data = Map::new();
        data.insert("x".to_string(), json!(x));
        data.insert("y".to_string(), json!(y));
        data.insert("heading".to_string(), json!(heading));
        Self::ok_with("Location updated", data)
    }

    pub fn sensor_reading(sensor_type: &str, value: f64, unit: Option<&str>) -> Self {
        let mut data = Map::new();
        data.insert("sensor_type".to_string(), json!(sensor_type));
        data.insert("value".to_string(), json!(value));
        if let Some(unit) = unit {
            data.insert("unit".to_string(), json!(unit));
        }
        Self::ok_with("Sensor reading", data)
    }

    pub fn sensor_data(sensor_type: &str, data: Map<String, Value>) -> Self {
        let mut shaped = Map::new();
        shaped.insert("sensor_type".to_string(), json!(sensor_type));
        shaped.insert("data".to_string(), Value::Object(data));
        Self::ok_with("Sensor data", shaped)
    }
}

type HandlerFn = dyn FnMut(&Command) -> Reply + Send + Sync;

/// A module peer: listener, dispatcher and response path in one.
pub struct Peer {
    socket: UdpSocket,
    identity: ModuleIdentity,
    handler: Option<Box<HandlerFn>>,
    max_commands: usize,
}

impl Peer {
    /// Bind the peer's listening socket.
    pub async fn bind(identity: ModuleIdentity, config: PeerConfig) -> Result<Self> {
        let address: SocketAddr = config.bind_address.parse().map_err(|_| {
            ModuleError::Config(format!("invalid bind address: {}", config.bind_address))
        })?;
        if config.max_commands == 0 {
            return Err(ModuleError::Config(
                "max_commands must be greater than 0".to_string(),
            ));
        }

        let socket = UdpSocket::bind(address).await?;
        info!(
            module = %identity.id,
            kind = %identity.module_type,
            addr = %socket.local_addr()?,
            "module peer listening"
        );

        Ok(Self {
            socket,
            identity,
            handler: None,
            max_commands: config.max_commands,
        })
    }

    /// Register the command handler. At most one; a later call replaces the
    /// earlier handler.
    pub fn set_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&Command) -> Reply + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Service one ready datagram without blocking; the cooperative tick
    /// for firmware-style loops. Returns whether a datagram was handled.
    pub async fn poll_once(&mut self) -> Result<bool> {
        let mut buf = [0u8; 2048];
        match self.socket.try_recv_from(&mut buf) {
            Ok((len, source)) => {
                self.handle_datagram(&buf[..len], source).await?;
                Ok(true)
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    /// Await one datagram and service it.
    pub async fn process_one(&mut self) -> Result<()> {
        let mut buf = [0u8; 2048];
        let (len, source) = self.socket.recv_from(&mut buf).await?;
        self.handle_datagram(&buf[..len], source).await
    }

    /// Service datagrams until the task is cancelled. Per-datagram failures
    /// are logged and do not stop the loop.
    pub async fn serve(&mut self) -> Result<()> {
        loop {
            if let Err(error) = self.process_one().await {
                warn!(%error, "failed to service datagram");
            }
        }
    }

    #[instrument(skip(self, data), fields(module = %self.identity.id, bytes = data.len()))]
    async fn handle_datagram(&mut self, data: &[u8], source: SocketAddr) -> Result<()> {
        let message = match codec::decode_message(data) {
            Ok(message) => message,
            Err(error) => {
                debug!(%source, %error, "rejecting malformed message");
                let rejection = Reply::error(
                    Status::BadRequest,
                    format!("{}: {error}", constants::ERR_INVALID_MESSAGE),
                );
                return self.send_reply(rejection, None, source).await;
            }
        };

        let mut commands = message.commands;
        if commands.len() > self.max_commands {
            // The excess is dropped without telling the sender; see the
            // protocol notes on oversized batches.
            warn!(
                received = commands.len(),
                limit = self.max_commands,
                "truncating oversized command batch"
            );
            commands.truncate(self.max_commands);
        }

        for command in &commands {
            if !command.is_addressed_to(&self.identity.id) {
                debug!(module_id = %command.module_id, "ignoring command for another module");
                continue;
            }
            let reply = self.dispatch(command);
            self.send_reply(reply, message.sequence, source).await?;
        }
        Ok(())
    }

    /// Route one matching command: discovery is answered by the core, all
    /// else goes to the handler in message order.
    fn dispatch(&mut self, command: &Command) -> Reply {
        if command.action == DISCOVER_ACTION {
            let mut data = Map::new();
            data.insert(
                "module_type".to_string(),
                json!(self.identity.module_type.as_str()),
            );
            return Reply::ok_with("Module present", data);
        }

        match self.handler.as_mut() {
            Some(handler) => handler(command),
            None => Reply::error(Status::MethodNotAllowed, constants::ERR_NO_HANDLER),
        }
    }

    /// Unicast a response to the observed sender address, echoing the
    /// request sequence in `data` so the controller can correlate it.
    async fn send_reply(
        &self,
        reply: Reply,
        sequence: Option<u32>,
        destination: SocketAddr,
    ) -> Result<()> {
        let mut data = reply.data.unwrap_or_default();
        if let Some(sequence) = sequence {
            data.insert(SEQUENCE_KEY.to_string(), json!(sequence));
        }

        let response = Response {
            status: reply.status.code(),
            message: reply.message,
            module_id: self.identity.id.clone(),
            timestamp: unix_timestamp_ms(),
            data: if data.is_empty() { None } else { Some(data) },
        };

        let payload = codec::encode_response(&response)?;
        self.socket.send_to(&payload, destination).await?;
        debug!(status = response.status, %destination, "response sent");
        Ok(())
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("identity", &self.identity)
            .field("has_handler", &self.handler.is_some())
            .field("max_commands", &self.max_commands)
            .finish()
    }
}
