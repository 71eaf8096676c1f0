//! # module-protocol
//!
//! Datagram request/response protocol core for commanding distributed
//! hardware modules (actuators, displays, mobility units, sensors and
//! custom peripherals) over UDP.
//!
//! ## Features
//! - **Typed command builders**: per-module-type constructors that validate
//!   every parameter before anything touches the wire
//! - **Sequence-correlated requests**: each tracked request owns a
//!   completion handle; responses match by sequence, with bounded timeout
//!   and transmit retry
//! - **Discovery**: broadcast presence probes deduplicated into a module
//!   roster
//! - **Module peers**: a composable listener that routes matching commands
//!   to one handler and unicasts responses to the observed sender
//!
//! ## Example
//! ```no_run
//! use module_protocol::{Actuator, Controller, ControllerConfig};
//!
//! #[tokio::main]
//! async fn main() -> module_protocol::Result<()> {
//!     let controller = Controller::connect("192.168.1.50", 8888, ControllerConfig::default()).await?;
//!
//!     let arm = Actuator::new("arm-1")?;
//!     let response = controller.send_command(arm.set_servo(90, None, None)?).await?;
//!
//!     if let Some(response) = response {
//!         println!("module answered: {}", response.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The wire format is a compact JSON envelope, at most 1024 bytes per
//! datagram. Security is deliberately out of scope: deploy on a trusted
//! network segment or wrap the transport.

pub mod command;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::command::{Actuator, Custom, Display, Easing, Expression, Mobile, Sensor};
pub use crate::config::{
    ControllerConfig, DiscoveryConfig, LoggingConfig, PeerConfig, ProtocolConfig, DEFAULT_PORT,
    MAX_COMMANDS_PER_MESSAGE, MAX_DATAGRAM_SIZE, PROTOCOL_VERSION,
};
pub use crate::core::message::{Command, Message, ModuleType, Response, Status};
pub use crate::error::{ModuleError, Result};
pub use crate::protocol::{
    discover, Controller, ControllerEvent, ModuleIdentity, ModuleRecord, Peer, Reply,
};
