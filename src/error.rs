//! # Error Types
//!
//! Comprehensive error handling for the module protocol.
//!
//! This module defines all error variants that can occur during protocol
//! operations, from command validation failures to transport errors.
//!
//! ## Error Categories
//! - **Validation Errors**: Out-of-range command parameters, oversized messages
//! - **Protocol Errors**: Malformed wire payloads, version mismatches
//! - **Transport Errors**: Socket failures, exhausted retransmission attempts
//! - **Request Outcomes**: Response timeouts, peer-reported failures
//!
//! All errors implement `std::error::Error` for interoperability.
//!
//! Validation errors are always raised locally, before anything touches the
//! wire. Decode failures on unsolicited inbound traffic are surfaced through
//! the controller's event channel and never fail an unrelated in-flight
//! request.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// Pending-request table errors
    pub const ERR_PENDING_LOCK: &str = "Failed to acquire lock on pending-request table";

    /// Controller lifecycle errors
    pub const ERR_CONTROLLER_CLOSED: &str = "Controller closed";

    /// Peer dispatch errors
    pub const ERR_NO_HANDLER: &str = "No command handler registered";
    pub const ERR_INVALID_MESSAGE: &str = "Invalid message format";

    /// Message validation errors
    pub const ERR_MISSING_VERSION: &str = "Message missing version field";
    pub const ERR_BAD_TIMESTAMP: &str = "Message timestamp must be an integer";
    pub const ERR_BAD_COMMANDS: &str = "Message commands must be an array";
}

/// Primary error type for all protocol operations.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A command or message field failed local validation. Never transmitted.
    #[error("invalid {field}: {reason}")]
    InvalidParameter {
        field: &'static str,
        reason: String,
    },

    /// The encoded message exceeds the datagram payload limit.
    #[error("message of {0} bytes exceeds the maximum datagram size")]
    OversizedMessage(usize),

    /// An inbound payload was not a well-formed protocol message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The payload declared a protocol version this crate does not speak.
    /// Distinct from [`ModuleError::MalformedMessage`] so callers can report
    /// version skew separately from corruption.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// No correlated response arrived within the configured deadline.
    /// Terminal for the request; never retried automatically.
    #[error("no response received within {0}ms")]
    Timeout(u64),

    /// The peer answered with a non-2xx status.
    #[error("peer returned {status}: {message}")]
    Application { status: u16, message: String },

    /// The controller was shut down while this request was pending,
    /// or a send was attempted after close.
    #[error("controller closed")]
    Closed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ModuleError {
    /// Convenience constructor for parameter validation failures.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Type alias for Results using ModuleError
pub type Result<T> = std::result::Result<T, ModuleError>;
