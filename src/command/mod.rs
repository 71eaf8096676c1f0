//! # Command Builders
//!
//! One builder per module type, each exposing one constructor per supported
//! action. Builders are pure: they hold only the target module id, validate
//! every parameter against the protocol's constraints, and either return a
//! fully-formed [`Command`](crate::core::message::Command) or a validation
//! error naming the offending field. No partial command is ever produced.

mod actuator;
mod custom;
mod display;
mod mobile;
mod sensor;

pub use actuator::{Actuator, Easing};
pub use custom::Custom;
pub use display::{Display, Expression};
pub use mobile::Mobile;
pub use sensor::Sensor;

use crate::core::message::{Command, ModuleType, WILDCARD_ID};
use crate::error::{ModuleError, Result};
use serde_json::{Map, Value};

/// Module ids must be non-empty; the wildcard is reserved for addressing,
/// not for a builder's own identity.
pub(crate) fn validate_module_id(module_id: &str) -> Result<()> {
    if module_id.is_empty() {
        return Err(ModuleError::invalid("module_id", "must be a non-empty string"));
    }
    if module_id == WILDCARD_ID {
        return Err(ModuleError::invalid(
            "module_id",
            "the wildcard id cannot name a builder target",
        ));
    }
    Ok(())
}

pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ModuleError::invalid(
            field,
            format!("must be a finite number, got {value}"),
        ));
    }
    Ok(())
}

pub(crate) fn make_command(
    module_id: &str,
    module_type: ModuleType,
    action: &str,
    params: Map<String, Value>,
) -> Command {
    Command {
        module_id: module_id.to_string(),
        module_type,
        action: action.to_string(),
        params,
    }
}
