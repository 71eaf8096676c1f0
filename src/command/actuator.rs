//! Actuator command builder: servo and 3D position control.

use super::{make_command, require_finite, validate_module_id};
use crate::core::message::{Command, ModuleType};
use crate::error::{ModuleError, Result};
use serde_json::{json, Map};
use std::fmt;

/// Motion easing profiles a servo accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
}

impl Easing {
    pub fn as_str(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "ease-in",
            Easing::EaseOut => "ease-out",
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for actuator module commands.
#[derive(Debug, Clone)]
pub struct Actuator {
    module_id: String,
}

impl Actuator {
    pub fn new(module_id: impl Into<String>) -> Result<Self> {
        let module_id = module_id.into();
        validate_module_id(&module_id)?;
        Ok(Self { module_id })
    }

    /// `set_servo`: angle in degrees, optional speed and easing profile.
    pub fn set_servo(
        &self,
        angle: i64,
        speed: Option<i64>,
        easing: Option<Easing>,
    ) -> Result<Command> {
        if !(0..=180).contains(&angle) {
            return Err(ModuleError::invalid(
                "angle",
                format!("must be between 0 and 180, got {angle}"),
            ));
        }
        if let Some(speed) = speed {
            if !(0..=255).contains(&speed) {
                return Err(ModuleError::invalid(
                    "speed",
                    format!("must be between 0 and 255, got {speed}"),
                ));
            }
        }

        let mut params = Map::new();
        params.insert("angle".to_string(), json!(angle));
        if let Some(speed) = speed {
            params.insert("speed".to_string(), json!(speed));
        }
        if let Some(easing) = easing {
            params.insert("easing".to_string(), json!(easing.as_str()));
        }
        Ok(self.command("set_servo", params))
    }

    /// `set_position`: absolute 3D target, all coordinates finite.
    pub fn set_position(&self, x: f64, y: f64, z: f64) -> Result<Command> {
        require_finite("x", x)?;
        require_finite("y", y)?;
        require_finite("z", z)?;

        let mut params = Map::new();
        params.insert("x".to_string(), json!(x));
        params.insert("y".to_string(), json!(y));
        params.insert("z".to_string(), json!(z));
        Ok(self.command("set_position", params))
    }

    /// `get_position`: query the current position.
    pub fn get_position(&self) -> Command {
        self.command("get_position", Map::new())
    }

    /// `stop`: halt all motion.
    pub fn stop(&self) -> Command {
        self.command("stop", Map::new())
    }

    fn command(&self, action: &str, params: Map<String, serde_json::Value>) -> Command {
        make_command(&self.module_id, ModuleType::Actuator, action, params)
    }
}
