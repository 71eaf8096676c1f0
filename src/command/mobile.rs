//! Mobile command builder: movement, positioning and rotation.

use super::{make_command, require_finite, validate_module_id};
use crate::core::message::{Command, ModuleType};
use crate::error::{ModuleError, Result};
use serde_json::{json, Map};

/// Builder for mobile module commands.
#[derive(Debug, Clone)]
pub struct Mobile {
    module_id: String,
}

impl Mobile {
    pub fn new(module_id: impl Into<String>) -> Result<Self> {
        let module_id = module_id.into();
        validate_module_id(&module_id)?;
        Ok(Self { module_id })
    }

    /// `move`: velocity and direction, optional bounded duration.
    pub fn drive(
        &self,
        velocity: f64,
        direction: f64,
        duration: Option<f64>,
    ) -> Result<Command> {
        require_finite("velocity", velocity)?;
        require_finite("direction", direction)?;
        if let Some(duration) = duration {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(ModuleError::invalid(
                    "duration",
                    format!("must be a positive number, got {duration}"),
                ));
            }
        }

        let mut params = Map::new();
        params.insert("velocity".to_string(), json!(velocity));
        params.insert("direction".to_string(), json!(direction));
        if let Some(duration) = duration {
            params.insert("duration".to_string(), json!(duration));
        }
        Ok(self.command("move", params))
    }

    /// `set_location`: planar target, optional heading.
    pub fn set_location(&self, x: f64, y: f64, heading: Option<f64>) -> Result<Command> {
        require_finite("x", x)?;
        require_finite("y", y)?;
        if let Some(heading) = heading {
            require_finite("heading", heading)?;
        }

        let mut params = Map::new();
        params.insert("x".to_string(), json!(x));
        params.insert("y".to_string(), json!(y));
        if let Some(heading) = heading {
            params.insert("heading".to_string(), json!(heading));
        }
        Ok(self.command("set_location", params))
    }

    /// `rotate`: relative angle, optional speed in percent.
    pub fn rotate(&self, angle: f64, speed: Option<f64>) -> Result<Command> {
        require_finite("angle", angle)?;
        if let Some(speed) = speed {
            if !speed.is_finite() || !(0.0..=100.0).contains(&speed) {
                return Err(ModuleError::invalid(
                    "speed",
                    format!("must be between 0 and 100, got {speed}"),
                ));
            }
        }

        let mut params = Map::new();
        params.insert("angle".to_string(), json!(angle));
        if let Some(speed) = speed {
            params.insert("speed".to_string(), json!(speed));
        }
        Ok(self.command("rotate", params))
    }

    /// `get_location`: query the current location.
    pub fn get_location(&self) -> Command {
        self.command("get_location", Map::new())
    }

    /// `stop`: halt all motion.
    pub fn stop(&self) -> Command {
        self.command("stop", Map::new())
    }

    fn command(&self, action: &str, params: Map<String, serde_json::Value>) -> Command {
        make_command(&self.module_id, ModuleType::Mobile, action, params)
    }
}
