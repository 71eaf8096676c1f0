//! Sensor command builder: reads, streaming control and calibration.

use super::{make_command, validate_module_id};
use crate::core::message::{Command, ModuleType};
use crate::error::{ModuleError, Result};
use serde_json::{json, Map};

/// Builder for sensor module commands.
#[derive(Debug, Clone)]
pub struct Sensor {
    module_id: String,
}

impl Sensor {
    pub fn new(module_id: impl Into<String>) -> Result<Self> {
        let module_id = module_id.into();
        validate_module_id(&module_id)?;
        Ok(Self { module_id })
    }

    /// `read`: one-shot reading, optionally narrowed to a sensor type.
    pub fn read(&self, sensor_type: Option<&str>) -> Command {
        let mut params = Map::new();
        if let Some(sensor_type) = sensor_type {
            params.insert("sensor_type".to_string(), json!(sensor_type));
        }
        self.command("read", params)
    }

    /// `start_streaming`: periodic readings at the given interval (seconds).
    pub fn start_streaming(&self, sensor_type: &str, interval: f64) -> Result<Command> {
        validate_sensor_type(sensor_type)?;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ModuleError::invalid(
                "interval",
                format!("must be a positive number, got {interval}"),
            ));
        }

        let mut params = Map::new();
        params.insert("sensor_type".to_string(), json!(sensor_type));
        params.insert("interval".to_string(), json!(interval));
        Ok(self.command("start_streaming", params))
    }

    /// `stop_streaming`: stop one stream, or all when no type is given.
    pub fn stop_streaming(&self, sensor_type: Option<&str>) -> Command {
        let mut params = Map::new();
        if let Some(sensor_type) = sensor_type {
            params.insert("sensor_type".to_string(), json!(sensor_type));
        }
        self.command("stop_streaming", params)
    }

    /// `calibrate`: run the named sensor's calibration routine.
    pub fn calibrate(&self, sensor_type: &str) -> Result<Command> {
        validate_sensor_type(sensor_type)?;

        let mut params = Map::new();
        params.insert("sensor_type".to_string(), json!(sensor_type));
        Ok(self.command("calibrate", params))
    }

    /// `get_status`: query streaming and calibration state.
    pub fn get_status(&self) -> Command {
        self.command("get_status", Map::new())
    }

    fn command(&self, action: &str, params: Map<String, serde_json::Value>) -> Command {
        make_command(&self.module_id, ModuleType::Sensor, action, params)
    }
}

fn validate_sensor_type(sensor_type: &str) -> Result<()> {
    if sensor_type.is_empty() {
        return Err(ModuleError::invalid(
            "sensor_type",
            "must be a non-empty string",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn streaming_interval_must_be_positive() {
        let probe = Sensor::new("probe-1").unwrap();
        assert!(probe.start_streaming("temperature", 0.5).is_ok());
        assert!(probe.start_streaming("temperature", 0.0).is_err());
        assert!(probe.start_streaming("temperature", -1.0).is_err());
        assert!(probe.start_streaming("temperature", f64::NAN).is_err());
    }

    #[test]
    fn calibrate_requires_sensor_type() {
        let probe = Sensor::new("probe-1").unwrap();
        assert!(probe.calibrate("imu").is_ok());
        assert!(probe.calibrate("").is_err());
        assert!(probe.start_streaming("", 1.0).is_err());
    }

    #[test]
    fn read_narrows_optionally() {
        let probe = Sensor::new("probe-1").unwrap();
        assert!(probe.read(None).params.is_empty());
        let narrowed = probe.read(Some("distance"));
        assert_eq!(narrowed.params["sensor_type"], json!("distance"));
        assert_eq!(narrowed.action, "read");
    }
}
