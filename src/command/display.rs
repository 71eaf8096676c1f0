//! Display command builder: eyes, facial expressions and brightness.

use super::{make_command, validate_module_id};
use crate::core::message::{Command, ModuleType};
use crate::error::{ModuleError, Result};
use serde_json::{json, Map};
use std::fmt;

/// Facial expressions a display module can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    Happy,
    Sad,
    Surprised,
    Neutral,
    Angry,
}

impl Expression {
    pub fn as_str(self) -> &'static str {
        match self {
            Expression::Happy => "happy",
            Expression::Sad => "sad",
            Expression::Surprised => "surprised",
            Expression::Neutral => "neutral",
            Expression::Angry => "angry",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builder for display module commands.
#[derive(Debug, Clone)]
pub struct Display {
    module_id: String,
}

impl Display {
    pub fn new(module_id: impl Into<String>) -> Result<Self> {
        let module_id = module_id.into();
        validate_module_id(&module_id)?;
        Ok(Self { module_id })
    }

    /// `set_eyes`: pixel coordinates for both eyes, optional blink flag.
    pub fn set_eyes(
        &self,
        left_x: i64,
        left_y: i64,
        right_x: i64,
        right_y: i64,
        blink: Option<bool>,
    ) -> Result<Command> {
        validate_eye("left_eye.x", left_x)?;
        validate_eye("left_eye.y", left_y)?;
        validate_eye("right_eye.x", right_x)?;
        validate_eye("right_eye.y", right_y)?;

        let mut params = Map::new();
        params.insert("left_eye".to_string(), json!({"x": left_x, "y": left_y}));
        params.insert("right_eye".to_string(), json!({"x": right_x, "y": right_y}));
        if let Some(blink) = blink {
            params.insert("blink".to_string(), json!(blink));
        }
        Ok(self.command("set_eyes", params))
    }

    /// `set_expression`: expression from the closed set, optional intensity.
    pub fn set_expression(
        &self,
        expression: Expression,
        intensity: Option<i64>,
    ) -> Result<Command> {
        if let Some(intensity) = intensity {
            if !(0..=100).contains(&intensity) {
                return Err(ModuleError::invalid(
                    "intensity",
                    format!("must be between 0 and 100, got {intensity}"),
                ));
            }
        }

        let mut params = Map::new();
        params.insert("expression".to_string(), json!(expression.as_str()));
        if let Some(intensity) = intensity {
            params.insert("intensity".to_string(), json!(intensity));
        }
        Ok(self.command("set_expression", params))
    }

    /// `set_brightness`: backlight level in percent.
    pub fn set_brightness(&self, brightness: i64) -> Result<Command> {
        if !(0..=100).contains(&brightness) {
            return Err(ModuleError::invalid(
                "brightness",
                format!("must be between 0 and 100, got {brightness}"),
            ));
        }

        let mut params = Map::new();
        params.insert("brightness".to_string(), json!(brightness));
        Ok(self.command("set_brightness", params))
    }

    /// `clear_display`: blank the screen.
    pub fn clear_display(&self) -> Command {
        self.command("clear_display", Map::new())
    }

    fn command(&self, action: &str, params: Map<String, serde_json::Value>) -> Command {
        make_command(&self.module_id, ModuleType::Display, action, params)
    }
}

fn validate_eye(field: &'static str, coordinate: i64) -> Result<()> {
    if coordinate < 0 {
        return Err(ModuleError::invalid(
            field,
            format!("must be a non-negative integer, got {coordinate}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn eyes_require_non_negative_coordinates() {
        let face = Display::new("face-1").unwrap();
        let command = face.set_eyes(10, 20, 30, 40, None).unwrap();
        assert_eq!(command.params["left_eye"], json!({"x": 10, "y": 20}));
        assert_eq!(command.params["right_eye"], json!({"x": 30, "y": 40}));
        assert!(!command.params.contains_key("blink"));

        assert!(face.set_eyes(-1, 0, 0, 0, None).is_err());
        assert!(face.set_eyes(0, 0, 0, -5, None).is_err());
    }

    #[test]
    fn expression_intensity_bounds() {
        let face = Display::new("face-1").unwrap();
        assert!(face.set_expression(Expression::Happy, None).is_ok());
        assert!(face.set_expression(Expression::Angry, Some(0)).is_ok());
        assert!(face.set_expression(Expression::Angry, Some(100)).is_ok());
        assert!(face.set_expression(Expression::Angry, Some(101)).is_err());
        assert!(face.set_expression(Expression::Angry, Some(-1)).is_err());
    }

    #[test]
    fn expression_uses_wire_names() {
        let face = Display::new("face-1").unwrap();
        let command = face.set_expression(Expression::Surprised, Some(50)).unwrap();
        assert_eq!(command.params["expression"], json!("surprised"));
        assert_eq!(command.params["intensity"], json!(50));
    }

    #[test]
    fn brightness_bounds() {
        let face = Display::new("face-1").unwrap();
        assert!(face.set_brightness(0).is_ok());
        assert!(face.set_brightness(100).is_ok());
        assert!(face.set_brightness(101).is_err());
        assert!(face.set_brightness(-1).is_err());
    }

    #[test]
    fn clear_display_has_no_params() {
        let face = Display::new("face-1").unwrap();
        let command = face.clear_display();
        assert_eq!(command.action, "clear_display");
        assert!(command.params.is_empty());
    }
}
