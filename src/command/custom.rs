//! Custom command builder: free-form actions for user-defined modules.

use super::{make_command, validate_module_id};
use crate::core::message::{Command, ModuleType};
use crate::error::{ModuleError, Result};
use serde_json::{Map, Value};

/// Builder for custom module commands. Actions and params are free-form;
/// only the envelope constraints are enforced.
#[derive(Debug, Clone)]
pub struct Custom {
    module_id: String,
}

impl Custom {
    pub fn new(module_id: impl Into<String>) -> Result<Self> {
        let module_id = module_id.into();
        validate_module_id(&module_id)?;
        Ok(Self { module_id })
    }

    pub fn command(&self, action: &str, params: Option<Map<String, Value>>) -> Result<Command> {
        if action.is_empty() {
            return Err(ModuleError::invalid("action", "must be a non-empty string"));
        }
        Ok(make_command(
            &self.module_id,
            ModuleType::Custom,
            action,
            params.unwrap_or_default(),
        ))
    }
}
