//! Configuration structure definitions

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Contents of an `xsens.toml` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SAT encoder defaults
    #[serde(default)]
    pub formal: FormalConfig,

    /// `sensitizepath` defaults
    #[serde(default)]
    pub sensitize: SensitizeConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormalConfig {
    /// SAT engine name; the built-in default when unset
    #[serde(default)]
    pub engine: Option<String>,

    /// Model undefined values as a third logic state
    #[serde(default)]
    pub model_undef: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensitizeConfig {
    #[serde(default)]
    pub constrain_inputs: bool,

    #[serde(default)]
    pub constrain_undef: bool,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if let Some(engine) = &self.formal.engine {
            if engine.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "formal.engine must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
