//! xsens configuration
//!
//! This crate loads `xsens.toml` files, which hold defaults for the SAT
//! encoder and the passes. Every section and key is optional.

pub mod config;
pub mod error;

pub use config::{Config, FormalConfig, SensitizeConfig};
pub use error::{ConfigError, Result};

use std::path::Path;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "xsens.toml";

/// Parse a configuration from a file path
pub fn from_path(path: impl AsRef<Path>) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
    from_str(&contents)
}

/// Parse a configuration from a string
pub fn from_str(s: &str) -> Result<Config> {
    let config: Config = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Load `path` if given, else `xsens.toml` in `dir` when present, else
/// the defaults
pub fn discover(path: Option<&Path>, dir: impl AsRef<Path>) -> Result<Config> {
    match path {
        Some(path) => from_path(path),
        None => {
            let candidate = dir.as_ref().join(CONFIG_FILE);
            if candidate.is_file() {
                from_path(candidate)
            } else {
                Ok(Config::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
            [formal]
            engine = "aig"
            model_undef = true

            [sensitize]
            constrain_inputs = true
            constrain_undef = false
        "#;

        let config = from_str(toml).unwrap();
        assert_eq!(config.formal.engine.as_deref(), Some("aig"));
        assert!(config.formal.model_undef);
        assert!(config.sensitize.constrain_inputs);
        assert!(!config.sensitize.constrain_undef);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.formal.engine.is_none());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = from_str("[sensitize]\nconstrain_everything = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_engine_rejected() {
        let err = from_str("[formal]\nengine = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
