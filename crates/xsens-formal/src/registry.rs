//! Named SAT engine backends
//!
//! The registry is an ordinary value owned by the caller. The first
//! registered factory is the default unless another one is selected.

use crate::aig::AigEngine;
use crate::engine::SatEngine;
use crate::{FormalError, FormalResult};
use indexmap::IndexMap;

pub trait EngineFactory {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn create(&self) -> Box<dyn SatEngine>;
}

pub struct AigEngineFactory;

impl EngineFactory for AigEngineFactory {
    fn name(&self) -> &str {
        "aig"
    }

    fn description(&self) -> &str {
        "structurally hashed AIG solved with varisat"
    }

    fn create(&self) -> Box<dyn SatEngine> {
        Box::new(AigEngine::new())
    }
}

pub struct EngineRegistry {
    factories: IndexMap<String, Box<dyn EngineFactory>>,
    default: Option<String>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl EngineRegistry {
    /// Registry without any backend
    pub fn empty() -> Self {
        Self {
            factories: IndexMap::new(),
            default: None,
        }
    }

    /// Registry with the built-in backends
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(AigEngineFactory));
        registry
    }

    /// Add a backend, replacing one registered under the same name
    pub fn register(&mut self, factory: Box<dyn EngineFactory>) {
        let name = factory.name().to_string();
        if self.default.is_none() {
            self.default = Some(name.clone());
        }
        self.factories.insert(name, factory);
    }

    pub fn set_default(&mut self, name: &str) -> FormalResult<()> {
        if !self.factories.contains_key(name) {
            return Err(FormalError::UnknownEngine(name.to_string()));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Create an engine by name, or the default one
    pub fn create(&self, name: Option<&str>) -> FormalResult<Box<dyn SatEngine>> {
        let name = match name.or(self.default.as_deref()) {
            Some(name) => name,
            None => return Err(FormalError::UnknownEngine("<none registered>".to_string())),
        };
        self.factories
            .get(name)
            .map(|f| f.create())
            .ok_or_else(|| FormalError::UnknownEngine(name.to_string()))
    }

    /// `(name, description)` of every backend in registration order
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.factories
            .values()
            .map(|f| (f.name(), f.description()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine() {
        let registry = EngineRegistry::default();
        assert_eq!(registry.default_name(), Some("aig"));
        let engine = registry.create(None).unwrap();
        assert_eq!(engine.name(), "aig");
    }

    #[test]
    fn test_unknown_engine() {
        let mut registry = EngineRegistry::default();
        assert!(matches!(
            registry.create(Some("minisat")),
            Err(FormalError::UnknownEngine(name)) if name == "minisat"
        ));
        assert!(registry.set_default("minisat").is_err());
        assert!(EngineRegistry::empty().create(None).is_err());
    }
}
