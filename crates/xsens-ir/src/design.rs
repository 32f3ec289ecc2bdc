//! Design: the collection of modules passes operate on

use crate::id::IdString;
use crate::module::Module;
use crate::{IrError, IrResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    #[serde(default)]
    pub modules: IndexMap<IdString, Module>,
}

impl Design {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.get_mut(name)
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Insert a fully built module; names must be unique
    pub fn add_module(&mut self, module: Module) -> IrResult<&mut Module> {
        if self.modules.contains_key(&module.name) {
            return Err(IrError::DuplicateModule(module.name.to_string()));
        }
        let name = module.name.clone();
        Ok(self.modules.entry(name).or_insert(module))
    }

    pub fn remove_module(&mut self, name: &str) -> IrResult<Module> {
        self.modules
            .shift_remove(name)
            .ok_or_else(|| IrError::ModuleNotFound(name.to_string()))
    }
}
