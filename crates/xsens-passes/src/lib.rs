//! Netlist transformation passes
//!
//! Passes are invoked with a command line (`name arg...`) against a
//! `Design`. The `PassRegistry` maps pass names to implementations and is
//! an ordinary value owned by the caller.

pub mod sensitize;

pub use sensitize::{build_miter, MiterStats, SensitizeOptions, SensitizePath};

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;
use xsens_ir::{Design, IrError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    #[error("{pass}: unknown option {option}")]
    UnknownOption { pass: String, option: String },
    #[error("{pass}: {message}")]
    InvalidArguments { pass: String, message: String },
    #[error("Can't find source module {0}")]
    ModuleNotFound(String),
    #[error("Miter module {0} already exists")]
    ModuleExists(String),
    #[error("Module {module} contains {content}; lower them before running this pass")]
    UnsupportedContent { module: String, content: String },
    #[error("Module {module} already uses the name {name} that the miter needs")]
    NameCollision { module: String, name: String },
    #[error("No such pass: {0}")]
    UnknownPass(String),
    #[error("Empty command")]
    EmptyCommand,
    #[error(transparent)]
    Ir(#[from] IrError),
}

pub type Result<T> = std::result::Result<T, PassError>;

/// What a pass run did
#[derive(Debug, Clone, Default)]
pub struct PassSummary {
    pub pass_name: String,
    pub changed: bool,
    /// Additional statistics
    pub extra: Vec<(String, String)>,
}

impl PassSummary {
    pub fn new(pass_name: &str) -> Self {
        Self {
            pass_name: pass_name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_extra(&mut self, key: &str, value: impl ToString) {
        self.extra.push((key.to_string(), value.to_string()));
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.pass_name,
            if self.changed { "changed" } else { "unchanged" }
        )?;
        for (key, value) in &self.extra {
            write!(f, ", {} {}", value, key)?;
        }
        Ok(())
    }
}

pub trait Pass {
    fn name(&self) -> &str;

    /// One line description
    fn short_help(&self) -> &str;

    /// Usage text
    fn help(&self) -> &str;

    /// Run the pass. `args[0]` is the pass name.
    fn execute(&self, args: &[String], design: &mut Design) -> Result<PassSummary>;
}

pub struct PassRegistry {
    passes: IndexMap<String, Box<dyn Pass>>,
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl PassRegistry {
    pub fn new() -> Self {
        Self {
            passes: IndexMap::new(),
        }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SensitizePath::new()));
        registry
    }

    /// Add a pass, replacing one registered under the same name
    pub fn register(&mut self, pass: Box<dyn Pass>) {
        self.passes.insert(pass.name().to_string(), pass);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Pass> {
        self.passes.get(name).map(|p| p.as_ref())
    }

    pub fn passes(&self) -> impl Iterator<Item = &dyn Pass> {
        self.passes.values().map(|p| p.as_ref())
    }

    pub fn run(&self, args: &[String], design: &mut Design) -> Result<PassSummary> {
        let name = args.first().ok_or(PassError::EmptyCommand)?;
        let pass = self
            .get(name)
            .ok_or_else(|| PassError::UnknownPass(name.clone()))?;
        pass.execute(args, design)
    }

    /// Run a whitespace separated command line
    pub fn run_line(&self, line: &str, design: &mut Design) -> Result<PassSummary> {
        let args: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        self.run(&args, design)
    }
}
