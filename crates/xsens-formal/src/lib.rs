//! SAT encoding of xsens netlists
//!
//! This crate provides:
//! - The `SatEngine` capability interface and an AIG backend solved with varisat
//! - An explicit `EngineRegistry` for selecting a backend by name
//! - `SatGen`, the encoding session that imports signals as literals,
//!   models undefined values, normalizes operand widths and builds
//!   property obligations
//! - Cell encoders for the common internal cell types
//! - An assertion prover built on top of the above

pub mod aig;
pub mod engine;
pub mod prove;
pub mod registry;
pub mod satgen;

pub use aig::AigEngine;
pub use engine::{Lit, Model, SatEngine};
pub use prove::{prove_asserts, ProofOutcome, ProofReport, ProveOptions};
pub use registry::{AigEngineFactory, EngineFactory, EngineRegistry};
pub use satgen::{SatGen, ScopeKey, COMBINATIONAL};

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormalError {
    #[error("SAT solver error: {0}")]
    SolverError(String),
    #[error("Unknown SAT engine: {0}")]
    UnknownEngine(String),
}

pub type FormalResult<T> = Result<T, FormalError>;

/// Signal values that falsify a property
#[derive(Debug, Clone)]
pub struct Counterexample {
    /// Trace length
    pub length: usize,
    /// Signal assignments at each step
    pub trace: Vec<TraceStep>,
}

#[derive(Debug, Clone)]
pub struct TraceStep {
    /// Step number
    pub step: usize,
    /// Wire name to MSB-first value string (`x` for undefined bits)
    pub assignments: BTreeMap<String, String>,
}

impl Counterexample {
    pub fn value(&self, step: usize, wire: &str) -> Option<&str> {
        self.trace
            .iter()
            .find(|s| s.step == step)
            .and_then(|s| s.assignments.get(wire))
            .map(|v| v.as_str())
    }
}
