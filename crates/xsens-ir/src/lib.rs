//! xsens IR - gate-level netlist representation
//!
//! This crate provides the design database that every xsens pass and the
//! SAT encoder operate on:
//! - `Design` / `Module` containers with arena-addressed wires and cells
//! - `SigBit` / `SigSpec` signal vectors with chunk views
//! - `SigMap` canonicalization of connected bits and `SigPool` bit sets
//! - The internal cell type table (`celltypes`)
//!
//! Wires and cells are addressed by module-scoped ids (`WireId`, `CellId`),
//! so cloning and rewriting a module never has to chase owning references.

pub mod celltypes;
pub mod constant;
pub mod design;
pub mod id;
pub mod module;
pub mod sigmap;
pub mod sigspec;

pub use constant::{Const, State};
pub use design::Design;
pub use id::{escape_id, IdString};
pub use module::{Cell, CellId, Memory, Module, Process, SigSig, Wire, WireId};
pub use sigmap::{SigMap, SigPool};
pub use sigspec::{SigBit, SigChunk, SigSpec};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("Invalid constant literal: {0}")]
    InvalidConst(String),
    #[error("Module {0} already exists")]
    DuplicateModule(String),
    #[error("Module {0} not found")]
    ModuleNotFound(String),
    #[error("Module {module} declares {kind} {name} twice")]
    DuplicateName {
        module: String,
        kind: &'static str,
        name: String,
    },
    #[error("Module {module}: {context} references missing bit {offset} of wire {wire}")]
    DanglingWire {
        module: String,
        context: String,
        wire: WireId,
        offset: u32,
    },
    #[error("Module {module}: connection {index} joins {lhs} bits to {rhs} bits")]
    ConnectionWidth {
        module: String,
        index: usize,
        lhs: usize,
        rhs: usize,
    },
}

pub type IrResult<T> = Result<T, IrError>;
