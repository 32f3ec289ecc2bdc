//! Combinational assertion checking
//!
//! Imports a whole module into one session, treats `$assume` obligations as
//! hard constraints and asks the solver for an assignment that violates at
//! least one `$assert`.

use crate::registry::EngineRegistry;
use crate::satgen::{SatGen, COMBINATIONAL};
use crate::{Counterexample, FormalResult, TraceStep};
use std::collections::BTreeMap;
use tracing::{info, warn};
use xsens_ir::{IdString, Module};

#[derive(Debug, Clone, Default)]
pub struct ProveOptions {
    /// Model undefined values instead of treating x as an arbitrary boolean
    pub model_undef: bool,
    /// Engine name; the registry default when unset
    pub engine: Option<String>,
}

impl ProveOptions {
    pub fn with_model_undef(mut self, model_undef: bool) -> Self {
        self.model_undef = model_undef;
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }
}

#[derive(Debug, Clone)]
pub enum ProofOutcome {
    Proved,
    Failed(Counterexample),
}

#[derive(Debug, Clone)]
pub struct ProofReport {
    pub outcome: ProofOutcome,
    pub asserts: usize,
    pub assumes: usize,
    /// Cells left unconstrained because no encoder supports them
    pub unsupported: Vec<IdString>,
}

impl ProofReport {
    pub fn is_proved(&self) -> bool {
        matches!(self.outcome, ProofOutcome::Proved)
    }
}

pub fn prove_asserts(
    module: &Module,
    registry: &EngineRegistry,
    options: &ProveOptions,
) -> FormalResult<ProofReport> {
    let engine = registry.create(options.engine.as_deref())?;
    info!(
        "Proving asserts of {} with engine {}{}",
        module.name,
        engine.name(),
        if options.model_undef { " (modeling undef)" } else { "" }
    );

    let mut sat = SatGen::new(engine, module).with_model_undef(options.model_undef);
    let unsupported: Vec<IdString> = sat
        .import_module(COMBINATIONAL)
        .into_iter()
        .map(|id| module.cell(id).name.clone())
        .collect();
    if !unsupported.is_empty() {
        warn!(
            "{} cells have no encoder, their outputs are unconstrained",
            unsupported.len()
        );
    }

    let mut asserts = Vec::new();
    let mut assumes = 0;
    for cell in module.cells() {
        if cell.is_type("$assume") {
            let lit = sat.import_property_cell(cell, COMBINATIONAL);
            sat.assume(lit);
            assumes += 1;
        } else if cell.is_type("$assert") {
            asserts.push(sat.import_property_cell(cell, COMBINATIONAL));
        }
    }

    // import the reported wires before solving so the model covers them
    let mut watched = Vec::new();
    for wire in module.wires().filter(|w| w.name.is_public()) {
        let sig = module.wire_sig(wire.id);
        let values = sat.import_sig_spec(&sig, COMBINATIONAL);
        let undefs = if options.model_undef {
            Some(sat.import_undef_sig_spec(&sig, COMBINATIONAL))
        } else {
            None
        };
        watched.push((wire.name.to_string(), values, undefs));
    }

    let all_hold = sat.engine_mut().and_all(&asserts);
    let outcome = match sat.solve(&[!all_hold])? {
        None => ProofOutcome::Proved,
        Some(model) => {
            let mut assignments = BTreeMap::new();
            for (name, values, undefs) in &watched {
                let text: String = (0..values.len())
                    .rev()
                    .map(|i| match undefs {
                        Some(u) if model.value(u[i]) => 'x',
                        _ if model.value(values[i]) => '1',
                        _ => '0',
                    })
                    .collect();
                assignments.insert(name.clone(), text);
            }
            ProofOutcome::Failed(Counterexample {
                length: 1,
                trace: vec![TraceStep {
                    step: 0,
                    assignments,
                }],
            })
        }
    };

    match &outcome {
        ProofOutcome::Proved => info!("All {} asserts hold", asserts.len()),
        ProofOutcome::Failed(_) => info!("Found an assignment violating an assert"),
    }
    Ok(ProofReport {
        outcome,
        asserts: asserts.len(),
        assumes,
        unsupported,
    })
}
