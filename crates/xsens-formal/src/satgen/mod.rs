//! Encoding session
//!
//! A `SatGen` owns one formula under construction and the table of
//! imported signals. Every wire bit imported under the same scope
//! (prefix, timestep, undef flag) maps to the same literal for the whole
//! life of the session, and distinct (scope, bit) pairs never share one.
//! Literals are never shared across sessions.

mod cells;
mod extend;
mod property;
mod structural;
mod undef;

use crate::engine::{Lit, Model, SatEngine};
use crate::FormalResult;
use std::collections::HashMap;
use tracing::trace;
use xsens_ir::{Module, SigBit, SigMap, SigPool, SigSpec, State};

/// Timestep of a combinational (not unrolled) encoding
pub const COMBINATIONAL: i32 = -1;

/// Key of one import scope in the imported-signal table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    pub prefix: String,
    pub timestep: i32,
    pub undef: bool,
}

impl ScopeKey {
    /// Prefix of the solver-side literal names in this scope.
    ///
    /// Names are debug labels only; two scopes may print the same prefix.
    /// Literal identity comes from the import table.
    pub fn literal_prefix(&self) -> String {
        let mut pf = String::new();
        if self.undef {
            pf.push_str("undef:");
        }
        pf.push_str(&self.prefix);
        if self.timestep != COMBINATIONAL {
            pf.push_str(&format!("@{}:", self.timestep));
        }
        pf
    }
}

pub struct SatGen<'a> {
    ez: Box<dyn SatEngine>,
    module: &'a Module,
    sigmap: SigMap,
    prefix: String,
    imported_signals: HashMap<ScopeKey, HashMap<SigBit, Lit>>,
    initstates: HashMap<(String, i32), bool>,
    initial_state: SigPool,
    model_undef: bool,
}

impl<'a> SatGen<'a> {
    /// Session over `module`, canonicalizing signals through its connections
    pub fn new(ez: Box<dyn SatEngine>, module: &'a Module) -> Self {
        Self::with_sigmap(ez, module, SigMap::from_module(module))
    }

    pub fn with_sigmap(ez: Box<dyn SatEngine>, module: &'a Module, sigmap: SigMap) -> Self {
        Self {
            ez,
            module,
            sigmap,
            prefix: String::new(),
            imported_signals: HashMap::new(),
            initstates: HashMap::new(),
            initial_state: SigPool::new(),
            model_undef: false,
        }
    }

    pub fn with_model_undef(mut self, model_undef: bool) -> Self {
        self.model_undef = model_undef;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Switch module, canonicalizer and name prefix.
    ///
    /// Literals imported under the previous context stay cached.
    pub fn set_context(&mut self, module: &'a Module, sigmap: SigMap, prefix: &str) {
        self.module = module;
        self.sigmap = sigmap;
        self.prefix = prefix.to_string();
    }

    pub fn model_undef(&self) -> bool {
        self.model_undef
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    pub fn sigmap(&self) -> &SigMap {
        &self.sigmap
    }

    pub fn engine(&self) -> &dyn SatEngine {
        self.ez.as_ref()
    }

    pub fn engine_mut(&mut self) -> &mut dyn SatEngine {
        self.ez.as_mut()
    }

    pub fn into_engine(self) -> Box<dyn SatEngine> {
        self.ez
    }

    /// Wire bits recorded as initial state while encoding timestep 1
    pub fn initial_state(&self) -> &SigPool {
        &self.initial_state
    }

    pub fn assume(&mut self, lit: Lit) {
        self.ez.assume(lit);
    }

    pub fn solve(&mut self, assumptions: &[Lit]) -> FormalResult<Option<Model>> {
        self.ez.solve(assumptions)
    }

    fn scope_key(&self, timestep: i32, undef: bool) -> ScopeKey {
        ScopeKey {
            prefix: self.prefix.clone(),
            timestep,
            undef,
        }
    }

    fn import_worker(
        &mut self,
        sig: &SigSpec,
        timestep: i32,
        undef_mode: bool,
        dup_undef: bool,
    ) -> Vec<Lit> {
        assert_ne!(timestep, 0, "timestep 0 is reserved");
        assert!(
            !undef_mode || self.model_undef,
            "undef import without undef modeling"
        );

        let key = self.scope_key(timestep, undef_mode);
        let sig = self.sigmap.map(sig);
        let mut lits = Vec::with_capacity(sig.len());

        for bit in sig.iter() {
            let lit = match *bit {
                SigBit::Const(state) => {
                    if self.model_undef && dup_undef && state == State::Sx {
                        self.ez.frozen_literal()
                    } else if undef_mode {
                        Lit::from_bool(state == State::Sx)
                    } else {
                        Lit::from_bool(state == State::S1)
                    }
                }
                SigBit::Wire { .. } => {
                    if let Some(lit) = self.imported_signals.get(&key).and_then(|m| m.get(bit)) {
                        *lit
                    } else {
                        let name = format!("{}{}", key.literal_prefix(), self.module.bit_name(bit));
                        let lit = self.ez.frozen_literal();
                        self.ez.label_literal(lit, &name);
                        trace!("Imported {} as {}", name, lit);
                        self.imported_signals
                            .entry(key.clone())
                            .or_default()
                            .insert(*bit, lit);
                        lit
                    }
                }
            };
            lits.push(lit);
        }
        lits
    }

    pub fn import_sig_spec(&mut self, sig: &SigSpec, timestep: i32) -> Vec<Lit> {
        self.import_worker(sig, timestep, false, false)
    }

    /// Value import for cell definitions: every undefined constant bit
    /// gets its own fresh literal under undef modeling
    pub fn import_def_sig_spec(&mut self, sig: &SigSpec, timestep: i32) -> Vec<Lit> {
        self.import_worker(sig, timestep, false, true)
    }

    /// Import the undef flags of `sig`; requires undef modeling
    pub fn import_undef_sig_spec(&mut self, sig: &SigSpec, timestep: i32) -> Vec<Lit> {
        self.import_worker(sig, timestep, true, false)
    }

    pub fn import_sig_bit(&mut self, bit: SigBit, timestep: i32) -> Lit {
        self.import_worker(&SigSpec::from(bit), timestep, false, false)[0]
    }

    pub fn import_def_sig_bit(&mut self, bit: SigBit, timestep: i32) -> Lit {
        self.import_worker(&SigSpec::from(bit), timestep, false, true)[0]
    }

    pub fn import_undef_sig_bit(&mut self, bit: SigBit, timestep: i32) -> Lit {
        self.import_worker(&SigSpec::from(bit), timestep, true, false)[0]
    }

    /// Whether `bit` already has a value literal at `timestep` in the
    /// current scope. Constants always count as imported.
    pub fn imported_sig_bit(&self, bit: SigBit, timestep: i32) -> bool {
        assert_ne!(timestep, 0, "timestep 0 is reserved");
        let bit = self.sigmap.map_bit(bit);
        if !bit.is_wire() {
            return true;
        }
        self.imported_signals
            .get(&self.scope_key(timestep, false))
            .is_some_and(|m| m.contains_key(&bit))
    }

    /// Mark `timestep` as the initial state of the current prefix
    pub fn set_init_state(&mut self, timestep: i32) {
        let key = (self.prefix.clone(), timestep);
        let previous = self.initstates.get(&key).copied();
        assert!(
            previous.is_none() || previous == Some(true),
            "timestep {} was already encoded as a non-initial state",
            timestep
        );
        self.initstates.insert(key, true);
    }

    pub fn is_init_state(&self, timestep: i32) -> bool {
        self.initstates
            .get(&(self.prefix.clone(), timestep))
            .copied()
            .unwrap_or(false)
    }

    /// Read the initial-state flag for an `$initstate` cell. An unset flag
    /// is frozen to false so the timestep can no longer become initial.
    fn claim_init_state(&mut self, timestep: i32) -> bool {
        *self
            .initstates
            .entry((self.prefix.clone(), timestep))
            .or_insert(false)
    }

    fn record_initial_state(&mut self, sig: &SigSpec) {
        let sig = self.sigmap.map(sig);
        self.initial_state.add(&sig);
    }
}
