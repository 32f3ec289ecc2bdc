//! Path sensitization miter
//!
//! `sensitizepath` builds a module holding two copies of a source module.
//! Path A keeps the original wires and cells; path B gets a shadow wire
//! for every wire and a `__b` copy of every cell. Each public wire gets an
//! `__is_x` divergence wire that is set when the two paths disagree.
//!
//! A comparison against an all-x constant (`sig === 'x`, `sig !== 'x`) is
//! replaced by a comparison of `sig` between the two paths, which turns
//! "can this signal be x" into "can the two paths be driven apart".
//!
//! With `-constrain_undef`, every undriven signal and every x constant is
//! shared between both paths so that only genuine x sources remain free.

use crate::{Pass, PassError, PassSummary, Result};
use std::collections::HashMap;
use tracing::{debug, info};
use xsens_ir::{
    celltypes, escape_id, Cell, CellId, Design, IdString, Module, SigBit, SigChunk, SigMap,
    SigPool, SigSig, SigSpec, State, WireId,
};

const HELP: &str = "\
    sensitizepath [options] src_module miter_module

This creates a miter module for formal with two copies of the input module
and converts comparisons of the form (sig === 'x) and (sig !== 'x) into a
comparison between the values of sig in the two copies. This is used in
formal to prove that a signal is defined, or that the value of one net
cannot influence the value of another net.

    -constrain_inputs
        Forces the inputs to the module to be defined.

    -constrain_undef
        Constrain undriven wires, x constants and module inputs to take the
        same value in both circuits.
";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensitizeOptions {
    /// Drive path B inputs from path A instead of free sources
    pub constrain_inputs: bool,
    /// Share undriven signals and x constants between the paths
    pub constrain_undef: bool,
}

/// Counts of what the miter construction added
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiterStats {
    pub shadow_wires: usize,
    pub shadow_cells: usize,
    pub divergence_wires: usize,
    pub converted_comparisons: usize,
    pub free_sources: usize,
    pub constrained_undriven: usize,
}

pub struct SensitizePath {
    defaults: SensitizeOptions,
}

impl Default for SensitizePath {
    fn default() -> Self {
        Self::new()
    }
}

impl SensitizePath {
    pub fn new() -> Self {
        Self {
            defaults: SensitizeOptions::default(),
        }
    }

    /// Options in effect before the command line flags are applied
    pub fn with_defaults(mut self, defaults: SensitizeOptions) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Pass for SensitizePath {
    fn name(&self) -> &str {
        "sensitizepath"
    }

    fn short_help(&self) -> &str {
        "create a miter circuit for path sensitization"
    }

    fn help(&self) -> &str {
        HELP
    }

    fn execute(&self, args: &[String], design: &mut Design) -> Result<PassSummary> {
        let mut options = self.defaults;
        let mut argidx = 1;
        while argidx < args.len() {
            match args[argidx].as_str() {
                "-constrain_inputs" => options.constrain_inputs = true,
                "-constrain_undef" => options.constrain_undef = true,
                arg if arg.starts_with('-') => {
                    return Err(PassError::UnknownOption {
                        pass: self.name().to_string(),
                        option: arg.to_string(),
                    });
                }
                _ => break,
            }
            argidx += 1;
        }

        if args.len() != argidx + 2 {
            return Err(PassError::InvalidArguments {
                pass: self.name().to_string(),
                message: "Invalid number of module arguments.".to_string(),
            });
        }

        let stats = build_miter(design, &args[argidx], &args[argidx + 1], options)?;

        let mut summary = PassSummary::new(self.name());
        summary.changed = true;
        summary.add_extra("shadow wires", stats.shadow_wires);
        summary.add_extra("shadow cells", stats.shadow_cells);
        summary.add_extra("divergence wires", stats.divergence_wires);
        summary.add_extra("converted comparisons", stats.converted_comparisons);
        summary.add_extra("free sources", stats.free_sources);
        if options.constrain_undef {
            summary.add_extra("constrained undriven chunks", stats.constrained_undriven);
        }
        Ok(summary)
    }
}

/// Build the miter of `src_module` as a new module `miter_module`.
///
/// All checks run before the design is touched; on error the design is
/// unchanged.
pub fn build_miter(
    design: &mut Design,
    src_module: &str,
    miter_module: &str,
    options: SensitizeOptions,
) -> Result<MiterStats> {
    let src_name = escape_id(src_module);
    let miter_name = escape_id(miter_module);

    let source = design
        .module(src_name.as_str())
        .ok_or_else(|| PassError::ModuleNotFound(src_module.to_string()))?;
    if design.has_module(miter_name.as_str()) {
        return Err(PassError::ModuleExists(miter_module.to_string()));
    }
    if source.has_memories() || source.has_processes() {
        return Err(PassError::UnsupportedContent {
            module: src_module.to_string(),
            content: "memories or processes".to_string(),
        });
    }

    if let Some(name) = generated_name_collision(source, options) {
        return Err(PassError::NameCollision {
            module: src_module.to_string(),
            name: name.to_string(),
        });
    }

    info!("Executing SENSITIZEPATH pass (creating path sensitization miter)");

    let mut miter = Module::new(miter_name);
    source.clone_into(&mut miter);
    let stats = MiterBuilder::new(&mut miter, options).run();

    info!(
        "Built miter {} from {}: {} shadow cells, {} divergence wires",
        miter.name, src_name, stats.shadow_cells, stats.divergence_wires
    );
    design.add_module(miter)?;
    Ok(stats)
}

/// Name of the path B copy of a cell
fn label_b(cell: &Cell) -> IdString {
    cell.name.with_suffix("__b")
}

/// `sig === 'x` or `sig !== 'x` with one side an all-x constant
fn is_x_comparison(sigmap: &SigMap, cell: &Cell) -> bool {
    cell.type_in(&["$eqx", "$nex"])
        && (sigmap.map(&cell.port("A")).is_fully_undef()
            || sigmap.map(&cell.port("B")).is_fully_undef())
}

/// Cells that get a `__b` copy in path B
fn needs_shadow_cell(cell: &Cell, sigmap: &SigMap, options: SensitizeOptions) -> bool {
    if cell.type_in(&["$assert", "$live", "$cover"])
        || celltypes::is_nondeterministic_source(cell.cell_type.as_str())
    {
        return false;
    }
    options.constrain_undef || !is_x_comparison(sigmap, cell)
}

/// First name the miter would add that the source module already uses
fn generated_name_collision(source: &Module, options: SensitizeOptions) -> Option<IdString> {
    let divergence = source
        .wires()
        .filter(|wire| wire.name.is_public())
        .map(|wire| wire.name.with_suffix("__is_x"))
        .find(|name| source.find_wire(name.as_str()).is_some());
    if divergence.is_some() {
        return divergence;
    }

    let sigmap = SigMap::from_module(source);
    source
        .cells()
        .filter(|cell| needs_shadow_cell(cell, &sigmap, options))
        .map(label_b)
        .find(|name| source.find_cell(name.as_str()).is_some())
}

/// Single forward pass over a freshly cloned module: instrument wires,
/// rewire cells, mirror connections, then constrain undriven signals and
/// commit every new connection at once.
struct MiterBuilder<'m> {
    miter: &'m mut Module,
    options: SensitizeOptions,
    sigmap: SigMap,
    wire_map: HashMap<WireId, WireId>,
    undriven: SigPool,
    new_connections: Vec<SigSig>,
    stats: MiterStats,
}

impl<'m> MiterBuilder<'m> {
    fn new(miter: &'m mut Module, options: SensitizeOptions) -> Self {
        let sigmap = SigMap::from_module(miter);
        Self {
            miter,
            options,
            sigmap,
            wire_map: HashMap::new(),
            undriven: SigPool::new(),
            new_connections: Vec::new(),
            stats: MiterStats::default(),
        }
    }

    fn run(mut self) -> MiterStats {
        let wires = self.miter.wire_ids();
        let cells = self.miter.cell_ids();
        // re-emitted for both paths below
        let connections = self.miter.take_connections();

        for wire in wires {
            self.instrument_wire(wire);
        }
        for cell in cells {
            self.rewire_cell(cell);
        }
        for (lhs, rhs) in connections {
            self.mirror_connection(lhs, rhs);
        }
        if self.options.constrain_undef {
            self.constrain_undriven();
        }

        debug!(
            "Committing {} connections to {}",
            self.new_connections.len(),
            self.miter.name
        );
        let new_connections = std::mem::take(&mut self.new_connections);
        self.miter.new_connections(new_connections);
        self.miter.fixup_ports();
        self.stats
    }

    fn connect(&mut self, lhs: SigSpec, rhs: SigSpec) {
        assert_eq!(lhs.len(), rhs.len());
        self.new_connections.push((lhs, rhs));
    }

    fn free_source(&mut self, width: usize) -> SigSpec {
        let name = self.miter.auto_id();
        self.stats.free_sources += 1;
        self.miter.anyseq(name, width)
    }

    /// Map path A wires to their path B shadows
    fn rewrite(&self, sig: &SigSpec) -> SigSpec {
        sig.map_wires(|wire| self.wire_map[&wire])
    }

    /// Path A and path B versions of `sig` where every run of x constants
    /// is replaced by one free source shared by both paths
    fn rewrite_constrain(&mut self, sig: &SigSpec) -> (SigSpec, SigSpec) {
        let mut sig_a = SigSpec::new();
        let mut sig_b = SigSpec::new();

        for chunk in sig.chunks() {
            let data = match chunk {
                SigChunk::Wire { .. } => {
                    let bits = chunk.to_sigspec();
                    sig_b.append(&self.rewrite(&bits));
                    sig_a.append(&bits);
                    continue;
                }
                SigChunk::Const(data) => data,
            };

            let mut x_len = 0;
            for state in data {
                if state == State::Sx {
                    x_len += 1;
                    continue;
                }
                if x_len > 0 {
                    let shared = self.free_source(x_len);
                    sig_a.append(&shared);
                    sig_b.append(&shared);
                    x_len = 0;
                }
                sig_a.push(SigBit::Const(state));
                sig_b.push(SigBit::Const(state));
            }
            if x_len > 0 {
                let shared = self.free_source(x_len);
                sig_a.append(&shared);
                sig_b.append(&shared);
            }
        }

        assert_eq!(sig_a.len(), sig.len());
        (sig_a, sig_b)
    }

    fn instrument_wire(&mut self, wire_a: WireId) {
        let template = self.miter.wire(wire_a).clone();
        let name = self.miter.auto_id();
        let wire_b = self.miter.add_wire_like(name, &template);
        {
            let wire = self.miter.wire_mut(wire_b);
            wire.port_input = false;
            wire.port_output = false;
            wire.port_id = 0;
        }
        self.wire_map.insert(wire_a, wire_b);
        self.stats.shadow_wires += 1;

        let sig_a = self.miter.wire_sig(wire_a);
        let sig_b = self.miter.wire_sig(wire_b);

        if template.name.is_public() {
            let x_name = template.name.with_suffix("__is_x");
            let wire_x = self.miter.add_wire(x_name, 1);
            self.miter.wire_mut(wire_x).set_bool_attribute("keep", true);
            let y = self.miter.wire_sig(wire_x);
            let nex_name = self.miter.auto_id();
            self.miter.add_nex(nex_name, sig_a.clone(), sig_b.clone(), y);
            self.stats.divergence_wires += 1;
        }

        if self.options.constrain_undef {
            let canonical = self.sigmap.map(&sig_a);
            self.undriven.add(&canonical);
            return;
        }

        if template.port_input {
            if self.options.constrain_inputs {
                self.connect(sig_b, sig_a);
            } else {
                let free = self.free_source(sig_b.len());
                self.connect(sig_b, free);
            }
        }
    }

    fn rewire_cell(&mut self, id: CellId) {
        let cell = self.miter.cell(id).clone();
        let cell_type = cell.cell_type.as_str();

        if self.options.constrain_undef {
            for (port, sig) in &cell.connections {
                if !celltypes::is_known(cell_type) || celltypes::is_output(cell_type, port.as_str())
                {
                    let canonical = self.sigmap.map(sig);
                    self.undriven.del(&canonical);
                }
            }
        }

        // both paths are symmetric, one copy of each check is enough
        if cell.type_in(&["$assert", "$live", "$cover"]) {
            return;
        }

        // explicit free values are not x sources: both paths see the same value
        if celltypes::is_nondeterministic_source(cell_type) {
            let y = cell.port("Y");
            let y_b = self.rewrite(&y);
            self.connect(y_b, y);
            return;
        }

        if !needs_shadow_cell(&cell, &self.sigmap, self.options) {
            self.convert_x_equality(&cell);
            return;
        }

        let cell_b = self.miter.add_cell_like(label_b(&cell), &cell);
        self.stats.shadow_cells += 1;
        for (port, sig) in &cell.connections {
            if self.options.constrain_undef {
                let (sig_a, sig_b) = self.rewrite_constrain(sig);
                self.miter.cell_mut(id).set_port(port.as_str(), sig_a);
                self.miter.cell_mut(cell_b).set_port(port.as_str(), sig_b);
            } else {
                let sig_b = self.rewrite(sig);
                self.miter.cell_mut(cell_b).set_port(port.as_str(), sig_b);
            }
        }
    }

    /// Replace `sig === 'x` by `sig_a !== sig_b` (and `!==` by `===`).
    /// `cell` must be an x comparison.
    fn convert_x_equality(&mut self, cell: &Cell) {
        let mut sig_a = self.sigmap.map(&cell.port("A"));
        let mut sig_b = self.sigmap.map(&cell.port("B"));

        if sig_a.is_fully_undef() {
            sig_a = self.rewrite(&sig_b);
        } else {
            sig_b = self.rewrite(&sig_a);
        }
        debug!(
            "Converting {} cell {} on {}",
            cell.cell_type,
            cell.name,
            self.miter.describe(&sig_a)
        );

        let name = self.miter.auto_id();
        let mut eq_wire = if cell.is_type("$eqx") {
            self.miter.nex(name, sig_a, sig_b)
        } else {
            self.miter.eqx(name, sig_a, sig_b)
        };

        let sig_y = cell.port("Y");
        while eq_wire.len() < sig_y.len() {
            eq_wire.push(SigBit::Const(State::S0));
        }
        let sig_y_b = self.rewrite(&sig_y);
        self.connect(sig_y, eq_wire.clone());
        self.connect(sig_y_b, eq_wire);

        self.miter.remove_cell(cell.id);
        self.stats.converted_comparisons += 1;
    }

    fn mirror_connection(&mut self, lhs: SigSpec, rhs: SigSpec) {
        let lhs_b = self.rewrite(&lhs);
        if self.options.constrain_undef {
            let (rhs_a, rhs_b) = self.rewrite_constrain(&rhs);
            self.connect(lhs, rhs_a);
            self.connect(lhs_b, rhs_b);
        } else {
            let rhs_b = self.rewrite(&rhs);
            self.connect(lhs, rhs);
            self.connect(lhs_b, rhs_b);
        }
    }

    /// Drive every bit that no cell drives: inputs feed their shadow,
    /// everything else gets one free source shared by both paths
    fn constrain_undriven(&mut self) {
        let undriven = self.undriven.export_all();
        for chunk in undriven.chunks() {
            let SigChunk::Wire {
                wire,
                offset,
                width,
            } = chunk
            else {
                continue;
            };
            let chunk_a = chunk.to_sigspec();
            let chunk_b = SigChunk::Wire {
                wire: self.wire_map[&wire],
                offset,
                width,
            }
            .to_sigspec();
            debug!("Constraining undriven {}", self.miter.describe(&chunk_a));

            if self.miter.wire(wire).port_input {
                self.connect(chunk_b, chunk_a);
            } else {
                let shared = self.free_source(width as usize);
                self.connect(chunk_a, shared.clone());
                self.connect(chunk_b, shared);
            }
            self.stats.constrained_undriven += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PassRegistry;
    use xsens_ir::{Const, Memory, Process};

    fn inverter() -> Design {
        let mut m = Module::new(escape_id("top"));
        let a = m.add_input(escape_id("a"), 2);
        let y = m.add_output(escape_id("y"), 2);
        let (a, y) = (m.wire_sig(a), m.wire_sig(y));
        let u = m.add_cell(escape_id("u"), "$not");
        let cell = m.cell_mut(u);
        cell.set_param("A_SIGNED", Const::from_bool(false));
        cell.set_port("A", a);
        cell.set_port("Y", y);
        let mut design = Design::new();
        design.add_module(m).unwrap();
        design
    }

    fn run(design: &mut Design, line: &str) -> Result<PassSummary> {
        PassRegistry::default().run_line(line, design)
    }

    #[test]
    fn test_shadow_structure() {
        let mut design = inverter();
        let stats = build_miter(&mut design, "top", "miter", SensitizeOptions::default()).unwrap();
        assert_eq!(stats.shadow_wires, 2);
        assert_eq!(stats.shadow_cells, 1);
        assert_eq!(stats.divergence_wires, 2);
        assert_eq!(stats.free_sources, 1);

        let miter = design.module("\\miter").unwrap();
        let u = miter.cell(miter.find_cell("\\u").unwrap());
        let u_b = miter.cell(miter.find_cell("\\u__b").unwrap());
        assert_eq!(u_b.cell_type, u.cell_type);
        assert_eq!(u_b.param("A_SIGNED"), Some(&Const::from_bool(false)));
        assert_ne!(u_b.port("A"), u.port("A"));
        assert_eq!(u_b.port("A").len(), 2);

        let a_b = u_b.port("A")[0].wire_id().unwrap();
        assert!(!miter.wire(a_b).is_port());
        assert!(!miter.wire(a_b).name.is_public());
        assert_eq!(miter.ports().len(), 2);

        let is_x = miter.wire(miter.find_wire("\\a__is_x").unwrap());
        assert_eq!(is_x.width, 1);
        assert!(is_x.get_bool_attribute("keep"));

        // the source module is untouched
        assert_eq!(design.module("\\top").unwrap().cells().count(), 1);
    }

    #[test]
    fn test_inputs_of_path_b() {
        let mut design = inverter();
        run(&mut design, "sensitizepath top free").unwrap();
        run(&mut design, "sensitizepath -constrain_inputs top tied").unwrap();

        let free = design.module("\\free").unwrap();
        let a = free.wire_sig(free.find_wire("\\a").unwrap());
        assert!(free.connections().iter().all(|(_, rhs)| *rhs != a));
        assert_eq!(free.cells().filter(|c| c.is_type("$anyseq")).count(), 1);

        let tied = design.module("\\tied").unwrap();
        let a = tied.wire_sig(tied.find_wire("\\a").unwrap());
        let u_b = tied.cell(tied.find_cell("\\u__b").unwrap());
        assert!(tied.connections().contains(&(u_b.port("A"), a)));
        assert_eq!(tied.cells().filter(|c| c.is_type("$anyseq")).count(), 0);
    }

    #[test]
    fn test_properties_and_sources() {
        let mut design = inverter();
        let m = design.module_mut("\\top").unwrap();
        let y = m.wire_sig(m.find_wire("\\y").unwrap());
        let one = SigSpec::repeat(State::S1, 1);
        for (name, ty) in [("chk", "$assert"), ("cov", "$cover"), ("asm", "$assume")] {
            let id = m.add_cell(escape_id(name), ty);
            m.cell_mut(id).set_port("A", y.extract(0, 1));
            m.cell_mut(id).set_port("EN", one.clone());
        }
        let r = m.add_wire(escape_id("r"), 3);
        let r = m.wire_sig(r);
        let src = m.add_cell(escape_id("src"), "$anyconst");
        m.cell_mut(src).set_port("Y", r.clone());

        run(&mut design, "sensitizepath top miter").unwrap();
        let miter = design.module("\\miter").unwrap();
        assert!(miter.find_cell("\\chk__b").is_none());
        assert!(miter.find_cell("\\cov__b").is_none());
        assert!(miter.find_cell("\\asm__b").is_some());
        assert!(miter.find_cell("\\src__b").is_none());
        assert!(miter
            .connections()
            .iter()
            .any(|(lhs, rhs)| *rhs == r && *lhs != r && lhs.len() == 3));
    }

    #[test]
    fn test_user_errors_leave_design_unchanged() {
        let mut design = inverter();
        let err = run(&mut design, "sensitizepath -fast top miter").unwrap_err();
        assert!(matches!(err, PassError::UnknownOption { ref option, .. } if option == "-fast"));

        let err = run(&mut design, "sensitizepath top").unwrap_err();
        assert!(matches!(err, PassError::InvalidArguments { .. }));
        let err = run(&mut design, "sensitizepath top miter extra").unwrap_err();
        assert!(matches!(err, PassError::InvalidArguments { .. }));

        let err = run(&mut design, "sensitizepath nothere miter").unwrap_err();
        assert_eq!(err, PassError::ModuleNotFound("nothere".to_string()));

        let err = run(&mut design, "sensitizepath top top").unwrap_err();
        assert_eq!(err, PassError::ModuleExists("top".to_string()));

        assert_eq!(design.modules.len(), 1);
    }

    #[test]
    fn test_generated_names_must_be_free() {
        let mut design = inverter();
        design
            .module_mut("\\top")
            .unwrap()
            .add_wire(escape_id("a__is_x"), 1);
        let err = run(&mut design, "sensitizepath top miter").unwrap_err();
        assert_eq!(
            err,
            PassError::NameCollision {
                module: "top".to_string(),
                name: "a__is_x".to_string(),
            }
        );
        assert_eq!(design.modules.len(), 1);

        let mut design = inverter();
        design
            .module_mut("\\top")
            .unwrap()
            .add_cell(escape_id("u__b"), "$not");
        let err = run(&mut design, "sensitizepath top miter").unwrap_err();
        assert!(matches!(err, PassError::NameCollision { ref name, .. } if name == "u__b"));
        assert!(!design.has_module("\\miter"));
    }

    #[test]
    fn test_converted_comparison_needs_no_copy_name() {
        let mut design = inverter();
        let top = design.module_mut("\\top").unwrap();
        let a = top.wire_sig(top.find_wire("\\a").unwrap());
        let hit = top.add_wire(escape_id("hit"), 1);
        let hit = top.wire_sig(hit);
        top.add_eqx(escape_id("cmp"), a, Module::undef_sig(2), hit);
        top.add_cell(escape_id("cmp__b"), "$assert");

        let summary = run(&mut design, "sensitizepath top miter").unwrap();
        assert!(summary.changed);
        let miter = design.module("\\miter").unwrap();
        assert!(miter.find_cell("\\cmp").is_none());
        assert!(miter.find_cell("\\cmp__b").is_some());
    }

    #[test]
    fn test_memories_and_processes_rejected() {
        let mut design = inverter();
        design.module_mut("\\top").unwrap().memories.insert(
            escape_id("mem"),
            Memory {
                name: escape_id("mem"),
                width: 8,
                size: 16,
            },
        );
        let err = run(&mut design, "sensitizepath top miter").unwrap_err();
        assert!(matches!(err, PassError::UnsupportedContent { .. }));

        let mut design = inverter();
        design.module_mut("\\top").unwrap().processes.insert(
            escape_id("proc"),
            Process {
                name: escape_id("proc"),
            },
        );
        assert!(run(&mut design, "sensitizepath top miter").is_err());
        assert!(!design.has_module("\\miter"));
    }

    #[test]
    fn test_configured_defaults() {
        let mut registry = PassRegistry::new();
        registry.register(Box::new(SensitizePath::new().with_defaults(SensitizeOptions {
            constrain_inputs: true,
            constrain_undef: false,
        })));
        let mut design = inverter();
        let summary = registry.run_line("sensitizepath top miter", &mut design).unwrap();
        assert!(summary.changed);
        let miter = design.module("\\miter").unwrap();
        assert_eq!(miter.cells().filter(|c| c.is_type("$anyseq")).count(), 0);
    }
}
