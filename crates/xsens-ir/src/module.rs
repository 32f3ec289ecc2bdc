//! Modules, wires and cells

use crate::constant::{Const, State};
use crate::id::IdString;
use crate::sigspec::{SigBit, SigChunk, SigSpec};
use crate::{IrError, IrResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a wire within one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireId(pub u32);

/// Unique identifier for a cell within one module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(pub u32);

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// A direct connection: `lhs` is driven by `rhs`
pub type SigSig = (SigSpec, SigSpec);

// ============================================================================
// Wires and Cells
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub id: WireId,
    pub name: IdString,
    pub width: u32,
    #[serde(default)]
    pub port_input: bool,
    #[serde(default)]
    pub port_output: bool,
    /// Position in the port list (1-based, 0 for internal wires)
    #[serde(default)]
    pub port_id: u32,
    #[serde(default)]
    pub attributes: IndexMap<IdString, Const>,
}

impl Wire {
    pub fn is_port(&self) -> bool {
        self.port_input || self.port_output
    }

    pub fn set_bool_attribute(&mut self, name: &str, value: bool) {
        if value {
            self.attributes.insert(IdString::new(name), Const::from_bool(true));
        } else {
            self.attributes.shift_remove(name);
        }
    }

    pub fn get_bool_attribute(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|c| c.as_bool())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub name: IdString,
    /// Internal cell type such as `$and` or `$eqx`
    pub cell_type: IdString,
    #[serde(default)]
    pub parameters: IndexMap<IdString, Const>,
    #[serde(default)]
    pub connections: IndexMap<IdString, SigSpec>,
    #[serde(default)]
    pub attributes: IndexMap<IdString, Const>,
}

impl Cell {
    pub fn is_type(&self, cell_type: &str) -> bool {
        self.cell_type == cell_type
    }

    pub fn type_in(&self, types: &[&str]) -> bool {
        types.iter().any(|t| self.cell_type == *t)
    }

    pub fn has_port(&self, port: &str) -> bool {
        self.connections.contains_key(port)
    }

    /// Connected signal of `port`, empty when unconnected
    pub fn port(&self, port: &str) -> SigSpec {
        self.connections.get(port).cloned().unwrap_or_default()
    }

    pub fn set_port(&mut self, port: &str, sig: SigSpec) {
        self.connections.insert(IdString::new(port), sig);
    }

    pub fn param(&self, name: &str) -> Option<&Const> {
        self.parameters.get(name)
    }

    /// A parameter read as a flag; absent parameters are false
    pub fn param_bool(&self, name: &str) -> bool {
        self.param(name).is_some_and(|c| c.as_bool())
    }

    pub fn set_param(&mut self, name: &str, value: Const) {
        self.parameters.insert(IdString::new(name), value);
    }
}

/// A memory that has not yet been lowered to cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub name: IdString,
    pub width: u32,
    pub size: u32,
}

/// A behavioral process that has not yet been lowered to cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub name: IdString,
}

// ============================================================================
// Module
// ============================================================================

/// Serialized form of a module; the name indexes are rebuilt on load
#[derive(Clone, Serialize, Deserialize)]
struct ModuleRepr {
    name: IdString,
    #[serde(default)]
    wires: Vec<Wire>,
    #[serde(default)]
    cells: Vec<Cell>,
    #[serde(default)]
    connections: Vec<SigSig>,
    #[serde(default)]
    memories: IndexMap<IdString, Memory>,
    #[serde(default)]
    processes: IndexMap<IdString, Process>,
    #[serde(default)]
    ports: Vec<IdString>,
    #[serde(default)]
    autoidx: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModuleRepr", into = "ModuleRepr")]
pub struct Module {
    pub name: IdString,
    wires: IndexMap<WireId, Wire>,
    cells: IndexMap<CellId, Cell>,
    connections: Vec<SigSig>,
    pub memories: IndexMap<IdString, Memory>,
    pub processes: IndexMap<IdString, Process>,
    ports: Vec<IdString>,
    wire_names: HashMap<IdString, WireId>,
    cell_names: HashMap<IdString, CellId>,
    next_wire: u32,
    next_cell: u32,
    autoidx: u32,
}

impl TryFrom<ModuleRepr> for Module {
    type Error = IrError;

    fn try_from(repr: ModuleRepr) -> Result<Self, Self::Error> {
        let mut module = Module::new(repr.name);
        let duplicate = |module: &Module, kind: &'static str, name: &IdString| {
            IrError::DuplicateName {
                module: module.name.to_string(),
                kind,
                name: name.to_string(),
            }
        };

        for wire in repr.wires {
            if module.wires.contains_key(&wire.id) || module.wire_names.contains_key(&wire.name) {
                return Err(duplicate(&module, "wire", &wire.name));
            }
            module.next_wire = module.next_wire.max(wire.id.0 + 1);
            module.wire_names.insert(wire.name.clone(), wire.id);
            module.wires.insert(wire.id, wire);
        }
        for cell in repr.cells {
            if module.cells.contains_key(&cell.id) || module.cell_names.contains_key(&cell.name) {
                return Err(duplicate(&module, "cell", &cell.name));
            }
            for (port, sig) in &cell.connections {
                module.check_bits(sig, || format!("port {} of cell {}", port, cell.name))?;
            }
            module.next_cell = module.next_cell.max(cell.id.0 + 1);
            module.cell_names.insert(cell.name.clone(), cell.id);
            module.cells.insert(cell.id, cell);
        }
        for (index, (lhs, rhs)) in repr.connections.iter().enumerate() {
            if lhs.len() != rhs.len() {
                return Err(IrError::ConnectionWidth {
                    module: module.name.to_string(),
                    index,
                    lhs: lhs.len(),
                    rhs: rhs.len(),
                });
            }
            module.check_bits(lhs, || format!("connection {}", index))?;
            module.check_bits(rhs, || format!("connection {}", index))?;
        }
        module.connections = repr.connections;
        module.memories = repr.memories;
        module.processes = repr.processes;
        module.ports = repr.ports;
        module.autoidx = repr.autoidx;
        Ok(module)
    }
}

impl From<Module> for ModuleRepr {
    fn from(module: Module) -> Self {
        ModuleRepr {
            name: module.name,
            wires: module.wires.into_values().collect(),
            cells: module.cells.into_values().collect(),
            connections: module.connections,
            memories: module.memories,
            processes: module.processes,
            ports: module.ports,
            autoidx: module.autoidx,
        }
    }
}

impl Module {
    pub fn new(name: impl Into<IdString>) -> Self {
        Self {
            name: name.into(),
            wires: IndexMap::new(),
            cells: IndexMap::new(),
            connections: Vec::new(),
            memories: IndexMap::new(),
            processes: IndexMap::new(),
            ports: Vec::new(),
            wire_names: HashMap::new(),
            cell_names: HashMap::new(),
            next_wire: 0,
            next_cell: 0,
            autoidx: 0,
        }
    }

    // --- lookup -------------------------------------------------------------

    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[&id]
    }

    pub fn wire_mut(&mut self, id: WireId) -> &mut Wire {
        self.wires
            .get_mut(&id)
            .unwrap_or_else(|| panic!("wire {} does not exist", id))
    }

    pub fn find_wire(&self, name: &str) -> Option<WireId> {
        self.wire_names.get(name).copied()
    }

    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wires.values()
    }

    pub fn wire_ids(&self) -> Vec<WireId> {
        self.wires.keys().copied().collect()
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[&id]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        self.cells
            .get_mut(&id)
            .unwrap_or_else(|| panic!("cell {} does not exist", id))
    }

    pub fn find_cell(&self, name: &str) -> Option<CellId> {
        self.cell_names.get(name).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells.keys().copied().collect()
    }

    pub fn connections(&self) -> &[SigSig] {
        &self.connections
    }

    pub fn ports(&self) -> &[IdString] {
        &self.ports
    }

    pub fn has_memories(&self) -> bool {
        !self.memories.is_empty()
    }

    pub fn has_processes(&self) -> bool {
        !self.processes.is_empty()
    }

    /// All bits of a wire as a signal
    /// Every wire bit of `sig` names an existing wire and offset
    fn check_bits(&self, sig: &SigSpec, context: impl Fn() -> String) -> IrResult<()> {
        for bit in sig {
            if let SigBit::Wire { wire, offset } = *bit {
                if !self.wires.get(&wire).is_some_and(|w| offset < w.width) {
                    return Err(IrError::DanglingWire {
                        module: self.name.to_string(),
                        context: context(),
                        wire,
                        offset,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn wire_sig(&self, id: WireId) -> SigSpec {
        SigSpec::from_wire(id, self.wire(id).width)
    }

    // --- mutation -----------------------------------------------------------

    /// Fresh generated name, unique within this module
    pub fn auto_id(&mut self) -> IdString {
        loop {
            self.autoidx += 1;
            let name = IdString::new(format!("$auto$xsens${}", self.autoidx));
            if !self.wire_names.contains_key(&name) && !self.cell_names.contains_key(&name) {
                return name;
            }
        }
    }

    pub fn add_wire(&mut self, name: IdString, width: u32) -> WireId {
        assert!(
            !self.wire_names.contains_key(&name),
            "wire {} already exists in module {}",
            name,
            self.name
        );
        let id = WireId(self.next_wire);
        self.next_wire += 1;
        self.wire_names.insert(name.clone(), id);
        self.wires.insert(
            id,
            Wire {
                id,
                name,
                width,
                port_input: false,
                port_output: false,
                port_id: 0,
                attributes: IndexMap::new(),
            },
        );
        id
    }

    /// New wire copying width, port flags and attributes of `template`
    pub fn add_wire_like(&mut self, name: IdString, template: &Wire) -> WireId {
        let id = self.add_wire(name, template.width);
        let wire = self.wire_mut(id);
        wire.port_input = template.port_input;
        wire.port_output = template.port_output;
        wire.port_id = template.port_id;
        wire.attributes = template.attributes.clone();
        id
    }

    pub fn add_input(&mut self, name: IdString, width: u32) -> WireId {
        let id = self.add_wire(name, width);
        self.wire_mut(id).port_input = true;
        self.fixup_ports();
        id
    }

    pub fn add_output(&mut self, name: IdString, width: u32) -> WireId {
        let id = self.add_wire(name, width);
        self.wire_mut(id).port_output = true;
        self.fixup_ports();
        id
    }

    pub fn add_cell(&mut self, name: IdString, cell_type: &str) -> CellId {
        assert!(
            !self.cell_names.contains_key(&name),
            "cell {} already exists in module {}",
            name,
            self.name
        );
        let id = CellId(self.next_cell);
        self.next_cell += 1;
        self.cell_names.insert(name.clone(), id);
        self.cells.insert(
            id,
            Cell {
                id,
                name,
                cell_type: IdString::new(cell_type),
                parameters: IndexMap::new(),
                connections: IndexMap::new(),
                attributes: IndexMap::new(),
            },
        );
        id
    }

    /// New cell copying type, parameters, connections and attributes
    pub fn add_cell_like(&mut self, name: IdString, template: &Cell) -> CellId {
        let id = self.add_cell(name, template.cell_type.as_str());
        let cell = self.cell_mut(id);
        cell.parameters = template.parameters.clone();
        cell.connections = template.connections.clone();
        cell.attributes = template.attributes.clone();
        id
    }

    pub fn remove_cell(&mut self, id: CellId) -> Option<Cell> {
        let cell = self.cells.shift_remove(&id)?;
        self.cell_names.remove(&cell.name);
        Some(cell)
    }

    pub fn connect(&mut self, lhs: SigSpec, rhs: SigSpec) {
        assert_eq!(
            lhs.len(),
            rhs.len(),
            "width mismatch connecting {} to {}",
            self.describe(&lhs),
            self.describe(&rhs)
        );
        self.connections.push((lhs, rhs));
    }

    pub fn new_connections(&mut self, connections: Vec<SigSig>) {
        for (lhs, rhs) in connections {
            self.connect(lhs, rhs);
        }
    }

    /// Take the connection list out of the module, leaving it empty
    pub fn take_connections(&mut self) -> Vec<SigSig> {
        std::mem::take(&mut self.connections)
    }

    /// Recompute the port list from the wire port flags.
    ///
    /// Existing port positions are kept; new ports are appended by name.
    pub fn fixup_ports(&mut self) {
        let mut ports: Vec<(u32, IdString, WireId)> = self
            .wires
            .values()
            .filter(|w| w.is_port())
            .map(|w| {
                let order = if w.port_id == 0 { u32::MAX } else { w.port_id };
                (order, w.name.clone(), w.id)
            })
            .collect();
        ports.sort();

        for wire in self.wires.values_mut() {
            if !wire.is_port() {
                wire.port_id = 0;
            }
        }

        self.ports.clear();
        for (index, (_, name, id)) in ports.into_iter().enumerate() {
            self.wires[&id].port_id = index as u32 + 1;
            self.ports.push(name);
        }
    }

    /// Copy all wires, cells, connections and pending constructs into `dst`.
    ///
    /// Ids are preserved, so a `WireId` of `self` addresses the same wire in
    /// `dst` afterwards. `dst` must be empty.
    pub fn clone_into(&self, dst: &mut Module) {
        assert!(
            dst.wires.is_empty() && dst.cells.is_empty() && dst.connections.is_empty(),
            "clone target {} is not empty",
            dst.name
        );
        dst.wires = self.wires.clone();
        dst.cells = self.cells.clone();
        dst.connections = self.connections.clone();
        dst.memories = self.memories.clone();
        dst.processes = self.processes.clone();
        dst.ports = self.ports.clone();
        dst.wire_names = self.wire_names.clone();
        dst.cell_names = self.cell_names.clone();
        dst.next_wire = self.next_wire;
        dst.next_cell = self.next_cell;
        dst.autoidx = self.autoidx;
    }

    // --- gate builders ------------------------------------------------------

    /// Add a `$anyseq` source and return its output
    pub fn anyseq(&mut self, name: IdString, width: usize) -> SigSpec {
        let wire_name = self.auto_id();
        let y = self.add_wire(wire_name, width as u32);
        let cell = self.add_cell(name, "$anyseq");
        let y_sig = self.wire_sig(y);
        let cell = self.cell_mut(cell);
        cell.set_param("WIDTH", Const::from_int(width as i64, 32));
        cell.set_port("Y", y_sig.clone());
        y_sig
    }

    fn add_compare(
        &mut self,
        name: IdString,
        cell_type: &str,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
    ) -> CellId {
        let id = self.add_cell(name, cell_type);
        let cell = self.cell_mut(id);
        cell.set_param("A_SIGNED", Const::from_bool(false));
        cell.set_param("B_SIGNED", Const::from_bool(false));
        cell.set_param("A_WIDTH", Const::from_int(a.len() as i64, 32));
        cell.set_param("B_WIDTH", Const::from_int(b.len() as i64, 32));
        cell.set_param("Y_WIDTH", Const::from_int(y.len() as i64, 32));
        cell.set_port("A", a);
        cell.set_port("B", b);
        cell.set_port("Y", y);
        id
    }

    pub fn add_nex(&mut self, name: IdString, a: SigSpec, b: SigSpec, y: SigSpec) -> CellId {
        self.add_compare(name, "$nex", a, b, y)
    }

    pub fn add_eqx(&mut self, name: IdString, a: SigSpec, b: SigSpec, y: SigSpec) -> CellId {
        self.add_compare(name, "$eqx", a, b, y)
    }

    /// `$nex` gate with a fresh single-bit output
    pub fn nex(&mut self, name: IdString, a: SigSpec, b: SigSpec) -> SigSpec {
        let wire_name = self.auto_id();
        let y = self.add_wire(wire_name, 1);
        let y = self.wire_sig(y);
        self.add_nex(name, a, b, y.clone());
        y
    }

    /// `$eqx` gate with a fresh single-bit output
    pub fn eqx(&mut self, name: IdString, a: SigSpec, b: SigSpec) -> SigSpec {
        let wire_name = self.auto_id();
        let y = self.add_wire(wire_name, 1);
        let y = self.wire_sig(y);
        self.add_eqx(name, a, b, y.clone());
        y
    }

    // --- display ------------------------------------------------------------

    /// Human readable rendering of a signal, e.g. `{ data [3:0] 2'bx1 }`
    pub fn describe(&self, sig: &SigSpec) -> String {
        let chunks = sig.chunks();
        let parts: Vec<String> = chunks
            .iter()
            .rev()
            .map(|chunk| match chunk {
                SigChunk::Wire {
                    wire,
                    offset,
                    width,
                } => {
                    let name = self
                        .wires
                        .get(wire)
                        .map(|w| (w.name.to_string(), w.width))
                        .unwrap_or_else(|| (wire.to_string(), *width));
                    if *offset == 0 && *width == name.1 {
                        name.0
                    } else if *width == 1 {
                        format!("{} [{}]", name.0, offset)
                    } else {
                        format!("{} [{}:{}]", name.0, offset + width - 1, offset)
                    }
                }
                SigChunk::Const(data) => Const::new(data.clone()).to_string(),
            })
            .collect();
        match parts.len() {
            0 => "{ }".to_string(),
            1 => parts[0].clone(),
            _ => format!("{{ {} }}", parts.join(" ")),
        }
    }

    /// Name of a bit as used for SAT variable naming: `name` or `name [i]`
    pub fn bit_name(&self, bit: &SigBit) -> String {
        match bit {
            SigBit::Wire { wire, offset } => {
                let wire = self.wire(*wire);
                if wire.width == 1 {
                    wire.name.to_string()
                } else {
                    format!("{} [{}]", wire.name, offset)
                }
            }
            SigBit::Const(state) => state.to_char().to_string(),
        }
    }

    /// Constant `x` run of the given width
    pub fn undef_sig(width: usize) -> SigSpec {
        SigSpec::repeat(State::Sx, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape_id;

    #[test]
    fn test_add_and_find() {
        let mut m = Module::new(escape_id("top"));
        let a = m.add_input(escape_id("a"), 4);
        let y = m.add_output(escape_id("y"), 4);
        let c = m.add_cell(escape_id("inv"), "$not");
        let a_sig = m.wire_sig(a);
        m.cell_mut(c).set_port("A", a_sig);

        assert_eq!(m.find_wire("\\a"), Some(a));
        assert_eq!(m.find_cell("\\inv"), Some(c));
        assert_eq!(m.ports(), &[escape_id("a"), escape_id("y")]);
        assert_eq!(m.wire(y).port_id, 2);
        assert_eq!(m.cell(c).port("A").len(), 4);
        assert!(m.cell(c).port("Y").is_empty());
    }

    #[test]
    fn test_remove_cell_frees_name() {
        let mut m = Module::new(escape_id("top"));
        let c = m.add_cell(escape_id("g"), "$and");
        assert!(m.remove_cell(c).is_some());
        assert!(m.find_cell("\\g").is_none());
        m.add_cell(escape_id("g"), "$or");
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn test_duplicate_wire_is_contract_violation() {
        let mut m = Module::new(escape_id("top"));
        m.add_wire(escape_id("a"), 1);
        m.add_wire(escape_id("a"), 1);
    }

    #[test]
    fn test_clone_into_preserves_ids() {
        let mut m = Module::new(escape_id("src"));
        let a = m.add_input(escape_id("a"), 2);
        let b = m.add_wire(escape_id("b"), 2);
        m.connect(m.wire_sig(b), m.wire_sig(a));

        let mut dst = Module::new(escape_id("dst"));
        m.clone_into(&mut dst);
        assert_eq!(dst.name, escape_id("dst"));
        assert_eq!(dst.wire(a).name, escape_id("a"));
        assert_eq!(dst.connections().len(), 1);

        let fresh = dst.add_wire(escape_id("c"), 1);
        assert!(fresh.0 > b.0);
    }

    #[test]
    fn test_anyseq_builder() {
        let mut m = Module::new(escape_id("top"));
        let name = m.auto_id();
        let y = m.anyseq(name.clone(), 3);
        assert_eq!(y.len(), 3);
        let cell = m.cell(m.find_cell(name.as_str()).unwrap());
        assert!(cell.is_type("$anyseq"));
        assert_eq!(cell.port("Y"), y);
    }

    #[test]
    fn test_describe() {
        let mut m = Module::new(escape_id("top"));
        let d = m.add_wire(escape_id("data"), 8);
        let mut sig = m.wire_sig(d).extract(0, 4);
        sig.append(&SigSpec::repeat(State::Sx, 2));
        assert_eq!(m.describe(&sig), "{ 2'bxx data [3:0] }");
        assert_eq!(m.describe(&m.wire_sig(d)), "data");
    }

    #[test]
    fn test_fixup_ports_drops_cleared_flags() {
        let mut m = Module::new(escape_id("top"));
        let a = m.add_input(escape_id("a"), 1);
        let b = m.add_output(escape_id("b"), 1);
        m.wire_mut(a).port_input = false;
        m.fixup_ports();
        assert_eq!(m.ports(), &[escape_id("b")]);
        assert_eq!(m.wire(a).port_id, 0);
        assert_eq!(m.wire(b).port_id, 1);
    }
}
