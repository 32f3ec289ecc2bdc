//! Internal cell type table
//!
//! Knows the input and output ports of every internal cell type. Passes use
//! it to tell which connections of a cell drive a signal; cells not listed
//! here are treated as driving all of their ports.

/// Port directions of one cell type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPorts {
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
}

const UNARY: CellPorts = CellPorts {
    inputs: &["A"],
    outputs: &["Y"],
};

const BINARY: CellPorts = CellPorts {
    inputs: &["A", "B"],
    outputs: &["Y"],
};

const MUX: CellPorts = CellPorts {
    inputs: &["A", "B", "S"],
    outputs: &["Y"],
};

const SOURCE: CellPorts = CellPorts {
    inputs: &[],
    outputs: &["Y"],
};

const PROPERTY: CellPorts = CellPorts {
    inputs: &["A", "EN"],
    outputs: &[],
};

const DFF: CellPorts = CellPorts {
    inputs: &["CLK", "D"],
    outputs: &["Q"],
};

const FF: CellPorts = CellPorts {
    inputs: &["D"],
    outputs: &["Q"],
};

pub fn cell_ports(cell_type: &str) -> Option<CellPorts> {
    let ports = match cell_type {
        "$not" | "$pos" | "$neg" | "$reduce_and" | "$reduce_or" | "$reduce_xor"
        | "$reduce_xnor" | "$reduce_bool" | "$logic_not" => UNARY,
        "$and" | "$or" | "$xor" | "$xnor" | "$shl" | "$shr" | "$sshl" | "$sshr" | "$lt"
        | "$le" | "$eq" | "$ne" | "$eqx" | "$nex" | "$ge" | "$gt" | "$add" | "$sub" | "$mul"
        | "$div" | "$mod" | "$logic_and" | "$logic_or" => BINARY,
        "$mux" | "$pmux" => MUX,
        "$anyseq" | "$anyconst" | "$allseq" | "$allconst" | "$initstate" => SOURCE,
        "$assert" | "$assume" | "$cover" | "$live" | "$fair" => PROPERTY,
        "$dff" => DFF,
        "$ff" => FF,
        _ => return None,
    };
    Some(ports)
}

pub fn is_known(cell_type: &str) -> bool {
    cell_ports(cell_type).is_some()
}

pub fn is_input(cell_type: &str, port: &str) -> bool {
    cell_ports(cell_type).is_some_and(|p| p.inputs.contains(&port))
}

pub fn is_output(cell_type: &str, port: &str) -> bool {
    cell_ports(cell_type).is_some_and(|p| p.outputs.contains(&port))
}

/// Formal property cells: they observe signals and drive nothing
pub fn is_property(cell_type: &str) -> bool {
    matches!(cell_type, "$assert" | "$assume" | "$cover" | "$live" | "$fair")
}

/// Cells whose outputs are unconstrained solver inputs
pub fn is_nondeterministic_source(cell_type: &str) -> bool {
    matches!(cell_type, "$anyseq" | "$anyconst" | "$allseq" | "$allconst")
}
