//! And-Inverter Graph backend
//!
//! Formulas are kept as a structurally hashed AIG. `solve` Tseitin-encodes
//! the whole graph into CNF and hands it to varisat. Constant folding and
//! hashing happen at construction time so encoders can build freely.

use crate::engine::{Lit, Model, SatEngine};
use crate::{FormalError, FormalResult};
use std::collections::HashMap;
use tracing::debug;
use varisat::{CnfFormula, ExtendFormula, Solver, Var};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AigNode {
    True,
    Input { name: Option<String> },
    And { left: Lit, right: Lit },
}

#[derive(Debug, Clone)]
pub struct AigEngine {
    /// `nodes[i]` is node `i + 1`
    nodes: Vec<AigNode>,
    strash: HashMap<(Lit, Lit), Lit>,
    names: HashMap<String, Lit>,
    assumptions: Vec<Lit>,
}

impl Default for AigEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AigEngine {
    pub fn new() -> Self {
        Self {
            nodes: vec![AigNode::True],
            strash: HashMap::new(),
            names: HashMap::new(),
            assumptions: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn and_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, AigNode::And { .. }))
            .count()
    }

    fn push(&mut self, node: AigNode) -> Lit {
        self.nodes.push(node);
        Lit::from_node(self.nodes.len(), false)
    }

    fn to_cnf(&self) -> CnfFormula {
        let mut formula = CnfFormula::new();
        formula.set_var_count(self.nodes.len());

        formula.add_clause(&[varisat::Lit::positive(Var::from_index(0))]);
        for (idx, node) in self.nodes.iter().enumerate() {
            if let AigNode::And { left, right } = node {
                let out = Var::from_index(idx);
                let left = to_varisat(*left);
                let right = to_varisat(*right);
                // out <-> left & right
                formula.add_clause(&[varisat::Lit::negative(out), left]);
                formula.add_clause(&[varisat::Lit::negative(out), right]);
                formula.add_clause(&[varisat::Lit::positive(out), !left, !right]);
            }
        }
        for lit in &self.assumptions {
            formula.add_clause(&[to_varisat(*lit)]);
        }
        formula
    }
}

fn to_varisat(lit: Lit) -> varisat::Lit {
    let var = Var::from_index(lit.node() - 1);
    if lit.is_negated() {
        varisat::Lit::negative(var)
    } else {
        varisat::Lit::positive(var)
    }
}

impl SatEngine for AigEngine {
    fn name(&self) -> &str {
        "aig"
    }

    fn literal(&mut self) -> Lit {
        self.push(AigNode::Input { name: None })
    }

    fn named_literal(&mut self, name: &str) -> Lit {
        if let Some(lit) = self.names.get(name) {
            return *lit;
        }
        let lit = self.push(AigNode::Input {
            name: Some(name.to_string()),
        });
        self.names.insert(name.to_string(), lit);
        lit
    }

    fn lookup_literal(&self, name: &str) -> Option<Lit> {
        self.names.get(name).copied()
    }

    fn label_literal(&mut self, lit: Lit, name: &str) {
        if self.names.contains_key(name) {
            debug!("Name {} already labels another literal", name);
            return;
        }
        self.names.insert(name.to_string(), lit);
        if let AigNode::Input { name: slot } = &mut self.nodes[lit.node() - 1] {
            if slot.is_none() {
                *slot = Some(name.to_string());
            }
        }
    }

    fn and(&mut self, a: Lit, b: Lit) -> Lit {
        if a == Lit::FALSE || b == Lit::FALSE || a == !b {
            return Lit::FALSE;
        }
        if a == Lit::TRUE || a == b {
            return b;
        }
        if b == Lit::TRUE {
            return a;
        }

        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(lit) = self.strash.get(&key) {
            return *lit;
        }
        let lit = self.push(AigNode::And {
            left: key.0,
            right: key.1,
        });
        self.strash.insert(key, lit);
        lit
    }

    fn assume(&mut self, lit: Lit) {
        if lit != Lit::TRUE {
            self.assumptions.push(lit);
        }
    }

    fn solve(&mut self, assumptions: &[Lit]) -> FormalResult<Option<Model>> {
        let formula = self.to_cnf();
        debug!(
            "Solving AIG with {} nodes, {} clauses, {} assumptions",
            self.nodes.len(),
            formula.len(),
            assumptions.len()
        );

        let mut solver = Solver::new();
        solver.add_formula(&formula);
        let assumed: Vec<varisat::Lit> = assumptions.iter().map(|l| to_varisat(*l)).collect();
        solver.assume(&assumed);

        let sat = solver
            .solve()
            .map_err(|e| FormalError::SolverError(e.to_string()))?;
        if !sat {
            return Ok(None);
        }

        let mut values = vec![false; self.nodes.len()];
        if let Some(model) = solver.model() {
            for lit in model {
                if let Some(value) = values.get_mut(lit.var().index()) {
                    *value = lit.is_positive();
                }
            }
        }
        Ok(Some(Model::new(values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_folding() {
        let mut aig = AigEngine::new();
        let a = aig.literal();
        assert_eq!(aig.and(a, Lit::TRUE), a);
        assert_eq!(aig.and(a, Lit::FALSE), Lit::FALSE);
        assert_eq!(aig.and(a, !a), Lit::FALSE);
        assert_eq!(aig.and(a, a), a);
        assert_eq!(aig.or(a, !a), Lit::TRUE);
    }

    #[test]
    fn test_structural_hashing() {
        let mut aig = AigEngine::new();
        let a = aig.literal();
        let b = aig.literal();
        let x = aig.and(a, b);
        let y = aig.and(b, a);
        assert_eq!(x, y);
        assert_eq!(aig.and_count(), 1);
    }

    #[test]
    fn test_named_literals_are_stable() {
        let mut aig = AigEngine::new();
        let a = aig.named_literal("a");
        let b = aig.named_literal("b");
        assert_ne!(a, b);
        assert_eq!(aig.named_literal("a"), a);
        assert_eq!(aig.lookup_literal("b"), Some(b));
        assert_eq!(aig.lookup_literal("c"), None);
    }

    #[test]
    fn test_labels_keep_first_literal() {
        let mut aig = AigEngine::new();
        let a = aig.frozen_literal();
        let b = aig.frozen_literal();
        aig.label_literal(a, "x");
        aig.label_literal(b, "x");
        assert_ne!(a, b);
        assert_eq!(aig.lookup_literal("x"), Some(a));
        assert_eq!(aig.named_literal("x"), a);
    }

    #[test]
    fn test_solve_xor() {
        let mut aig = AigEngine::new();
        let a = aig.named_literal("a");
        let b = aig.named_literal("b");
        let x = aig.xor(a, b);
        aig.assume(x);

        let model = aig.solve(&[a]).unwrap().expect("xor with a=1 is satisfiable");
        assert!(model.value(a));
        assert!(!model.value(b));

        let c = aig.iff(a, b);
        assert!(aig.solve(&[c]).unwrap().is_none());
    }

    #[test]
    fn test_assumptions_do_not_persist() {
        let mut aig = AigEngine::new();
        let a = aig.literal();
        assert!(aig.solve(&[a, !a]).unwrap().is_none());
        assert!(aig.solve(&[!a]).unwrap().is_some());
    }
}
