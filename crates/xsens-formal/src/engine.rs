//! Boolean formula construction interface
//!
//! Encoders only build formulas through `SatEngine`; solving is the
//! caller's business. Literals are plain handles, valid only for the
//! engine that created them.

use crate::FormalResult;
use std::fmt;
use std::ops::Not;

/// A literal: a formula node with optional negation.
///
/// Node 1 is the constant true, so `Lit::TRUE` and `Lit::FALSE` are the
/// same for every engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(i32);

impl Lit {
    pub const TRUE: Lit = Lit(1);
    pub const FALSE: Lit = Lit(-1);

    /// Literal of a 1-based node index
    pub fn from_node(node: usize, negated: bool) -> Self {
        assert!(node >= 1, "node indices start at 1");
        let code = node as i32;
        Lit(if negated { -code } else { code })
    }

    pub fn node(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    pub fn is_negated(self) -> bool {
        self.0 < 0
    }

    pub fn is_const(self) -> bool {
        self.node() == 1
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Lit::TRUE
        } else {
            Lit::FALSE
        }
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Lit::TRUE => write!(f, "true"),
            Lit::FALSE => write!(f, "false"),
            lit if lit.is_negated() => write!(f, "!n{}", lit.node()),
            lit => write!(f, "n{}", lit.node()),
        }
    }
}

/// A satisfying assignment
#[derive(Debug, Clone)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    /// `values[i]` is the value of node `i + 1`
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    pub fn value(&self, lit: Lit) -> bool {
        if lit.is_const() {
            return lit == Lit::TRUE;
        }
        let value = self.values.get(lit.node() - 1).copied().unwrap_or(false);
        value != lit.is_negated()
    }

    pub fn values(&self, lits: &[Lit]) -> Vec<bool> {
        lits.iter().map(|l| self.value(*l)).collect()
    }
}

/// Capability interface of a boolean formula backend
pub trait SatEngine {
    fn name(&self) -> &str;

    /// Fresh anonymous variable
    fn literal(&mut self) -> Lit;

    /// Fresh variable that the backend must not simplify away
    fn frozen_literal(&mut self) -> Lit {
        self.literal()
    }

    /// Variable with a stable identity: the same name always yields the
    /// same literal
    fn named_literal(&mut self, name: &str) -> Lit;

    fn lookup_literal(&self, name: &str) -> Option<Lit>;

    /// Attach a debug name to an existing literal. A name already in use
    /// keeps its first literal.
    fn label_literal(&mut self, _lit: Lit, _name: &str) {}

    fn and(&mut self, a: Lit, b: Lit) -> Lit;

    fn not(&mut self, a: Lit) -> Lit {
        !a
    }

    fn or(&mut self, a: Lit, b: Lit) -> Lit {
        !self.and(!a, !b)
    }

    fn xor(&mut self, a: Lit, b: Lit) -> Lit {
        let a_not_b = self.and(a, !b);
        let b_not_a = self.and(!a, b);
        self.or(a_not_b, b_not_a)
    }

    fn iff(&mut self, a: Lit, b: Lit) -> Lit {
        !self.xor(a, b)
    }

    /// `sel ? then : other`
    fn ite(&mut self, sel: Lit, then: Lit, other: Lit) -> Lit {
        let t = self.and(sel, then);
        let e = self.and(!sel, other);
        self.or(t, e)
    }

    fn and_all(&mut self, lits: &[Lit]) -> Lit {
        lits.iter().fold(Lit::TRUE, |acc, l| self.and(acc, *l))
    }

    fn or_all(&mut self, lits: &[Lit]) -> Lit {
        lits.iter().fold(Lit::FALSE, |acc, l| self.or(acc, *l))
    }

    fn xor_all(&mut self, lits: &[Lit]) -> Lit {
        lits.iter().fold(Lit::FALSE, |acc, l| self.xor(acc, *l))
    }

    fn vec_var(&mut self, width: usize) -> Vec<Lit> {
        (0..width).map(|_| self.literal()).collect()
    }

    fn vec_not(&mut self, a: &[Lit]) -> Vec<Lit> {
        a.iter().map(|l| !*l).collect()
    }

    fn vec_and(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| self.and(*x, *y)).collect()
    }

    fn vec_or(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| self.or(*x, *y)).collect()
    }

    fn vec_xor(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| self.xor(*x, *y)).collect()
    }

    fn vec_iff(&mut self, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| self.iff(*x, *y)).collect()
    }

    fn vec_ite(&mut self, sel: Lit, then: &[Lit], other: &[Lit]) -> Vec<Lit> {
        assert_eq!(then.len(), other.len());
        then.iter()
            .zip(other)
            .map(|(t, e)| self.ite(sel, *t, *e))
            .collect()
    }

    /// Bitwise select: `sel[i] ? then[i] : other[i]`
    fn vec_ite_bits(&mut self, sel: &[Lit], then: &[Lit], other: &[Lit]) -> Vec<Lit> {
        assert_eq!(sel.len(), then.len());
        assert_eq!(then.len(), other.len());
        (0..sel.len())
            .map(|i| self.ite(sel[i], then[i], other[i]))
            .collect()
    }

    fn vec_eq(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        let bits = self.vec_iff(a, b);
        self.and_all(&bits)
    }

    fn vec_ne(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        !self.vec_eq(a, b)
    }

    /// Hard constraint: `lit` holds in every model
    fn assume(&mut self, lit: Lit);

    /// Check the assumed constraints together with `assumptions`
    fn solve(&mut self, assumptions: &[Lit]) -> FormalResult<Option<Model>>;
}
