//! Signal canonicalization and bit pools

use crate::module::Module;
use crate::sigspec::{SigBit, SigSpec};
use std::collections::{BTreeSet, HashMap};

/// Maps every bit to the canonical representative of its connection group.
///
/// Groups are formed by the direct connections of a module. A constant
/// always becomes the representative of its group; otherwise the driving
/// (right hand) side of the most recent connection wins.
#[derive(Debug, Clone, Default)]
pub struct SigMap {
    parent: HashMap<SigBit, SigBit>,
}

impl SigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_module(module: &Module) -> Self {
        let mut sigmap = Self::new();
        for (lhs, rhs) in module.connections() {
            sigmap.add(lhs, rhs);
        }
        sigmap
    }

    fn find(&self, mut bit: SigBit) -> SigBit {
        while let Some(next) = self.parent.get(&bit) {
            bit = *next;
        }
        bit
    }

    /// `find` with path compression
    fn find_mut(&mut self, bit: SigBit) -> SigBit {
        let root = self.find(bit);
        let mut x = bit;
        while let Some(next) = self.parent.get(&x).copied() {
            if next == root {
                break;
            }
            self.parent.insert(x, root);
            x = next;
        }
        root
    }

    /// Merge the groups of `lhs` and `rhs` bit by bit
    pub fn add(&mut self, lhs: &SigSpec, rhs: &SigSpec) {
        assert_eq!(lhs.len(), rhs.len());
        for (a, b) in lhs.iter().zip(rhs.iter()) {
            let root_a = self.find_mut(*a);
            let root_b = self.find_mut(*b);
            if root_a == root_b {
                continue;
            }
            match (root_a.is_wire(), root_b.is_wire()) {
                // two different constants: conflicting drivers, keep both groups
                (false, false) => {}
                (false, true) => {
                    self.parent.insert(root_b, root_a);
                }
                _ => {
                    self.parent.insert(root_a, root_b);
                }
            }
        }
    }

    pub fn map_bit(&self, bit: SigBit) -> SigBit {
        self.find(bit)
    }

    pub fn map(&self, sig: &SigSpec) -> SigSpec {
        sig.iter().map(|bit| self.find(*bit)).collect()
    }

    pub fn apply(&self, sig: &mut SigSpec) {
        *sig = self.map(sig);
    }
}

/// An ordered set of wire bits; constant bits are never stored
#[derive(Debug, Clone, Default)]
pub struct SigPool {
    bits: BTreeSet<SigBit>,
}

impl SigPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sig: &SigSpec) {
        self.bits.extend(sig.iter().filter(|b| b.is_wire()).copied());
    }

    pub fn del(&mut self, sig: &SigSpec) {
        for bit in sig {
            self.bits.remove(bit);
        }
    }

    pub fn contains(&self, bit: &SigBit) -> bool {
        self.bits.contains(bit)
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// All bits, sorted by wire and offset so contiguous slices coalesce
    pub fn export_all(&self) -> SigSpec {
        self.bits.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::State;
    use crate::escape_id;

    #[test]
    fn test_driver_is_canonical() {
        let mut m = Module::new(escape_id("top"));
        let a = m.add_wire(escape_id("a"), 2);
        let b = m.add_wire(escape_id("b"), 2);
        let c = m.add_wire(escape_id("c"), 2);
        m.connect(m.wire_sig(b), m.wire_sig(a));
        m.connect(m.wire_sig(c), m.wire_sig(b));

        let sigmap = SigMap::from_module(&m);
        assert_eq!(sigmap.map(&m.wire_sig(c)), m.wire_sig(a));
        assert_eq!(sigmap.map(&m.wire_sig(a)), m.wire_sig(a));
    }

    #[test]
    fn test_long_chains_are_compressed() {
        let mut m = Module::new(escape_id("top"));
        let wires: Vec<_> = (0..5)
            .map(|i| m.add_wire(escape_id(&format!("w{}", i)), 1))
            .collect();
        let bit = |i: usize| SigBit::wire(wires[i], 0);

        let mut sigmap = SigMap::new();
        for i in 0..4 {
            sigmap.add(&SigSpec::from(bit(i)), &SigSpec::from(bit(i + 1)));
        }
        assert_eq!(sigmap.map_bit(bit(0)), bit(4));

        sigmap.add(&SigSpec::from(bit(0)), &SigSpec::from(bit(4)));
        assert_eq!(sigmap.parent[&bit(0)], bit(4));
        assert_eq!(sigmap.parent[&bit(1)], bit(4));
        assert_eq!(sigmap.map_bit(bit(2)), bit(4));
    }

    #[test]
    fn test_constants_win() {
        let mut m = Module::new(escape_id("top"));
        let a = m.add_wire(escape_id("a"), 1);
        let b = m.add_wire(escape_id("b"), 1);
        m.connect(m.wire_sig(a), m.wire_sig(b));
        m.connect(m.wire_sig(b), SigSpec::repeat(State::S1, 1));

        let sigmap = SigMap::from_module(&m);
        assert_eq!(
            sigmap.map_bit(SigBit::wire(a, 0)),
            SigBit::Const(State::S1)
        );
    }

    #[test]
    fn test_pool_ignores_constants_and_sorts() {
        let mut pool = SigPool::new();
        let w = crate::WireId(3);
        let mut sig = SigSpec::from_wire(w, 3);
        sig.push(SigBit::Const(State::Sx));
        pool.add(&sig.extract(2, 2));
        pool.add(&sig.extract(0, 2));
        assert_eq!(pool.len(), 3);

        pool.del(&SigSpec::from_bits(vec![SigBit::wire(w, 1)]));
        let exported = pool.export_all();
        assert_eq!(exported.chunks().len(), 2);
        assert!(!pool.contains(&SigBit::wire(w, 1)));
    }
}
