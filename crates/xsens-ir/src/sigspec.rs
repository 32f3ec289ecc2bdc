//! Signal bits and bit vectors
//!
//! A `SigSpec` is an ordered vector of `SigBit`s, least significant bit
//! first. Bit order is significant: two specs with the same bits in a
//! different order are different signals.

use crate::constant::{Const, State};
use crate::module::WireId;
use serde::{Deserialize, Serialize};

/// A single signal bit: a constant or one bit of a wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SigBit {
    Const(State),
    Wire { wire: WireId, offset: u32 },
}

impl SigBit {
    pub fn wire(wire: WireId, offset: u32) -> Self {
        SigBit::Wire { wire, offset }
    }

    pub fn is_wire(&self) -> bool {
        matches!(self, SigBit::Wire { .. })
    }

    pub fn wire_id(&self) -> Option<WireId> {
        match self {
            SigBit::Wire { wire, .. } => Some(*wire),
            SigBit::Const(_) => None,
        }
    }

    pub fn state(&self) -> Option<State> {
        match self {
            SigBit::Const(state) => Some(*state),
            SigBit::Wire { .. } => None,
        }
    }
}

impl From<State> for SigBit {
    fn from(state: State) -> Self {
        SigBit::Const(state)
    }
}

/// A maximal run of bits that are either one wire slice or all constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigChunk {
    Wire { wire: WireId, offset: u32, width: u32 },
    Const(Vec<State>),
}

impl SigChunk {
    pub fn width(&self) -> usize {
        match self {
            SigChunk::Wire { width, .. } => *width as usize,
            SigChunk::Const(data) => data.len(),
        }
    }

    pub fn is_wire(&self) -> bool {
        matches!(self, SigChunk::Wire { .. })
    }

    pub fn to_sigspec(&self) -> SigSpec {
        match self {
            SigChunk::Wire {
                wire,
                offset,
                width,
            } => (0..*width).map(|i| SigBit::wire(*wire, offset + i)).collect(),
            SigChunk::Const(data) => data.iter().map(|s| SigBit::Const(*s)).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SigSpec {
    bits: Vec<SigBit>,
}

impl SigSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: Vec<SigBit>) -> Self {
        Self { bits }
    }

    /// All bits of a wire of the given width
    pub fn from_wire(wire: WireId, width: u32) -> Self {
        (0..width).map(|i| SigBit::wire(wire, i)).collect()
    }

    pub fn from_const(value: &Const) -> Self {
        value.bits().iter().map(|s| SigBit::Const(*s)).collect()
    }

    pub fn repeat(state: State, width: usize) -> Self {
        Self {
            bits: vec![SigBit::Const(state); width],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[SigBit] {
        &self.bits
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SigBit> {
        self.bits.iter()
    }

    pub fn push(&mut self, bit: SigBit) {
        self.bits.push(bit);
    }

    pub fn append(&mut self, other: &SigSpec) {
        self.bits.extend_from_slice(&other.bits);
    }

    pub fn extract(&self, offset: usize, len: usize) -> SigSpec {
        Self {
            bits: self.bits[offset..offset + len].to_vec(),
        }
    }

    pub fn is_bit(&self) -> bool {
        self.bits.len() == 1
    }

    pub fn as_bit(&self) -> SigBit {
        assert!(self.is_bit(), "signal is {} bits wide, expected 1", self.len());
        self.bits[0]
    }

    pub fn is_fully_const(&self) -> bool {
        self.bits.iter().all(|b| !b.is_wire())
    }

    /// Every bit is a constant `x` or `z`
    pub fn is_fully_undef(&self) -> bool {
        !self.bits.is_empty()
            && self
                .bits
                .iter()
                .all(|b| matches!(b, SigBit::Const(s) if s.is_undef()))
    }

    pub fn has_undef(&self) -> bool {
        self.bits
            .iter()
            .any(|b| matches!(b, SigBit::Const(State::Sx)))
    }

    pub fn as_const(&self) -> Option<Const> {
        self.bits
            .iter()
            .map(|b| b.state())
            .collect::<Option<Vec<_>>>()
            .map(Const::new)
    }

    /// Replace every wire reference through `map`; constants are kept
    pub fn map_wires(&self, mut map: impl FnMut(WireId) -> WireId) -> SigSpec {
        self.bits
            .iter()
            .map(|bit| match *bit {
                SigBit::Wire { wire, offset } => SigBit::wire(map(wire), offset),
                constant => constant,
            })
            .collect()
    }

    /// Coalesce the bits into maximal wire slices and constant runs
    pub fn chunks(&self) -> Vec<SigChunk> {
        let mut chunks: Vec<SigChunk> = Vec::new();
        for bit in &self.bits {
            if let Some(last) = chunks.last_mut() {
                match (last, bit) {
                    (
                        SigChunk::Wire {
                            wire,
                            offset,
                            width,
                        },
                        SigBit::Wire {
                            wire: w,
                            offset: o,
                        },
                    ) if *wire == *w && *offset + *width == *o => {
                        *width += 1;
                        continue;
                    }
                    (SigChunk::Const(data), SigBit::Const(state)) => {
                        data.push(*state);
                        continue;
                    }
                    _ => {}
                }
            }
            chunks.push(match bit {
                SigBit::Wire { wire, offset } => SigChunk::Wire {
                    wire: *wire,
                    offset: *offset,
                    width: 1,
                },
                SigBit::Const(state) => SigChunk::Const(vec![*state]),
            });
        }
        chunks
    }
}

impl FromIterator<SigBit> for SigSpec {
    fn from_iter<T: IntoIterator<Item = SigBit>>(iter: T) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SigSpec {
    type Item = &'a SigBit;
    type IntoIter = std::slice::Iter<'a, SigBit>;

    fn into_iter(self) -> Self::IntoIter {
        self.bits.iter()
    }
}

impl From<SigBit> for SigSpec {
    fn from(bit: SigBit) -> Self {
        Self { bits: vec![bit] }
    }
}

impl From<&Const> for SigSpec {
    fn from(value: &Const) -> Self {
        SigSpec::from_const(value)
    }
}

impl std::ops::Index<usize> for SigSpec {
    type Output = SigBit;

    fn index(&self, index: usize) -> &Self::Output {
        &self.bits[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_coalesce() {
        let w = WireId(0);
        let v = WireId(1);
        let mut sig = SigSpec::from_wire(w, 4);
        sig.push(SigBit::Const(State::Sx));
        sig.push(SigBit::Const(State::S1));
        sig.push(SigBit::wire(v, 2));
        sig.push(SigBit::wire(v, 3));

        let chunks = sig.chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks[0],
            SigChunk::Wire {
                wire: w,
                offset: 0,
                width: 4
            }
        );
        assert_eq!(chunks[1], SigChunk::Const(vec![State::Sx, State::S1]));
        assert_eq!(chunks[2].width(), 2);
    }

    #[test]
    fn test_non_contiguous_wire_bits_split() {
        let w = WireId(7);
        let sig = SigSpec::from_bits(vec![SigBit::wire(w, 1), SigBit::wire(w, 0)]);
        assert_eq!(sig.chunks().len(), 2);
    }

    #[test]
    fn test_fully_undef() {
        assert!(SigSpec::repeat(State::Sx, 16).is_fully_undef());
        assert!(!SigSpec::new().is_fully_undef());
        let mut sig = SigSpec::repeat(State::Sx, 2);
        sig.push(SigBit::wire(WireId(0), 0));
        assert!(!sig.is_fully_undef());
        assert!(sig.has_undef());
    }

    #[test]
    fn test_map_wires_keeps_constants() {
        let mut sig = SigSpec::from_wire(WireId(0), 2);
        sig.push(SigBit::Const(State::S0));
        let mapped = sig.map_wires(|_| WireId(9));
        assert_eq!(mapped[0], SigBit::wire(WireId(9), 0));
        assert_eq!(mapped[1], SigBit::wire(WireId(9), 1));
        assert_eq!(mapped[2], SigBit::Const(State::S0));
    }
}
