//! Four-state constants

use crate::IrError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logic state of a single constant bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum State {
    S0,
    S1,
    /// Undefined
    Sx,
    /// High impedance
    Sz,
}

impl State {
    pub fn from_bool(value: bool) -> Self {
        if value {
            State::S1
        } else {
            State::S0
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(State::S0),
            '1' => Some(State::S1),
            'x' | 'X' => Some(State::Sx),
            'z' | 'Z' => Some(State::Sz),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            State::S0 => '0',
            State::S1 => '1',
            State::Sx => 'x',
            State::Sz => 'z',
        }
    }

    /// True for `x` and `z`
    pub fn is_undef(self) -> bool {
        matches!(self, State::Sx | State::Sz)
    }
}

/// A constant bit vector, least significant bit first.
///
/// Serialized as an MSB-first string such as `"10x1"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Const {
    bits: Vec<State>,
}

impl Const {
    pub fn new(bits: Vec<State>) -> Self {
        Self { bits }
    }

    /// Two's complement encoding of `value` truncated to `width` bits
    pub fn from_int(value: i64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                let bit = if i < 64 { (value >> i) & 1 == 1 } else { value < 0 };
                State::from_bool(bit)
            })
            .collect();
        Self { bits }
    }

    pub fn from_bool(value: bool) -> Self {
        Self {
            bits: vec![State::from_bool(value)],
        }
    }

    pub fn undef(width: usize) -> Self {
        Self {
            bits: vec![State::Sx; width],
        }
    }

    pub fn bits(&self) -> &[State] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Unsigned value of the defined bits (`x`/`z` read as 0)
    pub fn as_int(&self) -> i64 {
        self.bits
            .iter()
            .take(64)
            .enumerate()
            .filter(|(_, b)| **b == State::S1)
            .fold(0i64, |acc, (i, _)| acc | (1 << i))
    }

    pub fn as_bool(&self) -> bool {
        self.bits.iter().any(|b| *b == State::S1)
    }

    pub fn is_fully_undef(&self) -> bool {
        !self.bits.is_empty() && self.bits.iter().all(|b| b.is_undef())
    }

    pub fn is_fully_def(&self) -> bool {
        self.bits.iter().all(|b| !b.is_undef())
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'b", self.bits.len())?;
        for bit in self.bits.iter().rev() {
            write!(f, "{}", bit.to_char())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Const {
    type Error = IrError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        let bits = text
            .chars()
            .rev()
            .map(|c| State::from_char(c).ok_or_else(|| IrError::InvalidConst(text.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Const { bits })
    }
}

impl From<Const> for String {
    fn from(value: Const) -> Self {
        value.bits.iter().rev().map(|b| b.to_char()).collect()
    }
}
