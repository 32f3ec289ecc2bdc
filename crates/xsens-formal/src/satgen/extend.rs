//! Operand width and signedness normalization

use super::SatGen;
use crate::engine::Lit;
use xsens_ir::Cell;

fn pad(vec: &mut Vec<Lit>, width: usize, signed: bool) {
    while vec.len() < width {
        let fill = match vec.last() {
            Some(msb) if signed => *msb,
            _ => Lit::FALSE,
        };
        vec.push(fill);
    }
}

impl SatGen<'_> {
    /// Pad `vec_a` and `vec_b` to the wider of the two and at least
    /// `y_width` bits. Operands are sign extended only when both are
    /// declared signed, or when `forced_signed` is set.
    pub fn extend_signal_width(
        &self,
        vec_a: &mut Vec<Lit>,
        vec_b: &mut Vec<Lit>,
        cell: &Cell,
        y_width: usize,
        forced_signed: bool,
    ) {
        let is_signed =
            forced_signed || (cell.param_bool("A_SIGNED") && cell.param_bool("B_SIGNED"));
        let width = vec_a.len().max(vec_b.len()).max(y_width);
        pad(vec_a, width, is_signed);
        pad(vec_b, width, is_signed);
    }

    /// Like `extend_signal_width`, and grow `vec_y` with fresh literals
    /// up to the common operand width
    pub fn extend_signal_width_y(
        &mut self,
        vec_a: &mut Vec<Lit>,
        vec_b: &mut Vec<Lit>,
        vec_y: &mut Vec<Lit>,
        cell: &Cell,
        forced_signed: bool,
    ) {
        self.extend_signal_width(vec_a, vec_b, cell, vec_y.len(), forced_signed);
        while vec_y.len() < vec_a.len() {
            vec_y.push(self.ez.literal());
        }
    }

    /// Unary form, driven by `A_SIGNED` alone
    pub fn extend_signal_width_unary(
        &mut self,
        vec_a: &mut Vec<Lit>,
        vec_y: &mut Vec<Lit>,
        cell: &Cell,
        forced_signed: bool,
    ) {
        let is_signed = forced_signed || cell.param_bool("A_SIGNED");
        pad(vec_a, vec_y.len(), is_signed);
        while vec_y.len() < vec_a.len() {
            vec_y.push(self.ez.literal());
        }
    }
}
