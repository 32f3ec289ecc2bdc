//! Encoders for internal cell types
//!
//! Every encoder imports its ports, normalizes widths, computes the
//! expected output `yy` and either pins `y` to it or, under undef
//! modeling, pins the output undef flags and gates `y` against `yy`.

use super::SatGen;
use crate::engine::Lit;
use tracing::{debug, warn};
use xsens_ir::{Cell, CellId};

impl SatGen<'_> {
    /// Add the constraints of `cell` at `timestep`.
    ///
    /// Returns false when no encoder handles the cell type; the cell's
    /// outputs are then left unconstrained.
    pub fn import_cell(&mut self, cell: &Cell, timestep: i32) -> bool {
        let ty = cell.cell_type.as_str();
        match ty {
            "$not" | "$pos" => self.encode_unary(cell, timestep),
            "$and" | "$or" | "$xor" | "$xnor" => self.encode_bitwise(cell, timestep),
            "$reduce_and" | "$reduce_or" | "$reduce_xor" | "$reduce_xnor" | "$reduce_bool"
            | "$logic_not" => self.encode_reduce(cell, timestep),
            "$logic_and" | "$logic_or" => self.encode_logic(cell, timestep),
            "$eq" | "$ne" | "$eqx" | "$nex" => self.encode_compare(cell, timestep),
            "$mux" => self.encode_mux(cell, timestep),
            "$add" | "$sub" => self.encode_arith(cell, timestep),
            "$initstate" => self.encode_initstate(cell, timestep),
            "$anyseq" | "$anyconst" | "$allseq" | "$allconst" => {
                self.encode_source(cell, timestep)
            }
            "$dff" => return self.encode_dff(cell, timestep),
            // obligations are built by the caller
            "$assert" | "$assume" | "$cover" | "$live" => {}
            _ => return false,
        }
        true
    }

    /// Import every cell of the session module, returning the cells
    /// no encoder supports
    pub fn import_module(&mut self, timestep: i32) -> Vec<CellId> {
        let module = self.module;
        let mut unsupported = Vec::new();
        for cell in module.cells() {
            if !self.import_cell(cell, timestep) {
                warn!(
                    "Unsupported cell type {} for cell {}",
                    cell.cell_type, cell.name
                );
                unsupported.push(cell.id);
            }
        }
        debug!(
            "Imported {} cells of {} at timestep {}",
            module.cells().count() - unsupported.len(),
            module.name,
            timestep
        );
        unsupported
    }

    /// Pin `y` to `yy`, or gate it by `undef_y` under undef modeling
    fn finish_output(&mut self, y: &[Lit], yy: &[Lit], undef_y: Option<&[Lit]>) {
        match undef_y {
            Some(undef_y) => self.undef_gating(y, yy, undef_y),
            None => {
                let eq = self.ez.vec_eq(y, yy);
                self.ez.assume(eq);
            }
        }
    }

    /// Single-bit result in bit 0, remaining bits zero
    fn bool_vector(&self, bit: Lit, width: usize) -> Vec<Lit> {
        let mut vec = vec![Lit::FALSE; width];
        if let Some(first) = vec.first_mut() {
            *first = bit;
        }
        vec
    }

    fn encode_unary(&mut self, cell: &Cell, timestep: i32) {
        let mut a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let mut y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        self.extend_signal_width_unary(&mut a, &mut y, cell, false);

        let yy = if cell.is_type("$not") {
            self.ez.vec_not(&a)
        } else {
            a
        };

        if self.model_undef {
            let mut undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
            let mut undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
            self.extend_signal_width_unary(&mut undef_a, &mut undef_y, cell, false);
            let eq = self.ez.vec_eq(&undef_a, &undef_y);
            self.ez.assume(eq);
            self.finish_output(&y, &yy, Some(&undef_y));
        } else {
            self.finish_output(&y, &yy, None);
        }
    }

    fn encode_bitwise(&mut self, cell: &Cell, timestep: i32) {
        let mut a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let mut b = self.import_def_sig_spec(&cell.port("B"), timestep);
        let mut y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        self.extend_signal_width_y(&mut a, &mut b, &mut y, cell, false);

        let yy = match cell.cell_type.as_str() {
            "$and" => self.ez.vec_and(&a, &b),
            "$or" => self.ez.vec_or(&a, &b),
            "$xor" => self.ez.vec_xor(&a, &b),
            _ => {
                let x = self.ez.vec_xor(&a, &b);
                self.ez.vec_not(&x)
            }
        };

        if !self.model_undef {
            self.finish_output(&y, &yy, None);
            return;
        }

        let mut undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
        let mut undef_b = self.import_undef_sig_spec(&cell.port("B"), timestep);
        let mut undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
        self.extend_signal_width_y(&mut undef_a, &mut undef_b, &mut undef_y, cell, false);

        let mut y_x = Vec::with_capacity(y.len());
        for i in 0..y.len() {
            let (a, ua, b, ub) = (a[i], undef_a[i], b[i], undef_b[i]);
            let any_undef = self.ez.or(ua, ub);
            let x = match cell.cell_type.as_str() {
                // a defined dominating value on either side decides the bit
                "$and" | "$or" => {
                    let dominant = |v: Lit| if cell.is_type("$and") { !v } else { v };
                    let a_dom = self.ez.and(dominant(a), !ua);
                    let b_dom = self.ez.and(dominant(b), !ub);
                    let decided = self.ez.or(a_dom, b_dom);
                    self.ez.and(any_undef, !decided)
                }
                _ => any_undef,
            };
            y_x.push(x);
        }
        let eq = self.ez.vec_eq(&y_x, &undef_y);
        self.ez.assume(eq);
        self.finish_output(&y, &yy, Some(&y_x));
    }

    fn encode_reduce(&mut self, cell: &Cell, timestep: i32) {
        let a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        if y.is_empty() {
            return;
        }

        let bit = match cell.cell_type.as_str() {
            "$reduce_and" => self.ez.and_all(&a),
            "$reduce_or" | "$reduce_bool" => self.ez.or_all(&a),
            "$reduce_xor" => self.ez.xor_all(&a),
            "$reduce_xnor" => !self.ez.xor_all(&a),
            _ => !self.ez.or_all(&a),
        };
        let yy = self.bool_vector(bit, y.len());

        if !self.model_undef {
            self.finish_output(&y, &yy, None);
            return;
        }

        let undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
        let undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
        let any_undef = self.ez.or_all(&undef_a);
        let x = match cell.cell_type.as_str() {
            "$reduce_and" => {
                let zeros: Vec<Lit> = (0..a.len())
                    .map(|i| self.ez.and(!a[i], !undef_a[i]))
                    .collect();
                let has_zero = self.ez.or_all(&zeros);
                self.ez.and(any_undef, !has_zero)
            }
            "$reduce_xor" | "$reduce_xnor" => any_undef,
            _ => {
                let ones: Vec<Lit> = (0..a.len())
                    .map(|i| self.ez.and(a[i], !undef_a[i]))
                    .collect();
                let has_one = self.ez.or_all(&ones);
                self.ez.and(any_undef, !has_one)
            }
        };
        let y_x = self.bool_vector(x, undef_y.len());
        let eq = self.ez.vec_eq(&y_x, &undef_y);
        self.ez.assume(eq);
        self.finish_output(&y, &yy, Some(&y_x));
    }

    /// `(definitely true, definitely false)` of a vector used as a boolean
    fn logic_value(&mut self, a: &[Lit], undef_a: &[Lit]) -> (Lit, Lit) {
        let ones: Vec<Lit> = (0..a.len())
            .map(|i| self.ez.and(a[i], !undef_a[i]))
            .collect();
        let zeros: Vec<Lit> = (0..a.len())
            .map(|i| self.ez.and(!a[i], !undef_a[i]))
            .collect();
        let is_one = self.ez.or_all(&ones);
        let is_zero = self.ez.and_all(&zeros);
        (is_one, is_zero)
    }

    fn encode_logic(&mut self, cell: &Cell, timestep: i32) {
        let a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let b = self.import_def_sig_spec(&cell.port("B"), timestep);
        let y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        if y.is_empty() {
            return;
        }

        let a_bool = self.ez.or_all(&a);
        let b_bool = self.ez.or_all(&b);
        let is_and = cell.is_type("$logic_and");
        let bit = if is_and {
            self.ez.and(a_bool, b_bool)
        } else {
            self.ez.or(a_bool, b_bool)
        };
        let yy = self.bool_vector(bit, y.len());

        if !self.model_undef {
            self.finish_output(&y, &yy, None);
            return;
        }

        let undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
        let undef_b = self.import_undef_sig_spec(&cell.port("B"), timestep);
        let undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
        let (a1, a0) = self.logic_value(&a, &undef_a);
        let (b1, b0) = self.logic_value(&b, &undef_b);
        let (decided_by_one, decided_by_both) = if is_and {
            (self.ez.or(a0, b0), self.ez.and(a1, b1))
        } else {
            (self.ez.or(a1, b1), self.ez.and(a0, b0))
        };
        let decided = self.ez.or(decided_by_one, decided_by_both);
        let y_x = self.bool_vector(!decided, undef_y.len());
        let eq = self.ez.vec_eq(&y_x, &undef_y);
        self.ez.assume(eq);
        self.finish_output(&y, &yy, Some(&y_x));
    }

    fn encode_compare(&mut self, cell: &Cell, timestep: i32) {
        let is_eq = cell.type_in(&["$eq", "$eqx"]);
        let is_exact = cell.type_in(&["$eqx", "$nex"]);

        let mut a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let mut b = self.import_def_sig_spec(&cell.port("B"), timestep);
        let y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        if y.is_empty() {
            return;
        }
        self.extend_signal_width(&mut a, &mut b, cell, 0, false);

        if !self.model_undef {
            let bit = if is_eq {
                self.ez.vec_eq(&a, &b)
            } else {
                self.ez.vec_ne(&a, &b)
            };
            let yy = self.bool_vector(bit, y.len());
            self.finish_output(&y, &yy, None);
            return;
        }

        let mut undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
        let mut undef_b = self.import_undef_sig_spec(&cell.port("B"), timestep);
        self.extend_signal_width(&mut undef_a, &mut undef_b, cell, 0, false);
        let undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);

        if is_exact {
            // x compares as a value of its own: always defined
            let eq = self.vec_eq_undef(&a, &undef_a, &b, &undef_b);
            let bit = if is_eq { eq } else { !eq };
            let yy = self.bool_vector(bit, y.len());
            for u in &undef_y {
                self.ez.assume(!*u);
            }
            self.finish_output(&y, &yy, None);
            return;
        }

        let bit = if is_eq {
            self.ez.vec_eq(&a, &b)
        } else {
            self.ez.vec_ne(&a, &b)
        };
        let yy = self.bool_vector(bit, y.len());

        // undefined unless some defined bit pair already differs
        let any_undef_a = self.ez.or_all(&undef_a);
        let any_undef_b = self.ez.or_all(&undef_b);
        let any_undef = self.ez.or(any_undef_a, any_undef_b);
        let either_undef = self.ez.vec_or(&undef_a, &undef_b);
        let masked_a = self.ez.vec_or(&a, &either_undef);
        let masked_b = self.ez.vec_or(&b, &either_undef);
        let masked_ne = self.ez.vec_ne(&masked_a, &masked_b);
        let x = self.ez.and(any_undef, !masked_ne);
        let y_x = self.bool_vector(x, undef_y.len());
        let eq = self.ez.vec_eq(&y_x, &undef_y);
        self.ez.assume(eq);
        self.finish_output(&y, &yy, Some(&y_x));
    }

    fn encode_mux(&mut self, cell: &Cell, timestep: i32) {
        let a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let b = self.import_def_sig_spec(&cell.port("B"), timestep);
        let s = self.import_def_sig_spec(&cell.port("S"), timestep);
        let y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        assert_eq!(s.len(), 1, "select of {} must be 1 bit", cell.name);
        assert_eq!(a.len(), y.len());

        if !self.model_undef {
            let (yy, _) = self.mux(s[0], Lit::FALSE, &a, &[], &b, &[]);
            self.finish_output(&y, &yy, None);
            return;
        }

        let undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
        let undef_b = self.import_undef_sig_spec(&cell.port("B"), timestep);
        let undef_s = self.import_undef_sig_spec(&cell.port("S"), timestep);
        let undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
        let (yy, y_x) = self.mux(s[0], undef_s[0], &a, &undef_a, &b, &undef_b);
        let eq = self.ez.vec_eq(&y_x, &undef_y);
        self.ez.assume(eq);
        self.finish_output(&y, &yy, Some(&y_x));
    }

    fn encode_arith(&mut self, cell: &Cell, timestep: i32) {
        let mut a = self.import_def_sig_spec(&cell.port("A"), timestep);
        let mut b = self.import_def_sig_spec(&cell.port("B"), timestep);
        let mut y = self.import_def_sig_spec(&cell.port("Y"), timestep);
        self.extend_signal_width_y(&mut a, &mut b, &mut y, cell, false);

        // ripple carry; subtraction adds the complement plus one
        let subtract = cell.is_type("$sub");
        let mut carry = Lit::from_bool(subtract);
        let mut yy = Vec::with_capacity(y.len());
        for i in 0..y.len() {
            let bi = if subtract { !b[i] } else { b[i] };
            let half = self.ez.xor(a[i], bi);
            yy.push(self.ez.xor(half, carry));
            let generate = self.ez.and(a[i], bi);
            let propagate = self.ez.and(half, carry);
            carry = self.ez.or(generate, propagate);
        }

        if !self.model_undef {
            self.finish_output(&y, &yy, None);
            return;
        }

        let mut undef_a = self.import_undef_sig_spec(&cell.port("A"), timestep);
        let mut undef_b = self.import_undef_sig_spec(&cell.port("B"), timestep);
        let mut undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
        self.extend_signal_width_y(&mut undef_a, &mut undef_b, &mut undef_y, cell, false);
        let any_undef_a = self.ez.or_all(&undef_a);
        let any_undef_b = self.ez.or_all(&undef_b);
        let x = self.ez.or(any_undef_a, any_undef_b);
        let y_x = vec![x; undef_y.len()];
        let eq = self.ez.vec_eq(&y_x, &undef_y);
        self.ez.assume(eq);
        self.finish_output(&y, &yy, Some(&y_x));
    }

    fn encode_initstate(&mut self, cell: &Cell, timestep: i32) {
        let init = self.claim_init_state(timestep);
        let y = self.import_sig_spec(&cell.port("Y"), timestep);
        assert_eq!(y.len(), 1, "{} must have a 1 bit output", cell.name);
        let eq = self.ez.iff(y[0], Lit::from_bool(init));
        self.ez.assume(eq);
        if self.model_undef {
            let undef_y = self.import_undef_sig_spec(&cell.port("Y"), timestep);
            self.ez.assume(!undef_y[0]);
        }
    }

    /// Free value sources: defined, and held across timesteps for the
    /// `*const` kinds
    fn encode_source(&mut self, cell: &Cell, timestep: i32) {
        let y_sig = cell.port("Y");
        if cell.type_in(&["$anyconst", "$allconst"]) && timestep > 1 {
            let prev = self.import_def_sig_spec(&y_sig, timestep - 1);
            let cur = self.import_def_sig_spec(&y_sig, timestep);
            let eq = self.ez.vec_eq(&prev, &cur);
            self.ez.assume(eq);
        }
        if self.model_undef {
            let undef_y = self.import_undef_sig_spec(&y_sig, timestep);
            for u in undef_y {
                self.ez.assume(!u);
            }
        }
    }

    /// `Q@t = D@(t-1)`; at timestep 1 the state is recorded as initial
    fn encode_dff(&mut self, cell: &Cell, timestep: i32) -> bool {
        if timestep < 1 {
            return false;
        }
        let q_sig = cell.port("Q");
        if timestep == 1 {
            self.record_initial_state(&q_sig);
            return true;
        }

        let d = self.import_def_sig_spec(&cell.port("D"), timestep - 1);
        let q = self.import_def_sig_spec(&q_sig, timestep);
        assert_eq!(d.len(), q.len());
        if !self.model_undef {
            self.finish_output(&q, &d, None);
            return true;
        }

        let undef_d = self.import_undef_sig_spec(&cell.port("D"), timestep - 1);
        let undef_q = self.import_undef_sig_spec(&q_sig, timestep);
        let eq = self.ez.vec_eq(&undef_d, &undef_q);
        self.ez.assume(eq);
        self.finish_output(&q, &d, Some(&undef_d));
        true
    }
}
