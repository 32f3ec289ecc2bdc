//! Undef-aware equality and multiplexing

use super::SatGen;
use crate::engine::Lit;

impl SatGen<'_> {
    /// Equality of two undef-annotated vectors.
    ///
    /// Two bits are equal when their undef flags agree and `value | undef`
    /// agrees on both sides, so an undefined bit only equals another
    /// undefined bit.
    pub fn vec_eq_undef(&mut self, a: &[Lit], undef_a: &[Lit], b: &[Lit], undef_b: &[Lit]) -> Lit {
        assert!(self.model_undef, "undef equality without undef modeling");
        assert_eq!(a.len(), b.len());
        assert_eq!(a.len(), undef_a.len());
        assert_eq!(b.len(), undef_b.len());

        let mut eq_bits = Vec::with_capacity(a.len());
        for i in 0..a.len() {
            let undef_eq = self.ez.iff(undef_a[i], undef_b[i]);
            let va = self.ez.or(a[i], undef_a[i]);
            let vb = self.ez.or(b[i], undef_b[i]);
            let value_eq = self.ez.iff(va, vb);
            eq_bits.push(self.ez.and(undef_eq, value_eq));
        }
        self.ez.and_all(&eq_bits)
    }

    /// Select `b` when `s` is set, else `a`.
    ///
    /// Returns the selected values and, under undef modeling, their undef
    /// flags: an undefined select makes the result undefined wherever the
    /// branches may differ. Without undef modeling the undef vector is
    /// empty.
    pub fn mux(
        &mut self,
        s: Lit,
        undef_s: Lit,
        a: &[Lit],
        undef_a: &[Lit],
        b: &[Lit],
        undef_b: &[Lit],
    ) -> (Vec<Lit>, Vec<Lit>) {
        let res = self.ez.vec_ite(s, b, a);
        if !self.model_undef {
            return (res, Vec::new());
        }

        assert_eq!(undef_a.len(), a.len());
        assert_eq!(undef_b.len(), b.len());
        let same = self.ez.vec_iff(a, b);
        let differ = self.ez.vec_not(&same);
        let either_undef = self.ez.vec_or(undef_a, undef_b);
        let undef_ab = self.ez.vec_or(&differ, &either_undef);
        let selected = self.ez.vec_ite(s, undef_b, undef_a);
        let undef_res = self.ez.vec_ite(undef_s, &undef_ab, &selected);
        (res, undef_res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aig::AigEngine;
    use xsens_ir::Module;

    fn session(m: &Module) -> SatGen<'_> {
        SatGen::new(Box::new(AigEngine::new()), m).with_model_undef(true)
    }

    #[test]
    fn test_undef_equality_is_symmetric() {
        let m = Module::new("\\m");
        let mut sat = session(&m);
        let ez = sat.engine_mut();
        let a = ez.vec_var(3);
        let ua = ez.vec_var(3);
        let b = ez.vec_var(3);
        let ub = ez.vec_var(3);

        let ab = sat.vec_eq_undef(&a, &ua, &b, &ub);
        let ba = sat.vec_eq_undef(&b, &ub, &a, &ua);
        let differ = sat.engine_mut().xor(ab, ba);
        assert!(sat.solve(&[differ]).unwrap().is_none());
    }

    #[test]
    fn test_undef_bit_only_equals_undef() {
        let m = Module::new("\\m");
        let mut sat = session(&m);
        let a = sat.engine_mut().literal();
        let b = sat.engine_mut().literal();

        // a undefined, b defined
        let eq = sat.vec_eq_undef(&[a], &[Lit::TRUE], &[b], &[Lit::FALSE]);
        assert!(sat.solve(&[eq]).unwrap().is_none());

        // both undefined: equal whatever the values
        let eq = sat.vec_eq_undef(&[a], &[Lit::TRUE], &[b], &[Lit::TRUE]);
        assert_eq!(eq, Lit::TRUE);
    }

    #[test]
    fn test_mux_defined_select_follows_branch() {
        let m = Module::new("\\m");
        let mut sat = session(&m);
        let a = [Lit::TRUE, Lit::FALSE];
        let b = [Lit::FALSE, Lit::FALSE];
        let ua = [Lit::FALSE, Lit::TRUE];
        let ub = [Lit::FALSE, Lit::FALSE];

        let (res, undef) = sat.mux(Lit::TRUE, Lit::FALSE, &a, &ua, &b, &ub);
        assert_eq!(res, b.to_vec());
        assert_eq!(undef, ub.to_vec());

        let (res, undef) = sat.mux(Lit::FALSE, Lit::FALSE, &a, &ua, &b, &ub);
        assert_eq!(res, a.to_vec());
        assert_eq!(undef, ua.to_vec());
    }

    #[test]
    fn test_mux_undef_select() {
        let m = Module::new("\\m");
        let mut sat = session(&m);
        let s = sat.engine_mut().literal();
        // bit 0 differs, bit 1 agrees and is defined
        let a = [Lit::TRUE, Lit::TRUE];
        let b = [Lit::FALSE, Lit::TRUE];
        let u = [Lit::FALSE, Lit::FALSE];
        let (_, undef) = sat.mux(s, Lit::TRUE, &a, &u, &b, &u);
        assert_eq!(undef, vec![Lit::TRUE, Lit::FALSE]);
    }

    #[test]
    fn test_mux_without_undef_modeling() {
        let m = Module::new("\\m");
        let mut sat = SatGen::new(Box::new(AigEngine::new()), &m);
        let (res, undef) = sat.mux(Lit::TRUE, Lit::FALSE, &[Lit::FALSE], &[], &[Lit::TRUE], &[]);
        assert_eq!(res, vec![Lit::TRUE]);
        assert!(undef.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_mismatched_lengths_panic() {
        let m = Module::new("\\m");
        let mut sat = session(&m);
        sat.vec_eq_undef(&[Lit::TRUE], &[Lit::FALSE], &[], &[]);
    }
}
