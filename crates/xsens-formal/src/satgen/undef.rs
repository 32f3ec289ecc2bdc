//! Signal equality and undef gating

use super::SatGen;
use crate::engine::Lit;
use xsens_ir::SigSpec;

impl SatGen<'_> {
    /// Literal that is true when `lhs` at `timestep_lhs` equals `rhs` at
    /// `timestep_rhs`. A negative `timestep_rhs` reuses `timestep_lhs`.
    pub fn signals_eq(
        &mut self,
        lhs: &SigSpec,
        rhs: &SigSpec,
        timestep_lhs: i32,
        timestep_rhs: i32,
    ) -> Lit {
        let timestep_rhs = if timestep_rhs < 0 {
            timestep_lhs
        } else {
            timestep_rhs
        };
        assert_eq!(lhs.len(), rhs.len());

        let vec_lhs = self.import_sig_spec(lhs, timestep_lhs);
        let vec_rhs = self.import_sig_spec(rhs, timestep_rhs);
        if !self.model_undef {
            return self.ez.vec_eq(&vec_lhs, &vec_rhs);
        }

        let undef_lhs = self.import_undef_sig_spec(lhs, timestep_lhs);
        let undef_rhs = self.import_undef_sig_spec(rhs, timestep_rhs);
        self.vec_eq_undef(&vec_lhs, &undef_lhs, &vec_rhs, &undef_rhs)
    }

    /// Constrain `y` to equal `yy` on every bit whose undef flag is clear.
    ///
    /// `y` may be longer than `undef`; the extra bits are left free.
    pub fn undef_gating(&mut self, y: &[Lit], yy: &[Lit], undef: &[Lit]) {
        assert!(self.model_undef, "undef gating without undef modeling");
        assert!(y.len() >= undef.len());
        assert_eq!(y.len(), yy.len());

        let n = undef.len();
        let same = self.ez.vec_iff(&y[..n], &yy[..n]);
        let gated = self.ez.vec_or(undef, &same);
        let all = self.ez.and_all(&gated);
        self.ez.assume(all);
    }

    pub fn undef_gating_bit(&mut self, y: Lit, yy: Lit, undef: Lit) {
        assert!(self.model_undef, "undef gating without undef modeling");
        let same = self.ez.iff(y, yy);
        let gated = self.ez.or(undef, same);
        self.ez.assume(gated);
    }
}
