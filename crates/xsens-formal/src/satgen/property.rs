//! Proof obligations of property cells

use super::SatGen;
use crate::engine::Lit;
use xsens_ir::Cell;

impl SatGen<'_> {
    /// Obligation literal of an `$assert`, `$assume` or `$cover` cell.
    ///
    /// Undefined check or enable bits count as false. Covers yield
    /// `en & check`, asserts and assumes yield `!en | check`.
    pub fn import_property_cell(&mut self, cell: &Cell, timestep: i32) -> Lit {
        assert!(
            cell.type_in(&["$assert", "$assume", "$cover"]),
            "{} is not a property cell",
            cell.cell_type
        );
        let check_sig = self.sigmap.map(&cell.port("A"));
        let en_sig = self.sigmap.map(&cell.port("EN"));
        assert!(check_sig.is_bit(), "check of {} must be 1 bit", cell.name);
        assert!(en_sig.is_bit(), "enable of {} must be 1 bit", cell.name);

        let mut check_bit = self.import_def_sig_spec(&check_sig, timestep)[0];
        let mut enable_bit = self.import_def_sig_spec(&en_sig, timestep)[0];

        if self.model_undef {
            let undef_check = self.import_undef_sig_spec(&check_sig, timestep)[0];
            let undef_enable = self.import_undef_sig_spec(&en_sig, timestep)[0];
            check_bit = self.ez.and(!undef_check, check_bit);
            enable_bit = self.ez.and(!undef_enable, enable_bit);
        }

        if cell.is_type("$cover") {
            self.ez.and(check_bit, enable_bit)
        } else {
            self.ez.or(!enable_bit, check_bit)
        }
    }
}
