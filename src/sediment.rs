//! Per-layer sediment bookkeeping: three size fractions (fine, sand, coarse),
//! each tracking both the depth-equivalent currently present and the
//! depth-equivalent lost to notch incision, plus the consolidated/
//! unconsolidated pair that makes up one `CellLayer`.

/// One stratum's sediment content, split into fine/sand/coarse fractions.
/// Each fraction tracks both its present depth-equivalent and how much of it
/// has been carved away by a cliff notch but not yet physically removed
/// (removal happens once, in [`SedimentLayer::remove_cliff`], when the cell's
/// landform finally transitions from Cliff to Sea).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SedimentLayer {
    fine: f64,
    notch_fine_lost: f64,
    sand: f64,
    notch_sand_lost: f64,
    coarse: f64,
    notch_coarse_lost: f64,
}

impl SedimentLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fine(&self) -> f64 {
        self.fine
    }
    pub fn set_fine(&mut self, v: f64) {
        self.fine = v;
    }
    pub fn sand(&self) -> f64 {
        self.sand
    }
    pub fn set_sand(&mut self, v: f64) {
        self.sand = v;
    }
    pub fn coarse(&self) -> f64 {
        self.coarse
    }
    pub fn set_coarse(&mut self, v: f64) {
        self.coarse = v;
    }

    pub fn notch_fine_lost(&self) -> f64 {
        self.notch_fine_lost
    }
    pub fn incr_notch_fine_lost(&mut self, d: f64) {
        self.notch_fine_lost += d;
    }
    pub fn notch_sand_lost(&self) -> f64 {
        self.notch_sand_lost
    }
    pub fn incr_notch_sand_lost(&mut self, d: f64) {
        self.notch_sand_lost += d;
    }
    pub fn notch_coarse_lost(&self) -> f64 {
        self.notch_coarse_lost
    }
    pub fn incr_notch_coarse_lost(&mut self, d: f64) {
        self.notch_coarse_lost += d;
    }

    /// Total depth-equivalent across all three fractions.
    pub fn total(&self) -> f64 {
        self.fine + self.sand + self.coarse
    }

    /// `notchLost <= present` for every fraction: the invariant checked by
    /// the per-step testable properties.
    pub fn notch_lost_within_present(&self) -> bool {
        self.notch_fine_lost <= self.fine
            && self.notch_sand_lost <= self.sand
            && self.notch_coarse_lost <= self.coarse
    }

    /// Permanently removes notch-lost material from what is present, then
    /// zeroes the lost counters. Called exactly once per cell, when the
    /// cliff landform transitions to Sea.
    pub fn remove_cliff(&mut self) {
        self.fine -= self.notch_fine_lost;
        self.notch_fine_lost = 0.0;
        self.sand -= self.notch_sand_lost;
        self.notch_sand_lost = 0.0;
        self.coarse -= self.notch_coarse_lost;
        self.notch_coarse_lost = 0.0;
    }
}

/// A single stratigraphic layer on a cell: a consolidated and an
/// unconsolidated stack of sediment, plus the scalar properties that drive
/// erosion-fraction partitioning.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellLayer {
    unconsolidated: SedimentLayer,
    consolidated: SedimentLayer,
    vol_sed_fraction: f64,
    mech_resistance: f64,
    consolidation_status: f64,
}

impl CellLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unconsolidated(&self) -> &SedimentLayer {
        &self.unconsolidated
    }
    pub fn unconsolidated_mut(&mut self) -> &mut SedimentLayer {
        &mut self.unconsolidated
    }
    pub fn consolidated(&self) -> &SedimentLayer {
        &self.consolidated
    }
    pub fn consolidated_mut(&mut self) -> &mut SedimentLayer {
        &mut self.consolidated
    }

    pub fn unconsolidated_thickness(&self) -> f64 {
        self.unconsolidated.total()
    }
    pub fn consolidated_thickness(&self) -> f64 {
        self.consolidated.total()
    }
    pub fn total_thickness(&self) -> f64 {
        self.unconsolidated.total() + self.consolidated.total()
    }

    pub fn notch_unconsolidated_lost(&self) -> f64 {
        self.unconsolidated.notch_fine_lost
            + self.unconsolidated.notch_sand_lost
            + self.unconsolidated.notch_coarse_lost
    }
    pub fn notch_consolidated_lost(&self) -> f64 {
        self.consolidated.notch_fine_lost
            + self.consolidated.notch_sand_lost
            + self.consolidated.notch_coarse_lost
    }

    pub fn vol_sed_fraction(&self) -> f64 {
        self.vol_sed_fraction
    }
    pub fn set_vol_sed_fraction(&mut self, v: f64) {
        self.vol_sed_fraction = v;
    }
    pub fn mech_resistance(&self) -> f64 {
        self.mech_resistance
    }
    pub fn set_mech_resistance(&mut self, v: f64) {
        self.mech_resistance = v;
    }
    pub fn consolidation_status(&self) -> f64 {
        self.consolidation_status
    }
    pub fn set_consolidation_status(&mut self, v: f64) {
        self.consolidation_status = v;
    }

    /// Applies [`SedimentLayer::remove_cliff`] to both strata, for a layer
    /// whose cell has just transitioned from Cliff to Sea. The caller is
    /// responsible for recomputing layer elevations afterwards.
    pub fn remove_cliff(&mut self) {
        self.unconsolidated.remove_cliff();
        self.consolidated.remove_cliff();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_cliff_subtracts_lost_and_zeroes_it() {
        let mut s = SedimentLayer::new();
        s.set_fine(10.0);
        s.incr_notch_fine_lost(3.0);
        s.remove_cliff();
        assert!((s.fine() - 7.0).abs() < 1e-12);
        assert_eq!(s.notch_fine_lost(), 0.0);
    }

    #[test]
    fn notch_lost_within_present_holds_initially() {
        let s = SedimentLayer::new();
        assert!(s.notch_lost_within_present());
    }

    #[test]
    fn cell_layer_total_thickness_sums_both_strata() {
        let mut l = CellLayer::new();
        l.unconsolidated_mut().set_fine(1.0);
        l.unconsolidated_mut().set_sand(2.0);
        l.consolidated_mut().set_coarse(3.0);
        assert!((l.total_thickness() - 6.0).abs() < 1e-12);
        assert!((l.unconsolidated_thickness() - 3.0).abs() < 1e-12);
        assert!((l.consolidated_thickness() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn cell_layer_remove_cliff_applies_to_both_strata() {
        let mut l = CellLayer::new();
        l.unconsolidated_mut().set_sand(5.0);
        l.unconsolidated_mut().incr_notch_sand_lost(2.0);
        l.consolidated_mut().set_coarse(4.0);
        l.consolidated_mut().incr_notch_coarse_lost(1.0);
        l.remove_cliff();
        assert!((l.unconsolidated().sand() - 3.0).abs() < 1e-12);
        assert!((l.consolidated().coarse() - 3.0).abs() < 1e-12);
    }
}
