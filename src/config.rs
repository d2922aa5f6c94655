//! Run configuration, Kahan-summed grand totals, and the save-instant
//! schedule, all deserializable the way the rest of the ambient stack is.

use serde::{Deserialize, Serialize};

use crate::error::{CmeError, CmeResult};

/// Top-level parameters for one simulation run. Distinct from the transient,
/// per-step fields carried on [`crate::cell::Cell`]: everything here is
/// fixed for the whole run, set once at startup and validated before the
/// first step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of coastal-evolution timesteps to run.
    pub num_steps: u32,
    /// Seconds per timestep.
    pub timestep_seconds: f64,

    /// Mean along-coast spacing between profiles, in the external CRS unit.
    pub profile_spacing: f64,
    /// Fraction of `profile_spacing` used as the Gaussian perturbation's
    /// standard deviation when placing each profile.
    pub profile_rand_space_fact: f64,
    /// Coast-normal profile length.
    pub profile_length: f64,

    /// Beach protection factor, `[0, 1]` (0 = no protection, 1 = fully
    /// protected), applied uniformly for now.
    pub beach_protection_factor: f64,
    /// `R`, the shore-platform material-strength / hydrodynamic constant.
    pub material_strength_r: f64,
    /// Maximum depth-over-breaking-depth the erosion-potential lookup covers
    /// before falling back to zero.
    pub max_depth_over_db: f64,

    /// Rate at which accumulated wave energy converts to cliff-notch
    /// incision depth.
    pub notch_energy_to_depth_rate: f64,
    /// Notch overhang depth, or zero remaining lateral depth, at which a
    /// cliff collapses.
    pub collapse_overhang_threshold: f64,
    /// Fraction of a cliff cell's lateral depth consumed by one collapse.
    pub collapse_notch_area_fraction: f64,
    /// Across-shore length, in cells, of the talus deposit each collapse
    /// spreads over.
    pub cliff_deposition_planview_length: usize,
    /// Alongshore width, in profiles (odd), that one collapse's talus is
    /// spread across. Distinct from `cliff_deposition_planview_length`.
    pub cliff_deposition_planview_width: usize,
    /// Fixed Dean profile scale parameter `A`; if absent, solved per-event
    /// so the talus toe meets the existing foreshore.
    pub cliff_deposition_a: Option<f64>,

    /// Fraction of topmost-layer fine sediment released by one step's worth
    /// of actual erosion.
    pub fine_erodibility: f64,
    /// Fraction of topmost-layer sand sediment released by one step's worth
    /// of actual erosion.
    pub sand_erodibility: f64,
    /// Fraction of topmost-layer coarse sediment released by one step's
    /// worth of actual erosion.
    pub coarse_erodibility: f64,

    /// Smoothing method applied to a freshly traced coastline before
    /// profiles are placed on it.
    pub coast_smooth_method: CoastSmoothMethod,
    /// Smoothing window (odd, in points) applied to a freshly traced
    /// coastline before profiles are placed on it.
    pub coast_smoothing_window: usize,
    /// Polynomial order used when `coast_smooth_method` is
    /// `SavitzkyGolay`.
    pub coast_savgol_poly_order: usize,
    /// Half-width (points) used by the Hermann & Klette curvature estimate.
    pub curvature_half_width: usize,
    /// Smoothing window (odd, in points) applied to a profile's elevation
    /// series before slopes are derived from it.
    pub profile_smooth_window: usize,

    /// Whether cliff-collapse processing runs this step.
    pub do_cliff_collapse: bool,
    /// Whether alongshore sediment transport runs this step. Declared for
    /// external-interface parity; this core has no transport pass to gate.
    pub do_alongshore_transport: bool,

    /// Still water level for this run; real runs vary this per step from a
    /// tide series, but a constant value is accepted directly too.
    pub still_water_level: f64,
    pub min_still_water_level: f64,

    /// RNG seed for the edge-search shuffle order.
    pub edge_search_seed: u64,
    /// RNG seed for profile-spacing perturbation, independent of the above.
    pub profile_spacing_seed: u64,

    /// Tolerance for the end-of-step mass-balance check.
    pub mass_balance_tolerance: f64,
}

/// Coastline smoothing method, selected per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoastSmoothMethod {
    None,
    RunningMean,
    SavitzkyGolay,
}

impl SimulationConfig {
    pub fn validate(&self) -> CmeResult<()> {
        if self.num_steps == 0 {
            return Err(CmeError::BadParam("num_steps must be > 0".into()));
        }
        if self.timestep_seconds <= 0.0 {
            return Err(CmeError::BadParam("timestep_seconds must be > 0".into()));
        }
        if self.profile_spacing <= 0.0 {
            return Err(CmeError::BadParam("profile_spacing must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.beach_protection_factor) {
            return Err(CmeError::BadParam("beach_protection_factor must be in [0, 1]".into()));
        }
        if self.material_strength_r <= 0.0 {
            return Err(CmeError::BadParam("material_strength_r must be > 0".into()));
        }
        if self.coast_smoothing_window % 2 == 0 {
            return Err(CmeError::BadParam("coast_smoothing_window must be odd".into()));
        }
        if !(0.0..=1.0).contains(&self.collapse_notch_area_fraction) {
            return Err(CmeError::BadParam(
                "collapse_notch_area_fraction must be in [0, 1]".into(),
            ));
        }
        if self.cliff_deposition_planview_width % 2 == 0 {
            return Err(CmeError::BadParam("cliff_deposition_planview_width must be odd".into()));
        }
        if self.profile_smooth_window % 2 == 0 {
            return Err(CmeError::BadParam("profile_smooth_window must be odd".into()));
        }
        if !(0.0..=1.0).contains(&self.fine_erodibility) {
            return Err(CmeError::BadParam("fine_erodibility must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.sand_erodibility) {
            return Err(CmeError::BadParam("sand_erodibility must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.coarse_erodibility) {
            return Err(CmeError::BadParam("coarse_erodibility must be in [0, 1]".into()));
        }
        Ok(())
    }
}

/// A Kahan (compensated) running sum, used for every grand total so that
/// thousands of small per-step additions don't accumulate floating-point
/// drift over a long run.
#[derive(Debug, Clone, Copy, Default)]
pub struct KahanSum {
    sum: f64,
    compensation: f64,
}

impl KahanSum {
    pub fn add(&mut self, value: f64) {
        let y = value - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum
    }
}

/// Run-wide mass-balance accumulators. Cliff-collapse fine sediment is added
/// to `fine_lost` exactly once, at the point of collapse; erosion elsewhere
/// adds to `total_eroded` at the point of actual erosion. Double-counting
/// collapse output in both would overstate total sediment loss, so the
/// driver must route each tranche of sediment to exactly one of these sums.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrandTotals {
    pub total_potential_erosion: KahanSum,
    pub total_actual_erosion: KahanSum,
    pub total_collapsed_depth: KahanSum,
    pub total_collapsed_deposit_depth: KahanSum,
    pub total_fine_lost: KahanSum,
    pub total_sand_deposited: KahanSum,
    pub total_coarse_deposited: KahanSum,
}

impl GrandTotals {
    /// `|eroded + collapsed - deposited| <= tolerance`: the run-level sanity
    /// check that sediment has been moved around, not created or destroyed.
    pub fn mass_balance_residual(&self) -> f64 {
        let removed = self.total_actual_erosion.value() + self.total_collapsed_depth.value();
        let added = self.total_sand_deposited.value() + self.total_coarse_deposited.value();
        (removed - added - self.total_fine_lost.value()).abs()
    }
}

/// Decides which steps write output, following the source's fixed-interval
/// save schedule plus an explicit list of one-off save points.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SaveSchedule {
    pub every_n_steps: Option<u32>,
    pub explicit_steps: Vec<u32>,
}

impl SaveSchedule {
    pub fn should_save(&self, step: u32) -> bool {
        if let Some(n) = self.every_n_steps {
            if n > 0 && step % n == 0 {
                return true;
            }
        }
        self.explicit_steps.contains(&step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kahan_sum_accumulates_many_small_values_without_drift() {
        let mut s = KahanSum::default();
        for _ in 0..100_000 {
            s.add(0.0001);
        }
        assert!((s.value() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn save_schedule_matches_interval_and_explicit_steps() {
        let sched = SaveSchedule {
            every_n_steps: Some(10),
            explicit_steps: vec![3],
        };
        assert!(sched.should_save(0));
        assert!(sched.should_save(10));
        assert!(sched.should_save(3));
        assert!(!sched.should_save(7));
    }

    #[test]
    fn validate_rejects_even_smoothing_window() {
        let mut cfg = sample_config();
        cfg.coast_smoothing_window = 4;
        assert!(cfg.validate().is_err());
    }

    fn sample_config() -> SimulationConfig {
        SimulationConfig {
            num_steps: 10,
            timestep_seconds: 3600.0,
            profile_spacing: 10.0,
            profile_rand_space_fact: 0.1,
            profile_length: 50.0,
            beach_protection_factor: 0.0,
            material_strength_r: 1000.0,
            max_depth_over_db: 1.0,
            notch_energy_to_depth_rate: 1e-6,
            collapse_overhang_threshold: 0.5,
            collapse_notch_area_fraction: 0.5,
            cliff_deposition_planview_length: 5,
            cliff_deposition_planview_width: 5,
            cliff_deposition_a: None,
            fine_erodibility: 0.3,
            sand_erodibility: 0.4,
            coarse_erodibility: 0.3,
            coast_smooth_method: CoastSmoothMethod::SavitzkyGolay,
            coast_smoothing_window: 5,
            coast_savgol_poly_order: 2,
            curvature_half_width: 2,
            profile_smooth_window: 3,
            do_cliff_collapse: true,
            do_alongshore_transport: false,
            still_water_level: 0.0,
            min_still_water_level: -1.0,
            edge_search_seed: 1,
            profile_spacing_seed: 2,
            mass_balance_tolerance: 1e-4,
        }
    }
}
