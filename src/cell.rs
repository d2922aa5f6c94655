//! A single grid cell: fixed basement elevation, a fixed-length stack of
//! sediment layers, a persistent landform tag, and the transient scratch
//! fields that the wave/erosion/collapse passes write and the per-step
//! reset wipes.

use crate::landform::Landform;
use crate::sediment::CellLayer;

/// Transient, per-step fields. Every field here is zeroed (or set to its
/// "not yet written" default) by [`Cell::reset_transients`] at the top of
/// each step; nothing here survives to the next step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transients {
    pub wave_orientation: f64,
    pub wave_height: f64,
    pub in_active_zone: bool,
    pub local_slope: f64,
    pub potential_erosion: f64,
    pub actual_erosion: f64,
    /// Fine-sediment component of `actual_erosion` this step; tallied
    /// separately because it routes to suspended sediment rather than
    /// staying on the layer stack.
    pub actual_erosion_fine: f64,
    /// Weight used by inter-profile inverse-distance blending. `None` means
    /// "not yet written this step" (replaces the source's `DBL_NODATA`
    /// sentinel per design note o4).
    pub interpolation_weight: Option<f64>,
    pub is_coastline: bool,
    pub is_normal_profile: bool,
    pub collapsed_depth: f64,
    pub collapsed_deposit_depth: f64,
}

/// Running per-cell totals, accumulated step over step. Never reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningTotals {
    pub tot_potential_erosion: f64,
    pub tot_actual_erosion: f64,
    pub tot_collapsed_depth: f64,
    pub tot_collapsed_deposit_depth: f64,
}

#[derive(Debug, Clone)]
pub struct Cell {
    /// Non-erodible elevation datum beneath all sediment layers; fixed for
    /// the run.
    basement: f64,
    /// Bottom-to-top ordered sediment layers; length fixed at `L` for the
    /// run (layer 0 sits on the basement, `num_layers() - 1` is the
    /// topmost/surface layer).
    layers: Vec<CellLayer>,
    landform: Landform,
    intervention_code: i32,
    suspended_sediment_depth: f64,

    /// Cached top-of-layer elevations, one past the basement per layer plus
    /// a final entry equal to `sediment_top_elev`. Recomputed by
    /// [`Cell::recalc_layer_elevations`] after any thickness change.
    layer_top_elevs: Vec<f64>,

    pub transients: Transients,
    pub totals: RunningTotals,
}

impl Cell {
    pub fn new(basement: f64, num_layers: usize) -> Self {
        let mut cell = Self {
            basement,
            layers: vec![CellLayer::new(); num_layers],
            landform: Landform::default(),
            intervention_code: 0,
            suspended_sediment_depth: 0.0,
            layer_top_elevs: vec![0.0; num_layers],
            transients: Transients::default(),
            totals: RunningTotals::default(),
        };
        cell.recalc_layer_elevations();
        cell
    }

    pub fn basement(&self) -> f64 {
        self.basement
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, i: usize) -> &CellLayer {
        &self.layers[i]
    }

    pub fn layer_mut(&mut self, i: usize) -> &mut CellLayer {
        &mut self.layers[i]
    }

    pub fn layers(&self) -> &[CellLayer] {
        &self.layers
    }

    pub fn landform(&self) -> &Landform {
        &self.landform
    }

    pub fn set_landform(&mut self, lf: Landform) {
        self.landform = lf;
    }

    pub fn intervention_code(&self) -> i32 {
        self.intervention_code
    }

    pub fn set_intervention_code(&mut self, code: i32) {
        self.intervention_code = code;
    }

    pub fn suspended_sediment_depth(&self) -> f64 {
        self.suspended_sediment_depth
    }

    pub fn set_suspended_sediment_depth(&mut self, d: f64) {
        self.suspended_sediment_depth = d;
    }

    /// `basement + sum(layer thicknesses)`.
    pub fn sediment_top_elev(&self) -> f64 {
        *self
            .layer_top_elevs
            .last()
            .expect("layer_top_elevs always has >= 1 entry")
    }

    /// Elevation of the top of layer `i` (higher index = higher elevation,
    /// so this is the elevation after layers `0..=i` have been accounted
    /// for). Recomputed by [`Cell::recalc_layer_elevations`].
    pub fn layer_top_elev(&self, i: usize) -> f64 {
        self.layer_top_elevs[i]
    }

    /// Recomputes every inter-layer elevation and `sediment_top_elev` from
    /// `basement` upward. Must be called after any thickness change
    /// (`CalcAllLayerElevs` in the source).
    pub fn recalc_layer_elevations(&mut self) {
        let mut elev = self.basement;
        for (i, layer) in self.layers.iter().enumerate() {
            elev += layer.total_thickness();
            self.layer_top_elevs[i] = elev;
        }
    }

    /// `max(0, still_water_level - sediment_top_elev)`.
    pub fn water_depth(&self, still_water_level: f64) -> f64 {
        (still_water_level - self.sediment_top_elev()).max(0.0)
    }

    /// Zeroes every transient field while preserving basement, sediment
    /// stack, landform, and intervention code.
    pub fn reset_transients(&mut self) {
        self.transients = Transients::default();
    }

    /// Applies `CellLayer::remove_cliff` to every layer, then recomputes
    /// layer elevations. Invoked exactly once per cell when its cliff
    /// landform transitions to Sea.
    pub fn remove_cliff(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.remove_cliff();
        }
        self.recalc_layer_elevations();
    }

    /// `sediment_top_elev >= basement`, the invariant checked after every
    /// step.
    pub fn invariant_holds(&self) -> bool {
        self.sediment_top_elev() >= self.basement - 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cell_sediment_top_equals_basement() {
        let c = Cell::new(5.0, 3);
        assert!((c.sediment_top_elev() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn recalc_layer_elevations_tracks_thickness_changes() {
        let mut c = Cell::new(0.0, 2);
        c.layer_mut(0).unconsolidated_mut().set_sand(2.0);
        c.recalc_layer_elevations();
        assert!((c.layer_top_elev(0) - 2.0).abs() < 1e-12);
        assert!((c.sediment_top_elev() - 2.0).abs() < 1e-12);

        c.layer_mut(1).consolidated_mut().set_coarse(3.0);
        c.recalc_layer_elevations();
        assert!((c.layer_top_elev(1) - 5.0).abs() < 1e-12);
        assert!((c.sediment_top_elev() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn water_depth_is_zero_above_sea_level() {
        let c = Cell::new(10.0, 1);
        assert_eq!(c.water_depth(5.0), 0.0);
        assert!((c.water_depth(12.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn reset_transients_preserves_persistent_fields() {
        let mut c = Cell::new(1.0, 1);
        c.set_intervention_code(7);
        c.transients.wave_height = 3.0;
        c.transients.potential_erosion = 2.0;
        c.reset_transients();
        assert_eq!(c.transients.wave_height, 0.0);
        assert_eq!(c.transients.potential_erosion, 0.0);
        assert_eq!(c.intervention_code(), 7);
        assert!((c.basement() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn remove_cliff_lowers_top_elev_by_lost_amount() {
        let mut c = Cell::new(0.0, 1);
        c.layer_mut(0).unconsolidated_mut().set_fine(10.0);
        c.layer_mut(0).unconsolidated_mut().incr_notch_fine_lost(4.0);
        c.recalc_layer_elevations();
        assert!((c.sediment_top_elev() - 10.0).abs() < 1e-12);
        c.remove_cliff();
        assert!((c.sediment_top_elev() - 6.0).abs() < 1e-12);
        assert!(c.invariant_holds());
    }
}
