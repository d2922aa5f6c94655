//! Shore-platform erosion: the Hermite-spline erosion-potential lookup,
//! per-profile potential erosion, inverse-distance-weighted blending of
//! potential erosion between profiles, and sediment-constrained actual
//! erosion.

use crate::geometry::Point2I;
use crate::grid::RasterGrid;

/// Erosion potential values above this (less negative) are treated as zero;
/// avoids chasing floating-point noise near the point where the Hermite
/// curve crosses zero.
const EROSION_POTENTIAL_TOLERANCE: f64 = -1e-10;
const DODB_INCREMENT: f64 = 0.001;

/// A dense lookup table for erosion potential as a function of
/// depth-over-breaking-depth, built once per run from a handful of
/// user-supplied control points by cubic Hermite interpolation.
#[derive(Debug, Clone)]
pub struct ErosionPotentialTable {
    samples: Vec<f64>,
    depth_over_db_max: f64,
}

impl ErosionPotentialTable {
    /// `control_x`/`control_y`/`control_dydx` are the user-supplied
    /// depth-over-DB / erosion-potential / first-derivative triples (the
    /// shape function). The table is sampled every [`DODB_INCREMENT`] out to
    /// the first point the interpolated curve becomes non-negative, which
    /// fixes `depth_over_db_max`.
    pub fn build(control_x: &[f64], control_y: &[f64], control_dydx: &[f64]) -> Self {
        let max_x = *control_x.last().unwrap_or(&1.0);
        let n = (max_x / DODB_INCREMENT).ceil() as usize + 1;
        let mut samples = Vec::with_capacity(n);
        for i in 0..n {
            let x = i as f64 * DODB_INCREMENT;
            samples.push(hermite_eval(control_x, control_y, control_dydx, x));
        }

        let last_negative = samples
            .iter()
            .rposition(|&v| v <= EROSION_POTENTIAL_TOLERANCE)
            .unwrap_or(0);
        samples.truncate(last_negative + 2);
        if let Some(last) = samples.last_mut() {
            *last = 0.0;
        }

        Self {
            depth_over_db_max: (samples.len() - 1) as f64 * DODB_INCREMENT,
            samples,
        }
    }

    /// Linear interpolation within the precomputed dense table; zero beyond
    /// `depth_over_db_max`.
    pub fn lookup(&self, depth_over_db: f64) -> f64 {
        if depth_over_db >= self.depth_over_db_max || self.samples.len() < 2 {
            return 0.0;
        }
        let idx = (depth_over_db / DODB_INCREMENT).floor();
        let frac = depth_over_db / DODB_INCREMENT - idx;
        let i = idx as usize;
        let a = self.samples[i];
        let b = self.samples[(i + 1).min(self.samples.len() - 1)];
        a + frac * (b - a)
    }

    pub fn depth_over_db_max(&self) -> f64 {
        self.depth_over_db_max
    }
}

/// Cubic Hermite interpolation through `(x[i], y[i])` with derivative
/// `dydx[i]`, evaluated at `x`. Clamps to the first/last segment outside the
/// control range.
fn hermite_eval(x: &[f64], y: &[f64], dydx: &[f64], at: f64) -> f64 {
    let n = x.len();
    if n < 2 {
        return y.first().copied().unwrap_or(0.0);
    }
    let seg = match x.iter().position(|&xi| xi >= at) {
        Some(0) => 0,
        Some(i) => i - 1,
        None => n - 2,
    };
    let (x0, x1) = (x[seg], x[seg + 1]);
    let (y0, y1) = (y[seg], y[seg + 1]);
    let (m0, m1) = (dydx[seg], dydx[seg + 1]);
    let h = x1 - x0;
    let t = if h.abs() > 1e-12 { (at - x0) / h } else { 0.0 };
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    h00 * y0 + h10 * h * m0 + h01 * y1 + h11 * h * m1
}

/// Inputs shared by every point along a rasterized profile when computing
/// shore-platform erosion, per Walkden & Hall (2005).
#[derive(Debug, Clone, Copy)]
pub struct ErosionInputs {
    pub still_water_level: f64,
    pub depth_of_breaking: f64,
    pub wave_energy: f64,
    pub beach_protection_factor: f64,
    /// `R`, the material-strength / hydrodynamic constant `[m^(9/4) s^(2/3)]`.
    pub material_strength: f64,
    /// Upper clamp on depth-over-breaking-depth, applied on top of the
    /// lookup table's own range.
    pub max_depth_over_db: f64,
}

/// Computes potential erosion (a non-negative elevation loss) at every cell
/// of a rasterized profile beyond the coast point (index 0), and stamps it
/// onto the grid's per-cell transients. Cells already carrying potential
/// erosion from an earlier profile this step are left untouched (profiles
/// can cross; the source notes this as a known rough edge and so do we).
pub fn apply_profile_potential_erosion(
    cells: &[Point2I],
    slopes: &[f64],
    table: &ErosionPotentialTable,
    grid: &mut RasterGrid,
    inputs: ErosionInputs,
) {
    for i in 1..cells.len() {
        let pos = cells[i];
        let top = grid.cell(pos).sediment_top_elev();
        let mut depth_over_db = (inputs.still_water_level - top) / inputs.depth_of_breaking;
        depth_over_db = depth_over_db.clamp(0.0, table.depth_over_db_max().min(inputs.max_depth_over_db));

        let mut potential = table.lookup(depth_over_db);
        if potential > EROSION_POTENTIAL_TOLERANCE {
            potential = 0.0;
        }

        let slope = slopes[i];
        let recession_xy = (inputs.wave_energy * inputs.beach_protection_factor * potential * slope
            / inputs.material_strength)
            .min(0.0);
        let delta_z = recession_xy * slope;

        if delta_z < 0.0 {
            let cell = grid.cell_mut(pos);
            if cell.transients.potential_erosion == 0.0 {
                cell.transients.potential_erosion = -delta_z;
                cell.transients.interpolation_weight = Some(1.0);
            }
        }
    }
}

/// Inverse-distance weight a virtual (inter-profile) cell's potential
/// erosion should receive from the two real profiles bracketing it, given
/// the fraction of the inter-profile gap it sits at (`0` at profile A's
/// side, `1` at profile B's side).
pub fn inter_profile_weight(fraction: f64) -> (f64, f64) {
    let fraction = fraction.clamp(0.0, 1.0);
    let wa = 1.0 - fraction;
    let wb = fraction;
    let total = wa + wb;
    if total <= 0.0 {
        (0.5, 0.5)
    } else {
        (wa / total, wb / total)
    }
}

/// Blends two profiles' already-computed potential erosion values for a
/// virtual cell lying between them, writing the result to `pos` only if
/// nothing has written there yet this step.
pub fn blend_inter_profile_potential_erosion(
    grid: &mut RasterGrid,
    pos: Point2I,
    erosion_a: f64,
    erosion_b: f64,
    fraction: f64,
) {
    let (wa, wb) = inter_profile_weight(fraction);
    let blended = wa * erosion_a + wb * erosion_b;
    let cell = grid.cell_mut(pos);
    if cell.transients.interpolation_weight.is_none() {
        cell.transients.potential_erosion = blended;
        cell.transients.interpolation_weight = Some(fraction);
    }
}

/// Converts potential erosion into actual erosion, drawn from the topmost
/// sediment layer only. `potential` is partitioned among fine/sand/coarse in
/// proportion to `(fraction present ? 1 : 0) * erodibility`; the fine share
/// is tallied separately (`transients.actual_erosion_fine`) since it routes
/// to suspended sediment rather than staying in the layer stack. Returns the
/// total depth actually removed.
pub fn apply_actual_erosion(
    grid: &mut RasterGrid,
    pos: Point2I,
    fine_erodibility: f64,
    sand_erodibility: f64,
    coarse_erodibility: f64,
) -> f64 {
    let cell = grid.cell_mut(pos);
    let potential = cell.transients.potential_erosion;
    if potential <= 0.0 || cell.num_layers() == 0 {
        return 0.0;
    }

    let top = cell.num_layers() - 1;
    let layer = cell.layer_mut(top).unconsolidated_mut();
    let weight_fine = if layer.fine() > 0.0 { fine_erodibility } else { 0.0 };
    let weight_sand = if layer.sand() > 0.0 { sand_erodibility } else { 0.0 };
    let weight_coarse = if layer.coarse() > 0.0 { coarse_erodibility } else { 0.0 };
    let total_weight = weight_fine + weight_sand + weight_coarse;

    let (mut fine, mut sand, mut coarse) = (0.0, 0.0, 0.0);
    if total_weight > 0.0 {
        fine = (potential * weight_fine / total_weight).min(layer.fine());
        sand = (potential * weight_sand / total_weight).min(layer.sand());
        coarse = (potential * weight_coarse / total_weight).min(layer.coarse());
        layer.set_fine(layer.fine() - fine);
        layer.set_sand(layer.sand() - sand);
        layer.set_coarse(layer.coarse() - coarse);
    }

    let removed = fine + sand + coarse;
    cell.recalc_layer_elevations();
    cell.transients.actual_erosion = removed;
    cell.transients.actual_erosion_fine = fine;
    cell.totals.tot_actual_erosion += removed;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_table() -> ErosionPotentialTable {
        // y goes from -1 at x=0 to 0 at x=1, with derivative 0 at both ends
        // (a smooth S-curve, not a straight line, but monotone non-decreasing).
        ErosionPotentialTable::build(&[0.0, 1.0], &[-1.0, 0.0], &[0.0, 0.0])
    }

    #[test]
    fn lookup_is_zero_beyond_max_depth_over_db() {
        let table = linear_table();
        assert_eq!(table.lookup(table.depth_over_db_max() + 1.0), 0.0);
    }

    #[test]
    fn lookup_is_negative_within_range() {
        let table = linear_table();
        assert!(table.lookup(0.1) < 0.0);
    }

    #[test]
    fn inter_profile_weight_sums_to_one() {
        let (wa, wb) = inter_profile_weight(0.3);
        assert!((wa + wb - 1.0).abs() < 1e-12);
        assert!(wa > wb);
    }

    #[test]
    fn actual_erosion_never_exceeds_potential() {
        let mut grid = RasterGrid::new(2, 2, 1.0, 0.0, 0.0, 1);
        let pos = Point2I::new(0, 0);
        grid.cell_mut(pos).layer_mut(0).unconsolidated_mut().set_sand(0.5);
        grid.cell_mut(pos).recalc_layer_elevations();
        grid.cell_mut(pos).transients.potential_erosion = 10.0;
        let removed = apply_actual_erosion(&mut grid, pos, 0.3, 0.4, 0.3);
        assert!(removed <= 10.0);
        assert!(removed <= 0.5 + 1e-9);
    }
}
