//! Deep-water Airy wave parameters, per-profile shoaling and refraction,
//! breaking detection, and the two interpolation passes that spread
//! breaking-wave properties from profiles to the rest of the coastline and
//! grid.

use crate::coast::Coast;
use crate::geometry::Point2I;
use crate::grid::RasterGrid;
use crate::profile::Profile;

pub const GRAVITY: f64 = 9.81;
pub const BREAKING_RATIO: f64 = 0.78;
const PI: f64 = std::f64::consts::PI;

/// Deep-water inputs for one step, following Airy wave theory.
#[derive(Debug, Clone, Copy)]
pub struct WaveInputs {
    pub offshore_height: f64,
    pub period: f64,
    /// Azimuth degrees, direction the waves move toward.
    pub orientation_deg: f64,
    pub still_water_level: f64,
}

/// Deep-water celerity and wavelength derived once per step from the wave
/// period.
#[derive(Debug, Clone, Copy)]
pub struct AiryConstants {
    pub c0: f64,
    pub l0: f64,
}

impl AiryConstants {
    pub fn from_period(period: f64) -> Self {
        let c0 = GRAVITY * period / (2.0 * PI);
        let l0 = c0 * period;
        Self { c0, l0 }
    }
}

/// Per-cell wave state written along a profile, and the frozen breaking
/// properties once the waves start breaking.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreakingWave {
    pub height: f64,
    pub angle_deg: f64,
    pub depth: f64,
    /// Landward-index distance (in cells) from the profile's seaward end to
    /// the breaking point.
    pub breaking_distance_cells: usize,
}

/// Solves the implicit dispersion relation `L = L0 tanh(2*pi*d/L0)` by fixed
/// -point iteration, starting from the deep-water wavelength.
fn solve_wavelength(l0: f64, depth: f64) -> f64 {
    if depth <= 0.0 {
        return l0;
    }
    let mut l = l0;
    for _ in 0..40 {
        let next = l0 * (2.0 * PI * depth / l).tanh();
        if (next - l).abs() < 1e-9 {
            l = next;
            break;
        }
        l = next;
    }
    l.max(1e-9)
}

/// Propagates waves landward along one profile's rasterized cells (index 0
/// = coast cell, increasing seawards), stamping wave height/orientation and
/// `in_active_zone` onto each cell, and returns the frozen breaking-wave
/// properties (default/zero if the waves never break on this profile).
///
/// `coast_tangent_deg` is the flux orientation at the profile's coast
/// point: with shore-parallel contours assumed, the relative wave angle
/// `alpha_0` does not change moving seaward along the profile.
pub fn propagate_profile(
    cells: &[Point2I],
    grid: &mut RasterGrid,
    wave: &WaveInputs,
    airy: &AiryConstants,
    coast_tangent_deg: f64,
) -> BreakingWave {
    let alpha0_deg = relative_wave_angle(coast_tangent_deg, wave.orientation_deg).clamp(-90.0, 90.0);

    let mut breaking = BreakingWave::default();
    let mut is_breaking = false;

    // Walk landward (from the seaward end, index len-1, down to index 1;
    // index 0 is the coast point itself and is not touched here).
    for (landward_idx, &pos) in cells.iter().enumerate().skip(1).rev() {
        if !grid.is_within_grid(pos) {
            continue;
        }
        let depth = grid.cell(pos).water_depth(wave.still_water_level);

        let mut height = wave.offshore_height;
        let mut orientation = wave.orientation_deg;

        if !is_breaking && depth > 0.0 {
            let l = solve_wavelength(airy.l0, depth);
            let c = airy.c0 * (2.0 * PI * depth / l).tanh();
            let k = 2.0 * PI / l;
            let n = 0.5 * (1.0 + (2.0 * k * depth) / (2.0 * k * depth).sinh());
            let ks = (airy.c0 / (2.0 * n * c)).sqrt();

            let alpha0_rad = alpha0_deg.to_radians();
            let sin_alpha = ((c / airy.c0) * alpha0_rad.sin()).clamp(-1.0, 1.0);
            let alpha_rad = sin_alpha.asin();
            let kr = (alpha0_rad.cos() / alpha_rad.cos()).sqrt();

            height = wave.offshore_height * ks * kr;

            if height >= BREAKING_RATIO * depth {
                is_breaking = true;
                breaking.height = height;
                breaking.angle_deg = coast_tangent_deg + alpha_rad.to_degrees();
                breaking.depth = depth;
                breaking.breaking_distance_cells = landward_idx;
            } else {
                orientation = coast_tangent_deg + alpha_rad.to_degrees();
            }
        }

        let cell = grid.cell_mut(pos);
        if is_breaking {
            cell.transients.wave_height = breaking.height;
            cell.transients.wave_orientation = breaking.angle_deg;
            cell.transients.in_active_zone = true;
        } else {
            cell.transients.wave_height = height;
            cell.transients.wave_orientation = orientation;
            cell.transients.in_active_zone = false;
        }
    }

    breaking
}

/// Angle (degrees) between the offshore wave orientation and the shore
/// normal at a point whose coast tangent (flux orientation) is
/// `coast_tangent_deg`. Returns 0 when the wave direction is offshore of
/// the coast (no onshore component).
fn relative_wave_angle(coast_tangent_deg: f64, offshore_orientation_deg: f64) -> f64 {
    let mut alpha0 = if offshore_orientation_deg <= coast_tangent_deg + 90.0 {
        coast_tangent_deg - offshore_orientation_deg - 90.0
    } else if offshore_orientation_deg > coast_tangent_deg + 270.0 {
        coast_tangent_deg + 270.0 - offshore_orientation_deg
    } else {
        270.0 - (offshore_orientation_deg - coast_tangent_deg)
    };

    if !(-90.0..=90.0).contains(&alpha0) {
        alpha0 = 0.0;
    }
    alpha0
}

/// Linearly interpolates breaking-wave attributes for every coast point
/// that lies strictly between two profile-bearing coast points, weighted
/// by along-coast index distance. Coast points before the first profile
/// (or after the last) inherit that profile's values unchanged — the
/// caller handles those ranges by passing the same profile index for both
/// bounds.
pub fn interpolate_breaking_to_coastline(coast: &mut Coast, profiles: &[Profile]) {
    if profiles.is_empty() {
        return;
    }
    let n = coast.len();

    let first = profiles[0].coast_point_index();
    for i in 0..first {
        copy_breaking(coast, first, i);
    }
    let last_profile = profiles[profiles.len() - 1].coast_point_index();
    for i in last_profile..n {
        copy_breaking(coast, last_profile, i);
    }

    for pair in profiles.windows(2) {
        let a = pair[0].coast_point_index();
        let b = pair[1].coast_point_index();
        if b <= a + 1 {
            continue;
        }
        let span = (b - a) as f64;
        for i in (a + 1)..b {
            let w_b = (i - a) as f64 / span;
            let w_a = 1.0 - w_b;
            let h = coast.breaking_wave_height(a) * w_a + coast.breaking_wave_height(b) * w_b;
            let ang = coast.breaking_wave_angle(a) * w_a + coast.breaking_wave_angle(b) * w_b;
            let depth = coast.depth_of_breaking(a) * w_a + coast.depth_of_breaking(b) * w_b;
            let dist = coast.breaking_distance(a) as f64 * w_a + coast.breaking_distance(b) as f64 * w_b;
            coast.set_breaking_wave_height(i, h);
            coast.set_breaking_wave_angle(i, ang);
            coast.set_depth_of_breaking(i, depth);
            coast.set_breaking_distance(i, dist.round() as usize);
        }
    }
}

fn copy_breaking(coast: &mut Coast, from: usize, to: usize) {
    let h = coast.breaking_wave_height(from);
    let a = coast.breaking_wave_angle(from);
    let d = coast.depth_of_breaking(from);
    let dist = coast.breaking_distance(from);
    coast.set_breaking_wave_height(to, h);
    coast.set_breaking_wave_angle(to, a);
    coast.set_depth_of_breaking(to, d);
    coast.set_breaking_distance(to, dist);
}

/// Walkden & Hall (2005) Eq. 4: energy delivered to a coast point this step
/// from its breaking wave height and the step's wave period.
pub fn wave_energy(breaking_height: f64, period: f64, timestep_seconds: f64) -> f64 {
    breaking_height.max(0.0).powf(3.25) * period.powf(0.75) * timestep_seconds
}

/// Translates a profile's cell list so that its coast cell lands on
/// `new_coast_cell`, walking landward and discarding any translated cell
/// that falls off-grid or is dry. Used to build a "virtual" profile through
/// an inter-profile coast point.
pub fn build_virtual_profile(
    profile_cells: &[Point2I],
    new_coast_cell: Point2I,
    grid: &RasterGrid,
    still_water_level: f64,
) -> Vec<Point2I> {
    if profile_cells.is_empty() {
        return Vec::new();
    }
    let origin = profile_cells[0];
    let dcol = new_coast_cell.col - origin.col;
    let drow = new_coast_cell.row - origin.row;

    let mut out = Vec::with_capacity(profile_cells.len());
    for &p in profile_cells {
        let translated = Point2I::new(p.col + dcol, p.row + drow);
        if !grid.is_within_grid(translated) {
            break;
        }
        if grid.cell(translated).water_depth(still_water_level) <= 0.0 && !out.is_empty() {
            break;
        }
        out.push(translated);
    }
    out
}

/// Blends wave height/orientation from two bracketing profiles onto the
/// virtual profile built through an in-between coast point, weighted by
/// along-coast proximity. Idempotent under repeated forward/backward
/// sweeps: a cell that already carries a value this step has its old and
/// new values simple-averaged (spec's two-pass blending requirement).
pub fn interpolate_inter_profile_cells(
    grid: &mut RasterGrid,
    virtual_cells: &[Point2I],
    profile_a_cells: &[Point2I],
    profile_b_cells: &[Point2I],
    weight_b: f64,
) {
    let weight_a = 1.0 - weight_b;
    let n = virtual_cells
        .len()
        .min(profile_a_cells.len())
        .min(profile_b_cells.len());

    for idx in 0..n {
        let pos = virtual_cells[idx];
        if !grid.is_within_grid(pos) {
            continue;
        }
        let (ha, oa) = {
            let c = grid.cell(profile_a_cells[idx]);
            (c.transients.wave_height, c.transients.wave_orientation)
        };
        let (hb, ob) = {
            let c = grid.cell(profile_b_cells[idx]);
            (c.transients.wave_height, c.transients.wave_orientation)
        };
        let new_h = ha * weight_a + hb * weight_b;
        let new_o = oa * weight_a + ob * weight_b;

        let cell = grid.cell_mut(pos);
        match cell.transients.interpolation_weight {
            None => {
                cell.transients.wave_height = new_h;
                cell.transients.wave_orientation = new_o;
                cell.transients.interpolation_weight = Some(1.0);
            }
            Some(_) => {
                cell.transients.wave_height = (cell.transients.wave_height + new_h) / 2.0;
                cell.transients.wave_orientation = (cell.transients.wave_orientation + new_o) / 2.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airy_constants_match_deep_water_formula() {
        let a = AiryConstants::from_period(8.0);
        assert!((a.c0 - (GRAVITY * 8.0 / (2.0 * PI))).abs() < 1e-9);
        assert!((a.l0 - a.c0 * 8.0).abs() < 1e-9);
    }

    #[test]
    fn wavelength_solver_converges_and_is_shorter_than_deep_water() {
        let l0 = 100.0;
        let l = solve_wavelength(l0, 5.0);
        assert!(l > 0.0 && l < l0);
    }

    #[test]
    fn wavelength_solver_handles_zero_depth() {
        assert_eq!(solve_wavelength(100.0, 0.0), 100.0);
    }

    #[test]
    fn relative_wave_angle_is_zero_for_offshore_waves() {
        // Waves travelling directly offshore (opposite the coast normal)
        // should be clipped to zero (no onshore component).
        let a = relative_wave_angle(0.0, 180.0);
        assert_eq!(a, 0.0);
    }

    #[test]
    fn wave_energy_matches_walkden_hall_formula() {
        let e = wave_energy(2.0, 8.0, 3600.0);
        let expected = 2.0_f64.powf(3.25) * 8.0_f64.powf(0.75) * 3600.0;
        assert!((e - expected).abs() < 1e-6);
    }

    #[test]
    fn inter_profile_blend_is_idempotent_on_repeat() {
        let mut grid = RasterGrid::new(5, 5, 1.0, 0.0, 0.0, 1);
        let a = Point2I::new(0, 0);
        let b = Point2I::new(1, 0);
        let v = Point2I::new(2, 0);
        grid.cell_mut(a).transients.wave_height = 1.0;
        grid.cell_mut(b).transients.wave_height = 3.0;

        interpolate_inter_profile_cells(&mut grid, &[v], &[a], &[b], 0.5);
        let first_pass = grid.cell(v).transients.wave_height;
        assert!((first_pass - 2.0).abs() < 1e-9);

        // A second (and third) blend against the same unchanged inputs
        // should leave the virtual cell's value unchanged.
        interpolate_inter_profile_cells(&mut grid, &[v], &[a], &[b], 0.5);
        interpolate_inter_profile_cells(&mut grid, &[v], &[a], &[b], 0.5);
        assert!((grid.cell(v).transients.wave_height - 2.0).abs() < 1e-9);
    }
}
