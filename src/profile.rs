//! Coast-normal profile generation: placement along the coast, endpoint
//! selection by handedness, DDA rasterization, and intersection checks.

use crate::error::{CmeError, CmeResult};
use crate::geometry::{Handedness, Point2D, Point2I, Polyline};
use crate::grid::RasterGrid;
use crate::landform::Landform;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// A coast-normal line: the coast point it starts from, its two-point
/// external-CRS segment, and (once rasterized) the ordered grid cells it
/// crosses.
#[derive(Debug, Clone)]
pub struct Profile {
    coast_point_index: usize,
    start: Point2D,
    end: Point2D,
    /// Index 0 = coast cell, increasing seawards.
    cells: Vec<Point2I>,
}

impl Profile {
    pub fn coast_point_index(&self) -> usize {
        self.coast_point_index
    }

    pub fn start(&self) -> Point2D {
        self.start
    }

    pub fn end(&self) -> Point2D {
        self.end
    }

    pub fn cells(&self) -> &[Point2I] {
        &self.cells
    }

    pub fn coast_cell(&self) -> Point2I {
        self.cells[0]
    }
}

/// Emits a new profile from `coast_point_index`, whose raw-trace cell is
/// `coast_cell` (its centroid is the profile start, per spec — not the
/// smoothed polyline point) and whose coast tangent at that point is given
/// by `tangent_azimuth_deg`. `length` is the coast-normal length `ell`;
/// `handedness` picks which of the two perpendicular candidates lies
/// seaward.
pub fn emit_profile(
    coast_point_index: usize,
    coast_cell: Point2I,
    grid: &RasterGrid,
    tangent_point_before: Point2D,
    tangent_point_after: Point2D,
    length: f64,
    handedness: Handedness,
) -> CmeResult<Profile> {
    let start = grid.grid_to_external(coast_cell);

    // The seaward candidate is the one on the side the coast's handedness
    // says the sea lies on.
    let end = Polyline::perpendicular_endpoint(
        &tangent_point_before,
        &tangent_point_after,
        length,
        seaward_side(handedness),
    );
    // Re-centre the perpendicular on the profile's actual start point
    // (perpendicular_endpoint assumes the vector originates at
    // tangent_point_before; translate the resulting offset onto `start`).
    let dx = end.x() - tangent_point_before.x();
    let dy = end.y() - tangent_point_before.y();
    let end = Point2D::new(start.x() + dx, start.y() + dy);

    let end_cell = grid.external_to_grid(end);
    if !grid.is_within_grid(end_cell) {
        return Err(CmeError::OffGridEndpoint);
    }

    Ok(Profile {
        coast_point_index,
        start,
        end,
        cells: Vec::new(),
    })
}

fn seaward_side(handedness: Handedness) -> Handedness {
    // The sea lies on the coast's handed side by construction (see
    // `Coast::handedness`); the seaward perpendicular candidate is simply
    // that same side.
    handedness
}

/// Rasterizes a profile's two-point segment with a DDA walk from coast cell
/// to offshore end, clamping to the grid. Rejects (`LineToGrid`) if any
/// cell beyond index 0 is dry land or already marked coastline, or if fewer
/// than three cells result.
pub fn rasterize_profile(profile: &mut Profile, grid: &RasterGrid, still_water_level: f64) -> CmeResult<()> {
    let start_cell = grid.external_to_grid(profile.start);
    let end_cell = grid.external_to_grid(profile.end);

    let mut cells = dda_line(start_cell, end_cell, grid);

    for (i, &pos) in cells.iter().enumerate() {
        if i == 0 {
            continue;
        }
        let cell = grid.cell(pos);
        let is_dry = cell.water_depth(still_water_level) <= 0.0 && !matches!(cell.landform(), Landform::Sea);
        if is_dry {
            return Err(CmeError::LineToGrid(format!(
                "profile from coast point {} crosses dry land at cell ({}, {})",
                profile.coast_point_index, pos.col, pos.row
            )));
        }
        if cell.transients.is_coastline {
            return Err(CmeError::LineToGrid(format!(
                "profile from coast point {} re-crosses the coastline at cell ({}, {})",
                profile.coast_point_index, pos.col, pos.row
            )));
        }
    }

    if cells.len() < 3 {
        return Err(CmeError::LineToGrid(format!(
            "profile from coast point {} rasterized to only {} cell(s)",
            profile.coast_point_index,
            cells.len()
        )));
    }

    cells.shrink_to_fit();
    profile.cells = cells;
    Ok(())
}

/// Bresenham/DDA walk between two grid-CRS points, clamped to the grid.
fn dda_line(start: Point2I, end: Point2I, grid: &RasterGrid) -> Vec<Point2I> {
    let start = grid.clamp_to_grid(start);
    let end = grid.clamp_to_grid(end);

    let dx = (end.col - start.col).abs();
    let dy = -(end.row - start.row).abs();
    let sx = if start.col < end.col { 1 } else { -1 };
    let sy = if start.row < end.row { 1 } else { -1 };
    let mut err = dx + dy;

    let mut out = Vec::new();
    let (mut x, mut y) = (start.col, start.row);
    loop {
        out.push(Point2I::new(x, y));
        if x == end.col && y == end.row {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    out
}

/// Decides the next profile-emission distance along the coast: `spacing`
/// perturbed by a zero-mean Gaussian scaled by `rand_space_fact`, floored at
/// one cell side.
pub fn next_spacing(spacing: f64, rand_space_fact: f64, cell_side: f64, rng: &mut impl Rng) -> f64 {
    if rand_space_fact <= 0.0 {
        return spacing.max(cell_side);
    }
    let normal = Normal::new(0.0, spacing * rand_space_fact).expect("valid normal params");
    (spacing + normal.sample(rng)).max(cell_side)
}

/// Checks whether two rasterized profiles' external-CRS segments intersect;
/// intersections are logged by the caller, never auto-pruned (per spec).
pub fn profiles_intersect(a: &Profile, b: &Profile) -> Option<Point2D> {
    Polyline::segment_intersection(&a.start, &a.end, &b.start, &b.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;

    #[test]
    fn dda_line_from_origin_to_diagonal_includes_endpoints() {
        let grid = RasterGrid::new(10, 10, 1.0, 0.0, 0.0, 1);
        let cells = dda_line(Point2I::new(0, 0), Point2I::new(3, 3), &grid);
        assert_eq!(cells[0], Point2I::new(0, 0));
        assert_eq!(*cells.last().unwrap(), Point2I::new(3, 3));
    }

    #[test]
    fn next_spacing_is_floored_at_cell_side() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
        let s = next_spacing(0.1, 5.0, 1.0, &mut rng);
        assert!(s >= 1.0);
    }

    #[test]
    fn zero_rand_factor_returns_spacing_unperturbed() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(42);
        let s = next_spacing(3.0, 0.0, 1.0, &mut rng);
        assert_eq!(s, 3.0);
    }
}
