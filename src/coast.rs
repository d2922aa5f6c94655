//! Coastline tracing and the `Coast` aggregate: an edge-seeded wall-follower
//! maze trace over the raster grid, its per-point attribute arrays, and the
//! curvature / flux-orientation calculations derived from it.

use crate::config::CoastSmoothMethod;
use crate::error::{CmeError, CmeResult};
use crate::geometry::{azimuth_degrees, Handedness, Point2D, Point2I, Polyline};
use crate::grid::RasterGrid;
use crate::landform::Landform;
use crate::profile::Profile;

const ROUND_LOOP_MAX: u32 = 50_000;
const COAST_MAX_FACTOR: usize = 1000;
/// Shortest trace kept as a coastline; anything shorter is a spurious loop
/// seeded by a single isolated wet or dry cell.
const COAST_MIN: usize = 9;
/// Matching tolerance, in cells, between a trace's landing point and one of
/// the previously-found edge points.
const EDGE_MATCH_TOLERANCE: i32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    fn delta(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, -1),
            Orientation::East => (1, 0),
            Orientation::South => (0, 1),
            Orientation::West => (-1, 0),
        }
    }

    fn cw(self) -> Orientation {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    fn ccw(self) -> Orientation {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    fn reverse(self) -> Orientation {
        self.cw().cw()
    }

    fn step(self, pos: Point2I) -> Point2I {
        let (dx, dy) = self.delta();
        Point2I::new(pos.col + dx, pos.row + dy)
    }

    fn all_edges() -> [Orientation; 4] {
        [
            Orientation::North,
            Orientation::East,
            Orientation::South,
            Orientation::West,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgePoint {
    pos: Point2I,
    handedness: Handedness,
    search_direction: Orientation,
    matched: bool,
}

/// A traced coastline: the raw (grid-CRS) trace, its external-CRS polyline,
/// and parallel per-point attribute arrays.
#[derive(Debug, Clone)]
pub struct Coast {
    handedness: Handedness,
    /// Grid-CRS cells, in trace order; index 0 is the start edge point.
    raw_trace: Vec<Point2I>,
    polyline: Polyline,
    curvature: Vec<f64>,
    flux_orientation: Vec<f64>,
    wave_energy: Vec<f64>,
    breaking_wave_height: Vec<f64>,
    breaking_wave_angle: Vec<f64>,
    depth_of_breaking: Vec<f64>,
    breaking_distance: Vec<usize>,
    /// The landform attached to each coast point. Unlike the source, which
    /// appends a `CCoastLandform` per profile, every coast point here can
    /// independently become (or cease to be) a cliff, so the array is
    /// indexed by coast point, not by profile.
    landform_ref: Vec<Landform>,
    profiles: Vec<Profile>,
}

impl Coast {
    pub(crate) fn new(handedness: Handedness, raw_trace: Vec<Point2I>, grid: &RasterGrid) -> Self {
        let n = raw_trace.len();
        let polyline = Polyline::from_points(raw_trace.iter().map(|&p| grid.grid_to_external(p)).collect());
        Self {
            handedness,
            raw_trace,
            polyline,
            curvature: vec![0.0; n],
            flux_orientation: vec![0.0; n],
            wave_energy: vec![0.0; n],
            breaking_wave_height: vec![0.0; n],
            breaking_wave_angle: vec![0.0; n],
            depth_of_breaking: vec![0.0; n],
            breaking_distance: vec![0; n],
            landform_ref: vec![Landform::default(); n],
            profiles: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw_trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_trace.is_empty()
    }

    pub fn handedness(&self) -> Handedness {
        self.handedness
    }

    pub fn cell_at(&self, i: usize) -> Point2I {
        self.raw_trace[i]
    }

    pub fn point_at(&self, i: usize) -> Point2D {
        *self.polyline.get(i).expect("index within coast length")
    }

    pub fn polyline(&self) -> &Polyline {
        &self.polyline
    }

    pub fn smooth(&mut self, method: CoastSmoothMethod, window: usize, savgol_poly: usize) {
        self.polyline = match method {
            CoastSmoothMethod::None => self.polyline.clone(),
            CoastSmoothMethod::RunningMean => self.polyline.smooth_running_mean(window),
            CoastSmoothMethod::SavitzkyGolay => self.polyline.smooth_savitzky_golay(window, savgol_poly),
        };
    }

    pub fn curvature(&self, i: usize) -> f64 {
        self.curvature[i]
    }

    pub fn flux_orientation(&self, i: usize) -> f64 {
        self.flux_orientation[i]
    }

    pub fn landform(&self, i: usize) -> &Landform {
        &self.landform_ref[i]
    }

    pub fn set_landform(&mut self, i: usize, lf: Landform) {
        self.landform_ref[i] = lf;
    }

    pub fn wave_energy(&self, i: usize) -> f64 {
        self.wave_energy[i]
    }

    pub fn add_wave_energy(&mut self, i: usize, delta: f64) {
        self.wave_energy[i] += delta;
    }

    pub fn breaking_wave_height(&self, i: usize) -> f64 {
        self.breaking_wave_height[i]
    }

    pub fn set_breaking_wave_height(&mut self, i: usize, v: f64) {
        self.breaking_wave_height[i] = v;
    }

    pub fn breaking_wave_angle(&self, i: usize) -> f64 {
        self.breaking_wave_angle[i]
    }

    pub fn set_breaking_wave_angle(&mut self, i: usize, v: f64) {
        self.breaking_wave_angle[i] = v;
    }

    pub fn depth_of_breaking(&self, i: usize) -> f64 {
        self.depth_of_breaking[i]
    }

    pub fn set_depth_of_breaking(&mut self, i: usize, v: f64) {
        self.depth_of_breaking[i] = v;
    }

    pub fn breaking_distance(&self, i: usize) -> usize {
        self.breaking_distance[i]
    }

    pub fn set_breaking_distance(&mut self, i: usize, v: usize) {
        self.breaking_distance[i] = v;
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profiles_mut(&mut self) -> &mut Vec<Profile> {
        &mut self.profiles
    }

    /// Hermann & Klette (2003) discrete curvature at point `i`, using the
    /// chord-angle turn over a `+-k` neighbourhood.
    pub fn calc_curvature(&mut self, k: usize) {
        let n = self.polyline.len();
        for i in 0..n {
            if i < k || i + k >= n {
                self.curvature[i] = 0.0;
                continue;
            }
            let p0 = self.polyline.get(i - k).unwrap();
            let p1 = self.polyline.get(i).unwrap();
            let p2 = self.polyline.get(i + k).unwrap();

            let a1 = azimuth_degrees(p1.x() - p0.x(), p1.y() - p0.y());
            let a2 = azimuth_degrees(p2.x() - p1.x(), p2.y() - p1.y());
            let mut turn = a2 - a1;
            while turn > 180.0 {
                turn -= 360.0;
            }
            while turn < -180.0 {
                turn += 360.0;
            }
            let chord = p0.distance_to(p2);
            self.curvature[i] = if chord > 1e-9 { turn.to_radians() / chord } else { 0.0 };
        }
    }

    /// Flux (tangent) orientation at every point: the azimuth of the chord
    /// spanning the point's two neighbours, or of the single available
    /// neighbour at either end.
    pub fn calc_flux_orientation(&mut self) {
        let n = self.polyline.len();
        for i in 0..n {
            let (p0, p1) = match (i.checked_sub(1), i + 1 < n) {
                (Some(prev), true) => (*self.polyline.get(prev).unwrap(), *self.polyline.get(i + 1).unwrap()),
                (Some(prev), false) => (*self.polyline.get(prev).unwrap(), *self.polyline.get(i).unwrap()),
                (None, true) => (*self.polyline.get(i).unwrap(), *self.polyline.get(i + 1).unwrap()),
                (None, false) => (*self.polyline.get(i).unwrap(), *self.polyline.get(i).unwrap()),
            };
            self.flux_orientation[i] = azimuth_degrees(p1.x() - p0.x(), p1.y() - p0.y());
        }
    }
}

/// Finds all land/sea crossings along the four grid edges. Each crossing
/// records the handedness a trace started there must use to keep the sea on
/// its correct side, and the initial search direction.
fn find_edge_points(grid: &RasterGrid, still_water_level: f64) -> Vec<EdgePoint> {
    let mut out = Vec::new();
    for edge in Orientation::all_edges() {
        let (range, fixed_is_col) = match edge {
            Orientation::North => (1..grid.width() as i32 - 1, false),
            Orientation::South => (1..grid.width() as i32 - 1, false),
            Orientation::West => (0..grid.height() as i32, true),
            Orientation::East => (0..grid.height() as i32, true),
        };
        let fixed = match edge {
            Orientation::North => 0,
            Orientation::South => grid.height() as i32 - 1,
            Orientation::West => 0,
            Orientation::East => grid.width() as i32 - 1,
        };
        let (search_direction, downhill_hand, uphill_hand) = match edge {
            Orientation::North => (Orientation::South, Handedness::Right, Handedness::Left),
            Orientation::South => (Orientation::North, Handedness::Left, Handedness::Right),
            Orientation::West => (Orientation::East, Handedness::Left, Handedness::Right),
            Orientation::East => (Orientation::West, Handedness::Right, Handedness::Left),
        };

        let mut last: Option<(Point2I, f64)> = None;
        for n in range {
            let pos = if fixed_is_col {
                Point2I::new(fixed, n)
            } else {
                Point2I::new(n, fixed)
            };
            let elev = grid.cell(pos).sediment_top_elev();

            if let Some((last_pos, last_elev)) = last {
                if last_elev <= still_water_level && elev > still_water_level {
                    out.push(EdgePoint {
                        pos,
                        handedness: downhill_hand,
                        search_direction,
                        matched: false,
                    });
                } else if last_elev > still_water_level && elev <= still_water_level {
                    out.push(EdgePoint {
                        pos: last_pos,
                        handedness: uphill_hand,
                        search_direction,
                        matched: false,
                    });
                }
            }
            last = Some((pos, elev));
        }
    }
    out
}

/// Traces every coastline on the grid, marking the traced cells as coastline
/// as it goes, and returns one [`Coast`] per distinct trace. Short spurious
/// traces (fewer than [`COAST_MIN`] cells) are silently dropped, matching the
/// source's treatment of single-cell islands caught in the edge scan.
pub fn trace_coastlines(grid: &mut RasterGrid, still_water_level: f64) -> CmeResult<Vec<Coast>> {
    let mut edge_points = find_edge_points(grid, still_water_level);
    if edge_points.is_empty() {
        return Err(CmeError::FindCoast(
            "no coastline endpoints found, is the still water level too high?".to_string(),
        ));
    }

    let coast_max = COAST_MAX_FACTOR * grid.width().max(grid.height());
    let mut coasts = Vec::new();

    let mut idx = 0;
    while idx < edge_points.len() {
        if edge_points[idx].matched {
            idx += 1;
            continue;
        }

        let start = edge_points[idx];
        let handedness = start.handedness;
        let (trace, landed_at) = walk_wall_follower(
            grid,
            start.pos,
            start.search_direction,
            handedness,
            coast_max,
            still_water_level,
        )?;
        edge_points[idx].matched = true;

        if let Some(nearest) = nearest_unmatched(&edge_points, landed_at) {
            edge_points[nearest].matched = true;
        }

        if trace.len() >= COAST_MIN {
            coasts.push(Coast::new(handedness, trace, grid));
        } else {
            for pos in &trace {
                grid.cell_mut(*pos).transients.is_coastline = false;
            }
        }

        idx += 1;
    }

    Ok(coasts)
}

fn nearest_unmatched(points: &[EdgePoint], landed_at: Point2I) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.matched)
        .map(|(i, p)| {
            let d = (p.pos.col - landed_at.col).abs().max((p.pos.row - landed_at.row).abs());
            (i, d)
        })
        .filter(|(_, d)| *d <= EDGE_MATCH_TOLERANCE)
        .min_by_key(|(_, d)| *d)
        .map(|(i, _)| i)
}

/// Wall-follower maze trace: walks land cells clockwise (`Right`) or
/// counter-clockwise (`Left`) of the sea, marking each cell with sea on its
/// seaward side as coastline, until it returns to a grid edge having left the
/// starting one. Returns the ordered coastline cells and the cell the walker
/// was standing on when it stopped.
fn walk_wall_follower(
    grid: &mut RasterGrid,
    start: Point2I,
    mut search_direction: Orientation,
    handedness: Handedness,
    coast_max: usize,
    still_water_level: f64,
) -> CmeResult<(Vec<Point2I>, Point2I)> {
    let (primary, secondary) = match handedness {
        Handedness::Right => (Orientation::cw as fn(Orientation) -> Orientation, Orientation::ccw as fn(Orientation) -> Orientation),
        Handedness::Left => (Orientation::ccw as fn(Orientation) -> Orientation, Orientation::cw as fn(Orientation) -> Orientation),
    };

    let mut pos = start;
    let mut trace = Vec::new();
    let mut left_start_edge = false;
    let mut at_coast = false;

    for _ in 0..ROUND_LOOP_MAX {
        if !left_start_edge && has_left_edge(pos, start, grid) {
            left_start_edge = true;
        }
        if left_start_edge && at_coast && is_on_any_edge(pos, grid) {
            break;
        }
        if trace.len() > coast_max {
            return Err(CmeError::FindCoast(format!(
                "temporary coastline length {} exceeds maximum {}",
                trace.len(),
                coast_max
            )));
        }

        pos = grid.clamp_to_grid(pos);
        at_coast = false;

        let seaward_dir = primary(search_direction);
        let antiseaward_dir = secondary(search_direction);
        // Checked in priority order: seaward, straight on, anti-seaward.
        // Each is tried only while still within the grid; a sea neighbour
        // marks the current cell as coast without moving the walker.
        let ranked = [
            (seaward_dir.step(pos), seaward_dir),
            (search_direction.step(pos), search_direction),
            (antiseaward_dir.step(pos), antiseaward_dir),
        ];

        let mut moved = false;
        for &(candidate, new_dir) in ranked.iter() {
            if !grid.is_within_grid(candidate) {
                continue;
            }
            if is_sea(grid, candidate, still_water_level) {
                at_coast = true;
                if !grid.cell(pos).transients.is_coastline {
                    grid.cell_mut(pos).transients.is_coastline = true;
                    trace.push(pos);
                }
                continue;
            }
            pos = candidate;
            search_direction = new_dir;
            moved = true;
            break;
        }

        if !moved {
            // Dead end: every reachable neighbour was sea, or the grid edge
            // blocked every forward option. Turn around unconditionally,
            // then let the next iteration's clamp keep it on the grid.
            let goback_dir = search_direction.reverse();
            pos = goback_dir.step(pos);
            search_direction = goback_dir;
        }
    }

    if let Some(&last) = trace.last() {
        if last != pos {
            trace.push(pos);
        }
    } else {
        trace.push(pos);
    }

    Ok((trace, pos))
}

fn is_sea(grid: &RasterGrid, pos: Point2I, still_water_level: f64) -> bool {
    grid.cell(pos).water_depth(still_water_level) > 0.0
}

fn has_left_edge(pos: Point2I, start: Point2I, grid: &RasterGrid) -> bool {
    let (w, h) = (grid.width() as i32 - 1, grid.height() as i32 - 1);
    (start.col == 0 && pos.col > 0)
        || (start.col == w && pos.col < w)
        || (start.row == 0 && pos.row > 0)
        || (start.row == h && pos.row < h)
}

fn is_on_any_edge(pos: Point2I, grid: &RasterGrid) -> bool {
    pos.col <= 0 || pos.col >= grid.width() as i32 - 1 || pos.row <= 0 || pos.row >= grid.height() as i32 - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Land fills the west half of the grid, sea the east half, so the
    /// coastline is a straight vertical line crossing the north and south
    /// edges — the shape the edge-scan / wall-follower pair is built for.
    fn half_land_half_sea_grid(w: usize, h: usize, swl: f64) -> RasterGrid {
        let mut g = RasterGrid::new(w, h, 1.0, 0.0, 0.0, 1);
        for row in 0..h as i32 {
            for col in 0..w as i32 {
                let is_land = col < w as i32 / 2;
                let elev = if is_land { swl + 5.0 } else { swl - 5.0 };
                g.cell_mut(Point2I::new(col, row)).layer_mut(0).unconsolidated_mut().set_sand(elev);
                g.cell_mut(Point2I::new(col, row)).recalc_layer_elevations();
                g.cell_mut(Point2I::new(col, row)).set_landform(if is_land {
                    Landform::Hinterland
                } else {
                    Landform::Sea
                });
            }
        }
        g
    }

    #[test]
    fn traces_a_straight_coastline_crossing_the_grid() {
        let mut g = half_land_half_sea_grid(12, 12, 0.0);
        let coasts = trace_coastlines(&mut g, 0.0).expect("tracing should succeed");
        assert!(!coasts.is_empty());
        assert!(coasts[0].len() >= COAST_MIN);
    }

    #[test]
    fn no_sea_cells_at_all_is_not_confused_with_no_edge_points() {
        // An all-dry grid produces no land/sea crossing on any edge.
        let mut g = RasterGrid::new(6, 6, 1.0, 0.0, 0.0, 1);
        for row in 0..6 {
            for col in 0..6 {
                g.cell_mut(Point2I::new(col, row))
                    .layer_mut(0)
                    .unconsolidated_mut()
                    .set_sand(10.0);
                g.cell_mut(Point2I::new(col, row)).recalc_layer_elevations();
            }
        }
        let err = trace_coastlines(&mut g, 0.0).unwrap_err();
        assert!(matches!(err, CmeError::FindCoast(_)));
    }

    #[test]
    fn flux_orientation_matches_azimuth_of_chord() {
        let mut g = RasterGrid::new(5, 5, 1.0, 0.0, 0.0, 1);
        let trace = vec![Point2I::new(0, 0), Point2I::new(1, 0), Point2I::new(2, 0)];
        let mut coast = Coast::new(Handedness::Right, trace, &g);
        coast.calc_flux_orientation();
        // Straight west-to-east trace: tangent points due east (azimuth 90).
        assert!((coast.flux_orientation(1) - 90.0).abs() < 1e-6);
        let _ = &mut g;
    }
}
