//! Cliff notch deepening, collapse triggering and mass accounting, and talus
//! redistribution onto the foreshore under a Dean equilibrium profile.

use crate::coast::Coast;
use crate::error::{CmeError, CmeResult};
use crate::geometry::Point2I;
use crate::grid::RasterGrid;
use crate::landform::{CliffState, Landform};

/// Exponent in the Dean (1977) equilibrium beach profile `h(y) = A * y^p`.
const DEAN_POWER: f64 = 2.0 / 3.0;

/// One cliff collapse this step: where it happened, and how much sand- and
/// coarse-sized sediment it releases onto the foreshore as talus (fine
/// sediment is assumed to disperse offshore, matching the source, and is
/// folded straight into the grand total rather than redistributed).
#[derive(Debug, Clone, Copy)]
pub struct CollapseEvent {
    pub coast_index: usize,
    pub point_on_coast_index: usize,
    pub pos: Point2I,
    pub fine_lost: f64,
    pub sand_released: f64,
    pub coarse_released: f64,
}

/// Deepens every cliff coast point's notch by the wave energy delivered to
/// it this step (`energy_to_depth_rate` converts accumulated joules to
/// metres of notch incision), and returns the coast points now ready to
/// collapse.
pub fn deepen_notches(
    coast: &mut Coast,
    grid: &mut RasterGrid,
    cell_side: f64,
    energy_to_depth_rate: f64,
    collapse_threshold: f64,
) -> Vec<usize> {
    let mut ready = Vec::new();
    for i in 0..coast.len() {
        let pos = coast.cell_at(i);
        let cell = grid.cell_mut(pos);
        let cliff = match cell.landform().as_cliff() {
            Some(c) => *c,
            None => continue,
        };

        let energy = coast.wave_energy(i);
        let mut cliff = cliff;
        cliff.accum_wave_energy += energy;
        let deepen = energy * energy_to_depth_rate;
        cliff.erode_notch(deepen);
        debug_assert!(cliff.invariant_holds(cell_side));

        if cliff.ready_to_collapse(collapse_threshold) {
            ready.push(i);
        }
        cell.set_landform(Landform::Cliff(cliff));
    }
    ready
}

/// Collapses the cliff at coast point `i`. Losses accumulate into each
/// fraction's notch-lost counter rather than being physically subtracted:
/// layers strictly above the notch layer lose `notch_area_frac` of their
/// remaining (not-yet-notch-lost) present depth; the notch layer itself
/// loses that same fraction scaled by how far above the notch its top sits.
/// Physical removal happens later, in [`crate::cell::Cell::remove_cliff`],
/// once the lateral depth is fully consumed and the landform transitions to
/// `Sea`. Returns `Ok(None)` if the coast point is not currently a cliff, and
/// `Err(CmeError::CliffNotch)` if the notch sits above the sediment top.
pub fn collapse_cliff(
    coast: &mut Coast,
    coast_index: usize,
    grid: &mut RasterGrid,
    i: usize,
    notch_area_frac: f64,
) -> CmeResult<Option<CollapseEvent>> {
    let pos = coast.cell_at(i);
    let cell = grid.cell_mut(pos);
    let cliff = match cell.landform().as_cliff().copied() {
        Some(c) => c,
        None => return Ok(None),
    };

    let notch_area_frac = notch_area_frac.clamp(0.0, 1.0);
    let notch_elev = cliff.notch_base_elev;
    if notch_elev >= cell.sediment_top_elev() {
        return Err(CmeError::CliffNotch(format!(
            "notch at {notch_elev} is at or above sediment top {} on cell ({}, {})",
            cell.sediment_top_elev(),
            pos.col,
            pos.row
        )));
    }
    let notch_layer = (0..cell.num_layers())
        .find(|&li| notch_elev < cell.layer_top_elev(li))
        .expect("notch_elev < sediment_top_elev guarantees a containing layer");

    let mut fine_lost = 0.0;
    let mut sand_released = 0.0;
    let mut coarse_released = 0.0;

    for layer_idx in notch_layer..cell.num_layers() {
        let frac = if layer_idx == notch_layer {
            let layer_top = cell.layer_top_elev(layer_idx);
            let layer_bottom = if layer_idx == 0 { cell.basement() } else { cell.layer_top_elev(layer_idx - 1) };
            let thickness = layer_top - layer_bottom;
            if thickness > 1e-12 {
                ((layer_top - notch_elev) / thickness * notch_area_frac).clamp(0.0, 1.0)
            } else {
                0.0
            }
        } else {
            notch_area_frac
        };
        if frac <= 0.0 {
            continue;
        }

        let layer = cell.layer_mut(layer_idx);
        for stratum in [layer.unconsolidated_mut(), layer.consolidated_mut()] {
            let avail_fine = (stratum.fine() - stratum.notch_fine_lost()).max(0.0);
            let avail_sand = (stratum.sand() - stratum.notch_sand_lost()).max(0.0);
            let avail_coarse = (stratum.coarse() - stratum.notch_coarse_lost()).max(0.0);
            let fine = avail_fine * frac;
            let sand = avail_sand * frac;
            let coarse = avail_coarse * frac;
            stratum.incr_notch_fine_lost(fine);
            stratum.incr_notch_sand_lost(sand);
            stratum.incr_notch_coarse_lost(coarse);
            fine_lost += fine;
            sand_released += sand;
            coarse_released += coarse;
        }
    }

    cell.totals.tot_collapsed_depth += fine_lost + sand_released + coarse_released;
    cell.transients.collapsed_depth += fine_lost + sand_released + coarse_released;

    let remaining_after = cliff.remaining - cliff.remaining * notch_area_frac;
    let new_cliff = CliffState {
        remaining: remaining_after.max(0.0),
        ..cliff
    };

    if new_cliff.remaining <= 0.0 {
        cell.set_landform(Landform::Sea);
        cell.remove_cliff();
    } else {
        cell.set_landform(Landform::Cliff(new_cliff));
    }

    coast.set_landform(i, *cell.landform());

    Ok(Some(CollapseEvent {
        coast_index,
        point_on_coast_index: i,
        pos,
        fine_lost,
        sand_released,
        coarse_released,
    }))
}

/// Depth below the shoreline at distance `y` seaward of it, under a Dean
/// (1977) equilibrium profile with scale parameter `a`.
pub fn dean_profile_depth(a: f64, y: f64) -> f64 {
    if y <= 0.0 {
        0.0
    } else {
        a * y.powf(DEAN_POWER)
    }
}

/// Solves for the Dean scale parameter `a` such that the equilibrium profile
/// meets the existing foreshore elevation at the end of the talus slope,
/// used when the run has not been given a fixed value for `a`.
pub fn solve_dean_a(talus_top_elev: f64, existing_profile_end_elev: f64, talus_slope_length: f64) -> f64 {
    if talus_slope_length <= 0.0 {
        return 0.0;
    }
    (talus_top_elev - existing_profile_end_elev) / talus_slope_length.powf(DEAN_POWER)
}

/// Redistributes one collapse event's sand and coarse release as talus along
/// `planview_width` profiles centred on the collapse point, each raising its
/// unconsolidated sand by the Dean-profile depth at its distance from the
/// cliff toe, scaled so the total added volume matches what was released.
pub fn redistribute_talus(
    event: &CollapseEvent,
    coast: &Coast,
    grid: &mut RasterGrid,
    planview_width: usize,
    dean_a: f64,
) {
    let total_released = event.sand_released + event.coarse_released;
    if total_released <= 0.0 || planview_width == 0 {
        return;
    }

    let half = (planview_width / 2) as i32;
    let mut depths = Vec::with_capacity(planview_width);
    let mut sum = 0.0;
    for k in -half..=half {
        let y = (k.abs() as f64 + 1.0) * grid.cell_side();
        let d = dean_profile_depth(dean_a, y);
        depths.push(d);
        sum += d;
    }
    if sum <= 0.0 {
        return;
    }

    let centre = event.pos;
    for (k, depth) in (-half..=half).zip(depths.iter()) {
        let pos = Point2I::new(centre.col + k, centre.row);
        if !grid.is_within_grid(pos) {
            continue;
        }
        let share = total_released * (depth / sum);
        if share <= 0.0 {
            continue;
        }
        let sand_fraction = if total_released > 0.0 {
            event.sand_released / total_released
        } else {
            0.0
        };
        let cell = grid.cell_mut(pos);
        let top = cell.num_layers() - 1;
        let unconsolidated = cell.layer_mut(top).unconsolidated_mut();
        unconsolidated.set_sand(unconsolidated.sand() + share * sand_fraction);
        unconsolidated.set_coarse(unconsolidated.coarse() + share * (1.0 - sand_fraction));
        cell.transients.collapsed_deposit_depth += share;
        cell.totals.tot_collapsed_deposit_depth += share;
        cell.recalc_layer_elevations();
    }

    let _ = coast;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dean_profile_is_zero_at_shoreline_and_grows_seaward() {
        assert_eq!(dean_profile_depth(0.1, 0.0), 0.0);
        let near = dean_profile_depth(0.1, 1.0);
        let far = dean_profile_depth(0.1, 8.0);
        assert!(far > near);
    }

    #[test]
    fn solve_dean_a_matches_end_elevation() {
        let a = solve_dean_a(2.0, 0.5, 10.0);
        let end_depth = dean_profile_depth(a, 10.0);
        assert!((2.0 - end_depth - 0.5).abs() < 1e-9);
    }

    #[test]
    fn collapse_cliff_releases_proportional_sediment_and_shrinks_remaining() {
        let mut grid = RasterGrid::new(3, 1, 1.0, 0.0, 0.0, 1);
        let pos = Point2I::new(1, 0);
        grid.cell_mut(pos).layer_mut(0).unconsolidated_mut().set_sand(4.0);
        grid.cell_mut(pos).recalc_layer_elevations();
        grid.cell_mut(pos).set_landform(Landform::Cliff(CliffState::new_cliff(1.0, 0.0, 0, 0)));

        let mut coast = Coast::new(crate::geometry::Handedness::Right, vec![pos], &grid);
        let event = collapse_cliff(&mut coast, 0, &mut grid, 0, 0.5)
            .expect("collapse did not error")
            .expect("cell was a cliff");
        assert!((event.sand_released - 2.0).abs() < 1e-9);
        // Notch-lost accounting only: present sediment is untouched until
        // `remove_cliff` runs on the Cliff -> Sea transition.
        assert!((grid.cell(pos).layer(0).unconsolidated().sand() - 4.0).abs() < 1e-9);
        assert!((grid.cell(pos).layer(0).unconsolidated().notch_sand_lost() - 2.0).abs() < 1e-9);
        assert!(matches!(grid.cell(pos).landform(), Landform::Cliff(_)));
    }

    #[test]
    fn collapse_cliff_raises_notch_error_above_sediment_top() {
        let mut grid = RasterGrid::new(3, 1, 1.0, 0.0, 0.0, 1);
        let pos = Point2I::new(1, 0);
        // No sediment at all: sediment_top_elev == basement == 0.0, equal to
        // the notch's min_still_water_level, so the notch sits at or above it.
        grid.cell_mut(pos).set_landform(Landform::Cliff(CliffState::new_cliff(1.0, 0.0, 0, 0)));

        let mut coast = Coast::new(crate::geometry::Handedness::Right, vec![pos], &grid);
        let result = collapse_cliff(&mut coast, 0, &mut grid, 0, 0.5);
        assert!(matches!(result, Err(crate::error::CmeError::CliffNotch(_))));
    }

    #[test]
    fn collapse_cliff_fully_depletes_triggers_remove_cliff_next_collapse() {
        let mut grid = RasterGrid::new(3, 1, 1.0, 0.0, 0.0, 1);
        let pos = Point2I::new(1, 0);
        grid.cell_mut(pos).layer_mut(0).unconsolidated_mut().set_sand(4.0);
        grid.cell_mut(pos).recalc_layer_elevations();
        grid.cell_mut(pos).set_landform(Landform::Cliff(CliffState::new_cliff(1.0, 0.0, 0, 0)));

        let mut coast = Coast::new(crate::geometry::Handedness::Right, vec![pos], &grid);
        // notch_area_frac == 1.0 fully depletes `remaining` in one collapse.
        let event = collapse_cliff(&mut coast, 0, &mut grid, 0, 1.0)
            .expect("collapse did not error")
            .expect("cell was a cliff");
        assert!((event.sand_released - 4.0).abs() < 1e-9);
        assert!(matches!(grid.cell(pos).landform(), Landform::Sea));
        // RemoveCliff already ran: present sand is permanently gone and the
        // notch-lost counter is zeroed.
        assert!((grid.cell(pos).layer(0).unconsolidated().sand() - 0.0).abs() < 1e-9);
        assert_eq!(grid.cell(pos).layer(0).unconsolidated().notch_sand_lost(), 0.0);
    }
}
