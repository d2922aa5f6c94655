//! The per-step orchestration sequence: locate coastlines and profiles,
//! propagate waves, erode the shore platform, deepen and collapse cliffs,
//! and check mass balance — the fixed order every step runs in.

use tracing::{info, warn};

use crate::cliff_collapse::{self, CollapseEvent};
use crate::coast::{self, Coast};
use crate::config::{GrandTotals, SaveSchedule, SimulationConfig};
use crate::erosion_shore::{self, ErosionInputs, ErosionPotentialTable};
use crate::error::{CmeError, CmeResult};
use crate::grid::RasterGrid;
use crate::io::{RasterSink, TideSeries, VectorSink};
use crate::landform::{CliffState, Landform};
use crate::profile::{self, Profile};
use crate::rng::SimRng;
use crate::wave::{self, AiryConstants, WaveInputs};

/// Forcing that varies from step to step; everything else lives in
/// [`SimulationConfig`].
#[derive(Debug, Clone, Copy)]
pub struct StepForcing {
    pub offshore_wave_height: f64,
    pub offshore_wave_period: f64,
    pub offshore_wave_orientation_deg: f64,
}

pub struct Driver {
    pub config: SimulationConfig,
    pub grid: RasterGrid,
    pub rng: SimRng,
    pub totals: GrandTotals,
    erosion_table: ErosionPotentialTable,
    sweep_forward: bool,
}

impl Driver {
    pub fn new(config: SimulationConfig, grid: RasterGrid, erosion_table: ErosionPotentialTable) -> CmeResult<Self> {
        config.validate()?;
        let rng = SimRng::new(config.edge_search_seed, config.profile_spacing_seed);
        Ok(Self {
            config,
            grid,
            rng,
            totals: GrandTotals::default(),
            erosion_table,
            sweep_forward: true,
        })
    }

    /// Runs every step up to `config.num_steps`, saving output through
    /// `sinks` on the steps [`SaveSchedule`] selects, and returns the final
    /// grand totals.
    pub fn run_to_completion(
        &mut self,
        tide: &dyn TideSeries,
        forcing: &[StepForcing],
        save_schedule: &SaveSchedule,
        raster_sink: &mut dyn RasterSink,
        vector_sink: &mut dyn VectorSink,
    ) -> CmeResult<GrandTotals> {
        for step in 0..self.config.num_steps {
            let swl = tide.still_water_level(step)?;
            let step_forcing = forcing
                .get(step as usize)
                .copied()
                .or_else(|| forcing.last().copied())
                .ok_or_else(|| CmeError::BadParam("no wave forcing supplied for this run".into()))?;

            match self.run_step(step, swl, step_forcing) {
                Ok(coasts) => {
                    if save_schedule.should_save(step) {
                        self.save_step(step, &coasts, raster_sink, vector_sink)?;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(step, error = %e, "step failed, continuing to next step");
                }
            }

            self.check_mass_balance()?;
        }
        Ok(self.totals)
    }

    /// Runs the fixed per-step sequence once, returning the coastlines
    /// traced this step (so the caller can save them without re-tracing).
    pub fn run_step(&mut self, step: u32, swl: f64, forcing: StepForcing) -> CmeResult<Vec<Coast>> {
        self.grid.reset_for_step();

        let mut coasts = coast::trace_coastlines(&mut self.grid, swl)?;
        info!(step, num_coasts = coasts.len(), "traced coastline(s)");

        for (coast_index, coast) in coasts.iter_mut().enumerate() {
            coast.smooth(self.config.coast_smooth_method, self.config.coast_smoothing_window, self.config.coast_savgol_poly_order);
            coast.calc_curvature(self.config.curvature_half_width);
            coast.calc_flux_orientation();
            self.assign_landforms(coast, coast_index, swl);
            self.build_profiles(coast, swl)?;
            self.propagate_waves(coast, &forcing, swl);
            self.erode_shore_platform(coast, swl);
        }

        let events = if self.config.do_cliff_collapse {
            self.run_cliff_collapse(&mut coasts, swl)
        } else {
            Vec::new()
        };
        self.redistribute_collapse_talus(&events, &coasts);

        self.grid.recompute_accumulators(swl);
        if self.grid.accumulators.sea_cell_count == 0 {
            return Err(CmeError::NoSeaCells);
        }

        self.update_suspended_sediment(&events, swl);

        for coast in coasts.iter() {
            for i in 0..coast.len() {
                let pos = coast.cell_at(i);
                if !self.grid.cell(pos).invariant_holds() {
                    warn!(step, col = pos.col, row = pos.row, "cell invariant violated after step");
                }
            }
        }

        self.sweep_forward = !self.sweep_forward;
        Ok(coasts)
    }

    /// Gives every coast point that isn't already a cliff a fresh
    /// [`CliffState`] when its backing cell has no beach sediment left
    /// covering the basement, mirroring `nAssignCoastalLandforms`.
    fn assign_landforms(&mut self, coast: &mut Coast, coast_index: usize, _swl: f64) {
        let cell_side = self.grid.cell_side();
        let min_swl = self.config.min_still_water_level;
        for i in 0..coast.len() {
            let pos = coast.cell_at(i);
            let cell = self.grid.cell_mut(pos);
            let is_bare_basement = cell.layers().iter().all(|l| l.total_thickness() <= 1e-9);

            if is_bare_basement {
                let new_state = match cell.landform().as_cliff() {
                    Some(existing) => *existing,
                    None => CliffState::new_cliff(cell_side, min_swl, coast_index, i),
                };
                cell.set_landform(Landform::Cliff(new_state));
            } else if !cell.landform().is_cliff() {
                cell.set_landform(Landform::Hinterland);
            }
            coast.set_landform(i, *cell.landform());
        }
    }

    fn build_profiles(&mut self, coast: &mut Coast, swl: f64) -> CmeResult<()> {
        let n = coast.len();
        if n == 0 {
            return Ok(());
        }
        let mut next_emit = 0.0;
        let mut travelled = 0.0;
        let mut profiles = Vec::new();

        for i in 0..n {
            if i > 0 {
                travelled += coast.point_at(i - 1).distance_to(&coast.point_at(i));
            }
            if travelled < next_emit && i != 0 {
                continue;
            }

            let before = coast.point_at(i.saturating_sub(1));
            let after = coast.point_at((i + 1).min(n - 1));
            if before.distance_to(&after) < 1e-9 {
                continue;
            }

            match profile::emit_profile(
                i,
                coast.cell_at(i),
                &self.grid,
                before,
                after,
                self.config.profile_length,
                coast.handedness(),
            ) {
                Ok(mut prof) => match profile::rasterize_profile(&mut prof, &self.grid, swl) {
                    Ok(()) => profiles.push(prof),
                    Err(e) => warn!(coast_point = i, error = %e, "profile rejected"),
                },
                Err(e) => warn!(coast_point = i, error = %e, "profile endpoint rejected"),
            }

            next_emit = travelled
                + profile::next_spacing(
                    self.config.profile_spacing,
                    self.config.profile_rand_space_fact,
                    self.grid.cell_side(),
                    &mut self.rng.profile_spacing,
                );
        }

        for pair in profiles.windows(2) {
            if let Some(p) = profile::profiles_intersect(&pair[0], &pair[1]) {
                warn!(x = p.x(), y = p.y(), "adjacent profiles intersect");
            }
        }

        *coast.profiles_mut() = profiles;
        Ok(())
    }

    fn propagate_waves(&mut self, coast: &mut Coast, forcing: &StepForcing, swl: f64) {
        let airy = AiryConstants::from_period(forcing.offshore_wave_period);
        let wave_inputs = WaveInputs {
            offshore_height: forcing.offshore_wave_height,
            period: forcing.offshore_wave_period,
            orientation_deg: forcing.offshore_wave_orientation_deg,
            still_water_level: swl,
        };

        let mut breaking_per_profile = Vec::with_capacity(coast.profiles().len());
        for profile in coast.profiles() {
            let tangent = coast.flux_orientation(profile.coast_point_index());
            let breaking = wave::propagate_profile(profile.cells(), &mut self.grid, &wave_inputs, &airy, tangent);
            breaking_per_profile.push(breaking);
        }

        let coast_points: Vec<usize> = coast.profiles().iter().map(|p| p.coast_point_index()).collect();
        for (i, breaking) in coast_points.into_iter().zip(breaking_per_profile.iter()) {
            coast.set_breaking_wave_height(i, breaking.height);
            coast.set_breaking_wave_angle(i, breaking.angle_deg);
            coast.set_depth_of_breaking(i, breaking.depth);
            coast.set_breaking_distance(i, breaking.breaking_distance_cells);
            coast.add_wave_energy(
                i,
                wave::wave_energy(breaking.height, forcing.offshore_wave_period, self.config.timestep_seconds),
            );
        }

        let profiles: Vec<Profile> = coast.profiles().to_vec();
        wave::interpolate_breaking_to_coastline(coast, &profiles);

        // Re-arm the interpolation-weight sentinel for the erosion pass:
        // the wave phase has already consumed it for inter-profile wave
        // blending, and erosion needs a fresh "not yet written" state.
        for cell in self.grid.cells_mut() {
            cell.transients.interpolation_weight = None;
        }

        for pair in profiles.windows(2) {
            let a = &pair[0];
            let b = &pair[1];
            let span = b.coast_point_index().saturating_sub(a.coast_point_index());
            if span < 2 {
                continue;
            }
            for i in (a.coast_point_index() + 1)..b.coast_point_index() {
                let weight_b = (i - a.coast_point_index()) as f64 / span as f64;
                let virtual_cells = wave::build_virtual_profile(a.cells(), coast.cell_at(i), &self.grid, swl);
                wave::interpolate_inter_profile_cells(&mut self.grid, &virtual_cells, a.cells(), b.cells(), weight_b);
            }
        }
    }

    fn erode_shore_platform(&mut self, coast: &mut Coast, swl: f64) {
        // Re-arm once more: the wave phase's inter-profile blend left its
        // own sentinel set, and actual-erosion blending needs its own pass.
        for cell in self.grid.cells_mut() {
            cell.transients.interpolation_weight = None;
        }

        let indices: Vec<usize> = if self.sweep_forward {
            (0..coast.profiles().len()).collect()
        } else {
            (0..coast.profiles().len()).rev().collect()
        };

        for &idx in &indices {
            let profile = &coast.profiles()[idx];
            let coast_point = profile.coast_point_index();
            let depth_of_breaking = coast.depth_of_breaking(coast_point);
            if depth_of_breaking <= 0.0 {
                continue;
            }
            let slopes = profile_slopes(profile.cells(), &self.grid, self.config.profile_smooth_window);
            let inputs = ErosionInputs {
                still_water_level: swl,
                depth_of_breaking,
                wave_energy: coast.wave_energy(coast_point),
                beach_protection_factor: self.config.beach_protection_factor,
                material_strength: self.config.material_strength_r,
                max_depth_over_db: self.config.max_depth_over_db,
            };
            erosion_shore::apply_profile_potential_erosion(
                profile.cells(),
                &slopes,
                &self.erosion_table,
                &mut self.grid,
                inputs,
            );
        }

        for i in 0..coast.len() {
            let pos = coast.cell_at(i);
            let removed = erosion_shore::apply_actual_erosion(
                &mut self.grid,
                pos,
                self.config.fine_erodibility,
                self.config.sand_erodibility,
                self.config.coarse_erodibility,
            );
            self.totals.total_actual_erosion.add(removed);
            self.totals.total_potential_erosion.add(self.grid.cell(pos).transients.potential_erosion);
            self.totals.total_fine_lost.add(self.grid.cell(pos).transients.actual_erosion_fine);
        }
    }

    fn run_cliff_collapse(&mut self, coasts: &mut [Coast], _swl: f64) -> Vec<CollapseEvent> {
        let mut events = Vec::new();
        let cell_side = self.grid.cell_side();
        for (coast_index, coast) in coasts.iter_mut().enumerate() {
            let ready = cliff_collapse::deepen_notches(
                coast,
                &mut self.grid,
                cell_side,
                self.config.notch_energy_to_depth_rate,
                self.config.collapse_overhang_threshold,
            );
            for point in ready {
                match cliff_collapse::collapse_cliff(
                    coast,
                    coast_index,
                    &mut self.grid,
                    point,
                    self.config.collapse_notch_area_fraction,
                ) {
                    Ok(Some(event)) => {
                        self.totals.total_fine_lost.add(event.fine_lost);
                        self.totals.total_collapsed_depth.add(event.sand_released + event.coarse_released);
                        events.push(event);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(coast_point = point, error = %e, "cliff collapse failed"),
                }
            }
        }
        events
    }

    fn redistribute_collapse_talus(&mut self, events: &[CollapseEvent], coasts: &[Coast]) {
        for event in events {
            let coast = &coasts[event.coast_index];
            let dean_a = self.config.cliff_deposition_a.unwrap_or_else(|| {
                cliff_collapse::solve_dean_a(
                    self.config.collapse_overhang_threshold,
                    self.config.still_water_level,
                    (self.config.cliff_deposition_planview_length as f64) * self.grid.cell_side() / 2.0,
                )
            });
            cliff_collapse::redistribute_talus(
                event,
                coast,
                &mut self.grid,
                self.config.cliff_deposition_planview_width,
                dean_a,
            );
            self.totals.total_sand_deposited.add(event.sand_released);
            self.totals.total_coarse_deposited.add(event.coarse_released);
        }
    }

    /// Spreads this step's fine sediment (shore erosion plus cliff collapse)
    /// evenly across every sea cell, per the grid-update phase that closes
    /// out a step. Must run after `grid.recompute_accumulators` so
    /// `sea_cell_count` reflects this step's coastline.
    fn update_suspended_sediment(&mut self, events: &[CollapseEvent], swl: f64) {
        let n = self.grid.accumulators.sea_cell_count;
        if n == 0 {
            return;
        }
        let erosion_fine: f64 = self.grid.cells().iter().map(|c| c.transients.actual_erosion_fine).sum();
        let collapse_fine: f64 = events.iter().map(|e| e.fine_lost).sum();
        let per_cell = (erosion_fine + collapse_fine) / n as f64;
        if per_cell <= 0.0 {
            return;
        }
        for cell in self.grid.cells_mut() {
            let is_sea = matches!(cell.landform(), Landform::Sea) || cell.water_depth(swl) > 0.0;
            if is_sea {
                let current = cell.suspended_sediment_depth();
                cell.set_suspended_sediment_depth(current + per_cell);
            }
        }
    }

    /// `|actual erosion + collapsed - deposited - fine lost| <= tolerance`.
    pub fn check_mass_balance(&self) -> CmeResult<()> {
        let residual = self.totals.mass_balance_residual();
        if residual > self.config.mass_balance_tolerance {
            return Err(CmeError::MassBalance(format!(
                "residual {residual} exceeds tolerance {}",
                self.config.mass_balance_tolerance
            )));
        }
        Ok(())
    }

    fn save_step(
        &self,
        step: u32,
        coasts: &[Coast],
        raster_sink: &mut dyn RasterSink,
        vector_sink: &mut dyn VectorSink,
    ) -> CmeResult<()> {
        let layer = crate::io::RasterLayer {
            name: "sediment_top_elev".to_string(),
            width: self.grid.width(),
            height: self.grid.height(),
            cell_side: self.grid.cell_side(),
            nw_x: 0.0,
            nw_y: 0.0,
            values: self.grid.cells().iter().map(|c| c.sediment_top_elev()).collect(),
        };
        raster_sink.write_raster(step, &layer)?;

        for coast in coasts {
            let points: Vec<(f64, f64)> = (0..coast.len())
                .map(|i| {
                    let p = coast.point_at(i);
                    (p.x(), p.y())
                })
                .collect();
            vector_sink.write_coastline(step, &points)?;

            for profile in coast.profiles() {
                let points = vec![(profile.start().x(), profile.start().y()), (profile.end().x(), profile.end().y())];
                vector_sink.write_profile(step, profile.coast_point_index(), &points)?;
            }
        }
        Ok(())
    }
}

/// Smoothed along-profile slope at every sample point, from the elevation
/// difference between consecutive cells over the cell side.
fn profile_slopes(cells: &[crate::geometry::Point2I], grid: &RasterGrid, window: usize) -> Vec<f64> {
    let mut raw = vec![0.0; cells.len()];
    for i in 1..cells.len() {
        let z0 = grid.cell(cells[i - 1]).sediment_top_elev();
        let z1 = grid.cell(cells[i]).sediment_top_elev();
        raw[i] = (z0 - z1) / grid.cell_side();
    }
    let poly = crate::geometry::Polyline::from_points(
        raw.iter().enumerate().map(|(i, &s)| crate::geometry::Point2D::new(i as f64, s)).collect(),
    );
    poly.smooth_running_mean(window).points().iter().map(|p| p.y()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2I;
    use crate::io::{ConstantTide, RasterLayer};

    fn sample_config() -> SimulationConfig {
        SimulationConfig {
            num_steps: 1,
            timestep_seconds: 3600.0,
            profile_spacing: 4.0,
            profile_rand_space_fact: 0.0,
            profile_length: 6.0,
            beach_protection_factor: 0.0,
            material_strength_r: 1000.0,
            max_depth_over_db: 1.0,
            notch_energy_to_depth_rate: 1e-8,
            collapse_overhang_threshold: 0.5,
            collapse_notch_area_fraction: 0.5,
            cliff_deposition_planview_length: 3,
            cliff_deposition_planview_width: 3,
            cliff_deposition_a: Some(0.1),
            fine_erodibility: 0.3,
            sand_erodibility: 0.4,
            coarse_erodibility: 0.3,
            coast_smooth_method: crate::config::CoastSmoothMethod::SavitzkyGolay,
            coast_smoothing_window: 1,
            coast_savgol_poly_order: 2,
            curvature_half_width: 1,
            profile_smooth_window: 1,
            do_cliff_collapse: true,
            do_alongshore_transport: false,
            still_water_level: 0.0,
            min_still_water_level: -1.0,
            edge_search_seed: 1,
            profile_spacing_seed: 2,
            mass_balance_tolerance: 1e-3,
        }
    }

    fn sample_grid() -> RasterGrid {
        let mut g = RasterGrid::new(12, 12, 1.0, 0.0, 0.0, 1);
        for row in 0..12i32 {
            for col in 0..12i32 {
                let is_land = col < 6;
                let elev = if is_land { 5.0 } else { -5.0 };
                let pos = Point2I::new(col, row);
                g.cell_mut(pos).layer_mut(0).unconsolidated_mut().set_sand(elev.max(0.0) + 1.0);
                g.cell_mut(pos).layer_mut(0).set_vol_sed_fraction(1.0);
                g.cell_mut(pos).recalc_layer_elevations();
                g.cell_mut(pos).set_landform(if is_land {
                    Landform::Hinterland
                } else {
                    Landform::Sea
                });
            }
        }
        g
    }

    #[test]
    fn run_step_traces_a_coast_and_leaves_sea_cells() {
        let config = sample_config();
        let grid = sample_grid();
        let table = ErosionPotentialTable::build(&[0.0, 1.0], &[-0.5, 0.0], &[0.0, 0.0]);
        let mut driver = Driver::new(config, grid, table).unwrap();

        let forcing = StepForcing {
            offshore_wave_height: 1.0,
            offshore_wave_period: 8.0,
            offshore_wave_orientation_deg: 90.0,
        };
        let coasts = driver.run_step(0, 0.0, forcing).expect("step should succeed");
        assert!(!coasts.is_empty());
        assert!(driver.grid.accumulators.sea_cell_count > 0);
    }

    struct NullRasterSink;
    impl RasterSink for NullRasterSink {
        fn write_raster(&mut self, _step: u32, _layer: &RasterLayer) -> CmeResult<()> {
            Ok(())
        }
    }

    struct NullVectorSink;
    impl VectorSink for NullVectorSink {
        fn write_coastline(&mut self, _step: u32, _points: &[(f64, f64)]) -> CmeResult<()> {
            Ok(())
        }
        fn write_profile(&mut self, _step: u32, _coast_point_index: usize, _points: &[(f64, f64)]) -> CmeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn run_drives_the_full_schedule_without_erroring() {
        let config = sample_config();
        let grid = sample_grid();
        let table = ErosionPotentialTable::build(&[0.0, 1.0], &[-0.5, 0.0], &[0.0, 0.0]);
        let mut driver = Driver::new(config, grid, table).unwrap();

        let tide = ConstantTide(0.0);
        let forcing = vec![StepForcing {
            offshore_wave_height: 1.0,
            offshore_wave_period: 8.0,
            offshore_wave_orientation_deg: 90.0,
        }];
        let schedule = SaveSchedule {
            every_n_steps: Some(1),
            explicit_steps: vec![],
        };
        let mut raster_sink = NullRasterSink;
        let mut vector_sink = NullVectorSink;

        let totals = driver
            .run_to_completion(&tide, &forcing, &schedule, &mut raster_sink, &mut vector_sink)
            .expect("run should complete");
        assert!(totals.mass_balance_residual() <= 1e-3 + 1e-9);
    }
}
