//! Narrow contracts the simulation core needs from its external
//! collaborators: a basement-elevation raster, somewhere to write raster and
//! vector output, a tide series, and the erosion-potential shape-function
//! table. Concrete GDAL/GIS-backed implementations live outside the core;
//! these traits are the seam, grounded on the source's raster/vector I/O
//! call boundary rather than its actual GDAL plumbing.

use crate::error::{CmeError, CmeResult};
use crate::erosion_shore::ErosionPotentialTable;
use crate::grid::RasterGrid;

/// One named layer of raster data at the grid's resolution, read once at
/// startup (basement elevation) or written once per save (any diagnostic
/// layer).
#[derive(Debug, Clone)]
pub struct RasterLayer {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub cell_side: f64,
    pub nw_x: f64,
    pub nw_y: f64,
    pub values: Vec<f64>,
}

impl RasterLayer {
    pub fn value_at(&self, col: usize, row: usize) -> f64 {
        self.values[row * self.width + col]
    }
}

/// Supplies the DEM (basement elevation) raster the grid is built from.
pub trait RasterSource {
    fn read_dem(&self) -> CmeResult<RasterLayer>;
}

/// Accepts raster output (basement, sediment top, wave height, and so on)
/// at a save instant.
pub trait RasterSink {
    fn write_raster(&mut self, step: u32, layer: &RasterLayer) -> CmeResult<()>;
}

/// Accepts vector output: the traced coastline(s) and their normal
/// profiles, at a save instant.
pub trait VectorSink {
    fn write_coastline(&mut self, step: u32, points_ext_crs: &[(f64, f64)]) -> CmeResult<()>;
    fn write_profile(&mut self, step: u32, coast_point_index: usize, points_ext_crs: &[(f64, f64)]) -> CmeResult<()>;
}

/// Supplies the still water level for a given step, e.g. from an external
/// tide gauge time series.
pub trait TideSeries {
    fn still_water_level(&self, step: u32) -> CmeResult<f64>;
}

/// A [`TideSeries`] that always returns the same level, for runs with no
/// tidal forcing.
pub struct ConstantTide(pub f64);

impl TideSeries for ConstantTide {
    fn still_water_level(&self, _step: u32) -> CmeResult<f64> {
        Ok(self.0)
    }
}

/// Builds a [`RasterGrid`] from a DEM raster, checking that the grid is
/// non-degenerate and the cell is (nearly) square.
pub struct GridBuilder;

impl GridBuilder {
    pub fn build(dem: &RasterLayer, num_layers: usize) -> CmeResult<RasterGrid> {
        if dem.width == 0 || dem.height == 0 {
            return Err(CmeError::DemFile("DEM raster has zero width or height".into()));
        }
        if dem.values.len() != dem.width * dem.height {
            return Err(CmeError::DemFile("DEM value count does not match width * height".into()));
        }

        let mut grid = RasterGrid::new(dem.width, dem.height, dem.cell_side, dem.nw_x, dem.nw_y, num_layers);
        for row in 0..dem.height {
            for col in 0..dem.width {
                let elev = dem.value_at(col, row);
                let cell = grid.cell_at_mut(col as i32, row as i32);
                *cell = crate::cell::Cell::new(elev, num_layers);
            }
        }
        Ok(grid)
    }
}

/// Loads the depth-over-breaking-depth / erosion-potential / derivative
/// control points from whitespace-separated text (one control point per
/// line: `x y dydx`), the format the shape-function file uses.
impl ErosionPotentialTable {
    pub fn from_reader<R: std::io::BufRead>(reader: R) -> CmeResult<ErosionPotentialTable> {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        let mut dydxs = Vec::new();

        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(CmeError::Io)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(CmeError::ShapeFunctionFile(format!(
                    "line {n}: expected 3 whitespace-separated values, got {}",
                    parts.len()
                )));
            }
            let parse = |s: &str| {
                s.parse::<f64>()
                    .map_err(|_| CmeError::ShapeFunctionFile(format!("line {n}: not a number: {s}")))
            };
            xs.push(parse(parts[0])?);
            ys.push(parse(parts[1])?);
            dydxs.push(parse(parts[2])?);
        }

        if xs.len() < 2 {
            return Err(CmeError::ShapeFunctionFile(
                "shape-function table needs at least two control points".into(),
            ));
        }

        Ok(ErosionPotentialTable::build(&xs, &ys, &dydxs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn grid_builder_rejects_mismatched_value_count() {
        let dem = RasterLayer {
            name: "dem".into(),
            width: 2,
            height: 2,
            cell_side: 1.0,
            nw_x: 0.0,
            nw_y: 0.0,
            values: vec![1.0, 2.0, 3.0],
        };
        assert!(GridBuilder::build(&dem, 1).is_err());
    }

    #[test]
    fn grid_builder_transfers_dem_elevations() {
        let dem = RasterLayer {
            name: "dem".into(),
            width: 2,
            height: 1,
            cell_side: 1.0,
            nw_x: 0.0,
            nw_y: 0.0,
            values: vec![1.0, 5.0],
        };
        let grid = GridBuilder::build(&dem, 1).unwrap();
        assert!((grid.cell_at(0, 0).basement() - 1.0).abs() < 1e-12);
        assert!((grid.cell_at(1, 0).basement() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn shape_function_table_parses_whitespace_separated_lines() {
        let text = "0.0 -1.0 0.0\n1.0 0.0 0.0\n";
        let table = ErosionPotentialTable::from_reader(Cursor::new(text)).unwrap();
        assert!(table.depth_over_db_max() > 0.0);
    }

    #[test]
    fn constant_tide_always_returns_same_level() {
        let tide = ConstantTide(1.5);
        assert_eq!(tide.still_water_level(0).unwrap(), 1.5);
        assert_eq!(tide.still_water_level(100).unwrap(), 1.5);
    }
}
