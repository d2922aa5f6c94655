//! CLI front end.
//!
//! Resolves a run-data file and a CoastalME home directory into a
//! [`SimulationConfig`] plus file-backed adapters, then drives
//! [`Driver::run_to_completion`]. The adapters here are placeholders: they
//! read and write the plain-text/JSON shapes the core's traits expect, not
//! real GDAL rasters or vector layers, so that a run is reproducible without
//! external GIS processes.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coastalme::config::{SaveSchedule, SimulationConfig};
use coastalme::driver::{Driver, StepForcing};
use coastalme::error::{CmeError, CmeResult};
use coastalme::erosion_shore::ErosionPotentialTable;
use coastalme::io::{GridBuilder, RasterLayer, RasterSink, RasterSource, TideSeries, VectorSink};

#[derive(Parser, Debug)]
#[command(name = "coastalme")]
#[command(about = "Cellular, raster-based coastal morphological evolution simulation")]
struct Args {
    /// CoastalME home directory (holds the shape-function table and,
    /// unless overridden, the default output location).
    #[arg(long, default_value = ".")]
    home: PathBuf,

    /// Run-data file: JSON-serialised `SimulationConfig` plus input/output
    /// file paths.
    #[arg(long)]
    datafile: PathBuf,

    /// Raise logging from info to debug.
    #[arg(long)]
    verbose: bool,
}

/// The subset of the run-data file that is not already part of
/// [`SimulationConfig`]: where to read the DEM and tide series from, and
/// where to write output.
#[derive(serde::Deserialize)]
struct RunData {
    config: SimulationConfig,
    dem_file: PathBuf,
    shape_function_file: PathBuf,
    tide_file: Option<PathBuf>,
    output_dir: PathBuf,
    save_every_n_steps: Option<u32>,
    offshore_wave_height: f64,
    offshore_wave_period: f64,
    offshore_wave_orientation_deg: f64,
}

/// Reads a DEM from the whitespace-separated text format: a header line
/// `width height cell_side nw_x nw_y`, then `width * height` elevation
/// values in row-major order.
struct FileRasterSource {
    path: PathBuf,
}

impl RasterSource for FileRasterSource {
    fn read_dem(&self) -> CmeResult<RasterLayer> {
        let text = std::fs::read_to_string(&self.path).map_err(CmeError::Io)?;
        let mut tokens = text.split_whitespace();

        let parse_usize = |t: Option<&str>| -> CmeResult<usize> {
            t.and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| CmeError::DemFile(format!("malformed header in {}", self.path.display())))
        };
        let parse_f64 = |t: Option<&str>| -> CmeResult<f64> {
            t.and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| CmeError::DemFile(format!("malformed header in {}", self.path.display())))
        };

        let width = parse_usize(tokens.next())?;
        let height = parse_usize(tokens.next())?;
        let cell_side = parse_f64(tokens.next())?;
        let nw_x = parse_f64(tokens.next())?;
        let nw_y = parse_f64(tokens.next())?;

        let mut values = Vec::with_capacity(width * height);
        for t in tokens {
            values.push(
                t.parse::<f64>()
                    .map_err(|_| CmeError::DemFile(format!("non-numeric elevation value: {t}")))?,
            );
        }

        Ok(RasterLayer {
            name: "basement".into(),
            width,
            height,
            cell_side,
            nw_x,
            nw_y,
            values,
        })
    }
}

/// Writes each saved raster layer to `<output_dir>/<layer_name>_<step>.asc`
/// in the same header-plus-values text format [`FileRasterSource`] reads.
struct FileRasterSink {
    output_dir: PathBuf,
}

impl RasterSink for FileRasterSink {
    fn write_raster(&mut self, step: u32, layer: &RasterLayer) -> CmeResult<()> {
        let path = self.output_dir.join(format!("{}_{}.asc", layer.name, step));
        let file = File::create(&path).map_err(CmeError::Io)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "{} {} {} {} {}", layer.width, layer.height, layer.cell_side, layer.nw_x, layer.nw_y)
            .map_err(CmeError::Io)?;
        for chunk in layer.values.chunks(layer.width) {
            let line: Vec<String> = chunk.iter().map(|v| v.to_string()).collect();
            writeln!(w, "{}", line.join(" ")).map_err(CmeError::Io)?;
        }
        Ok(())
    }
}

/// Writes coastlines and profiles as one `x y` pair per line, grouped by a
/// `# coast` / `# profile <coast_point_index>` header, to
/// `<output_dir>/vectors_<step>.txt`.
struct FileVectorSink {
    output_dir: PathBuf,
}

impl FileVectorSink {
    fn append(&self, step: u32, header: &str, points: &[(f64, f64)]) -> CmeResult<()> {
        let path = self.output_dir.join(format!("vectors_{step}.txt"));
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(CmeError::Io)?;
        let mut w = BufWriter::new(file);
        writeln!(w, "{header}").map_err(CmeError::Io)?;
        for (x, y) in points {
            writeln!(w, "{x} {y}").map_err(CmeError::Io)?;
        }
        Ok(())
    }
}

impl VectorSink for FileVectorSink {
    fn write_coastline(&mut self, step: u32, points_ext_crs: &[(f64, f64)]) -> CmeResult<()> {
        self.append(step, "# coast", points_ext_crs)
    }

    fn write_profile(&mut self, step: u32, coast_point_index: usize, points_ext_crs: &[(f64, f64)]) -> CmeResult<()> {
        self.append(step, &format!("# profile {coast_point_index}"), points_ext_crs)
    }
}

/// A still-water-level series backed by one value per line, holding the
/// last value for any step past the end of the file.
struct FileTideSeries {
    levels: Vec<f64>,
}

impl FileTideSeries {
    fn from_path(path: &Path) -> CmeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CmeError::Io)?;
        let mut levels = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            levels.push(
                line.parse::<f64>()
                    .map_err(|_| CmeError::TideDataFile(format!("non-numeric tide level: {line}")))?,
            );
        }
        if levels.is_empty() {
            return Err(CmeError::TideDataFile(format!("{} has no tide levels", path.display())));
        }
        Ok(Self { levels })
    }
}

impl TideSeries for FileTideSeries {
    fn still_water_level(&self, step: u32) -> CmeResult<f64> {
        Ok(self.levels[(step as usize).min(self.levels.len() - 1)])
    }
}

fn run(args: Args) -> CmeResult<()> {
    if !args.home.is_dir() {
        return Err(CmeError::CmeDirMissing(args.home.clone()));
    }

    let run_data_text = std::fs::read_to_string(&args.datafile).map_err(CmeError::Io)?;
    let run_data: RunData = serde_json::from_str(&run_data_text)
        .map_err(|e| CmeError::RunDataMalformed(format!("{}: {e}", args.datafile.display())))?;

    let dem_source = FileRasterSource { path: run_data.dem_file.clone() };
    let dem = dem_source.read_dem()?;
    let grid = GridBuilder::build(&dem, 1)?;

    let table_file = File::open(&run_data.shape_function_file).map_err(CmeError::Io)?;
    let erosion_table = ErosionPotentialTable::from_reader(BufReader::new(table_file))?;

    let mut driver = Driver::new(run_data.config.clone(), grid, erosion_table)?;

    let tide: Box<dyn TideSeries> = match &run_data.tide_file {
        Some(path) => Box::new(FileTideSeries::from_path(path)?),
        None => Box::new(coastalme::io::ConstantTide(run_data.config.still_water_level)),
    };

    let forcing = vec![
        StepForcing {
            offshore_wave_height: run_data.offshore_wave_height,
            offshore_wave_period: run_data.offshore_wave_period,
            offshore_wave_orientation_deg: run_data.offshore_wave_orientation_deg,
        };
        run_data.config.num_steps as usize
    ];

    let save_schedule = SaveSchedule {
        every_n_steps: run_data.save_every_n_steps,
        explicit_steps: Vec::new(),
    };

    std::fs::create_dir_all(&run_data.output_dir).map_err(CmeError::Io)?;
    let mut raster_sink = FileRasterSink { output_dir: run_data.output_dir.clone() };
    let mut vector_sink = FileVectorSink { output_dir: run_data.output_dir.clone() };

    tracing::info!(steps = run_data.config.num_steps, "starting run");
    let totals = driver.run_to_completion(tide.as_ref(), &forcing, &save_schedule, &mut raster_sink, &mut vector_sink)?;
    tracing::info!(residual = totals.mass_balance_residual(), "run complete");

    Ok(())
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "coastalme=debug" } else { "coastalme=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(args) {
        tracing::error!(error = %e, "run failed");
        std::process::exit(1);
    }
}
