//! CoastalME: a cellular, raster-based coastal morphological evolution
//! simulation.
//!
//! Traces a shoreline from a raster grid, places coast-normal profiles,
//! propagates waves landward along them, erodes the shore platform, and
//! deepens and collapses sea cliffs — stepping through a run the way
//! `src/driver.rs` orchestrates it.

pub mod cell;
pub mod cliff_collapse;
pub mod coast;
pub mod config;
pub mod driver;
pub mod error;
pub mod erosion_shore;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod landform;
pub mod profile;
pub mod rng;
pub mod sediment;
pub mod wave;
