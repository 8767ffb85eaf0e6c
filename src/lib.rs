//! lstfill: Gap-free daily land surface temperature from MODIS Terra and Aqua
//!
//! Cloud and QC gaps in the daily LST rasters are reconstructed from a long-term
//! per-pixel mean plus residuals interpolated over a sliding temporal window and
//! smoothed spatially. Directly observed pixels are never altered.

pub mod types;
pub mod config;
pub mod io;
pub mod core;
pub mod pipeline;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    Grid, GeoTransform, Raster, Observation, TimeSeries, ReconstructedRaster,
    Band, Sensor, Provenance, LstError, LstResult,
};

pub use config::{LstFillConfig, ProcessingPeriod};
pub use io::{InMemoryArchive, ObservationArchive, RawObservation, RegionMask};
pub use pipeline::{LstPipeline, BandReconstruction, ReconstructionReport, DateFailure};
