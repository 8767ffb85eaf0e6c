//! Core LST gap-filling modules

pub mod quality;
pub mod merge;
pub mod convert;
pub mod long_term_mean;
pub mod residual;
pub mod smoothing;
pub mod gap_fill;
pub mod reconstruct;
pub mod statistics;

// Re-export main types
pub use quality::QualityFilter;
pub use merge::TemporalMerger;
pub use convert::{UnitConverter, ConversionParams};
pub use long_term_mean::LongTermMeanEngine;
pub use residual::ResidualEngine;
pub use smoothing::{SpatialSmoother, SmoothingParams};
pub use gap_fill::{TemporalGapFiller, GapFillParams, SameDayPolicy, FilledResidual};
pub use reconstruct::Reconstructor;
pub use statistics::{RasterStatistics, CoverageStatistics, PointSample, point_series};
