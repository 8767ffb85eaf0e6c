use crate::core::smoothing::SpatialSmoother;
use crate::types::{LstResult, Raster, TimeSeries};

/// Decomposes observations into deviations from the long-term mean
pub struct ResidualEngine;

impl ResidualEngine {
    /// `observation - mean` where both are valid, masked elsewhere
    pub fn residual(observation: &Raster, mean: &Raster) -> LstResult<Raster> {
        observation.zip_valid(mean, |obs, m| obs - m)
    }

    /// Residual series, tags and order unchanged
    pub fn compute(series: &TimeSeries, mean: &Raster) -> LstResult<TimeSeries> {
        series.grid().ensure_shape(mean.shape())?;
        log::debug!("Computing {} residuals for {} observations", series.band(), series.len());
        series.map_rasters(|raster| Self::residual(raster, mean))
    }

    /// Residual series with every entry passed once through the smoother
    pub fn smoothed(residuals: &TimeSeries, smoother: &SpatialSmoother) -> LstResult<TimeSeries> {
        log::debug!("Smoothing {} {} residuals", residuals.len(), residuals.band());
        residuals.map_rasters(|raster| smoother.smooth(raster))
    }
}
