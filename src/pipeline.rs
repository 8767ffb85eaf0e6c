//! Two-phase reconstruction of both LST bands over a processing period

use crate::config::LstFillConfig;
use crate::core::convert::UnitConverter;
use crate::core::gap_fill::TemporalGapFiller;
use crate::core::long_term_mean::LongTermMeanEngine;
use crate::core::merge::TemporalMerger;
use crate::core::reconstruct::Reconstructor;
use crate::core::residual::ResidualEngine;
use crate::core::smoothing::SpatialSmoother;
use crate::core::statistics::CoverageStatistics;
use crate::io::archive::ObservationArchive;
use crate::io::region::RegionMask;
use crate::types::{Band, LstResult, Observation, Raster, ReconstructedRaster, TimeSeries};
use chrono::NaiveDate;
use std::time::Instant;

/// A date that could not be loaded or reconstructed
#[derive(Debug, Clone, PartialEq)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub band: Band,
    pub reason: String,
}

/// Output of one band
#[derive(Debug, Clone)]
pub struct BandReconstruction {
    pub band: Band,
    /// Long-term mean in °C
    pub long_term_mean: Raster,
    /// Quality-filtered, merged, converted input series
    pub merged: TimeSeries,
    /// One raster per successfully processed day, ascending
    pub days: Vec<ReconstructedRaster>,
    pub failures: Vec<DateFailure>,
}

impl BandReconstruction {
    pub fn day(&self, date: NaiveDate) -> Option<&ReconstructedRaster> {
        self.days
            .binary_search_by_key(&date, |r| r.date)
            .ok()
            .map(|i| &self.days[i])
    }
}

/// Output of a full run
#[derive(Debug, Clone)]
pub struct ReconstructionReport {
    pub bands: Vec<BandReconstruction>,
}

impl ReconstructionReport {
    pub fn band(&self, band: Band) -> Option<&BandReconstruction> {
        self.bands.iter().find(|b| b.band == band)
    }

    pub fn failures(&self) -> impl Iterator<Item = &DateFailure> {
        self.bands.iter().flat_map(|b| b.failures.iter())
    }
}

/// Gap-filling pipeline over a fixed region and configuration
pub struct LstPipeline {
    config: LstFillConfig,
    region: RegionMask,
    converter: UnitConverter,
    smoother: SpatialSmoother,
    gap_filler: TemporalGapFiller,
}

impl LstPipeline {
    pub fn new(config: LstFillConfig, region: RegionMask) -> LstResult<Self> {
        config.validate()?;
        let smoother = SpatialSmoother::with_params(config.smoothing);
        Ok(Self {
            converter: UnitConverter::with_params(config.conversion),
            gap_filler: TemporalGapFiller::with_params(config.gap_fill, smoother.clone()),
            smoother,
            config,
            region,
        })
    }

    pub fn config(&self) -> &LstFillConfig {
        &self.config
    }

    pub fn region(&self) -> &RegionMask {
        &self.region
    }

    /// Reconstructs the day and night bands from two sensor archives.
    ///
    /// The first archive takes precedence for same-day entries.
    pub fn run(
        &self,
        primary: &dyn ObservationArchive,
        secondary: &dyn ObservationArchive,
    ) -> LstResult<ReconstructionReport> {
        primary.grid().ensure_compatible(secondary.grid())?;
        self.region.ensure_shape(primary.grid().shape())?;

        log::info!(
            "🚀 Reconstructing {} days from {} to {} ({} + {})",
            self.config.period.len_days(),
            self.config.period.start,
            self.config.period.end,
            primary.sensor(),
            secondary.sensor()
        );

        let bands = Band::ALL
            .iter()
            .map(|&band| self.run_band(band, primary, secondary))
            .collect::<LstResult<Vec<_>>>()?;

        Ok(ReconstructionReport { bands })
    }

    /// Reconstructs one band from two sensor archives
    pub fn run_band(
        &self,
        band: Band,
        primary: &dyn ObservationArchive,
        secondary: &dyn ObservationArchive,
    ) -> LstResult<BandReconstruction> {
        primary.grid().ensure_compatible(secondary.grid())?;

        let (first, mut failures) = self.load_series(primary, band)?;
        let (second, second_failures) = self.load_series(secondary, band)?;
        failures.extend(second_failures);

        let merged = TemporalMerger::merge(&first, &second)?;
        let mut result = self.reconstruct_merged(&merged)?;
        failures.append(&mut result.failures);
        failures.sort_by_key(|f| f.date);
        result.failures = failures;
        Ok(result)
    }

    /// Quality-filtered series of one band for the period.
    ///
    /// Unreadable days are reported and skipped, and count as unobserved.
    pub fn load_series(
        &self,
        archive: &dyn ObservationArchive,
        band: Band,
    ) -> LstResult<(TimeSeries, Vec<DateFailure>)> {
        let sensor = archive.sensor();
        let dates: Vec<NaiveDate> = archive
            .dates(band)
            .into_iter()
            .filter(|d| self.config.period.contains(*d))
            .collect();

        let load = |date: &NaiveDate| -> LstResult<Option<Observation>> {
            match archive.read(*date, band)? {
                Some(raw) => {
                    archive.grid().ensure_shape(raw.values.shape())?;
                    raw.filter(*date, band, sensor).map(Some)
                }
                None => Ok(None),
            }
        };

        #[cfg(feature = "parallel")]
        let loaded: Vec<_> = {
            use rayon::prelude::*;
            dates.par_iter().map(|d| (*d, load(d))).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let loaded: Vec<_> = dates.iter().map(|d| (*d, load(d))).collect();

        let mut entries = Vec::with_capacity(loaded.len());
        let mut failures = Vec::new();
        for (date, outcome) in loaded {
            match outcome {
                Ok(Some(observation)) => entries.push(observation),
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Skipping {} {} {}: {}", sensor, band, date, e);
                    failures.push(DateFailure {
                        date,
                        band,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let series = TimeSeries::new(band, archive.grid().clone(), entries)?;
        let coverage = series_coverage(&series, &self.region);
        log::info!(
            "Loaded {} {} observations of {} ({} filtered by {}), mean region coverage {:.1}%",
            series.len(),
            sensor,
            sensor.product_id(),
            band.source_name(),
            band.quality_name(),
            mean_percent(&coverage)
        );
        Ok((series, failures))
    }

    /// Runs both phases on an already merged, quality-filtered series of digital numbers
    pub fn reconstruct_merged(&self, merged: &TimeSeries) -> LstResult<BandReconstruction> {
        let band = merged.band();
        self.region.ensure_shape(merged.grid().shape())?;
        let started = Instant::now();

        // Phase 1: whole-period statistics
        let converted = self.converter.convert_series(merged)?;
        let long_term_mean = LongTermMeanEngine::compute(&converted)?;
        let residuals = ResidualEngine::compute(&converted, &long_term_mean)?;
        let smoothed = ResidualEngine::smoothed(&residuals, &self.smoother)?;
        log::info!(
            "{} phase 1 finished in {:.2}s",
            band,
            started.elapsed().as_secs_f64()
        );

        // Phase 2: independent per-date reconstruction
        let reconstructor = Reconstructor::new(band, &long_term_mean, &self.region)?;
        let reconstruct_date = |date: NaiveDate| -> LstResult<ReconstructedRaster> {
            let filled = self.gap_filler.fill(&smoothed, &residuals, date)?;
            let observed = self.gap_filler.original(&converted, date)?;
            reconstructor.reconstruct(&filled, observed.as_ref())
        };

        let dates = self.config.period.days();
        #[cfg(feature = "parallel")]
        let outcomes: Vec<_> = {
            use rayon::prelude::*;
            dates.par_iter().map(|&d| (d, reconstruct_date(d))).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<_> = dates.iter().map(|&d| (d, reconstruct_date(d))).collect();

        let mut days = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (date, outcome) in outcomes {
            match outcome {
                Ok(raster) => days.push(raster),
                Err(e) => {
                    log::warn!("Reconstruction of {} {} failed: {}", band, date, e);
                    failures.push(DateFailure {
                        date,
                        band,
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.log_coverage(band, &series_coverage(&converted, &self.region), &days);
        log::info!(
            "✅ {} reconstruction: {} days, {} failures in {:.2}s",
            band,
            days.len(),
            failures.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(BandReconstruction {
            band,
            long_term_mean,
            merged: converted,
            days,
            failures,
        })
    }

    fn log_coverage(&self, band: Band, before: &[f64], days: &[ReconstructedRaster]) {
        let after: Vec<f64> = days
            .iter()
            .filter_map(|d| CoverageStatistics::compute(&d.raster, &self.region).ok())
            .filter_map(|c| c.coverage_percent())
            .collect();

        log::info!(
            "📊 {} mean region coverage: {:.1}% observed, {:.1}% reconstructed",
            band,
            mean_percent(before),
            mean_percent(&after)
        );
    }
}

fn mean_percent(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn series_coverage(series: &TimeSeries, region: &RegionMask) -> Vec<f64> {
    series
        .iter()
        .filter_map(|o| CoverageStatistics::compute(&o.raster, region).ok())
        .filter_map(|c| c.coverage_percent())
        .collect()
}
