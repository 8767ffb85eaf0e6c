use crate::core::long_term_mean::ValidAccumulator;
use crate::core::smoothing::SpatialSmoother;
use crate::types::{LstError, LstResult, Observation, Provenance, Raster, TimeSeries};
use chrono::{Days, NaiveDate};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Which residual counts as "the original" when several share the target day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameDayPolicy {
    /// Only the first merged entry of the day (sensor precedence order)
    #[default]
    FirstEntry,
    /// Per cell, the first entry of the day that is valid there
    FirstValid,
}

/// Temporal window parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillParams {
    /// Days searched on each side of the target date
    pub half_window_days: u32,
    /// Minimum valid observations in the window for a cell to be estimated
    pub min_support: u32,
    pub same_day_policy: SameDayPolicy,
}

impl Default for GapFillParams {
    fn default() -> Self {
        Self {
            half_window_days: 16,
            min_support: 3,
            same_day_policy: SameDayPolicy::FirstEntry,
        }
    }
}

impl GapFillParams {
    pub fn validate(&self) -> LstResult<()> {
        if self.half_window_days == 0 {
            return Err(LstError::Config(
                "Temporal half window must be at least one day".to_string(),
            ));
        }
        if self.min_support == 0 {
            return Err(LstError::Config(
                "Minimum support must be at least one observation".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gap-filled residual for one target date
#[derive(Debug, Clone)]
pub struct FilledResidual {
    pub date: NaiveDate,
    pub raster: Raster,
    pub provenance: Array2<Provenance>,
}

/// Sliding-window residual reconstruction
pub struct TemporalGapFiller {
    params: GapFillParams,
    smoother: SpatialSmoother,
}

impl Default for TemporalGapFiller {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalGapFiller {
    /// Create a gap filler with the 16-day / 3-observation defaults
    pub fn new() -> Self {
        Self {
            params: GapFillParams::default(),
            smoother: SpatialSmoother::new(),
        }
    }

    /// Create a gap filler with custom parameters
    pub fn with_params(params: GapFillParams, smoother: SpatialSmoother) -> Self {
        Self { params, smoother }
    }

    pub fn params(&self) -> &GapFillParams {
        &self.params
    }

    /// Entries in `[date - half, date)` and `[date, date + half)`.
    ///
    /// The second half includes the target day itself, so a target-day entry takes part
    /// in the window mean as well as serving as the original.
    pub fn window<'a>(
        &self,
        series: &'a TimeSeries,
        date: NaiveDate,
    ) -> LstResult<(&'a [Observation], &'a [Observation])> {
        let half = Days::new(u64::from(self.params.half_window_days));
        let start = date
            .checked_sub_days(half)
            .ok_or_else(|| {
                LstError::Processing(format!("Window start before {} out of range", date))
            })?;
        let end = date
            .checked_add_days(half)
            .ok_or_else(|| {
                LstError::Processing(format!("Window end after {} out of range", date))
            })?;

        Ok((series.range(start, date), series.range(date, end)))
    }

    /// Window mean, kept only where at least `min_support` valid values exist
    pub fn temporal_estimate<'a, I>(&self, shape: (usize, usize), window: I) -> LstResult<Raster>
    where
        I: IntoIterator<Item = &'a Raster>,
    {
        let mut acc = ValidAccumulator::new(shape);
        for raster in window {
            acc.add(raster)?;
        }
        acc.mean(self.params.min_support)
    }

    /// Residual acting as the target day's original, per the same-day policy
    pub fn original(&self, residuals: &TimeSeries, date: NaiveDate) -> LstResult<Option<Raster>> {
        let same_day = residuals.on(date);
        match self.params.same_day_policy {
            SameDayPolicy::FirstEntry => Ok(same_day.first().map(|o| o.raster.clone())),
            SameDayPolicy::FirstValid => {
                let mut entries = same_day.iter();
                let Some(first) = entries.next() else {
                    return Ok(None);
                };
                entries
                    .try_fold(first.raster.clone(), |acc, next| acc.unmask_with(&next.raster))
                    .map(Some)
            }
        }
    }

    /// Fills the residual field of `date`.
    ///
    /// `smoothed` is the spatially smoothed residual series used for windowing, `residuals`
    /// the unsmoothed one from which the original is taken. Original values always win.
    pub fn fill(
        &self,
        smoothed: &TimeSeries,
        residuals: &TimeSeries,
        date: NaiveDate,
    ) -> LstResult<FilledResidual> {
        smoothed.grid().ensure_compatible(residuals.grid())?;
        let shape = smoothed.grid().shape();

        let (before, after) = self.window(smoothed, date)?;
        let window = before.iter().chain(after.iter()).map(|o| &o.raster);
        let temporally_filled = self.temporal_estimate(shape, window)?;
        let spatially_smoothed = self.smoother.smooth(&temporally_filled)?;

        let original = self.original(residuals, date)?;
        let original_mask = original
            .as_ref()
            .map(|r| r.mask().clone())
            .unwrap_or_else(|| Array2::from_elem(shape, false));
        let raster = match &original {
            Some(original) => original.unmask_with(&spatially_smoothed)?,
            None => spatially_smoothed,
        };

        let provenance = Zip::from(&original_mask)
            .and(raster.mask())
            .map_collect(|&observed, &valid| match (observed, valid) {
                (true, _) => Provenance::Observed,
                (false, true) => Provenance::Filled,
                (false, false) => Provenance::Missing,
            });

        log::debug!(
            "{} window {}+{} entries, {} observed / {} valid pixels",
            date,
            before.len(),
            after.len(),
            original_mask.iter().filter(|&&v| v).count(),
            raster.valid_count()
        );

        Ok(FilledResidual {
            date,
            raster,
            provenance,
        })
    }
}
