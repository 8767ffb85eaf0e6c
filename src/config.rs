//! Run configuration

use crate::core::convert::ConversionParams;
use crate::core::gap_fill::GapFillParams;
use crate::core::smoothing::SmoothingParams;
use crate::types::{LstError, LstResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Days processed by a run, `start` inclusive, `end` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for ProcessingPeriod {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2020, 2, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl ProcessingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> LstResult<Self> {
        let period = Self { start, end };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> LstResult<()> {
        if self.end <= self.start {
            return Err(LstError::Config(format!(
                "Processing period end {} must be after start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Every calendar day of the period, ascending
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take_while(|d| *d < self.end).collect()
    }

    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days().max(0) as usize
    }
}

/// Complete configuration of a reconstruction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstFillConfig {
    pub period: ProcessingPeriod,
    pub gap_fill: GapFillParams,
    pub smoothing: SmoothingParams,
    pub conversion: ConversionParams,
}

impl LstFillConfig {
    pub fn from_json_str(json: &str) -> LstResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LstResult<Self> {
        log::info!("Reading configuration from: {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> LstResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> LstResult<()> {
        self.period.validate()?;
        self.gap_fill.validate()?;
        self.smoothing.validate()?;
        self.conversion.validate()?;
        Ok(())
    }
}
