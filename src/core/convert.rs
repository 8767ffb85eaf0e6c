use crate::types::{LstError, LstReal, LstResult, Raster, TimeSeries};
use serde::{Deserialize, Serialize};

/// Affine scaling from stored digital numbers to physical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParams {
    /// Multiplicative scale factor (MOD11A1/MYD11A1: 0.02 K per DN)
    pub scale: f64,
    /// Additive offset applied after scaling (Kelvin → Celsius)
    pub offset: f64,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            scale: 0.02,
            offset: -273.15,
        }
    }
}

impl ConversionParams {
    pub fn validate(&self) -> LstResult<()> {
        if !self.scale.is_finite() || !self.offset.is_finite() || self.scale == 0.0 {
            return Err(LstError::Config(format!(
                "Invalid unit conversion: scale={}, offset={}",
                self.scale, self.offset
            )));
        }
        Ok(())
    }
}

/// Converts scaled-Kelvin LST to degrees Celsius
pub struct UnitConverter {
    params: ConversionParams,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitConverter {
    /// Create a converter with the MODIS LST scaling
    pub fn new() -> Self {
        Self {
            params: ConversionParams::default(),
        }
    }

    /// Create a converter with custom scaling
    pub fn with_params(params: ConversionParams) -> Self {
        Self { params }
    }

    pub fn convert_value(&self, dn: LstReal) -> LstReal {
        dn * self.params.scale + self.params.offset
    }

    /// Converts valid cells; the mask is untouched
    pub fn convert(&self, raster: &Raster) -> Raster {
        raster.map_valid(|dn| self.convert_value(dn))
    }

    pub fn convert_series(&self, series: &TimeSeries) -> LstResult<TimeSeries> {
        log::debug!(
            "Converting {} {} observations (x * {} + {})",
            series.len(),
            series.band(),
            self.params.scale,
            self.params.offset
        );
        series.map_rasters(|raster| Ok(self.convert(raster)))
    }
}
