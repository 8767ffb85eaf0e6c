use crate::types::{LstError, LstReal, LstResult, Raster};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Box-mean smoothing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Window half-size in pixels; the window is (2 * radius + 1) square
    pub radius: usize,
    /// Number of times the box mean is applied in sequence
    pub passes: usize,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            radius: 3, // 7x7 window
            passes: 2, // box mean composed with itself
        }
    }
}

impl SmoothingParams {
    pub fn window_size(&self) -> usize {
        2 * self.radius + 1
    }

    pub fn validate(&self) -> LstResult<()> {
        if self.passes == 0 {
            return Err(LstError::Config("Smoothing needs at least one pass".to_string()));
        }
        Ok(())
    }
}

/// Mask-aware repeated box-mean filter
#[derive(Debug, Clone)]
pub struct SpatialSmoother {
    params: SmoothingParams,
}

impl Default for SpatialSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialSmoother {
    /// Create a smoother with the default double 7x7 pass
    pub fn new() -> Self {
        Self {
            params: SmoothingParams::default(),
        }
    }

    /// Create a smoother with custom parameters
    pub fn with_params(params: SmoothingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SmoothingParams {
        &self.params
    }

    /// Applies the box mean `passes` times
    pub fn smooth(&self, raster: &Raster) -> LstResult<Raster> {
        let mut current = self.box_mean(raster)?;
        for _ in 1..self.params.passes {
            current = self.box_mean(&current)?;
        }
        Ok(current)
    }

    /// One pass of the box mean.
    ///
    /// Only in-bounds, valid neighbours (centre included) enter the sum and the count.
    /// A cell with no valid neighbour stays masked. Output goes to fresh buffers.
    pub fn box_mean(&self, raster: &Raster) -> LstResult<Raster> {
        let (height, width) = raster.shape();
        let mut values = Array2::<LstReal>::from_elem((height, width), LstReal::NAN);
        let mut mask = Array2::<bool>::from_elem((height, width), false);

        if height == 0 || width == 0 {
            return Raster::new(values, mask);
        }

        let input_values = raster.values();
        let input_mask = raster.mask();
        let half_window = self.params.radius;

        let window_mean = |i: usize, j: usize| -> Option<LstReal> {
            let i_start = i.saturating_sub(half_window);
            let i_end = (i + half_window + 1).min(height);
            let j_start = j.saturating_sub(half_window);
            let j_end = (j + half_window + 1).min(width);

            let mut sum = 0.0;
            let mut count = 0usize;
            for wi in i_start..i_end {
                for wj in j_start..j_end {
                    if input_mask[[wi, wj]] {
                        sum += input_values[[wi, wj]];
                        count += 1;
                    }
                }
            }

            if count > 0 {
                Some(sum / count as LstReal)
            } else {
                None
            }
        };

        let write = |(i, j): (usize, usize), value: &mut LstReal, valid: &mut bool| {
            if let Some(mean) = window_mean(i, j) {
                *value = mean;
                *valid = true;
            }
        };

        #[cfg(feature = "parallel")]
        Zip::indexed(&mut values).and(&mut mask).par_for_each(write);
        #[cfg(not(feature = "parallel"))]
        Zip::indexed(&mut values).and(&mut mask).for_each(write);

        Raster::new(values, mask)
    }
}
