use crate::types::{Grid, LstError, LstReal, LstResult, Raster, TimeSeries};
use ndarray::{Array2, Zip};

/// Per-pixel sum and count of valid values over a set of rasters
pub(crate) struct ValidAccumulator {
    sum: Array2<LstReal>,
    count: Array2<u32>,
}

impl ValidAccumulator {
    pub(crate) fn new(shape: (usize, usize)) -> Self {
        Self {
            sum: Array2::zeros(shape),
            count: Array2::zeros(shape),
        }
    }

    pub(crate) fn add(&mut self, raster: &Raster) -> LstResult<()> {
        if raster.shape() != self.sum.dim() {
            return Err(LstError::ShapeMismatch {
                expected: self.sum.dim(),
                found: raster.shape(),
            });
        }
        Zip::from(&mut self.sum)
            .and(&mut self.count)
            .and(raster.values())
            .and(raster.mask())
            .for_each(|sum, count, &v, &valid| {
                if valid {
                    *sum += v;
                    *count += 1;
                }
            });
        Ok(())
    }

    /// Mean where at least `min_count` values were seen, masked elsewhere
    pub(crate) fn mean(&self, min_count: u32) -> LstResult<Raster> {
        let min_count = min_count.max(1);
        let mask = self.count.mapv(|n| n >= min_count);
        let values = Zip::from(&self.sum).and(&self.count).map_collect(|&sum, &n| {
            if n >= min_count {
                sum / n as LstReal
            } else {
                LstReal::NAN
            }
        });
        Raster::new(values, mask)
    }
}

/// Long-term (whole-period) per-pixel mean
pub struct LongTermMeanEngine;

impl LongTermMeanEngine {
    /// Mean of the valid values at each cell over every entry of the series.
    ///
    /// Cells never observed are masked. An empty series gives a fully masked raster.
    pub fn compute(series: &TimeSeries) -> LstResult<Raster> {
        let grid: &Grid = series.grid();
        let mut acc = ValidAccumulator::new(grid.shape());
        for observation in series.iter() {
            acc.add(&observation.raster)?;
        }

        let mean = acc.mean(1)?;
        log::info!(
            "📊 {} long-term mean from {} observations covers {}/{} pixels",
            series.band(),
            series.len(),
            mean.valid_count(),
            grid.cell_count()
        );
        Ok(mean)
    }
}
