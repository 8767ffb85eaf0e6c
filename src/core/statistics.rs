use crate::io::region::RegionMask;
use crate::types::{Grid, LstError, LstReal, LstResult, Raster};
use chrono::NaiveDate;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Descriptive statistics of the valid cells inside the region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterStatistics {
    pub count: usize,
    pub mean: Option<LstReal>,
    pub min: Option<LstReal>,
    pub max: Option<LstReal>,
    /// Population standard deviation
    pub std_dev: Option<LstReal>,
}

impl RasterStatistics {
    pub fn compute(raster: &Raster, region: &RegionMask) -> LstResult<Self> {
        region.ensure_shape(raster.shape())?;

        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = LstReal::INFINITY;
        let mut max = LstReal::NEG_INFINITY;
        Zip::from(raster.values())
            .and(raster.mask())
            .and(region.mask())
            .for_each(|&v, &valid, &inside| {
                if valid && inside {
                    count += 1;
                    sum += v;
                    min = min.min(v);
                    max = max.max(v);
                }
            });

        if count == 0 {
            return Ok(Self {
                count,
                mean: None,
                min: None,
                max: None,
                std_dev: None,
            });
        }

        let mean = sum / count as LstReal;
        let mut squared = 0.0;
        Zip::from(raster.values())
            .and(raster.mask())
            .and(region.mask())
            .for_each(|&v, &valid, &inside| {
                if valid && inside {
                    squared += (v - mean) * (v - mean);
                }
            });

        Ok(Self {
            count,
            mean: Some(mean),
            min: Some(min),
            max: Some(max),
            std_dev: Some((squared / count as LstReal).sqrt()),
        })
    }
}

/// Valid pixels against all pixels of the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStatistics {
    pub valid_pixels: usize,
    pub total_pixels_in_roi: usize,
}

impl CoverageStatistics {
    pub fn compute(raster: &Raster, region: &RegionMask) -> LstResult<Self> {
        region.ensure_shape(raster.shape())?;
        let valid_pixels = Zip::from(raster.mask())
            .and(region.mask())
            .fold(0usize, |acc, &valid, &inside| acc + usize::from(valid && inside));

        Ok(Self {
            valid_pixels,
            total_pixels_in_roi: region.inside_count(),
        })
    }

    /// Percentage of the region with a value; `None` for an empty region
    pub fn coverage_percent(&self) -> Option<f64> {
        if self.total_pixels_in_roi == 0 {
            None
        } else {
            Some(self.valid_pixels as f64 / self.total_pixels_in_roi as f64 * 100.0)
        }
    }
}

/// Value of one cell on one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    pub date: NaiveDate,
    pub value: Option<LstReal>,
}

/// Samples the cell under grid coordinate `(x, y)` from every dated raster
pub fn point_series<'a, I>(grid: &Grid, x: f64, y: f64, rasters: I) -> LstResult<Vec<PointSample>>
where
    I: IntoIterator<Item = (NaiveDate, &'a Raster)>,
{
    let (row, col) = grid
        .cell_at(x, y)
        .ok_or_else(|| {
            LstError::Processing(format!("Point ({}, {}) lies outside the grid {}", x, y, grid))
        })?;

    rasters
        .into_iter()
        .map(|(date, raster)| {
            grid.ensure_shape(raster.shape())?;
            Ok(PointSample {
                date,
                value: raster.get(row, col),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_statistics_inside_region() {
        let raster = Raster::new(
            array![[2.0, 4.0, 100.0], [4.0, 0.0, 5.0]],
            array![[true, true, true], [true, false, true]],
        )
        .unwrap();
        let region = RegionMask::from_mask(array![[true, true, false], [true, true, true]]);

        let stats = RasterStatistics::compute(&raster, &region).unwrap();
        assert_eq!(stats.count, 4);
        assert_abs_diff_eq!(stats.mean.unwrap(), 3.75);
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(5.0));
        // deviations -1.75, 0.25, 0.25, 1.25
        assert_abs_diff_eq!(stats.std_dev.unwrap(), (4.75f64 / 4.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_statistics_of_empty_raster() {
        let stats =
            RasterStatistics::compute(&Raster::masked((2, 2)), &RegionMask::full((2, 2))).unwrap();
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_none());
        assert!(stats.std_dev.is_none());
    }

    #[test]
    fn test_coverage() {
        let raster =
            Raster::new(array![[1.0, 1.0], [1.0, 1.0]], array![[true, false], [true, true]])
                .unwrap();
        let region = RegionMask::from_mask(array![[true, true], [false, true]]);

        let coverage = CoverageStatistics::compute(&raster, &region).unwrap();
        assert_eq!(coverage.valid_pixels, 2);
        assert_eq!(coverage.total_pixels_in_roi, 3);
        assert_abs_diff_eq!(coverage.coverage_percent().unwrap(), 200.0 / 3.0, epsilon = 1e-9);

        let empty = RegionMask::from_mask(array![[false, false], [false, false]]);
        assert!(CoverageStatistics::compute(&raster, &empty).unwrap().coverage_percent().is_none());
    }

    #[test]
    fn test_point_series() {
        let grid = Grid::pixel_grid(2, 2);
        let a = Raster::from_values(array![[1.0, 2.0], [3.0, 4.0]]);
        let b = Raster::new(array![[1.0, 2.0], [3.0, 4.0]], array![[true, true], [true, false]])
            .unwrap();
        let d1 = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();

        let samples = point_series(&grid, 1.5, 1.5, vec![(d1, &a), (d2, &b)]).unwrap();
        assert_eq!(samples[0], PointSample { date: d1, value: Some(4.0) });
        assert_eq!(samples[1], PointSample { date: d2, value: None });

        assert!(point_series(&grid, 5.0, 0.5, vec![(d1, &a)]).is_err());
    }
}
