use crate::core::gap_fill::FilledResidual;
use crate::io::region::RegionMask;
use crate::types::{Band, LstReal, LstResult, Provenance, Raster, ReconstructedRaster};
use ndarray::{Array2, Zip};

/// Adds the long-term mean back to filled residuals and clips to the region
pub struct Reconstructor<'a> {
    band: Band,
    long_term_mean: &'a Raster,
    region: &'a RegionMask,
}

impl<'a> Reconstructor<'a> {
    pub fn new(band: Band, long_term_mean: &'a Raster, region: &'a RegionMask) -> LstResult<Self> {
        region.ensure_shape(long_term_mean.shape())?;
        Ok(Self {
            band,
            long_term_mean,
            region,
        })
    }

    /// Final LST for the filled residual's date.
    ///
    /// Observed cells take the converted original value verbatim when `observed` is
    /// given; filled cells are `residual + mean`. Outside the region nothing survives.
    pub fn reconstruct(
        &self,
        filled: &FilledResidual,
        observed: Option<&Raster>,
    ) -> LstResult<ReconstructedRaster> {
        let shape = self.long_term_mean.shape();
        self.long_term_mean.ensure_same_shape(&filled.raster)?;
        if let Some(observed) = observed {
            self.long_term_mean.ensure_same_shape(observed)?;
        }

        let mut values = Array2::<LstReal>::from_elem(shape, LstReal::NAN);
        let mut provenance = filled.provenance.clone();

        Zip::indexed(&mut values)
            .and(&mut provenance)
            .and(self.region.mask())
            .for_each(|(i, j), value, kind, &inside| {
                let estimate = match filled.raster.get(i, j) {
                    Some(residual) => self.long_term_mean.get(i, j).map(|mean| residual + mean),
                    None => None,
                };
                let result = match *kind {
                    Provenance::Observed => observed.and_then(|o| o.get(i, j)).or(estimate),
                    Provenance::Filled => estimate,
                    Provenance::Missing => None,
                };

                match result {
                    Some(v) if inside => *value = v,
                    _ => *kind = Provenance::Missing,
                }
            });

        let mask = provenance.mapv(|p| p != Provenance::Missing);
        Ok(ReconstructedRaster {
            date: filled.date,
            band: self.band,
            product: self.band.final_product_name(),
            raster: Raster::new(values, mask)?,
            provenance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use ndarray::array;

    fn filled(values: Array2<f64>, provenance: Array2<Provenance>) -> FilledResidual {
        let mask = provenance.mapv(|p| p != Provenance::Missing);
        FilledResidual {
            date: NaiveDate::from_ymd_opt(2020, 1, 7).unwrap(),
            raster: Raster::new(values, mask).unwrap(),
            provenance,
        }
    }

    #[test]
    fn test_adds_mean_and_prefers_observed_value() {
        let mean = Raster::from_values(array![[20.0, 20.0, 20.0]]);
        let region = RegionMask::full((1, 3));
        let reconstructor = Reconstructor::new(Band::Day, &mean, &region).unwrap();

        let residual = filled(
            array![[1.25, -2.0, 0.0]],
            array![[Provenance::Observed, Provenance::Filled, Provenance::Missing]],
        );
        let observed =
            Raster::new(array![[21.25, 0.0, 0.0]], array![[true, false, false]]).unwrap();

        let out = reconstructor.reconstruct(&residual, Some(&observed)).unwrap();
        assert_eq!(out.raster.get(0, 0), Some(21.25));
        assert_abs_diff_eq!(out.raster.get(0, 1).unwrap(), 18.0);
        assert_eq!(out.raster.get(0, 2), None);
        assert_eq!(out.product, "final_LST_Day_C");
        assert_eq!(out.count(Provenance::Filled), 1);
    }

    #[test]
    fn test_region_clips_everything_outside() {
        let mean = Raster::filled((1, 2), 10.0);
        let region = RegionMask::from_mask(array![[true, false]]);
        let reconstructor = Reconstructor::new(Band::Night, &mean, &region).unwrap();

        let residual = filled(
            array![[1.0, 1.0]],
            array![[Provenance::Observed, Provenance::Observed]],
        );
        let out = reconstructor.reconstruct(&residual, None).unwrap();

        assert_abs_diff_eq!(out.raster.get(0, 0).unwrap(), 11.0);
        assert_eq!(out.raster.get(0, 1), None);
        assert_eq!(out.provenance[[0, 1]], Provenance::Missing);
    }

    #[test]
    fn test_filled_cell_without_mean_is_missing() {
        let mean = Raster::new(array![[10.0, 0.0]], array![[true, false]]).unwrap();
        let region = RegionMask::full((1, 2));
        let reconstructor = Reconstructor::new(Band::Day, &mean, &region).unwrap();

        let residual = filled(array![[0.5, 0.5]], array![[Provenance::Filled, Provenance::Filled]]);
        let out = reconstructor.reconstruct(&residual, None).unwrap();
        assert_abs_diff_eq!(out.raster.get(0, 0).unwrap(), 10.5);
        assert_eq!(out.raster.get(0, 1), None);
    }
}
