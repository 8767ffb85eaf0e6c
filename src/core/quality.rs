use crate::types::{LstError, LstResult, Raster, ValidityMask};
use ndarray::{Array2, Zip};
use num_traits::{NumCast, PrimInt};

/// Bits 0-1 of the MODIS LST QC word: `11` = pixel not produced (cloud or other reasons)
pub const MANDATORY_QA_BITS: u8 = 0b11;

/// Quality-control filter for daily LST products
pub struct QualityFilter;

impl QualityFilter {
    /// True when the mandatory QA bits are not both set; higher bits are ignored
    pub fn is_acceptable<Q: PrimInt>(code: Q) -> bool {
        let bits = <Q as NumCast>::from(MANDATORY_QA_BITS).unwrap_or_else(Q::zero);
        code & bits != bits
    }

    /// Per-cell acceptance mask for a quality-code array
    pub fn quality_mask<Q: PrimInt>(quality: &Array2<Q>) -> ValidityMask {
        quality.map(|&code| Self::is_acceptable(code))
    }

    /// Narrows the value raster's mask to cells with an acceptable quality code
    pub fn apply<Q: PrimInt>(values: &Raster, quality: &Array2<Q>) -> LstResult<Raster> {
        if values.shape() != quality.dim() {
            return Err(LstError::ShapeMismatch {
                expected: values.shape(),
                found: quality.dim(),
            });
        }

        let mask = Zip::from(values.mask())
            .and(quality)
            .map_collect(|&valid, &code| valid && Self::is_acceptable(code));

        let filtered = values.update_mask(&mask)?;
        log::debug!(
            "Quality filter kept {}/{} pixels",
            filtered.valid_count(),
            values.valid_count()
        );
        Ok(filtered)
    }
}
