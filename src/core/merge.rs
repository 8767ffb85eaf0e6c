use crate::types::{LstError, LstResult, TimeSeries};

/// Combines per-sensor series of one band into a single date-ordered series
pub struct TemporalMerger;

impl TemporalMerger {
    /// Union of both series ordered by date.
    ///
    /// Same-day entries are not deduplicated: a day observed by both sensors yields two
    /// entries, `first`'s before `second`'s, and both count in every later statistic.
    pub fn merge(first: &TimeSeries, second: &TimeSeries) -> LstResult<TimeSeries> {
        if first.band() != second.band() {
            return Err(LstError::BandMismatch {
                expected: first.band(),
                found: second.band(),
            });
        }
        first.grid().ensure_compatible(second.grid())?;

        let entries = first
            .iter()
            .chain(second.iter())
            .cloned()
            .collect::<Vec<_>>();

        let merged = TimeSeries::new(first.band(), first.grid().clone(), entries)?;
        log::info!(
            "🔗 Merged {} + {} {} observations into {}",
            first.len(),
            second.len(),
            first.band(),
            merged.len()
        );
        Ok(merged)
    }

    /// Merges any number of series, in the given precedence order
    pub fn merge_all(series: &[TimeSeries]) -> LstResult<TimeSeries> {
        let (head, tail) = series
            .split_first()
            .ok_or_else(|| LstError::Processing("Nothing to merge".to_string()))?;

        tail.iter().try_fold(head.clone(), |acc, next| Self::merge(&acc, next))
    }
}
