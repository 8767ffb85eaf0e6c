use crate::core::quality::QualityFilter;
use crate::types::{Band, Grid, LstError, LstReal, LstResult, Observation, Raster, Sensor};
use chrono::NaiveDate;
use ndarray::Array2;
use std::collections::BTreeMap;

/// Stored `_FillValue` of the MOD11A1/MYD11A1 LST bands
pub const LST_FILL_VALUE: u16 = 0;

/// One day of one band as delivered by a sensor archive
#[derive(Debug, Clone)]
pub struct RawObservation {
    /// Digital numbers with the product's own no-data mask
    pub values: Raster,
    /// Per-pixel QC codes
    pub quality: Array2<u8>,
}

impl RawObservation {
    pub fn new(values: Raster, quality: Array2<u8>) -> LstResult<Self> {
        if values.shape() != quality.dim() {
            return Err(LstError::ShapeMismatch {
                expected: values.shape(),
                found: quality.dim(),
            });
        }
        Ok(Self { values, quality })
    }

    /// From stored integers; `LST_FILL_VALUE` cells are no-data
    pub fn from_digital_numbers(dn: &Array2<u16>, quality: Array2<u8>) -> LstResult<Self> {
        let mask = dn.mapv(|v| v != LST_FILL_VALUE);
        let values = dn.mapv(LstReal::from);
        Self::new(Raster::new(values, mask)?, quality)
    }

    /// Quality-filtered observation
    pub fn filter(&self, date: NaiveDate, band: Band, sensor: Sensor) -> LstResult<Observation> {
        let raster = QualityFilter::apply(&self.values, &self.quality)?;
        Ok(Observation::new(date, band, sensor, raster))
    }
}

/// Source of raw daily rasters for one sensor
pub trait ObservationArchive: Send + Sync {
    fn sensor(&self) -> Sensor;

    /// Frame shared by every raster the archive yields
    fn grid(&self) -> &Grid;

    /// Days with a record for `band`, ascending
    fn dates(&self, band: Band) -> Vec<NaiveDate>;

    /// `Ok(None)` when nothing was acquired that day
    fn read(&self, date: NaiveDate, band: Band) -> LstResult<Option<RawObservation>>;
}

#[derive(Debug, Clone)]
enum Record {
    Present(RawObservation),
    Unreadable(String),
}

/// Archive held in memory, mostly for tests and bindings
#[derive(Debug, Clone)]
pub struct InMemoryArchive {
    sensor: Sensor,
    grid: Grid,
    records: BTreeMap<(Band, NaiveDate), Record>,
}

impl InMemoryArchive {
    pub fn new(sensor: Sensor, grid: Grid) -> Self {
        Self {
            sensor,
            grid,
            records: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, date: NaiveDate, band: Band, raw: RawObservation) -> LstResult<()> {
        self.grid.ensure_shape(raw.values.shape())?;
        self.records.insert((band, date), Record::Present(raw));
        Ok(())
    }

    /// Registers a day whose read will fail with `reason`
    pub fn insert_unreadable(&mut self, date: NaiveDate, band: Band, reason: impl Into<String>) {
        self.records.insert((band, date), Record::Unreadable(reason.into()));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ObservationArchive for InMemoryArchive {
    fn sensor(&self) -> Sensor {
        self.sensor
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn dates(&self, band: Band) -> Vec<NaiveDate> {
        self.records
            .keys()
            .filter(|(b, _)| *b == band)
            .map(|&(_, date)| date)
            .collect()
    }

    fn read(&self, date: NaiveDate, band: Band) -> LstResult<Option<RawObservation>> {
        match self.records.get(&(band, date)) {
            Some(Record::Present(raw)) => Ok(Some(raw.clone())),
            Some(Record::Unreadable(reason)) => Err(LstError::Archive {
                date,
                reason: reason.clone(),
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn test_fill_value_and_quality_both_mask() {
        let raw =
            RawObservation::from_digital_numbers(&array![[0u16, 15000, 14000]], array![[0u8, 0, 3]])
                .unwrap();
        let obs = raw.filter(date(1), Band::Day, Sensor::Terra).unwrap();

        assert_eq!(obs.raster.get(0, 0), None);
        assert_eq!(obs.raster.get(0, 1), Some(15000.0));
        assert_eq!(obs.raster.get(0, 2), None);
    }

    #[test]
    fn test_nan_under_valid_mask_never_reaches_observation() {
        let values = Raster::new(array![[LstReal::NAN, 14000.0]], array![[true, true]]).unwrap();
        let raw = RawObservation::new(values, array![[0u8, 0]]).unwrap();
        let obs = raw.filter(date(1), Band::Night, Sensor::Aqua).unwrap();

        assert_eq!(obs.raster.get(0, 0), None);
        assert_eq!(obs.raster.valid_count(), 1);
    }

    #[test]
    fn test_in_memory_archive_reads() {
        let mut archive = InMemoryArchive::new(Sensor::Aqua, Grid::pixel_grid(1, 1));
        let raw = RawObservation::from_digital_numbers(&array![[14500u16]], array![[0u8]]).unwrap();
        archive.insert(date(2), Band::Night, raw).unwrap();
        archive.insert_unreadable(date(3), Band::Night, "truncated tile");

        assert_eq!(archive.dates(Band::Night), vec![date(2), date(3)]);
        assert!(archive.dates(Band::Day).is_empty());
        assert!(archive.read(date(2), Band::Night).unwrap().is_some());
        assert!(archive.read(date(2), Band::Day).unwrap().is_none());
        assert!(matches!(
            archive.read(date(3), Band::Night),
            Err(LstError::Archive { .. })
        ));
    }

    #[test]
    fn test_dates_are_ascending_per_band() {
        let mut archive = InMemoryArchive::new(Sensor::Terra, Grid::pixel_grid(1, 1));
        let raw = || {
            RawObservation::from_digital_numbers(&array![[14500u16]], array![[0u8]]).unwrap()
        };
        for (d, band) in [(9, Band::Night), (4, Band::Day), (2, Band::Night), (7, Band::Day)] {
            archive.insert(date(d), band, raw()).unwrap();
        }

        assert_eq!(archive.len(), 4);
        assert_eq!(archive.dates(Band::Day), vec![date(4), date(7)]);
        assert_eq!(archive.dates(Band::Night), vec![date(2), date(9)]);
    }

    #[test]
    fn test_insert_rejects_wrong_shape() {
        let mut archive = InMemoryArchive::new(Sensor::Terra, Grid::pixel_grid(2, 2));
        let raw = RawObservation::from_digital_numbers(&array![[1u16]], array![[0u8]]).unwrap();
        assert!(archive.insert(date(1), Band::Day, raw).is_err());
    }
}
