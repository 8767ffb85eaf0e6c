use chrono::NaiveDate;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Real-valued LST data (Kelvin-scaled DN before conversion, °C after)
pub type LstReal = f64;

/// 2D LST value array (rows x cols)
pub type LstImage = Array2<LstReal>;

/// Per-cell validity flags (true = value defined)
pub type ValidityMask = Array2<bool>;

/// Geospatial transformation parameters (north-up, no rotation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub top_left_y: f64,
    pub pixel_height: f64,
}

/// Shared raster frame. Every raster of a run lives on one Grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    pub geo_transform: GeoTransform,
    /// Opaque coordinate reference label, compared but never interpreted
    pub crs: String,
}

impl Grid {
    pub fn new(
        rows: usize,
        cols: usize,
        geo_transform: GeoTransform,
        crs: impl Into<String>,
    ) -> Self {
        Self {
            rows,
            cols,
            geo_transform,
            crs: crs.into(),
        }
    }

    /// Unit-cell grid in pixel coordinates, origin at the top-left corner
    pub fn pixel_grid(rows: usize, cols: usize) -> Self {
        Self::new(
            rows,
            cols,
            GeoTransform {
                top_left_x: 0.0,
                pixel_width: 1.0,
                top_left_y: 0.0,
                pixel_height: 1.0,
            },
            "pixel",
        )
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Centre of a cell in grid coordinates
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        (
            gt.top_left_x + (col as f64 + 0.5) * gt.pixel_width,
            gt.top_left_y + (row as f64 + 0.5) * gt.pixel_height,
        )
    }

    /// Cell containing a grid coordinate, if it falls on the grid
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let gt = &self.geo_transform;
        let col = ((x - gt.top_left_x) / gt.pixel_width).floor();
        let row = ((y - gt.top_left_y) / gt.pixel_height).floor();

        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row < self.rows && col < self.cols {
            Some((row, col))
        } else {
            None
        }
    }

    /// Fails unless `other` describes exactly the same frame
    pub fn ensure_compatible(&self, other: &Grid) -> LstResult<()> {
        if self == other {
            Ok(())
        } else {
            Err(LstError::GridMismatch {
                expected: self.to_string(),
                found: other.to_string(),
            })
        }
    }

    pub fn ensure_shape(&self, shape: (usize, usize)) -> LstResult<()> {
        if self.shape() == shape {
            Ok(())
        } else {
            Err(LstError::ShapeMismatch {
                expected: self.shape(),
                found: shape,
            })
        }
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gt = &self.geo_transform;
        write!(
            f,
            "{}x{} @ ({}, {}) cell {}x{} [{}]",
            self.rows,
            self.cols,
            gt.top_left_x,
            gt.top_left_y,
            gt.pixel_width,
            gt.pixel_height,
            self.crs
        )
    }
}

/// Values plus validity mask. Masked cells always hold NaN; valid cells are finite.
#[derive(Debug, Clone)]
pub struct Raster {
    values: LstImage,
    mask: ValidityMask,
}

impl Raster {
    pub fn new(mut values: LstImage, mut mask: ValidityMask) -> LstResult<Self> {
        if values.dim() != mask.dim() {
            return Err(LstError::ShapeMismatch {
                expected: values.dim(),
                found: mask.dim(),
            });
        }
        Zip::from(&mut values).and(&mut mask).for_each(|v, valid| {
            // a non-finite value is never valid
            *valid = *valid && v.is_finite();
            if !*valid {
                *v = LstReal::NAN;
            }
        });
        Ok(Self { values, mask })
    }

    /// Raster whose mask is derived from finiteness of the values
    pub fn from_values(values: LstImage) -> Self {
        let mask = values.mapv(|v| v.is_finite());
        let values = values.mapv(|v| if v.is_finite() { v } else { LstReal::NAN });
        Self { values, mask }
    }

    /// Fully masked raster
    pub fn masked(shape: (usize, usize)) -> Self {
        Self {
            values: Array2::from_elem(shape, LstReal::NAN),
            mask: Array2::from_elem(shape, false),
        }
    }

    /// Fully valid constant raster
    pub fn filled(shape: (usize, usize), value: LstReal) -> Self {
        Self {
            values: Array2::from_elem(shape, value),
            mask: Array2::from_elem(shape, true),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn values(&self) -> &LstImage {
        &self.values
    }

    pub fn mask(&self) -> &ValidityMask {
        &self.mask
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.mask.get((row, col)).copied().unwrap_or(false)
    }

    /// Value at a cell, `None` if masked or out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<LstReal> {
        if self.is_valid(row, col) {
            Some(self.values[[row, col]])
        } else {
            None
        }
    }

    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&v| v).count()
    }

    pub fn ensure_same_shape(&self, other: &Raster) -> LstResult<()> {
        if self.shape() == other.shape() {
            Ok(())
        } else {
            Err(LstError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            })
        }
    }

    /// Narrows the mask: a cell stays valid only if `mask` is also true there
    pub fn update_mask(&self, mask: &ValidityMask) -> LstResult<Raster> {
        if self.shape() != mask.dim() {
            return Err(LstError::ShapeMismatch {
                expected: self.shape(),
                found: mask.dim(),
            });
        }
        let combined = Zip::from(&self.mask).and(mask).map_collect(|&a, &b| a && b);
        Raster::new(self.values.clone(), combined)
    }

    /// Applies `f` to valid cells only. A non-finite result masks the cell.
    pub fn map_valid<F>(&self, f: F) -> Raster
    where
        F: Fn(LstReal) -> LstReal,
    {
        let values = Zip::from(&self.values)
            .and(&self.mask)
            .map_collect(|&v, &valid| if valid { f(v) } else { LstReal::NAN });
        let mask = values.mapv(|v| v.is_finite());
        Raster { values, mask }
    }

    /// Cellwise binary operation, valid where both inputs are valid
    pub fn zip_valid<F>(&self, other: &Raster, f: F) -> LstResult<Raster>
    where
        F: Fn(LstReal, LstReal) -> LstReal,
    {
        self.ensure_same_shape(other)?;
        let mask = Zip::from(&self.mask).and(&other.mask).map_collect(|&a, &b| a && b);
        let values = Zip::from(&self.values)
            .and(&other.values)
            .and(&mask)
            .map_collect(|&a, &b, &valid| if valid { f(a, b) } else { LstReal::NAN });
        Raster::new(values, mask)
    }

    /// Keeps own values where valid, takes `fallback` where not
    pub fn unmask_with(&self, fallback: &Raster) -> LstResult<Raster> {
        self.ensure_same_shape(fallback)?;
        let mut values = self.values.clone();
        let mut mask = self.mask.clone();
        Zip::from(&mut values)
            .and(&mut mask)
            .and(&fallback.values)
            .and(&fallback.mask)
            .for_each(|v, valid, &fv, &fvalid| {
                if !*valid && fvalid {
                    *v = fv;
                    *valid = true;
                }
            });
        Ok(Raster { values, mask })
    }
}

/// LST band of the daily MODIS products
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Band {
    Day,
    Night,
}

impl Band {
    pub const ALL: [Band; 2] = [Band::Day, Band::Night];

    /// Name of the value band in the source product
    pub fn source_name(&self) -> &'static str {
        match self {
            Band::Day => "LST_Day_1km",
            Band::Night => "LST_Night_1km",
        }
    }

    /// Name of the quality band paired with the value band
    pub fn quality_name(&self) -> &'static str {
        match self {
            Band::Day => "QC_Day",
            Band::Night => "QC_Night",
        }
    }

    /// Product name of the reconstructed output
    pub fn final_product_name(&self) -> String {
        format!("final_LST_{}_C", self)
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Day => write!(f, "Day"),
            Band::Night => write!(f, "Night"),
        }
    }
}

/// Satellite platform carrying the MODIS instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    Terra, // MOD11A1
    Aqua,  // MYD11A1
}

impl Sensor {
    pub fn product_id(&self) -> &'static str {
        match self {
            Sensor::Terra => "MOD11A1",
            Sensor::Aqua => "MYD11A1",
        }
    }
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Terra => write!(f, "Terra"),
            Sensor::Aqua => write!(f, "Aqua"),
        }
    }
}

/// A raster tagged with its acquisition day, band and sensor
#[derive(Debug, Clone)]
pub struct Observation {
    pub date: NaiveDate,
    pub band: Band,
    pub sensor: Sensor,
    pub raster: Raster,
}

impl Observation {
    pub fn new(date: NaiveDate, band: Band, sensor: Sensor, raster: Raster) -> Self {
        Self {
            date,
            band,
            sensor,
            raster,
        }
    }

    /// Same tags, different raster
    pub fn with_raster(&self, raster: Raster) -> Self {
        Self {
            date: self.date,
            band: self.band,
            sensor: self.sensor,
            raster,
        }
    }
}

/// Date-ordered observations of one band on one grid.
///
/// Entries sharing a date are all kept, in insertion order.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    band: Band,
    grid: Grid,
    entries: Vec<Observation>,
}

impl TimeSeries {
    pub fn new(band: Band, grid: Grid, mut entries: Vec<Observation>) -> LstResult<Self> {
        for entry in &entries {
            if entry.band != band {
                return Err(LstError::BandMismatch {
                    expected: band,
                    found: entry.band,
                });
            }
            grid.ensure_shape(entry.raster.shape())?;
        }
        // stable: same-day entries keep their relative order
        entries.sort_by_key(|o| o.date);
        Ok(Self { band, grid, entries })
    }

    pub fn empty(band: Band, grid: Grid) -> Self {
        Self {
            band,
            grid,
            entries: Vec::new(),
        }
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn entries(&self) -> &[Observation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.entries.iter()
    }

    /// Entries with `from <= date < to`
    pub fn range(&self, from: NaiveDate, to: NaiveDate) -> &[Observation] {
        let lo = self.entries.partition_point(|o| o.date < from);
        let hi = self.entries.partition_point(|o| o.date < to).max(lo);
        &self.entries[lo..hi]
    }

    /// Entries acquired exactly on `date`
    pub fn on(&self, date: NaiveDate) -> &[Observation] {
        match date.succ_opt() {
            Some(next) => self.range(date, next),
            None => {
                let lo = self.entries.partition_point(|o| o.date < date);
                &self.entries[lo..]
            }
        }
    }

    /// Builds a new series by transforming every raster, preserving tags and order
    pub fn map_rasters<F>(&self, f: F) -> LstResult<TimeSeries>
    where
        F: Fn(&Raster) -> LstResult<Raster> + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        let entries = {
            use rayon::prelude::*;
            self.entries
                .par_iter()
                .map(|o| f(&o.raster).map(|r| o.with_raster(r)))
                .collect::<LstResult<Vec<_>>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let entries = self
            .entries
            .iter()
            .map(|o| f(&o.raster).map(|r| o.with_raster(r)))
            .collect::<LstResult<Vec<_>>>()?;

        for entry in &entries {
            self.grid.ensure_shape(entry.raster.shape())?;
        }
        Ok(Self {
            band: self.band,
            grid: self.grid.clone(),
            entries,
        })
    }
}

/// Where a reconstructed cell's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Direct observation on the target day
    Observed,
    /// Estimated from the temporal window
    Filled,
    /// No value (no support, no mean, or outside the region)
    Missing,
}

/// Final gap-filled LST raster for one calendar day
#[derive(Debug, Clone)]
pub struct ReconstructedRaster {
    pub date: NaiveDate,
    pub band: Band,
    /// Output product name, e.g. `final_LST_Day_C`
    pub product: String,
    pub raster: Raster,
    pub provenance: Array2<Provenance>,
}

impl ReconstructedRaster {
    pub fn count(&self, kind: Provenance) -> usize {
        self.provenance.iter().filter(|&&p| p == kind).count()
    }
}

/// Error types for LST reconstruction
#[derive(Debug, thiserror::Error)]
pub enum LstError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Grid mismatch: expected {expected}, found {found}")]
    GridMismatch { expected: String, found: String },

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Band mismatch: expected {expected}, found {found}")]
    BandMismatch { expected: Band, found: Band },

    #[error("Archive error on {date}: {reason}")]
    Archive { date: NaiveDate, reason: String },

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for LST operations
pub type LstResult<T> = Result<T, LstError>;
