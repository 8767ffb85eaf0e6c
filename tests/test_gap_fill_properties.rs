use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use lstfill::core::{
    CoverageStatistics, GapFillParams, LongTermMeanEngine, QualityFilter, RasterStatistics,
    ResidualEngine, SmoothingParams, SpatialSmoother, TemporalGapFiller, TemporalMerger,
    UnitConverter,
};
use lstfill::{Band, Grid, Observation, Provenance, Raster, RegionMask, Sensor, TimeSeries};
use ndarray::{array, Array2};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
}

fn series(sensor: Sensor, entries: Vec<(u32, Raster)>) -> TimeSeries {
    let (rows, cols) = entries.first().map(|(_, r)| r.shape()).unwrap_or((2, 2));
    let observations = entries
        .into_iter()
        .map(|(d, raster)| Observation::new(date(d), Band::Day, sensor, raster))
        .collect();
    TimeSeries::new(Band::Day, Grid::pixel_grid(rows, cols), observations).unwrap()
}

#[test]
fn test_quality_mask_for_all_low_bit_patterns() {
    let codes: Array2<u8> = array![[0b00, 0b01, 0b10, 0b11], [0b100, 0b101, 0b110, 0b111]];
    let mask = QualityFilter::quality_mask(&codes);
    assert_eq!(mask, array![[true, true, true, false], [true, true, true, false]]);
}

#[test]
fn test_conversion_then_decomposition() {
    let converter = UnitConverter::new();
    let terra = series(
        Sensor::Terra,
        vec![
            (1, Raster::from_values(array![[14000.0, 14500.0]])),
            (2, Raster::new(array![[14100.0, 0.0]], array![[true, false]]).unwrap()),
        ],
    );
    let aqua = series(Sensor::Aqua, vec![(1, Raster::from_values(array![[14200.0, 14700.0]]))]);

    let merged = TemporalMerger::merge(&terra, &aqua).unwrap();
    let converted = converter.convert_series(&merged).unwrap();
    let mean = LongTermMeanEngine::compute(&converted).unwrap();
    let residuals = ResidualEngine::compute(&converted, &mean).unwrap();

    assert_abs_diff_eq!(mean.get(0, 0).unwrap(), converter.convert_value(14100.0), epsilon = 1e-9);
    assert_abs_diff_eq!(mean.get(0, 1).unwrap(), converter.convert_value(14600.0), epsilon = 1e-9);
    for (obs, res) in converted.iter().zip(residuals.iter()) {
        assert_eq!(obs.raster.mask(), res.raster.mask());
        for ((r, c), v) in obs.raster.values().indexed_iter() {
            if let Some(residual) = res.raster.get(r, c) {
                assert_abs_diff_eq!(residual + mean.get(r, c).unwrap(), *v, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_gate_boundary_through_fill() {
    let identity = SpatialSmoother::with_params(SmoothingParams { radius: 0, passes: 1 });
    let filler = TemporalGapFiller::with_params(GapFillParams::default(), identity);

    // col 0 has three supports, col 1 only two
    let residuals = series(
        Sensor::Terra,
        vec![
            (1, Raster::from_values(array![[1.0, 1.0]])),
            (2, Raster::from_values(array![[2.0, 2.0]])),
            (3, Raster::new(array![[6.0, 0.0]], array![[true, false]]).unwrap()),
        ],
    );

    let filled = filler.fill(&residuals, &residuals, date(10)).unwrap();
    assert_abs_diff_eq!(filled.raster.get(0, 0).unwrap(), 3.0);
    assert_eq!(filled.raster.get(0, 1), None);
    assert_eq!(filled.provenance[[0, 0]], Provenance::Filled);
    assert_eq!(filled.provenance[[0, 1]], Provenance::Missing);
}

#[test]
fn test_window_includes_sixteen_days_before_and_excludes_sixteen_days_after() {
    let identity = SpatialSmoother::with_params(SmoothingParams { radius: 0, passes: 1 });
    let filler = TemporalGapFiller::with_params(GapFillParams::default(), identity);

    // target Mar 2: Mar 1 is t-1, Mar 17 is t+15, Mar 18 is t+16
    let residuals = series(
        Sensor::Terra,
        vec![
            (1, Raster::filled((1, 1), 1.0)),
            (2, Raster::masked((1, 1))),
            (17, Raster::filled((1, 1), 1.0)),
            (18, Raster::filled((1, 1), 1.0)),
        ],
    );
    let (before, after) = filler.window(&residuals, date(2)).unwrap();
    let before: Vec<_> = before.iter().map(|o| o.date).collect();
    let after: Vec<_> = after.iter().map(|o| o.date).collect();
    assert_eq!(before, vec![date(1)]);
    assert_eq!(after, vec![date(2), date(17)]);

    // target Mar 17: Mar 1 is exactly t-16 and still inside
    let (before, after) = filler.window(&residuals, date(17)).unwrap();
    let before: Vec<_> = before.iter().map(|o| o.date).collect();
    assert_eq!(before, vec![date(1), date(2)]);
    assert_eq!(after.len(), 2);

    // target Mar 18: Mar 1 is t-17 and drops out
    let (before, _) = filler.window(&residuals, date(18)).unwrap();
    assert!(before.iter().all(|o| o.date != date(1)));
}

#[test]
fn test_smoothing_spreads_into_gaps_but_not_beyond_radius() {
    let mut mask = Array2::from_elem((1, 12), false);
    mask[[0, 0]] = true;
    let raster = Raster::new(Array2::from_elem((1, 12), 4.0), mask).unwrap();

    let once = SpatialSmoother::with_params(SmoothingParams { radius: 3, passes: 1 })
        .smooth(&raster)
        .unwrap();
    assert_eq!(once.valid_count(), 4);

    let twice = SpatialSmoother::new().smooth(&raster).unwrap();
    assert_eq!(twice.valid_count(), 7);
    assert_abs_diff_eq!(twice.get(0, 6).unwrap(), 4.0);
}

#[test]
fn test_statistics_on_region() {
    let raster =
        Raster::new(array![[10.0, 20.0], [30.0, 0.0]], array![[true, true], [true, false]])
            .unwrap();
    let region = RegionMask::from_mask(array![[true, false], [true, true]]);

    let stats = RasterStatistics::compute(&raster, &region).unwrap();
    assert_eq!(stats.count, 2);
    assert_abs_diff_eq!(stats.mean.unwrap(), 20.0);
    assert_abs_diff_eq!(stats.std_dev.unwrap(), 10.0);

    let coverage = CoverageStatistics::compute(&raster, &region).unwrap();
    assert_eq!(coverage.valid_pixels, 2);
    assert_eq!(coverage.total_pixels_in_roi, 3);
}
