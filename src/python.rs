//! Python bindings over numpy arrays. NaN marks a masked cell on both sides.

use crate::config::{LstFillConfig, ProcessingPeriod};
use crate::core::quality::QualityFilter;
use crate::core::smoothing::{SmoothingParams, SpatialSmoother};
use crate::io::region::RegionMask;
use crate::pipeline::LstPipeline;
use crate::types::{Band, Grid, LstError, Observation, Raster, Sensor, TimeSeries};
use chrono::NaiveDate;
use ndarray::{Array2, Array3, Axis};
use numpy::{PyReadonlyArray2, PyReadonlyArray3, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: LstError) -> PyErr {
    match e {
        LstError::Config(_) | LstError::ShapeMismatch { .. } | LstError::GridMismatch { .. } => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn parse_date(text: &str) -> PyResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| PyValueError::new_err(format!("Invalid date '{}': {}", text, e)))
}

fn parse_band(text: &str) -> PyResult<Band> {
    match text.to_lowercase().as_str() {
        "day" => Ok(Band::Day),
        "night" => Ok(Band::Night),
        _ => Err(PyValueError::new_err(format!("Invalid band: {}", text))),
    }
}

/// Quality-code array to boolean acceptance mask
#[pyfunction]
fn quality_mask(py: Python, quality: PyReadonlyArray2<u8>) -> PyResult<PyObject> {
    let mask = QualityFilter::quality_mask(&quality.as_array().to_owned());
    Ok(mask.to_pyarray(py).into())
}

/// Repeated mask-aware box mean
#[pyfunction]
#[pyo3(signature = (values, radius=3, passes=2))]
fn smooth(
    py: Python,
    values: PyReadonlyArray2<f64>,
    radius: usize,
    passes: usize,
) -> PyResult<PyObject> {
    let params = SmoothingParams { radius, passes };
    params.validate().map_err(to_py_err)?;

    let raster = Raster::from_values(values.as_array().to_owned());
    let smoothed = SpatialSmoother::with_params(params)
        .smooth(&raster)
        .map_err(to_py_err)?;
    Ok(smoothed.values().to_pyarray(py).into())
}

/// Gap-fills a stack of merged daily LST digital numbers.
///
/// `values` and `quality` are (n, rows, cols) with one layer per entry of `dates`.
#[pyfunction]
#[pyo3(signature = (dates, values, quality, start, end, band="day", region=None))]
#[allow(clippy::too_many_arguments)]
fn reconstruct(
    py: Python,
    dates: Vec<String>,
    values: PyReadonlyArray3<f64>,
    quality: PyReadonlyArray3<u8>,
    start: &str,
    end: &str,
    band: &str,
    region: Option<PyReadonlyArray2<bool>>,
) -> PyResult<PyObject> {
    let band = parse_band(band)?;
    let values = values.as_array();
    let quality = quality.as_array();
    let (layers, rows, cols) = values.dim();
    if quality.dim() != values.dim() || dates.len() != layers {
        return Err(PyValueError::new_err(format!(
            "Expected {} dates and quality of shape {:?}, got {} and {:?}",
            layers,
            values.dim(),
            dates.len(),
            quality.dim()
        )));
    }

    let mut entries = Vec::with_capacity(layers);
    for (i, date) in dates.iter().enumerate() {
        let raster = Raster::from_values(values.index_axis(Axis(0), i).to_owned());
        let codes = quality.index_axis(Axis(0), i).to_owned();
        let filtered = QualityFilter::apply(&raster, &codes).map_err(to_py_err)?;
        entries.push(Observation::new(parse_date(date)?, band, Sensor::Terra, filtered));
    }
    let series = TimeSeries::new(band, Grid::pixel_grid(rows, cols), entries).map_err(to_py_err)?;

    let region = match region {
        Some(mask) => RegionMask::from_mask(mask.as_array().to_owned()),
        None => RegionMask::full((rows, cols)),
    };
    let config = LstFillConfig {
        period: ProcessingPeriod::new(parse_date(start)?, parse_date(end)?).map_err(to_py_err)?,
        ..LstFillConfig::default()
    };
    let pipeline = LstPipeline::new(config, region).map_err(to_py_err)?;

    let result = py
        .allow_threads(|| pipeline.reconstruct_merged(&series))
        .map_err(to_py_err)?;

    let mut data = Array3::<f64>::from_elem((result.days.len(), rows, cols), f64::NAN);
    for (i, day) in result.days.iter().enumerate() {
        data.index_axis_mut(Axis(0), i).assign(day.raster.values());
    }
    let out_dates: Vec<String> = result.days.iter().map(|d| d.date.to_string()).collect();
    let failures: Vec<(String, String)> = result
        .failures
        .iter()
        .map(|f| (f.date.to_string(), f.reason.clone()))
        .collect();
    let mean: Array2<f64> = result.long_term_mean.values().clone();

    let dict = PyDict::new(py);
    dict.set_item("dates", out_dates)?;
    dict.set_item("data", data.to_pyarray(py))?;
    dict.set_item("long_term_mean", mean.to_pyarray(py))?;
    dict.set_item("product", band.final_product_name())?;
    dict.set_item("failures", failures)?;
    Ok(dict.into())
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(quality_mask, m)?)?;
    m.add_function(wrap_pyfunction!(smooth, m)?)?;
    m.add_function(wrap_pyfunction!(reconstruct, m)?)?;
    Ok(())
}
