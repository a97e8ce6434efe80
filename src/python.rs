use numpy::{PyReadonlyArrayDyn, ToPyArray};
use once_cell::sync::OnceCell;
use pyo3::prelude::*;

use crate::api::{GeoValues, RainfallRateApi, Unit};
use crate::config::Config;
use crate::error::Error;

static SESSION: OnceCell<RainfallRateApi> = OnceCell::new();

/// Session shared by the Python functions, configured from the environment on
/// first use.
fn session() -> Result<&'static RainfallRateApi, Error> {
    SESSION.get_or_try_init(|| RainfallRateApi::from_config(&Config::from_env()?))
}

#[derive(FromPyObject)]
pub enum PyCoordinates<'py> {
    Scalar(f64),
    Array(PyReadonlyArrayDyn<'py, f64>),
    Sequence(Vec<f64>),
}

impl PyCoordinates<'_> {
    fn into_values(self) -> GeoValues {
        match self {
            PyCoordinates::Scalar(value) => GeoValues::Scalar(value),
            PyCoordinates::Array(values) => GeoValues::Array(values.as_array().to_owned()),
            PyCoordinates::Sequence(values) => GeoValues::Sequence(values),
        }
    }
}

fn to_python<'py>(py: Python<'py>, values: GeoValues) -> PyResult<Bound<'py, PyAny>> {
    Ok(match values {
        GeoValues::Scalar(value) => value.into_pyobject(py)?.into_any(),
        GeoValues::Sequence(values) => values.into_pyobject(py)?.into_any(),
        GeoValues::Array(values) => values.to_pyarray(py).into_any(),
    })
}

/// Rainfall rate exceeded for `p` % of an average year, returned as a
/// `(values, "mm/h")` tuple.
#[pyfunction]
#[pyo3(name = "rainfall_rate")]
pub fn py_rainfall_rate<'py>(
    py: Python<'py>,
    lat: PyCoordinates<'py>,
    lon: PyCoordinates<'py>,
    p: f64,
) -> PyResult<(Bound<'py, PyAny>, String)> {
    let (values, unit) = session()?
        .rainfall_rate(lat.into_values(), lon.into_values(), p)?
        .into_parts();
    Ok((to_python(py, values)?, unit))
}

#[pyfunction]
#[pyo3(name = "get_version")]
pub fn py_get_version() -> PyResult<u32> {
    Ok(session()?.get_version())
}

#[pyfunction]
#[pyo3(name = "change_version")]
pub fn py_change_version(new_version: i64) -> PyResult<()> {
    Ok(session()?.change_version(new_version)?)
}

/// Register a submodule in sys.modules so it can be imported.
pub fn register_submodule(
    py: Python<'_>,
    parent: &Bound<'_, PyModule>,
    child: &Bound<'_, PyModule>,
    parent_name: &str,
) -> PyResult<()> {
    parent.add_submodule(child)?;
    let child_name = child.name()?;
    let full_name = format!("{}.{}", parent_name, child_name);
    py.import("sys")?
        .getattr("modules")?
        .set_item(full_name, child)?;
    Ok(())
}

pub fn make_module(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let m = PyModule::new(py, "p837")?;
    m.add_function(wrap_pyfunction!(py_rainfall_rate, &m)?)?;
    m.add_function(wrap_pyfunction!(py_get_version, &m)?)?;
    m.add_function(wrap_pyfunction!(py_change_version, &m)?)?;
    m.add("UNIT", Unit::MillimetresPerHour.to_string())?;
    m.setattr(
        "__doc__",
        "ITU-R P.837 rainfall rate. rainfall_rate returns (values, unit) with values in mm/h.",
    )?;
    Ok(m)
}
