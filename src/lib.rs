//! Point rainfall rate exceeded for a percentage of an average year,
//! following ITU-R P.837 (versions 6 and 7).

pub mod api;
pub mod config;
pub mod error;
pub mod grid;
pub mod rainfall;
pub mod stats;
pub mod temperature;

#[cfg(feature = "python")]
mod python;

pub use api::{GeoValues, RainfallRate, RainfallRateApi, Unit};
pub use config::Config;
pub use error::Error;
pub use rainfall::{ModelSelector, ModelV6, ModelV7, RainModel, Version};
pub use temperature::{GridTemperature, MonthlyTemperature};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn rainrate_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();

    python::register_submodule(py, m, &python::make_module(py)?, "rainrate_rs")?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
