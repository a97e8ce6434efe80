mod v6;
mod v7;

pub use v6::ModelV6;
pub use v7::ModelV7;

use std::fmt;
use std::sync::Arc;

use ndarray::{ArrayD, ArrayViewD};
use tracing::debug;

use crate::error::Error;
use crate::grid::{CacheStats, GridSource};
use crate::temperature::MonthlyTemperature;

/// Versions of ITU-R P.837 available to the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Version {
    /// P.837-6 (02/12), superseded.
    V6,
    /// P.837-7 (06/17), current.
    #[default]
    V7,
}

/// Publication metadata of a recommendation version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recommendation {
    pub title: &'static str,
    pub year: u32,
    pub month: u32,
    pub link: &'static str,
}

impl Version {
    pub fn number(self) -> u32 {
        match self {
            Version::V6 => 6,
            Version::V7 => 7,
        }
    }

    pub fn recommendation(self) -> Recommendation {
        match self {
            Version::V6 => Recommendation {
                title: "ITU-R P.837-6",
                year: 2012,
                month: 2,
                link: "https://www.itu.int/rec/R-REC-P.837-6-201202-I/en",
            },
            Version::V7 => Recommendation {
                title: "ITU-R P.837-7",
                year: 2017,
                month: 6,
                link: "https://www.itu.int/rec/R-REC-P.837-7-201706-I/en",
            },
        }
    }
}

impl TryFrom<i64> for Version {
    type Error = Error;

    fn try_from(version: i64) -> Result<Self, Self::Error> {
        match version {
            6 => Ok(Version::V6),
            7 => Ok(Version::V7),
            _ => Err(Error::InvalidVersion(version)),
        }
    }
}

impl From<Version> for u32 {
    fn from(version: Version) -> u32 {
        version.number()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.recommendation().title)
    }
}

/// Per-point rainfall rate estimator of one recommendation version.
pub trait RainModel: Send + Sync {
    fn version(&self) -> Version;

    /// Rainfall rate (mm/h) exceeded for `p` % of an average year.
    fn rainfall_rate(&self, lat: f64, lon: f64, p: f64) -> Result<f64, Error>;

    fn dataset_stats(&self) -> CacheStats;
}

/// Holds the active model and applies it to batches of points.
pub struct ModelSelector {
    model: Box<dyn RainModel>,
    source: Arc<dyn GridSource>,
    temperature: Arc<dyn MonthlyTemperature>,
}

impl ModelSelector {
    pub fn new(
        version: Version,
        source: Arc<dyn GridSource>,
        temperature: Arc<dyn MonthlyTemperature>,
    ) -> Self {
        ModelSelector {
            model: build_model(version, &source, &temperature),
            source,
            temperature,
        }
    }

    /// A selector for `version` with a fresh model and an empty dataset cache.
    pub fn with_version(&self, version: Version) -> Self {
        ModelSelector::new(version, self.source.clone(), self.temperature.clone())
    }

    pub fn get_version(&self) -> Version {
        self.model.version()
    }

    pub fn dataset_stats(&self) -> CacheStats {
        self.model.dataset_stats()
    }

    /// Applies the active model to every (lat, lon) pair. Coordinates are
    /// broadcast against each other with numpy rules, so a single-element
    /// array of any dimension pairs with any shape on the other side.
    pub fn rainfall_rate(
        &self,
        lat: ArrayViewD<f64>,
        lon: ArrayViewD<f64>,
        p: f64,
    ) -> Result<ArrayD<f64>, Error> {
        let mismatch = || Error::ShapeMismatch(lat.shape().to_vec(), lon.shape().to_vec());
        let shape = broadcast_shape(lat.shape(), lon.shape()).ok_or_else(mismatch)?;
        let lat_b = lat.broadcast(shape.as_slice()).ok_or_else(mismatch)?;
        let lon_b = lon.broadcast(shape.as_slice()).ok_or_else(mismatch)?;

        debug!(
            version = self.get_version().number(),
            points = lat_b.len(),
            p,
            "computing rainfall rate"
        );
        let values = lat_b
            .iter()
            .zip(lon_b.iter())
            .map(|(&lat, &lon)| self.model.rainfall_rate(lat, lon, p))
            .collect::<Result<Vec<f64>, Error>>()?;

        ArrayD::from_shape_vec(lat_b.shape(), values).map_err(|_| mismatch())
    }
}

/// Common shape of two arrays under numpy broadcasting: shapes are aligned on
/// their trailing axes and a length of one stretches to the other length.
fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let ndim = a.len().max(b.len());
    let axis = |shape: &[usize], k: usize| {
        (k + shape.len())
            .checked_sub(ndim)
            .map_or(1, |i| shape[i])
    };
    (0..ndim)
        .map(|k| match (axis(a, k), axis(b, k)) {
            (m, n) if m == n => Some(m),
            (1, n) => Some(n),
            (m, 1) => Some(m),
            _ => None,
        })
        .collect()
}

fn build_model(
    version: Version,
    source: &Arc<dyn GridSource>,
    temperature: &Arc<dyn MonthlyTemperature>,
) -> Box<dyn RainModel> {
    match version {
        Version::V6 => Box::new(ModelV6::new(source.clone())),
        Version::V7 => Box::new(ModelV7::new(source.clone(), temperature.clone())),
    }
}
