use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use ndarray::{arr0, Array, ArrayD, Dimension};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Error;
use crate::grid::{CacheStats, GridSource, TextDirSource};
use crate::rainfall::{ModelSelector, Version};
use crate::temperature::{GridTemperature, MonthlyTemperature};

/// Coordinates or results as a scalar, a flat sequence or an n-d array.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoValues {
    Scalar(f64),
    Sequence(Vec<f64>),
    Array(ArrayD<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Scalar,
    Sequence,
    Array,
}

impl GeoValues {
    fn kind(&self) -> Kind {
        match self {
            GeoValues::Scalar(_) => Kind::Scalar,
            GeoValues::Sequence(_) => Kind::Sequence,
            GeoValues::Array(_) => Kind::Array,
        }
    }

    fn into_array(self) -> ArrayD<f64> {
        match self {
            GeoValues::Scalar(value) => arr0(value).into_dyn(),
            GeoValues::Sequence(values) => Array::from_vec(values).into_dyn(),
            GeoValues::Array(values) => values,
        }
    }

    fn from_array(values: ArrayD<f64>, kind: Kind) -> Self {
        match kind {
            Kind::Scalar if values.len() == 1 => {
                GeoValues::Scalar(values.iter().copied().next().unwrap_or(f64::NAN))
            }
            Kind::Sequence if values.ndim() <= 1 => {
                GeoValues::Sequence(values.iter().copied().collect())
            }
            _ => GeoValues::Array(values),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            GeoValues::Scalar(_) => 1,
            GeoValues::Sequence(values) => values.len(),
            GeoValues::Array(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            GeoValues::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            GeoValues::Scalar(_) => vec![],
            GeoValues::Sequence(values) => vec![values.len()],
            GeoValues::Array(values) => values.shape().to_vec(),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            GeoValues::Scalar(value) => vec![*value],
            GeoValues::Sequence(values) => values.clone(),
            GeoValues::Array(values) => values.iter().copied().collect(),
        }
    }
}

impl From<f64> for GeoValues {
    fn from(value: f64) -> Self {
        GeoValues::Scalar(value)
    }
}

impl From<Vec<f64>> for GeoValues {
    fn from(values: Vec<f64>) -> Self {
        GeoValues::Sequence(values)
    }
}

impl From<&[f64]> for GeoValues {
    fn from(values: &[f64]) -> Self {
        GeoValues::Sequence(values.to_vec())
    }
}

impl<D: Dimension> From<Array<f64, D>> for GeoValues {
    fn from(values: Array<f64, D>) -> Self {
        GeoValues::Array(values.into_dyn())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    MillimetresPerHour,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::MillimetresPerHour => write!(f, "mm/h"),
        }
    }
}

/// Rainfall rate values tagged with their unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallRate {
    pub value: GeoValues,
    pub unit: Unit,
}

impl RainfallRate {
    /// Values with the unit symbol, the pair handed out to Python callers.
    pub fn into_parts(self) -> (GeoValues, String) {
        (self.value, self.unit.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    version: Version,
    p: u64,
    lat_shape: Vec<usize>,
    lat: Vec<u64>,
    lon_shape: Vec<usize>,
    lon: Vec<u64>,
}

impl MemoKey {
    fn new(version: Version, lat: &ArrayD<f64>, lon: &ArrayD<f64>, p: f64) -> Self {
        MemoKey {
            version,
            p: p.to_bits(),
            lat_shape: lat.shape().to_vec(),
            lat: lat.iter().map(|v| v.to_bits()).collect(),
            lon_shape: lon.shape().to_vec(),
            lon: lon.iter().map(|v| v.to_bits()).collect(),
        }
    }
}

/// Rainfall rate session: the active recommendation version plus a memo of
/// past results.
pub struct RainfallRateApi {
    selector: RwLock<ModelSelector>,
    memo: Mutex<HashMap<MemoKey, ArrayD<f64>>>,
}

impl RainfallRateApi {
    pub fn new(
        version: Version,
        source: Arc<dyn GridSource>,
        temperature: Arc<dyn MonthlyTemperature>,
    ) -> Self {
        RainfallRateApi {
            selector: RwLock::new(ModelSelector::new(version, source, temperature)),
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Session reading text datasets from `config.dataset_dir`, with P.1510
    /// temperature grids from the same directory.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let source: Arc<dyn GridSource> =
            Arc::new(TextDirSource::new(config.dataset_dir.clone()));
        let temperature = Arc::new(GridTemperature::new(source.clone()));
        Ok(Self::new(config.version()?, source, temperature))
    }

    /// Rainfall rate exceeded for `p` % of an average year.
    ///
    /// The result has the shape and kind of `lat` (a scalar `lat` broadcast
    /// against several longitudes takes the kind of `lon`). Longitudes may be
    /// given in any convention.
    pub fn rainfall_rate(
        &self,
        lat: impl Into<GeoValues>,
        lon: impl Into<GeoValues>,
        p: f64,
    ) -> Result<RainfallRate, Error> {
        let (lat, lon) = (lat.into(), lon.into());
        let kind = if lat.len() == 1 && lon.len() > 1 {
            lon.kind()
        } else {
            lat.kind()
        };
        let lat = lat.into_array();
        let lon = lon.into_array().mapv_into(|lon| lon.rem_euclid(360.));

        let selector = self.selector.read().unwrap_or_else(PoisonError::into_inner);
        let key = MemoKey::new(selector.get_version(), &lat, &lon, p);

        let cached = self.memo().get(&key).cloned();
        let values = match cached {
            Some(values) => {
                debug!(p, points = values.len(), "rainfall rate served from memo");
                values
            }
            None => {
                let values = selector.rainfall_rate(lat.view(), lon.view(), p)?;
                self.memo().insert(key, values.clone());
                values
            }
        };

        Ok(RainfallRate {
            value: GeoValues::from_array(values, kind),
            unit: Unit::MillimetresPerHour,
        })
    }

    pub fn get_version(&self) -> u32 {
        self.selector
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_version()
            .number()
    }

    /// Switches to a fresh model of `version` (6 or 7) and forgets memoized
    /// results. An invalid version leaves the session untouched.
    pub fn change_version(&self, version: i64) -> Result<(), Error> {
        let version = Version::try_from(version)?;
        let mut selector = self.selector.write().unwrap_or_else(PoisonError::into_inner);
        *selector = selector.with_version(version);
        self.clear_cache();
        info!(%version, "rainfall rate model changed");
        Ok(())
    }

    /// Dataset cache statistics of the active model.
    pub fn dataset_stats(&self) -> CacheStats {
        self.selector
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dataset_stats()
    }

    pub fn clear_cache(&self) {
        self.memo().clear();
    }

    fn memo(&self) -> std::sync::MutexGuard<'_, HashMap<MemoKey, ArrayD<f64>>> {
        self.memo.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
