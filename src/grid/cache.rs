use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use ndarray::{Array1, Array2};
use once_cell::sync::OnceCell;
use tracing::debug;

use super::{GeoGrid, GridSource};
use crate::error::Error;

/// Names of the three matrices making up one grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridSpec {
    pub lat: String,
    pub lon: String,
    pub values: String,
}

impl GridSpec {
    pub fn new(
        lat: impl Into<String>,
        lon: impl Into<String>,
        values: impl Into<String>,
    ) -> Self {
        GridSpec {
            lat: lat.into(),
            lon: lon.into(),
            values: values.into(),
        }
    }
}

/// Twelve grids sharing their axes. `values` contains a `{month}`
/// placeholder, expanded to the two-digit month number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonthlyGridSpec {
    pub lat: String,
    pub lon: String,
    pub values: String,
}

impl MonthlyGridSpec {
    pub fn new(
        lat: impl Into<String>,
        lon: impl Into<String>,
        values: impl Into<String>,
    ) -> Self {
        MonthlyGridSpec {
            lat: lat.into(),
            lon: lon.into(),
            values: values.into(),
        }
    }

    pub fn month_values(&self, month: u32) -> String {
        self.values.replace("{month}", &format!("{:02}", month))
    }
}

#[derive(Debug, Clone)]
pub struct MonthlyGridSet {
    grids: Vec<Arc<GeoGrid>>,
}

impl MonthlyGridSet {
    pub fn month(&self, month: u32) -> Result<&GeoGrid, Error> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidMonth(month));
        }
        Ok(&self.grids[month as usize - 1])
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Grids built on first use and kept for the lifetime of the cache.
///
/// Every entry is initialized at most once, even under concurrent first use.
/// A failed load leaves the entry empty so a later call tries again.
pub struct DatasetCache {
    source: Arc<dyn GridSource>,
    grids: Mutex<HashMap<GridSpec, Slot<GeoGrid>>>,
    monthly: Mutex<HashMap<MonthlyGridSpec, Slot<MonthlyGridSet>>>,
    stats: Mutex<CacheStats>,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn GridSource>) -> Self {
        DatasetCache {
            source,
            grids: Mutex::new(HashMap::new()),
            monthly: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_grid(&self, spec: &GridSpec) -> Result<Arc<GeoGrid>, Error> {
        let slot = slot(&self.grids, spec);
        let mut loaded = false;
        let grid = slot
            .get_or_try_init(|| {
                loaded = true;
                let (lats, lons) = self.load_axes(&spec.lat, &spec.lon)?;
                self.load_grid(&spec.values, lats, lons).map(Arc::new)
            })
            .cloned();
        // failed loads count as misses too
        self.record(loaded);
        grid
    }

    pub fn get_monthly_grid(
        &self,
        spec: &MonthlyGridSpec,
    ) -> Result<Arc<MonthlyGridSet>, Error> {
        let slot = slot(&self.monthly, spec);
        let mut loaded = false;
        let set = slot
            .get_or_try_init(|| {
                loaded = true;
                let (lats, lons) = self.load_axes(&spec.lat, &spec.lon)?;
                let grids = (1..=12)
                    .map(|month| {
                        self.load_grid(
                            &spec.month_values(month),
                            lats.clone(),
                            lons.clone(),
                        )
                        .map(Arc::new)
                    })
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok::<_, Error>(Arc::new(MonthlyGridSet { grids }))
            })
            .cloned();
        self.record(loaded);
        set
    }

    fn record(&self, loaded: bool) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if loaded {
            stats.misses += 1;
        } else {
            stats.hits += 1;
        }
    }

    fn load_axes(
        &self,
        lat_name: &str,
        lon_name: &str,
    ) -> Result<(Array1<f64>, Array1<f64>), Error> {
        let lats = axis(self.source.load(lat_name)?, AxisKind::Latitude)
            .map_err(|reason| Error::dataset_load(lat_name, reason))?;
        let lons = axis(self.source.load(lon_name)?, AxisKind::Longitude)
            .map_err(|reason| Error::dataset_load(lon_name, reason))?;
        Ok((lats, lons))
    }

    fn load_grid(
        &self,
        name: &str,
        lats: Array1<f64>,
        lons: Array1<f64>,
    ) -> Result<GeoGrid, Error> {
        let values = self.source.load(name)?;
        let grid = GeoGrid::new(lats, lons, values).map_err(|err| match err {
            Error::MalformedGrid(reason) => Error::dataset_load(name, reason),
            err => err,
        })?;
        debug!(name, shape = ?grid.dim(), "grid loaded");
        Ok(grid)
    }
}

fn slot<K, T>(map: &Mutex<HashMap<K, Slot<T>>>, key: &K) -> Slot<T>
where
    K: Clone + Eq + std::hash::Hash,
{
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key.clone())
        .or_default()
        .clone()
}

enum AxisKind {
    Latitude,
    Longitude,
}

/// Axis vector from either a 1-D vector (row or column) or a meshgrid, where
/// latitude varies down the rows and longitude along the columns.
fn axis(matrix: Array2<f64>, kind: AxisKind) -> Result<Array1<f64>, String> {
    let (n_rows, n_cols) = matrix.dim();
    if n_rows == 0 || n_cols == 0 {
        return Err("empty axis".to_string());
    }
    if n_rows == 1 || n_cols == 1 {
        return Ok(matrix.iter().copied().collect());
    }
    Ok(match kind {
        AxisKind::Latitude => matrix.column(0).to_owned(),
        AxisKind::Longitude => matrix.row(0).to_owned(),
    })
}
