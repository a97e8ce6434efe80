use std::sync::Arc;

use crate::error::Error;
use crate::grid::{CacheStats, DatasetCache, GridSource, MonthlyGridSpec};

/// Monthly mean surface temperature statistics.
pub trait MonthlyTemperature: Send + Sync {
    /// Mean surface temperature (K) for `month` (1..=12) at a point.
    /// `lon` may use either the [0, 360) or the [-180, 180] convention.
    fn surface_month_mean_temperature(
        &self,
        lat: f64,
        lon: f64,
        month: u32,
    ) -> Result<f64, Error>;
}

/// Monthly mean surface temperature grids of ITU-R P.1510-1.
pub struct GridTemperature {
    cache: DatasetCache,
    spec: MonthlyGridSpec,
}

impl GridTemperature {
    pub fn new(source: Arc<dyn GridSource>) -> Self {
        GridTemperature {
            cache: DatasetCache::new(source),
            spec: MonthlyGridSpec::new(
                "p1510/v1_Lat.txt",
                "p1510/v1_Lon.txt",
                "p1510/v1_T_Month{month}.txt",
            ),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl MonthlyTemperature for GridTemperature {
    fn surface_month_mean_temperature(
        &self,
        lat: f64,
        lon: f64,
        month: u32,
    ) -> Result<f64, Error> {
        let grids = self.cache.get_monthly_grid(&self.spec)?;
        Ok(grids.month(month)?.interpolate(lat, lon))
    }
}
