use std::sync::Arc;

use crate::error::Error;
use crate::grid::{CacheStats, DatasetCache, GridSource, GridSpec};
use crate::rainfall::{RainModel, Version};

const LAT: &str = "p837/ESARAIN_LAT_v5.txt";
const LON: &str = "p837/ESARAIN_LON_v5.txt";

/// ITU-R P.837-6 rainfall rate from the ESARAIN v5 maps.
pub struct ModelV6 {
    cache: DatasetCache,
    pr6: GridSpec,
    mt: GridSpec,
    beta: GridSpec,
}

/// Rainfall climate at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainClimate {
    /// Probability of rain over 6-hour periods (%).
    pub pr6: f64,
    /// Mean annual total rainfall (mm).
    pub mt: f64,
    /// Convective fraction of the total rainfall.
    pub beta: f64,
}

impl RainClimate {
    /// Probability of rain in an average year (%).
    pub fn annual_probability(&self) -> f64 {
        let ms = (1. - self.beta) * self.mt;
        if self.pr6 > 0. {
            self.pr6 * (1. - (-0.0079 * ms / self.pr6).exp())
        } else {
            0.
        }
    }

    /// Rate exceeded for `p` % of the year, 0 when `p` exceeds the annual
    /// probability of rain.
    pub fn rate_exceeded(&self, p: f64) -> f64 {
        let p0 = self.annual_probability();
        if p0.is_nan() || p > p0 {
            return 0.;
        }

        let mc = self.beta * self.mt;
        let ms = (1. - self.beta) * self.mt;

        let a = 1.09;
        let b = (mc + ms) / (21797. * p0);
        let c = 26.02 * b;

        let ln_ratio = (p / p0).ln();
        let qa = a * b;
        let qb = a + c * ln_ratio;
        let qc = ln_ratio;

        (-qb + (qb * qb - 4. * qa * qc).sqrt()) / (2. * qa)
    }
}

impl ModelV6 {
    pub fn new(source: Arc<dyn GridSource>) -> Self {
        ModelV6 {
            cache: DatasetCache::new(source),
            pr6: GridSpec::new(LAT, LON, "p837/ESARAIN_PR6_v5.txt"),
            mt: GridSpec::new(LAT, LON, "p837/ESARAIN_MT_v5.txt"),
            beta: GridSpec::new(LAT, LON, "p837/ESARAIN_BETA_v5.txt"),
        }
    }

    pub fn rain_climate(&self, lat: f64, lon: f64) -> Result<RainClimate, Error> {
        Ok(RainClimate {
            pr6: self.cache.get_grid(&self.pr6)?.interpolate(lat, lon),
            mt: self.cache.get_grid(&self.mt)?.interpolate(lat, lon),
            beta: self.cache.get_grid(&self.beta)?.interpolate(lat, lon),
        })
    }
}

impl RainModel for ModelV6 {
    fn version(&self) -> Version {
        Version::V6
    }

    fn rainfall_rate(&self, lat: f64, lon: f64, p: f64) -> Result<f64, Error> {
        Ok(self.rain_climate(lat, lon)?.rate_exceeded(p))
    }

    fn dataset_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
