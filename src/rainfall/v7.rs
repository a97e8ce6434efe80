use std::sync::Arc;

use crate::error::Error;
use crate::grid::{CacheStats, DatasetCache, GridSource, GridSpec, MonthlyGridSpec};
use crate::rainfall::{RainModel, Version};
use crate::stats::{bisect, norm_sf};
use crate::temperature::MonthlyTemperature;

/// Days per month, February averaged over leap years.
const DAYS_IN_MONTH: [f64; 12] =
    [31., 28.25, 31., 30., 31., 30., 31., 31., 30., 31., 30., 31.];
const DAYS_IN_YEAR: f64 = 365.25;
const MAX_MONTHLY_RAIN_PROBABILITY: f64 = 70.;
const BRACKET: (f64, f64) = (1e-10, 1000.);
const XTOL: f64 = 1e-5;

/// ITU-R P.837-7 rainfall rate from monthly rainfall and temperature.
pub struct ModelV7 {
    cache: DatasetCache,
    temperature: Arc<dyn MonthlyTemperature>,
    total_rainfall: MonthlyGridSpec,
    r001: GridSpec,
}

/// Monthly rain statistics at one point.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyRain {
    /// Mean rain intensity per month (mm/h).
    pub intensity: [f64; 12],
    /// Probability of rain per month (%).
    pub probability: [f64; 12],
}

impl MonthlyRain {
    /// `temperature` in degrees Celsius, `rainfall` in mm per month.
    pub fn new(temperature: &[f64; 12], rainfall: &[f64; 12]) -> Self {
        let mut intensity = [0.; 12];
        let mut probability = [0.; 12];

        for i in 0..12 {
            let days = DAYS_IN_MONTH[i];
            let mut r = if temperature[i] >= 0. {
                0.5874 * (0.0883 * temperature[i]).exp()
            } else {
                0.5874
            };
            let mut p0 = 100. * rainfall[i] / (24. * days * r);
            if p0 > MAX_MONTHLY_RAIN_PROBABILITY {
                r = 100. / MAX_MONTHLY_RAIN_PROBABILITY * rainfall[i]
                    / (24. * days);
                p0 = MAX_MONTHLY_RAIN_PROBABILITY;
            }
            intensity[i] = r;
            probability[i] = p0;
        }

        MonthlyRain {
            intensity,
            probability,
        }
    }

    /// Annual probability of rain (%).
    pub fn annual_probability(&self) -> f64 {
        DAYS_IN_MONTH
            .iter()
            .zip(&self.probability)
            .map(|(n, p0)| n * p0)
            .sum::<f64>()
            / DAYS_IN_YEAR
    }

    /// Percentage of the year during which `rate` (mm/h) is exceeded.
    pub fn exceedance(&self, rate: f64) -> f64 {
        let ln_rate = rate.ln();
        DAYS_IN_MONTH
            .iter()
            .zip(&self.probability)
            .zip(&self.intensity)
            .map(|((n, p0), r)| {
                n * p0 * norm_sf((ln_rate + 0.7938 - r.ln()) / 1.26)
            })
            .sum::<f64>()
            / DAYS_IN_YEAR
    }

    /// Rate exceeded for `p` % of the year, 0 when `p` exceeds the annual
    /// probability of rain.
    pub fn rate_exceeded(&self, p: f64) -> Result<f64, Error> {
        if p > self.annual_probability() {
            return Ok(0.);
        }
        bisect(
            |rate| 100. * (self.exceedance(rate) / p - 1.),
            BRACKET.0,
            BRACKET.1,
            XTOL,
        )
    }
}

impl ModelV7 {
    pub fn new(
        source: Arc<dyn GridSource>,
        temperature: Arc<dyn MonthlyTemperature>,
    ) -> Self {
        ModelV7 {
            cache: DatasetCache::new(source),
            temperature,
            total_rainfall: MonthlyGridSpec::new(
                "p837/v7_LAT_MT.txt",
                "p837/v7_LON_MT.txt",
                "p837/v7_MT_Month{month}.txt",
            ),
            r001: GridSpec::new(
                "p837/v7_LAT_R001.txt",
                "p837/v7_LON_R001.txt",
                "p837/v7_R001.txt",
            ),
        }
    }

    /// Rainfall rate exceeded for 0.01 % of the year, read from its own map.
    pub fn r001(&self, lat: f64, lon: f64) -> Result<f64, Error> {
        Ok(self.cache.get_grid(&self.r001)?.interpolate(lat, lon))
    }

    pub fn monthly_rain(&self, lat: f64, lon: f64) -> Result<MonthlyRain, Error> {
        let rainfall_grids = self.cache.get_monthly_grid(&self.total_rainfall)?;

        let mut temperature = [0.; 12];
        let mut rainfall = [0.; 12];
        for (month, (t, mt)) in
            (1..=12).zip(temperature.iter_mut().zip(rainfall.iter_mut()))
        {
            *t = self
                .temperature
                .surface_month_mean_temperature(lat, lon, month)?
                - 273.15;
            *mt = rainfall_grids.month(month)?.interpolate(lat, lon);
        }

        Ok(MonthlyRain::new(&temperature, &rainfall))
    }
}

impl RainModel for ModelV7 {
    fn version(&self) -> Version {
        Version::V7
    }

    fn rainfall_rate(&self, lat: f64, lon: f64, p: f64) -> Result<f64, Error> {
        if p == 0.01 {
            return self.r001(lat, lon);
        }
        self.monthly_rain(lat, lon)?.rate_exceeded(p)
    }

    fn dataset_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warm_month_intensity() {
        let rain = MonthlyRain::new(&[20.; 12], &[100.; 12]);
        let expected = 0.5874 * (0.0883f64 * 20.).exp();
        assert!((rain.intensity[0] - expected).abs() < 1e-12);
        assert!((rain.probability[0] - 100. * 100. / (24. * 31. * expected)).abs() < 1e-12);
    }

    #[test]
    fn test_freezing_month_intensity_is_constant() {
        let rain = MonthlyRain::new(&[-5.; 12], &[10.; 12]);
        assert!(rain.intensity.iter().all(|&r| r == 0.5874));
    }

    #[test]
    fn test_probability_capped_at_70() {
        let rain = MonthlyRain::new(&[0.; 12], &[5000.; 12]);
        assert!(rain.probability.iter().all(|&p| p == 70.));
        let expected = 100. / 70. * 5000. / (24. * 28.25);
        assert!((rain.intensity[1] - expected).abs() < 1e-9);
        assert!((rain.annual_probability() - 70.).abs() < 1e-12);
    }

    #[test]
    fn test_annual_probability_weights_days() {
        let mut rainfall = [0.; 12];
        rainfall[1] = 100.;
        let rain = MonthlyRain::new(&[0.; 12], &rainfall);
        let p0_feb = 100. * 100. / (24. * 28.25 * 0.5874);
        assert!((rain.annual_probability() - 28.25 * p0_feb / 365.25).abs() < 1e-9);
    }

    #[test]
    fn test_rate_exceeded_solves_exceedance() {
        let rain = MonthlyRain::new(&[20.; 12], &[100.; 12]);
        let p = 0.1;
        let rate = rain.rate_exceeded(p).unwrap();
        assert!(rate > 1. && rate < 100.);
        // inverting at rate +/- xtol brackets p
        assert!(rain.exceedance(rate - 1e-4) >= p);
        assert!(rain.exceedance(rate + 1e-4) <= p);
    }

    #[test]
    fn test_rate_is_zero_above_annual_probability() {
        let rain = MonthlyRain::new(&[20.; 12], &[100.; 12]);
        let p0 = rain.annual_probability();
        assert_eq!(rain.rate_exceeded(p0 + 0.1).unwrap(), 0.);
        assert_eq!(rain.rate_exceeded(50.).unwrap(), 0.);
    }

    #[test]
    fn test_rate_decreases_with_p() {
        let rain = MonthlyRain::new(&[25.; 12], &[150.; 12]);
        let rates: Vec<f64> = [0.001, 0.003, 0.01, 0.03, 0.1, 0.3, 1., 3.]
            .iter()
            .map(|&p| rain.rate_exceeded(p).unwrap())
            .collect();
        assert!(rates.iter().all(|r| r.is_finite() && *r >= 0.));
        assert!(rates.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_dry_climate_is_zero() {
        let rain = MonthlyRain::new(&[30.; 12], &[0.; 12]);
        assert_eq!(rain.annual_probability(), 0.);
        assert_eq!(rain.rate_exceeded(0.1).unwrap(), 0.);
    }
}
