use std::f64::consts::SQRT_2;

use tracing::warn;

use crate::error::Error;

/// Complementary error function, Chebyshev fit with fractional error below
/// 1.2e-7 everywhere.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1. / (1. + 0.5 * z);
    let ans = t
        * (-z * z - 1.26551223
            + t * (1.00002368
                + t * (0.37409196
                    + t * (0.09678418
                        + t * (-0.18628806
                            + t * (0.27886807
                                + t * (-1.13520398
                                    + t * (1.48851587
                                        + t * (-0.82215223 + t * 0.17087277)))))))))
            .exp();
    if x >= 0. {
        ans
    } else {
        2. - ans
    }
}

/// Survival function (1 - CDF) of the standard normal distribution.
pub fn norm_sf(x: f64) -> f64 {
    0.5 * erfc(x / SQRT_2)
}

const MAX_ITERATIONS: usize = 100;
const RTOL: f64 = 4. * f64::EPSILON;

/// Root of `f` in `[a, b]` by bisection, to an absolute tolerance `xtol`.
///
/// `f(a)` and `f(b)` must have opposite signs (or one of them be zero).
pub fn bisect<F>(f: F, a: f64, b: f64, xtol: f64) -> Result<f64, Error>
where
    F: Fn(f64) -> f64,
{
    let fa = f(a);
    let fb = f(b);
    if fa == 0. {
        return Ok(a);
    }
    if fb == 0. {
        return Ok(b);
    }
    if fa * fb > 0. || fa.is_nan() || fb.is_nan() {
        warn!(a, b, fa, fb, "bisection bracket has no sign change");
        return Err(Error::NoRootBracketed(a, b));
    }

    let mut xa = a;
    let mut dm = b - a;
    let mut xm = a;
    for _ in 0..MAX_ITERATIONS {
        dm *= 0.5;
        xm = xa + dm;
        let fm = f(xm);
        if fm * fa >= 0. {
            xa = xm;
        }
        if fm == 0. || dm.abs() < xtol + RTOL * xm.abs() {
            break;
        }
    }
    Ok(xm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erfc_known_values() {
        assert!((erfc(0.) - 1.).abs() < 1e-7);
        assert!((erfc(1.) - 0.157_299_207_050_285_1).abs() < 1e-7);
        assert!((erfc(-1.) - 1.842_700_792_949_715).abs() < 1e-7);
        assert!(erfc(10.) < 1e-40);
    }

    #[test]
    fn test_norm_sf() {
        assert!((norm_sf(0.) - 0.5).abs() < 1e-7);
        assert!((norm_sf(1.959_963_984_540_054) - 0.025).abs() < 1e-7);
        assert!((norm_sf(-1.) - 0.841_344_746_068_542_9).abs() < 1e-7);
    }

    #[test]
    fn test_norm_sf_is_decreasing() {
        let values: Vec<f64> = (-60..=60).map(|i| norm_sf(i as f64 / 10.)).collect();
        assert!(values.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_bisect_finds_sqrt_two() {
        let root = bisect(|x| x * x - 2., 0., 2., 1e-10).unwrap();
        assert!((root - 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_bisect_decreasing_function() {
        let root = bisect(|x| 5. - x, 1e-10, 1000., 1e-5).unwrap();
        assert!((root - 5.).abs() < 1e-5);
    }

    #[test]
    fn test_bisect_without_sign_change() {
        let err = bisect(|x| x * x + 1., -1., 1., 1e-5).unwrap_err();
        assert_eq!(err, Error::NoRootBracketed(-1., 1.));
    }
}
