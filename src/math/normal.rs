// src/math/normal.rs

//! Standard normal density, distribution and quantile functions.

use std::f64::consts::SQRT_2;

use crate::error::{EngineError, EngineResult};

const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

pub fn normal_pdf(x: f64) -> f64 {
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let ax = x.abs();
    let t = 1.0 / (1.0 + P * ax);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-ax * ax).exp();
    sign * y
}

pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// CDF of `N(mean, std^2)`; a zero std degenerates to a step at the mean.
pub fn normal_cdf_scaled(x: f64, mean: f64, std: f64) -> f64 {
    if std > 0.0 {
        normal_cdf((x - mean) / std)
    } else if x >= mean {
        1.0
    } else {
        0.0
    }
}

/// Inverse standard normal CDF (Acklam's rational approximation).
///
/// Returns [`EngineError::InvalidProbability`] outside (0, 1): safety-stock
/// math downstream must never see a clamped quantile.
pub fn inverse_normal_cdf(p: f64) -> EngineResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(EngineError::InvalidProbability(p));
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    let x = if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - P_LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    };
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn cdf_sanity() {
        assert_abs_diff_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(normal_cdf(1.0), 0.841_344_746, epsilon = 1e-6);
        assert_abs_diff_eq!(normal_cdf(-1.0), 1.0 - normal_cdf(1.0), epsilon = 1e-12);
        assert_abs_diff_eq!(normal_pdf(0.0), INV_SQRT_2PI, epsilon = 1e-15);
    }

    #[test]
    fn quantiles_match_reference_values() {
        assert_abs_diff_eq!(inverse_normal_cdf(0.95).unwrap(), 1.644_853_6, epsilon = 1e-6);
        assert_abs_diff_eq!(inverse_normal_cdf(0.99).unwrap(), 2.326_347_9, epsilon = 1e-6);
        assert_abs_diff_eq!(inverse_normal_cdf(0.5).unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(inverse_normal_cdf(0.01).unwrap(), -2.326_347_9, epsilon = 1e-6);
    }

    #[test]
    fn quantile_rejects_boundary_probabilities() {
        assert_eq!(inverse_normal_cdf(0.0), Err(EngineError::InvalidProbability(0.0)));
        assert_eq!(inverse_normal_cdf(1.0), Err(EngineError::InvalidProbability(1.0)));
        assert!(inverse_normal_cdf(f64::NAN).is_err());
    }

    #[test]
    fn degenerate_scaled_cdf_is_a_step() {
        assert_eq!(normal_cdf_scaled(9.9, 10.0, 0.0), 0.0);
        assert_eq!(normal_cdf_scaled(10.0, 10.0, 0.0), 1.0);
    }
}
