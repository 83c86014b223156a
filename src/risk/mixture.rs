// src/risk/mixture.rs

//! Tail metrics of a discrete mixture of Normal revenue states.

use serde::{Deserialize, Serialize};

use crate::math::{normal_cdf_scaled, normal_pdf};

/// Fixed bisection budget; the residual error is accepted in exchange for a
/// hard latency bound.
pub const BISECTION_STEPS: usize = 80;
/// Half-width of the quantile bracket, in state standard deviations.
const BRACKET_SIGMAS: f64 = 6.0;
/// States with less tail mass than this are ignored in the ES average.
const MIN_TAIL_MASS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalState {
    pub mean: f64,
    pub std: f64,
    pub weight: f64,
}

impl NormalState {
    pub fn new(mean: f64, std: f64, weight: f64) -> Self {
        Self { mean, std, weight }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MixtureTail {
    /// Mixture mean minus the lower-tail revenue quantile, floored at 0.
    pub var: f64,
    /// Mixture mean minus the mean revenue below the quantile, floored at 0.
    pub es: f64,
    pub mean: f64,
    pub std: f64,
    pub quantile: f64,
}

/// Weights rescaled to sum to 1; an all-zero set is left as is.
fn normalized(states: &[NormalState]) -> Vec<NormalState> {
    let total: f64 = states.iter().map(|s| s.weight.max(0.0)).sum();
    let total = if total > 0.0 { total } else { 1.0 };
    states
        .iter()
        .map(|s| NormalState {
            weight: s.weight.max(0.0) / total,
            ..*s
        })
        .collect()
}

fn mixture_cdf(states: &[NormalState], x: f64) -> f64 {
    states
        .iter()
        .map(|s| s.weight * normal_cdf_scaled(x, s.mean, s.std))
        .sum()
}

/// VaR and ES at `confidence` for revenue distributed as the mixture.
///
/// The revenue quantile at CDF `1 - confidence` is found by bisection over
/// `mean ± 6 std` of the widest states. ES averages the truncated-normal
/// means of each state below that quantile, weighted by tail mass.
/// `confidence` is assumed to lie in (0, 1).
pub fn mixture_var_es(states: &[NormalState], confidence: f64) -> MixtureTail {
    let states = normalized(states);
    let mean: f64 = states.iter().map(|s| s.weight * s.mean).sum();
    let variance: f64 = states
        .iter()
        .map(|s| s.weight * (s.std * s.std + (s.mean - mean).powi(2)))
        .sum();

    let (mut lo, mut hi) = states.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
        let reach = BRACKET_SIGMAS * s.std.max(0.0);
        (lo.min(s.mean - reach), hi.max(s.mean + reach))
    });
    if !lo.is_finite() || !hi.is_finite() {
        lo = -1.0;
        hi = 1.0;
    }

    let target = 1.0 - confidence;
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if mixture_cdf(&states, mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let quantile = 0.5 * (lo + hi);

    let (weighted_mean, tail_mass) = states.iter().fold((0.0, 0.0), |(num, den), s| {
        if s.std <= 0.0 {
            return if quantile >= s.mean {
                (num + s.weight * s.mean, den + s.weight)
            } else {
                (num, den)
            };
        }
        let a = (quantile - s.mean) / s.std;
        let mass = normal_cdf_scaled(a, 0.0, 1.0);
        if mass <= MIN_TAIL_MASS {
            return (num, den);
        }
        let truncated_mean = s.mean - s.std * normal_pdf(a) / mass;
        (num + s.weight * mass * truncated_mean, den + s.weight * mass)
    });
    let conditional_mean = if tail_mass > 0.0 {
        weighted_mean / tail_mass
    } else {
        quantile
    };

    MixtureTail {
        var: (mean - quantile).max(0.0),
        es: (mean - conditional_mean).max(0.0),
        mean,
        std: variance.max(0.0).sqrt(),
        quantile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_state_matches_normal_formulas() {
        let tail = mixture_var_es(&[NormalState::new(1_000.0, 100.0, 1.0)], 0.95);
        assert_relative_eq!(tail.var, 164.485, epsilon = 1e-2);
        assert_relative_eq!(tail.es, 206.271, epsilon = 1e-2);
        assert_relative_eq!(tail.std, 100.0);
    }

    #[test]
    fn weights_are_normalized() {
        let a = mixture_var_es(&[NormalState::new(500.0, 50.0, 2.0), NormalState::new(900.0, 80.0, 2.0)], 0.99);
        let b = mixture_var_es(&[NormalState::new(500.0, 50.0, 0.5), NormalState::new(900.0, 80.0, 0.5)], 0.99);
        assert_relative_eq!(a.var, b.var, epsilon = 1e-9);
        assert_relative_eq!(a.mean, 700.0);
    }

    #[test]
    fn bimodal_tail_is_wider_than_components() {
        let tail = mixture_var_es(&[NormalState::new(500.0, 50.0, 0.5), NormalState::new(900.0, 80.0, 0.5)], 0.95);
        // mixture std = sqrt(0.5*2500 + 0.5*6400 + 200^2)
        assert_relative_eq!(tail.std, (4_450.0f64 + 40_000.0).sqrt(), epsilon = 1e-9);
        assert!(tail.var > 200.0);
        assert!(tail.es >= tail.var);
    }

    #[test]
    fn point_masses_have_no_tail() {
        let tail = mixture_var_es(&[NormalState::new(300.0, 0.0, 1.0)], 0.95);
        assert_relative_eq!(tail.var, 0.0, epsilon = 1e-9);
        assert_relative_eq!(tail.es, 0.0, epsilon = 1e-9);
    }
}
