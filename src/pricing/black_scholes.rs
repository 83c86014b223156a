// src/pricing/black_scholes.rs

//! Black-Scholes call on stocked revenue.
//!
//! The underlying `spot` is the expected revenue of the stocked units and the
//! `strike` their total carrying cost (purchase, financing, holding). Inputs
//! that would make the closed form blow up fall back to intrinsic value.

use crate::math::normal_cdf;

const EPS: f64 = 1e-6;
/// Beyond this moneyness the call is priced as a discounted forward.
const DEEP_ITM_RATIO: f64 = 3.0;
/// `|d1|` past which the normal CDF is saturated.
const D1_SATURATION: f64 = 10.0;

#[inline]
fn intrinsic(spot: f64, strike: f64) -> f64 {
    (spot - strike).max(0.0)
}

#[inline]
fn discounted_forward(spot: f64, strike: f64, rate: f64, expiry: f64) -> f64 {
    spot - strike * (-rate * expiry).exp()
}

/// Call value for `spot`, `strike`, `expiry` in years, `vol` and annual `rate`.
pub fn black_scholes_call(spot: f64, strike: f64, expiry: f64, vol: f64, rate: f64) -> f64 {
    if expiry <= 0.0 || spot <= EPS || strike <= EPS || vol <= EPS {
        return intrinsic(spot, strike);
    }
    if spot / strike > DEEP_ITM_RATIO {
        return discounted_forward(spot, strike, rate, expiry);
    }

    let sig_sqrt_t = vol * expiry.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * expiry) / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;

    if d1 > D1_SATURATION {
        return discounted_forward(spot, strike, rate, expiry);
    }
    if d1 < -D1_SATURATION {
        return 0.0;
    }
    (spot * normal_cdf(d1) - strike * (-rate * expiry).exp() * normal_cdf(d2)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn matches_textbook_price() {
        // S=100, K=100, T=1, sigma=0.2, r=0.05 -> 10.4506
        assert_relative_eq!(black_scholes_call(100.0, 100.0, 1.0, 0.2, 0.05), 10.4506, epsilon = 1e-3);
    }

    #[test]
    fn expiry_at_zero_is_intrinsic() {
        assert_eq!(black_scholes_call(120.0, 100.0, 0.0, 0.3, 0.05), 20.0);
        assert_eq!(black_scholes_call(80.0, 100.0, 0.0, 0.3, 0.05), 0.0);
        assert_relative_eq!(black_scholes_call(120.0, 100.0, 1e-9, 0.3, 0.05), 20.0, epsilon = 1e-3);
    }

    #[test]
    fn degenerate_inputs_fall_back_to_intrinsic() {
        assert_eq!(black_scholes_call(0.0, 100.0, 1.0, 0.3, 0.05), 0.0);
        assert_eq!(black_scholes_call(150.0, 100.0, 1.0, 0.0, 0.05), 50.0);
    }

    #[test]
    fn deep_in_the_money_is_linear() {
        let v = black_scholes_call(400.0, 100.0, 0.5, 0.3, 0.06);
        assert_relative_eq!(v, 400.0 - 100.0 * (-0.03f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn far_out_of_the_money_is_zero() {
        assert_eq!(black_scholes_call(1.0, 100.0, 0.25, 0.1, 0.05), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn call_value_increases_with_volatility(
            spot in 10.0f64..300.0,
            strike in 50.0f64..200.0,
            expiry in 0.05f64..2.0,
            vol in 0.05f64..1.0,
            bump in 0.01f64..0.5,
            rate in 0.0f64..0.15,
        ) {
            prop_assume!(spot / strike <= 3.0);
            let low = black_scholes_call(spot, strike, expiry, vol, rate);
            let high = black_scholes_call(spot, strike, expiry, vol + bump, rate);
            // CDF approximation noise only
            prop_assert!(high >= low - 1e-4 * low.max(1.0), "low {} high {}", low, high);
        }
    }
}
