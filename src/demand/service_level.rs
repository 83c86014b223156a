// src/demand/service_level.rs

//! Service-level stock targets for Normal lead-time demand.

use crate::demand::estimator::DemandModel;
use crate::error::EngineResult;
use crate::math::inverse_normal_cdf;

/// Calculates the Critical Ratio (target service level).
///
/// Balances the cost of understocking (margin lost per short unit) against
/// the cost of overstocking (carrying cost per leftover unit).
///
/// Formula: CR = Underage / (Underage + Overage)
pub fn critical_ratio(underage_cost: f64, overage_cost: f64) -> f64 {
    if underage_cost + overage_cost == 0.0 {
        return 0.0;
    }
    underage_cost / (underage_cost + overage_cost)
}

/// Safety stock covering lead-time demand at the given service level.
///
/// # Formula
/// Safety = ceil(Z * sigma_week * sqrt(weeks))
///
/// A service level of exactly 0 or 1 is rejected rather than clamped.
pub fn safety_stock(sigma_week: f64, weeks: f64, service_level: f64) -> EngineResult<u32> {
    let z = inverse_normal_cdf(service_level)?;
    let units = (z * sigma_week * weeks.max(0.0).sqrt()).ceil();
    Ok(if units < 0.0 { 0 } else { units as u32 })
}

/// Inventory position at which a new order should be placed.
///
/// ROP = mu_week * lead_time_weeks + safety
pub fn reorder_point(mu_week: f64, lead_time_weeks: f64, safety: u32) -> u32 {
    let rop = mu_week * lead_time_weeks + f64::from(safety);
    if rop < 0.0 {
        0
    } else {
        rop.round() as u32
    }
}

/// Newsvendor order-up-to level over the horizon of `demand`.
///
/// Target = mean_L + Z(CR) * std_L, with the critical ratio taken from
/// underage and overage costs.
pub fn newsvendor_quantity(
    underage_cost: f64,
    overage_cost: f64,
    demand: &DemandModel,
) -> EngineResult<u32> {
    let z = inverse_normal_cdf(critical_ratio(underage_cost, overage_cost))?;
    let target = demand.horizon_mean() + z * demand.horizon_std();
    Ok(if target < 0.0 { 0 } else { target.round() as u32 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn critical_ratio_handles_zero_costs() {
        assert_eq!(critical_ratio(0.0, 0.0), 0.0);
        assert_eq!(critical_ratio(3.0, 1.0), 0.75);
    }

    #[test]
    fn safety_stock_at_95_percent() {
        // z = 1.645, sigma_L = 10 * 2 = 20 -> 32.9 -> 33
        assert_eq!(safety_stock(10.0, 4.0, 0.95).unwrap(), 33);
    }

    #[test]
    fn safety_stock_rejects_certain_service() {
        assert_eq!(safety_stock(10.0, 4.0, 1.0), Err(EngineError::InvalidProbability(1.0)));
        assert!(safety_stock(10.0, 4.0, 0.0).is_err());
    }

    #[test]
    fn reorder_point_adds_safety_to_lead_time_demand() {
        assert_eq!(reorder_point(12.5, 4.0, 33), 83);
    }

    #[test]
    fn newsvendor_sits_at_mean_for_balanced_costs() {
        let demand = DemandModel::new(10.0, 3.0, 4.0);
        assert_eq!(newsvendor_quantity(1.0, 1.0, &demand).unwrap(), 40);
        assert!(newsvendor_quantity(0.0, 0.0, &demand).is_err());
    }
}
