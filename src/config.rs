// src/config.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub const BASE_CURRENCY: &str = "RUB";

/// How expected lost sales are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMethod {
    /// Normal loss function.
    Closed,
    /// Box-Muller sampling of horizon demand.
    MonteCarlo,
    /// Monte Carlo when the horizon CV exceeds 1.0, closed form otherwise.
    Auto,
}

/// Everything a valuation needs besides the item itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationParameters {
    pub lead_time_weeks: f64,
    pub holding_cost_per_unit_per_week: f64,
    pub annual_cost_of_capital: f64,
    /// Probability that a stocked-out customer is served by a rush purchase.
    pub rush_probability: f64,
    /// Revenue lost per unit served through a rush purchase.
    pub rush_unit_penalty: f64,
    pub service_level_target: f64,
    pub simulation_method: SimulationMethod,
    /// Overrides the CV-scaled default trial count when set.
    pub monte_carlo_iterations: Option<u32>,
    pub random_seed: Option<u64>,
    /// Upper end of the single-item search grid when the item has no storage cap.
    pub max_order_units: Option<u32>,
}

impl Default for ValuationParameters {
    fn default() -> Self {
        Self {
            lead_time_weeks: 13.0,
            holding_cost_per_unit_per_week: 0.5,
            annual_cost_of_capital: 0.06,
            rush_probability: 0.2,
            rush_unit_penalty: 3.0,
            service_level_target: 0.95,
            simulation_method: SimulationMethod::Closed,
            monte_carlo_iterations: None,
            random_seed: None,
            max_order_units: None,
        }
    }
}

impl ValuationParameters {
    /// Lead time as a fraction of a year.
    pub fn horizon_years(&self) -> f64 {
        self.lead_time_weeks / 52.0
    }
}

/// Shared limits for a multi-item purchase plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioConstraints {
    /// Budget in the base currency.
    pub total_budget: f64,
    pub warehouse_capacity: f64,
    pub max_suppliers: Option<usize>,
    pub min_order_value: Option<f64>,
    /// Largest share of the budget a single item may take (0..1].
    pub max_sku_share: f64,
    pub min_distinct_skus: usize,
}

impl Default for PortfolioConstraints {
    fn default() -> Self {
        Self {
            total_budget: 1_000_000.0,
            warehouse_capacity: 10_000.0,
            max_suppliers: None,
            min_order_value: None,
            max_sku_share: 0.5,
            min_distinct_skus: 0,
        }
    }
}

impl PortfolioConstraints {
    /// The configured share when it lies in (0, 1], otherwise 0.5.
    pub fn effective_max_share(&self) -> f64 {
        if self.max_sku_share > 0.0 && self.max_sku_share <= 1.0 {
            self.max_sku_share
        } else {
            0.5
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.total_budget.is_finite() || self.total_budget < 0.0 {
            return Err(EngineError::validation("total budget must be finite and >= 0"));
        }
        if !self.warehouse_capacity.is_finite() || self.warehouse_capacity < 0.0 {
            return Err(EngineError::validation(
                "warehouse capacity must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Tuning knobs of the portfolio allocator that are not business constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorSettings {
    /// Weeks of revenue history used for the portfolio risk metric.
    pub lookback_weeks: usize,
    /// Caps the coarse grid of each per-item quantity search.
    pub max_grid_points: u32,
    pub frontier_min_risk: f64,
    pub frontier_max_risk: f64,
    /// Season currently in effect (e.g. "summer"); enables seasonal rules.
    pub active_season: Option<String>,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            lookback_weeks: 26,
            max_grid_points: 200,
            frontier_min_risk: 0.1,
            frontier_max_risk: 0.5,
            active_season: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyQuote {
    /// Units of base currency per one unit of this currency.
    pub rate: f64,
    pub volatility: f64,
}

/// FX and logistics lookup tables used by the volatility synthesizer and the
/// allocator. Tests substitute their own tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTables {
    pub currencies: BTreeMap<String, CurrencyQuote>,
    pub logistics_volatility: BTreeMap<String, f64>,
    pub fallback_currency_volatility: f64,
    pub fallback_logistics_volatility: f64,
}

impl Default for MarketTables {
    fn default() -> Self {
        let currencies = [
            ("RUB", 1.0, 0.15),
            ("USD", 92.5, 0.20),
            ("EUR", 100.2, 0.18),
            ("CNY", 12.8, 0.12),
        ]
        .into_iter()
        .map(|(code, rate, volatility)| (code.to_string(), CurrencyQuote { rate, volatility }))
        .collect();

        let logistics_volatility = [
            ("domestic", 0.10),
            ("china", 0.25),
            ("europe", 0.20),
            ("usa", 0.22),
        ]
        .into_iter()
        .map(|(class, vol)| (class.to_string(), vol))
        .collect();

        Self {
            currencies,
            logistics_volatility,
            fallback_currency_volatility: 0.15,
            fallback_logistics_volatility: 0.15,
        }
    }
}

impl MarketTables {
    /// Base-currency units per unit of `code`; unknown codes convert at par.
    pub fn fx_rate(&self, code: &str) -> f64 {
        self.currencies
            .get(&code.to_uppercase())
            .map(|q| q.rate)
            .unwrap_or(1.0)
    }

    pub fn currency_volatility(&self, code: &str) -> f64 {
        self.currencies
            .get(&code.to_uppercase())
            .map(|q| q.volatility)
            .unwrap_or(self.fallback_currency_volatility)
    }

    pub fn logistics_volatility(&self, supplier_class: &str) -> f64 {
        self.logistics_volatility
            .get(&supplier_class.to_lowercase())
            .copied()
            .unwrap_or(self.fallback_logistics_volatility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive_with_fallbacks() {
        let tables = MarketTables::default();
        assert_eq!(tables.fx_rate("usd"), 92.5);
        assert_eq!(tables.fx_rate("XYZ"), 1.0);
        assert_eq!(tables.currency_volatility("XYZ"), 0.15);
        assert_eq!(tables.logistics_volatility("China"), 0.25);
        assert_eq!(tables.logistics_volatility("mars"), 0.15);
    }

    #[test]
    fn max_share_falls_back_to_half() {
        let mut c = PortfolioConstraints::default();
        c.max_sku_share = 0.0;
        assert_eq!(c.effective_max_share(), 0.5);
        c.max_sku_share = 0.3;
        assert_eq!(c.effective_max_share(), 0.3);
    }
}
