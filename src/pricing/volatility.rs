// src/pricing/volatility.rs

use crate::config::MarketTables;
use crate::demand::DemandModel;

/// Volatility reported when the horizon has no expected demand.
const NO_DEMAND_VOLATILITY: f64 = 0.1;
const MIN_REVENUE_VOLATILITY: f64 = 0.01;

/// Folds demand, currency and logistics noise into one Black-Scholes sigma.
///
/// The three sources are treated as independent and added in quadrature; no
/// covariance between them is modelled.
#[derive(Debug, Clone, Default)]
pub struct VolatilitySynthesizer {
    tables: MarketTables,
}

impl VolatilitySynthesizer {
    pub fn new(tables: MarketTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &MarketTables {
        &self.tables
    }

    /// Revenue volatility from demand alone.
    ///
    /// Demand CV is damped by how much of it the stock can serve: with a fill
    /// rate near zero revenue barely moves with demand. Rush purchases absorb
    /// a fifth of the rest at `rush_probability = 1`.
    pub fn revenue_volatility(&self, demand: &DemandModel, q: f64, rush_probability: f64) -> f64 {
        let mean = demand.horizon_mean();
        let cv = demand.horizon_std() / mean;
        let fill_rate = (q / mean).min(1.0);
        let revenue_vol = cv * (1.0 - (-2.0 * fill_rate).exp());
        let rush_factor = 1.0 - 0.2 * rush_probability;
        (revenue_vol * rush_factor).max(MIN_REVENUE_VOLATILITY)
    }

    pub fn combined_volatility(
        &self,
        demand: &DemandModel,
        q: f64,
        rush_probability: f64,
        currency: &str,
        supplier_class: &str,
    ) -> f64 {
        if demand.horizon_mean() <= 0.0 {
            return NO_DEMAND_VOLATILITY;
        }
        let base = self.revenue_volatility(demand, q, rush_probability);
        let currency_vol = self.tables.currency_volatility(currency);
        let logistics_vol = self.tables.logistics_volatility(supplier_class);
        (base * base + currency_vol * currency_vol + logistics_vol * logistics_vol).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_demand_has_fixed_volatility() {
        let synth = VolatilitySynthesizer::default();
        let demand = DemandModel::new(0.0, 5.0, 4.0);
        assert_eq!(synth.combined_volatility(&demand, 10.0, 0.0, "RUB", "domestic"), 0.1);
    }

    #[test]
    fn combines_in_quadrature() {
        let synth = VolatilitySynthesizer::default();
        let demand = DemandModel::new(10.0, 5.0, 4.0);
        // cv = 10/40 = 0.25, fill = 1, rush factor 1
        let base = 0.25 * (1.0 - (-2.0f64).exp());
        let expected = (base * base + 0.20 * 0.20 + 0.25 * 0.25).sqrt();
        assert_relative_eq!(
            synth.combined_volatility(&demand, 40.0, 0.0, "USD", "china"),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn revenue_volatility_is_floored() {
        let synth = VolatilitySynthesizer::default();
        let demand = DemandModel::new(10.0, 0.0, 4.0);
        assert_eq!(synth.revenue_volatility(&demand, 40.0, 0.5), 0.01);
    }

    #[test]
    fn substitute_tables_change_the_result() {
        let mut tables = MarketTables::default();
        tables.logistics_volatility.insert("domestic".into(), 0.0);
        tables.currencies.get_mut("RUB").unwrap().volatility = 0.0;
        let synth = VolatilitySynthesizer::new(tables);
        let demand = DemandModel::new(10.0, 0.0, 4.0);
        assert_relative_eq!(synth.combined_volatility(&demand, 40.0, 0.0, "RUB", "domestic"), 0.01);
    }
}
