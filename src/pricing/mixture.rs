// src/pricing/mixture.rs

//! Probability-weighted Black-Scholes value over demand scenarios.
//!
//! Each scenario gets its own revenue moments from a short Monte Carlo run
//! at the fixed order quantity; the moments are mapped to a lognormal
//! volatility and priced with [`black_scholes_call`].

use serde::Serialize;

use crate::demand::{effective_purchase_price, DemandModel, RevenueTerms};
use crate::math::{RandomSource, SeededSource};
use crate::model::item::VolumeDiscountTier;
use crate::model::scenario::DemandScenario;
use crate::pricing::black_scholes::black_scholes_call;

pub const MIN_TRIALS: u32 = 300;
pub const MAX_TRIALS: u32 = 2000;
pub const DEFAULT_TRIALS: u32 = 1000;
pub const DEFAULT_SEED: u64 = 1_234_567;
/// Volatility used when a scenario produces no revenue at all.
const NO_REVENUE_VOLATILITY: f64 = 0.2;
const FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioValue {
    pub name: String,
    pub weight: f64,
    pub mean_revenue: f64,
    pub revenue_std: f64,
    pub lognormal_volatility: f64,
    pub option_value: f64,
}

/// Inputs of the scenario-mixture valuation of one item.
///
/// `terms.unit_cost` is the undiscounted purchase price; volume tiers are
/// applied per evaluated quantity.
#[derive(Debug, Clone)]
pub struct MixtureValuation<'a> {
    pub demand: DemandModel,
    pub terms: RevenueTerms,
    pub scenarios: &'a [DemandScenario],
    pub annual_rate: f64,
    pub holding_cost_per_week: f64,
    pub tiers: &'a [VolumeDiscountTier],
    pub iterations: Option<u32>,
    pub seed: Option<u64>,
}

impl MixtureValuation<'_> {
    /// Trial count clamped to `[MIN_TRIALS, MAX_TRIALS]`.
    pub fn trials(&self) -> u32 {
        match self.iterations {
            Some(n) if n > 0 => n.clamp(MIN_TRIALS, MAX_TRIALS),
            _ => DEFAULT_TRIALS,
        }
    }

    /// Purchase, financing over the lead time, and holding for `q` units.
    pub fn carrying_cost(&self, q: u32) -> f64 {
        let qf = f64::from(q);
        let unit = effective_purchase_price(self.terms.unit_cost, q, self.tiers);
        let expiry = self.demand.weeks / 52.0;
        qf * unit * (1.0 + self.annual_rate * expiry) + qf * self.holding_cost_per_week * self.demand.weeks
    }

    /// Per-scenario breakdown at quantity `q`; empty when nothing is valued.
    pub fn scenario_values(&self, q: u32) -> Vec<ScenarioValue> {
        if q == 0 || self.demand.weeks <= 0.0 {
            return Vec::new();
        }
        let unit = effective_purchase_price(self.terms.unit_cost, q, self.tiers);
        let terms = RevenueTerms {
            unit_cost: unit,
            ..self.terms
        };
        let expiry = self.demand.weeks / 52.0;
        let strike = self.carrying_cost(q);
        let trials = self.trials();
        let base_seed = self.seed.unwrap_or(DEFAULT_SEED);

        self.scenarios
            .iter()
            .map(|scenario| {
                let demand = self.demand.scaled(scenario.mu_multiplier, scenario.sigma_multiplier);
                let seed = base_seed.wrapping_add((demand.mu_week * 1000.0).floor() as u64);
                let mut source = SeededSource::new(seed);
                let (mean_revenue, revenue_std) = revenue_moments(q, &demand, &terms, trials, &mut source);

                let lognormal_volatility = if mean_revenue > 0.0 {
                    (1.0 + (revenue_std / mean_revenue).powi(2)).ln().sqrt()
                } else {
                    NO_REVENUE_VOLATILITY
                };
                let option_value = black_scholes_call(
                    mean_revenue.max(FLOOR),
                    strike.max(FLOOR),
                    expiry,
                    lognormal_volatility.max(FLOOR),
                    self.annual_rate,
                );
                ScenarioValue {
                    name: scenario.name.clone(),
                    weight: scenario.weight,
                    mean_revenue,
                    revenue_std,
                    lognormal_volatility,
                    option_value,
                }
            })
            .collect()
    }

    /// Σ weight · value across scenarios.
    pub fn option_value(&self, q: u32) -> f64 {
        self.scenario_values(q)
            .iter()
            .map(|s| s.weight * s.option_value)
            .sum()
    }
}

/// Free-function form of [`MixtureValuation::option_value`].
pub fn strict_bs_mixture_option_value(q: u32, valuation: &MixtureValuation<'_>) -> f64 {
    valuation.option_value(q)
}

/// Mean and population std of simulated lead-time revenue at stock `q`.
fn revenue_moments(
    q: u32,
    demand: &DemandModel,
    terms: &RevenueTerms,
    trials: u32,
    source: &mut dyn RandomSource,
) -> (f64, f64) {
    let qf = f64::from(q);
    let (sum, sum_sq) = (0..trials).fold((0.0, 0.0), |(sum, sum_sq), _| {
        let units = demand.sample_units(source);
        let revenue = terms.revenue(units.min(qf), (units - qf).max(0.0));
        (sum + revenue, sum_sq + revenue * revenue)
    });
    let n = f64::from(trials.max(1));
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, var.sqrt())
}
