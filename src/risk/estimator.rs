// src/risk/estimator.rs

//! Weekly-revenue VaR/ES with the data source chosen by availability.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::MarketTables;
use crate::demand::stats::bucket_by_week;
use crate::error::EngineResult;
use crate::math::{inverse_normal_cdf, mean_std, normal_pdf};
use crate::model::history::SalesRecord;
use crate::model::item::{Item, ItemId};
use crate::model::scenario::{validate_scenarios, DemandScenario};
use crate::risk::mixture::{mixture_var_es, NormalState};

/// Fewest observed weeks that make history usable, before lookback scaling.
const MIN_HISTORY_WEEKS: usize = 8;

/// Which data produced a [`RiskReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSource {
    Historical,
    Mixture,
    Parametric,
}

/// Tail risk of one week of portfolio revenue, in base currency.
///
/// VaR and ES are loss-positive distances below the mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub var: f64,
    pub es: f64,
    pub mean: f64,
    pub std: f64,
    pub source: RiskSource,
    pub confidence: f64,
}

/// Normal VaR and ES for a given std: `σ·z` and `σ·φ(z)/(1-α)`.
///
/// VaR is floored at 0 so that confidence levels below 0.5 agree with
/// [`mixture_var_es`].
pub fn normal_var_es(std: f64, confidence: f64) -> EngineResult<(f64, f64)> {
    let z = inverse_normal_cdf(confidence)?;
    let std = std.max(0.0);
    Ok(((std * z).max(0.0), std * normal_pdf(z) / (1.0 - confidence)))
}

/// Mean and std of aggregate weekly revenue implied by the items' demand
/// models, with demand scaled by the multipliers. Items are treated as
/// uncorrelated.
pub fn implied_weekly_revenue(
    items: &[Item],
    tables: &MarketTables,
    mu_multiplier: f64,
    sigma_multiplier: f64,
) -> (f64, f64) {
    let (mean, variance) = items.iter().fold((0.0, 0.0), |(mean, variance), item| {
        let price = item.full_price() * tables.fx_rate(&item.currency);
        let mu = (item.weekly_demand_mean * mu_multiplier).max(0.0);
        let sigma = (item.weekly_demand_std * sigma_multiplier).max(0.0);
        let revenue_std = if mu > 0.0 { sigma * price } else { 0.0 };
        (mean + mu * price, variance + revenue_std * revenue_std)
    });
    (mean, variance.sqrt())
}

#[derive(Debug, Clone)]
pub struct RiskEstimator<'a> {
    items: &'a [Item],
    tables: &'a MarketTables,
    history: BTreeMap<ItemId, &'a [SalesRecord]>,
    scenarios: &'a [DemandScenario],
    lookback_weeks: usize,
    as_of: NaiveDate,
}

impl<'a> RiskEstimator<'a> {
    pub fn new(items: &'a [Item], tables: &'a MarketTables, as_of: NaiveDate) -> Self {
        Self {
            items,
            tables,
            history: BTreeMap::new(),
            scenarios: &[],
            lookback_weeks: 26,
            as_of,
        }
    }

    pub fn with_history(mut self, id: ItemId, records: &'a [SalesRecord]) -> Self {
        self.history.insert(id, records);
        self
    }

    pub fn with_scenarios(mut self, scenarios: &'a [DemandScenario]) -> EngineResult<Self> {
        validate_scenarios(scenarios)?;
        self.scenarios = scenarios;
        Ok(self)
    }

    pub fn with_lookback(mut self, weeks: usize) -> Self {
        self.lookback_weeks = weeks;
        self
    }

    /// Weeks of history needed before the historical mode is used.
    pub fn required_history_weeks(&self) -> usize {
        MIN_HISTORY_WEEKS.max(self.lookback_weeks / 2)
    }

    /// Aggregate weekly revenue over the lookback window and the number of
    /// weeks that had at least one recorded sale.
    pub fn weekly_revenue(&self) -> (Vec<f64>, usize) {
        let weeks = self.lookback_weeks;
        // item id -> (full price in item currency, fx rate)
        let pricing: BTreeMap<ItemId, (f64, f64)> = self
            .items
            .iter()
            .map(|i| (i.id, (i.full_price(), self.tables.fx_rate(&i.currency))))
            .collect();

        let mut records = Vec::new();
        let mut observed = BTreeSet::new();
        for (id, sales) in &self.history {
            let Some(&(price, fx)) = pricing.get(id) else {
                continue;
            };
            for sale in sales.iter() {
                let age = (self.as_of - sale.date).num_days();
                if (0..weeks as i64 * 7).contains(&age) {
                    observed.insert(age / 7);
                }
                records.push((sale.date, sale.revenue_or(price) * fx));
            }
        }
        (bucket_by_week(&records, self.as_of, weeks), observed.len())
    }

    /// VaR/ES at `confidence` from history, scenarios, or item parameters,
    /// in that order of preference.
    pub fn estimate(&self, confidence: f64) -> EngineResult<RiskReport> {
        // reject bad confidence up front in every mode
        inverse_normal_cdf(confidence)?;

        let (series, observed) = self.weekly_revenue();
        let report = if observed >= self.required_history_weeks() && self.scenarios.is_empty() {
            let (mean, std) = mean_std(&series);
            let (var, es) = normal_var_es(std, confidence)?;
            RiskReport {
                var,
                es,
                mean,
                std,
                source: RiskSource::Historical,
                confidence,
            }
        } else if !self.scenarios.is_empty() {
            let states: Vec<NormalState> = self
                .scenarios
                .iter()
                .map(|s| {
                    let (mean, std) =
                        implied_weekly_revenue(self.items, self.tables, s.mu_multiplier, s.sigma_multiplier);
                    NormalState::new(mean, std, s.weight)
                })
                .collect();
            debug!(states = states.len(), "mixture risk states built");
            let tail = mixture_var_es(&states, confidence);
            RiskReport {
                var: tail.var,
                es: tail.es,
                mean: tail.mean,
                std: tail.std,
                source: RiskSource::Mixture,
                confidence,
            }
        } else {
            let (mean, std) = implied_weekly_revenue(self.items, self.tables, 1.0, 1.0);
            let (var, es) = normal_var_es(std, confidence)?;
            RiskReport {
                var,
                es,
                mean,
                std,
                source: RiskSource::Parametric,
                confidence,
            }
        };

        info!(
            source = ?report.source,
            confidence,
            var = report.var,
            es = report.es,
            observed_weeks = observed,
            "risk estimated"
        );
        Ok(report)
    }
}
