// src/portfolio/allocator.rs

//! Greedy multi-item allocation under budget, space and diversification limits.
//!
//! Items are ranked by scenario-mixture option value per unit of capital at
//! their individually optimal quantity, then filled in rank order. This is a
//! knapsack heuristic: fast and predictable, not globally optimal.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AllocatorSettings, MarketTables, PortfolioConstraints, ValuationParameters};
use crate::demand::seasonality::average_seasonal_demand;
use crate::demand::{DemandModel, RevenueTerms};
use crate::error::{EngineError, EngineResult};
use crate::model::history::SalesRecord;
use crate::model::item::{Item, ItemId};
use crate::model::scenario::{scenarios_or_baseline, validate_scenarios, DemandScenario};
use crate::portfolio::logistics::LogisticsEvent;
use crate::portfolio::metrics::{investment_weights, portfolio_risk, weekly_revenue_series, CorrelationMatrix};
use crate::portfolio::normalize::{normalize_item, NormalizedItem};
use crate::portfolio::rules::{apply_correlation_rules, default_rules, CorrelationRule};
use crate::portfolio::schedule::{create_delivery_schedule, DeliveryWeek};
use crate::pricing::mixture::{MixtureValuation, DEFAULT_SEED};
use crate::pricing::{optimize_quantity, VolatilitySynthesizer};

/// Lower bound on the coarse grid step of the per-item search.
const MIN_COARSE_STEP: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAllocation {
    pub allocations: BTreeMap<ItemId, u32>,
    /// Σ quantity · unit cost, in base currency.
    pub total_investment: f64,
    /// Σ scenario-mixture option value of each allocated quantity.
    pub expected_return: f64,
    /// Coefficient of variation of weekly portfolio revenue.
    pub portfolio_risk: f64,
    pub currency_exposure: BTreeMap<String, f64>,
    pub supplier_concentration: BTreeMap<String, f64>,
    /// Distinct items still missing to reach `min_distinct_skus`.
    pub diversification_shortfall: usize,
}

impl PortfolioAllocation {
    /// Expected return per unit invested; 0 for an empty portfolio.
    pub fn return_ratio(&self) -> f64 {
        if self.total_investment > 0.0 {
            self.expected_return / self.total_investment
        } else {
            0.0
        }
    }
}

/// Per-item search outcome used for ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub id: ItemId,
    pub score: f64,
    pub best_quantity: u32,
    pub best_value: f64,
}

#[derive(Debug, Clone)]
pub struct PortfolioOptimizer {
    items: BTreeMap<ItemId, Item>,
    constraints: PortfolioConstraints,
    params: ValuationParameters,
    settings: AllocatorSettings,
    synth: VolatilitySynthesizer,
    scenarios: Vec<DemandScenario>,
    correlations: Option<CorrelationMatrix>,
    history: BTreeMap<ItemId, Vec<SalesRecord>>,
    rules: Vec<CorrelationRule>,
    events: Vec<LogisticsEvent>,
    as_of: NaiveDate,
}

impl PortfolioOptimizer {
    pub fn new(
        items: Vec<Item>,
        constraints: PortfolioConstraints,
        params: ValuationParameters,
        tables: MarketTables,
    ) -> EngineResult<Self> {
        constraints.validate()?;
        let mut lookup = BTreeMap::new();
        for item in items {
            item.validate()?;
            let id = item.id;
            if lookup.insert(id, item).is_some() {
                return Err(EngineError::validation(format!("duplicate item id {id}")));
            }
        }
        Ok(Self {
            items: lookup,
            constraints,
            params,
            settings: AllocatorSettings::default(),
            synth: VolatilitySynthesizer::new(tables),
            scenarios: Vec::new(),
            correlations: None,
            history: BTreeMap::new(),
            rules: default_rules(),
            events: Vec::new(),
            as_of: Utc::now().date_naive(),
        })
    }

    pub fn with_scenarios(mut self, scenarios: Vec<DemandScenario>) -> EngineResult<Self> {
        validate_scenarios(&scenarios)?;
        self.scenarios = scenarios;
        Ok(self)
    }

    pub fn with_correlations(mut self, correlations: CorrelationMatrix) -> Self {
        self.correlations = Some(correlations);
        self
    }

    pub fn with_sales_history(mut self, id: ItemId, records: Vec<SalesRecord>) -> EngineResult<Self> {
        if !self.items.contains_key(&id) {
            return Err(EngineError::UnknownItem(id));
        }
        self.history.insert(id, records);
        Ok(self)
    }

    pub fn with_rules(mut self, rules: Vec<CorrelationRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_logistics_events(mut self, events: Vec<LogisticsEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_settings(mut self, settings: AllocatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Reference date for history windows and the delivery calendar.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = date;
        self
    }

    pub fn item(&self, id: ItemId) -> EngineResult<&Item> {
        self.items.get(&id).ok_or(EngineError::UnknownItem(id))
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn constraints(&self) -> &PortfolioConstraints {
        &self.constraints
    }

    pub fn settings(&self) -> &AllocatorSettings {
        &self.settings
    }

    pub fn tables(&self) -> &MarketTables {
        self.synth.tables()
    }

    pub fn normalize_all(&self) -> BTreeMap<ItemId, NormalizedItem> {
        self.items
            .values()
            .map(|item| (item.id, normalize_item(item, &self.params, &self.synth)))
            .collect()
    }

    /// Scenario-mixture valuation of one item in its own currency.
    fn mixture_for<'a>(&'a self, item: &'a Item, scenarios: &'a [DemandScenario]) -> MixtureValuation<'a> {
        let weeks = self.params.lead_time_weeks;
        let mu = average_seasonal_demand(item.weekly_demand_mean, item.seasonality.as_ref(), weeks);
        MixtureValuation {
            demand: DemandModel::new(mu, item.weekly_demand_std, weeks),
            terms: RevenueTerms::new(
                item.unit_cost,
                item.unit_margin,
                self.params.rush_probability,
                self.params.rush_unit_penalty,
            ),
            scenarios,
            annual_rate: self.params.annual_cost_of_capital,
            holding_cost_per_week: self.params.holding_cost_per_unit_per_week,
            tiers: &item.volume_discount_tiers,
            iterations: self.params.monte_carlo_iterations,
            seed: self.params.random_seed,
        }
    }

    fn coarse_step(&self, item: &Item, min_q: u32, max_q: u32) -> u32 {
        let by_demand = ((item.weekly_demand_mean.max(1.0)) / 5.0).round() as u32;
        let by_grid = max_q.saturating_sub(min_q).div_ceil(self.settings.max_grid_points.max(1));
        by_demand.max(MIN_COARSE_STEP).max(by_grid)
    }

    /// Searches each item's best quantity and ranks items by value per unit
    /// of capital, best first. Ties keep id order.
    pub fn rank_items(&self, normalized: &BTreeMap<ItemId, NormalizedItem>) -> Vec<RankedItem> {
        let scenarios = scenarios_or_baseline(&self.scenarios);
        let mut ranked: Vec<RankedItem> = self
            .items
            .values()
            .filter_map(|item| normalized.get(&item.id).map(|n| (item, n)))
            .map(|(item, n)| {
                let unit = n.budget_unit_cost();
                let min_q = item.min_order();
                let max_q = item
                    .max_storage_qty
                    .unwrap_or_else(|| floor_units(self.constraints.total_budget / unit));
                if max_q == 0 || max_q < min_q {
                    return RankedItem {
                        id: item.id,
                        score: 0.0,
                        best_quantity: 0,
                        best_value: 0.0,
                    };
                }
                let mixture = self.mixture_for(item, &scenarios);
                let step = self.coarse_step(item, min_q, max_q);
                let best = optimize_quantity(min_q, max_q, step, |q| mixture.option_value(q) * n.fx_rate);
                let capital = (f64::from(best.best_quantity) * unit).max(1.0);
                RankedItem {
                    id: item.id,
                    score: best.best_option_value / capital,
                    best_quantity: best.best_quantity,
                    best_value: best.best_option_value,
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Runs ranking, greedy fill, correlation rules, constraint enforcement
    /// and diversification backfill, then measures the result.
    pub fn optimize(&self) -> EngineResult<PortfolioAllocation> {
        let normalized = self.normalize_all();
        let ranked = self.rank_items(&normalized);
        let c = &self.constraints;
        let sku_cap = c.total_budget * c.effective_max_share();

        let mut allocation = BTreeMap::new();
        let mut remaining_budget = c.total_budget;
        let mut remaining_space = c.warehouse_capacity;
        let mut suppliers: BTreeSet<&str> = BTreeSet::new();

        for r in &ranked {
            let (Some(item), Some(n)) = (self.items.get(&r.id), normalized.get(&r.id)) else {
                continue;
            };
            if let Some(limit) = c.max_suppliers {
                if !suppliers.contains(n.supplier.as_str()) && suppliers.len() >= limit {
                    debug!(item = r.id, supplier = %n.supplier, "skipped: supplier limit reached");
                    continue;
                }
            }
            let unit = n.budget_unit_cost();
            let by_budget = floor_units(remaining_budget.min(sku_cap) / unit);
            let by_space = floor_units(remaining_space / n.volume);
            let bound = by_budget
                .min(by_space)
                .min(item.max_storage_qty.unwrap_or(u32::MAX));
            let min_q = item.min_order();
            if bound == 0 || bound < min_q {
                debug!(item = r.id, bound, min_q, "skipped: no feasible quantity");
                continue;
            }
            let qty = bound.min(r.best_quantity.max(min_q));
            if qty == 0 {
                continue;
            }
            if let Some(min_value) = c.min_order_value {
                if f64::from(qty) * unit < min_value {
                    debug!(item = r.id, qty, "skipped: below minimum order value");
                    continue;
                }
            }
            allocation.insert(r.id, qty);
            suppliers.insert(n.supplier.as_str());
            remaining_budget -= f64::from(qty) * unit;
            remaining_space -= f64::from(qty) * n.volume;
        }

        let adjusted = apply_correlation_rules(
            &allocation,
            &normalized,
            &self.rules,
            self.settings.active_season.as_deref(),
        );
        let mut allocation = self.enforce_constraints(adjusted, &normalized);
        let shortfall = self.backfill(&mut allocation, &ranked, &normalized);
        if shortfall > 0 {
            warn!(
                shortfall,
                required = c.min_distinct_skus,
                "budget too small to reach the minimum number of distinct items"
            );
        }

        let mut result = self.evaluate_allocation(allocation, &normalized)?;
        result.diversification_shortfall = shortfall;
        info!(
            items = result.allocations.len(),
            investment = result.total_investment,
            expected_return = result.expected_return,
            risk = result.portfolio_risk,
            "portfolio optimized"
        );
        Ok(result)
    }

    /// Clamps every item to its per-item budget cap and storage limit, then
    /// scales the whole allocation down by the binding ratio if budget or
    /// capacity is still exceeded.
    fn enforce_constraints(
        &self,
        allocation: BTreeMap<ItemId, u32>,
        normalized: &BTreeMap<ItemId, NormalizedItem>,
    ) -> BTreeMap<ItemId, u32> {
        let c = &self.constraints;
        let sku_cap = c.total_budget * c.effective_max_share();

        let clamped: BTreeMap<ItemId, u32> = allocation
            .into_iter()
            .filter_map(|(id, qty)| {
                let n = normalized.get(&id)?;
                let storage = self.items.get(&id).and_then(|i| i.max_storage_qty).unwrap_or(u32::MAX);
                let qty = qty.min(floor_units(sku_cap / n.budget_unit_cost())).min(storage);
                (qty > 0).then_some((id, qty))
            })
            .collect();

        let (cost, volume) = totals(&clamped, normalized);
        if cost <= c.total_budget && volume <= c.warehouse_capacity {
            return clamped;
        }
        let budget_ratio = if cost > 0.0 { c.total_budget / cost } else { 1.0 };
        let volume_ratio = if volume > 0.0 { c.warehouse_capacity / volume } else { 1.0 };
        let scale = budget_ratio.min(volume_ratio);
        debug!(cost, volume, scale, "scaling allocation to fit constraints");

        clamped
            .into_iter()
            .filter_map(|(id, qty)| {
                let scaled = floor_units(f64::from(qty) * scale);
                (scaled > 0).then_some((id, scaled))
            })
            .collect()
    }

    /// Adds one unit of the next-ranked unallocated items until
    /// `min_distinct_skus` is met or nothing else fits. Returns the shortfall.
    fn backfill(
        &self,
        allocation: &mut BTreeMap<ItemId, u32>,
        ranked: &[RankedItem],
        normalized: &BTreeMap<ItemId, NormalizedItem>,
    ) -> usize {
        let c = &self.constraints;
        let required = c.min_distinct_skus;
        if allocation.len() >= required {
            return 0;
        }
        let sku_cap = c.total_budget * c.effective_max_share();
        let (cost, volume) = totals(allocation, normalized);
        let mut remaining_budget = c.total_budget - cost;
        let mut remaining_space = c.warehouse_capacity - volume;

        for r in ranked {
            if allocation.len() >= required {
                break;
            }
            if allocation.contains_key(&r.id) {
                continue;
            }
            let Some(n) = normalized.get(&r.id) else {
                continue;
            };
            let unit = n.budget_unit_cost();
            if unit > remaining_budget || unit > sku_cap || n.volume > remaining_space {
                continue;
            }
            debug!(item = r.id, "backfilled one unit for diversification");
            allocation.insert(r.id, 1);
            remaining_budget -= unit;
            remaining_space -= n.volume;
        }
        required.saturating_sub(allocation.len())
    }

    /// Investment, mixture value, exposures and risk of a given allocation.
    pub fn evaluate_allocation(
        &self,
        allocation: BTreeMap<ItemId, u32>,
        normalized: &BTreeMap<ItemId, NormalizedItem>,
    ) -> EngineResult<PortfolioAllocation> {
        let scenarios = scenarios_or_baseline(&self.scenarios);
        let mut total_investment = 0.0;
        let mut expected_return = 0.0;
        let mut currency_exposure = BTreeMap::new();
        let mut supplier_concentration = BTreeMap::new();
        let mut series = BTreeMap::new();
        let seed = self.params.random_seed.unwrap_or(DEFAULT_SEED);

        for (&id, &qty) in &allocation {
            let item = self.item(id)?;
            let n = normalized.get(&id).ok_or(EngineError::UnknownItem(id))?;
            let investment = f64::from(qty) * n.strike;
            total_investment += investment;
            expected_return += (self.mixture_for(item, &scenarios).option_value(qty) * n.fx_rate).max(0.0);
            *currency_exposure.entry(n.currency.clone()).or_insert(0.0) += investment;
            *supplier_concentration.entry(n.supplier.clone()).or_insert(0.0) += investment;

            let history = self.history.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            series.insert(
                id,
                weekly_revenue_series(
                    item,
                    history,
                    n.fx_rate,
                    self.as_of,
                    self.settings.lookback_weeks,
                    seed.wrapping_add(id),
                )?,
            );
        }

        let weights = investment_weights(&allocation, normalized);
        let portfolio_risk = portfolio_risk(&weights, &series, self.correlations.as_ref());

        Ok(PortfolioAllocation {
            allocations: allocation,
            total_investment,
            expected_return,
            portfolio_risk,
            currency_exposure,
            supplier_concentration,
            diversification_shortfall: 0,
        })
    }

    /// Delivery calendar for `allocation`, starting from the reference date.
    pub fn create_delivery_schedule(&self, allocation: &PortfolioAllocation) -> EngineResult<Vec<DeliveryWeek>> {
        create_delivery_schedule(
            &allocation.allocations,
            &self.items,
            self.synth.tables(),
            self.params.lead_time_weeks,
            &self.events,
            self.as_of,
        )
    }
}

/// Whole units affordable for `x`; 0 for negative or non-finite input.
pub(crate) fn floor_units(x: f64) -> u32 {
    if x.is_nan() || x <= 0.0 {
        0
    } else {
        x.floor().min(f64::from(u32::MAX)) as u32
    }
}

/// Budget cost and storage volume of an allocation.
fn totals(allocation: &BTreeMap<ItemId, u32>, normalized: &BTreeMap<ItemId, NormalizedItem>) -> (f64, f64) {
    allocation
        .iter()
        .filter_map(|(id, qty)| normalized.get(id).map(|n| (f64::from(*qty), n)))
        .fold((0.0, 0.0), |(cost, volume), (q, n)| {
            (cost + q * n.budget_unit_cost(), volume + q * n.volume)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ValuationParameters {
        ValuationParameters {
            lead_time_weeks: 4.0,
            random_seed: Some(5),
            monte_carlo_iterations: Some(300),
            ..ValuationParameters::default()
        }
    }

    fn catalog() -> Vec<Item> {
        vec![
            Item::new(1, "PHONE-1", 20.0, 6.0, 100.0, 40.0).with_name("Phone"),
            Item::new(2, "CASE-1", 40.0, 10.0, 5.0, 6.0).with_name("Phone case"),
            Item::new(3, "LAMP-1", 10.0, 4.0, 3.0, 1.0)
                .with_currency("USD")
                .with_supplier("china")
                .with_volume(2.0),
            Item::new(4, "MUG-1", 15.0, 5.0, 8.0, 4.0).with_supplier("europe"),
        ]
    }

    fn optimizer(constraints: PortfolioConstraints) -> PortfolioOptimizer {
        PortfolioOptimizer::new(catalog(), constraints, params(), MarketTables::default())
            .unwrap()
            .as_of(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
    }

    #[test]
    fn floor_units_handles_edges() {
        assert_eq!(floor_units(-3.0), 0);
        assert_eq!(floor_units(f64::NAN), 0);
        assert_eq!(floor_units(7.9), 7);
        assert_eq!(floor_units(f64::INFINITY), u32::MAX);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let items = vec![Item::new(1, "A", 1.0, 0.0, 1.0, 1.0), Item::new(1, "B", 1.0, 0.0, 1.0, 1.0)];
        let err = PortfolioOptimizer::new(items, PortfolioConstraints::default(), params(), MarketTables::default());
        assert!(matches!(err, Err(EngineError::Validation(_))));
    }

    #[test]
    fn history_for_unknown_item_is_rejected() {
        let opt = optimizer(PortfolioConstraints::default());
        assert_eq!(opt.with_sales_history(99, Vec::new()).unwrap_err(), EngineError::UnknownItem(99));
    }

    #[test]
    fn allocation_respects_budget_capacity_and_share() {
        let constraints = PortfolioConstraints {
            total_budget: 20_000.0,
            warehouse_capacity: 600.0,
            max_sku_share: 0.4,
            ..PortfolioConstraints::default()
        };
        let opt = optimizer(constraints.clone());
        let normalized = opt.normalize_all();
        let result = opt.optimize().unwrap();
        assert!(!result.allocations.is_empty());

        let (cost, volume) = totals(&result.allocations, &normalized);
        assert!(cost <= constraints.total_budget + 1e-6);
        assert!(volume <= constraints.warehouse_capacity + 1e-6);
        for (id, qty) in &result.allocations {
            let unit = normalized[id].budget_unit_cost();
            assert!(f64::from(*qty) * unit <= constraints.total_budget * 0.4 + 1e-6);
        }
        let exposure: f64 = result.currency_exposure.values().sum();
        assert!((exposure - result.total_investment).abs() < 1e-6);
        assert!(result.expected_return >= 0.0);
        assert!(result.portfolio_risk >= 0.0);
    }

    #[test]
    fn zero_budget_allocates_nothing() {
        let opt = optimizer(PortfolioConstraints {
            total_budget: 0.0,
            min_distinct_skus: 2,
            ..PortfolioConstraints::default()
        });
        let result = opt.optimize().unwrap();
        assert!(result.allocations.is_empty());
        assert_eq!(result.total_investment, 0.0);
        assert_eq!(result.portfolio_risk, 0.0);
        assert_eq!(result.diversification_shortfall, 2);
    }

    #[test]
    fn supplier_limit_caps_distinct_suppliers() {
        let opt = optimizer(PortfolioConstraints {
            max_suppliers: Some(1),
            ..PortfolioConstraints::default()
        });
        let result = opt.optimize().unwrap();
        assert_eq!(result.supplier_concentration.len(), 1);
    }

    #[test]
    fn backfill_adds_single_units() {
        let opt = optimizer(PortfolioConstraints {
            total_budget: 20_000.0,
            warehouse_capacity: 10_000.0,
            ..PortfolioConstraints::default()
        });
        let normalized = opt.normalize_all();
        let ranked = opt.rank_items(&normalized);
        let mut alloc: BTreeMap<ItemId, u32> = [(ranked[0].id, 1)].into_iter().collect();
        let mut constraints = opt.constraints().clone();
        constraints.min_distinct_skus = 3;
        let opt = PortfolioOptimizer { constraints, ..opt };
        let shortfall = opt.backfill(&mut alloc, &ranked, &normalized);
        assert_eq!(shortfall, 0);
        assert_eq!(alloc.len(), 3);
        assert!(alloc.values().all(|q| *q == 1));
    }

    #[test]
    fn enforcement_scales_by_binding_ratio() {
        let opt = optimizer(PortfolioConstraints {
            total_budget: 1_000.0,
            warehouse_capacity: 1_000.0,
            max_sku_share: 1.0,
            ..PortfolioConstraints::default()
        });
        let normalized = opt.normalize_all();
        // 150 * 5 + 100 * 8 = 1550 > 1000 -> ratio 0.645
        let alloc: BTreeMap<ItemId, u32> = [(2, 150), (4, 100)].into_iter().collect();
        let out = opt.enforce_constraints(alloc, &normalized);
        assert_eq!(out[&2], 96);
        assert_eq!(out[&4], 64);
    }

    #[test]
    fn ranking_is_sorted_by_score() {
        let opt = optimizer(PortfolioConstraints::default());
        let ranked = opt.rank_items(&opt.normalize_all());
        assert_eq!(ranked.len(), 4);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
