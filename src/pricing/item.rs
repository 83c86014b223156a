// src/pricing/item.rs

//! Single-item "stock as a call option" valuation.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SimulationMethod, ValuationParameters};
use crate::demand::estimator::resolve_method;
use crate::demand::seasonality::average_seasonal_demand;
use crate::demand::service_level::{newsvendor_quantity, reorder_point, safety_stock};
use crate::demand::{effective_purchase_price, expected_revenue, DemandModel, MonteCarloSettings, RevenueTerms};
use crate::error::EngineResult;
use crate::model::item::Item;
use crate::pricing::black_scholes::black_scholes_call;
use crate::pricing::optimizer::{optimize_quantity, OptimizationResult};
use crate::pricing::volatility::VolatilitySynthesizer;

/// Std multiples above horizon mean covered by the default search range.
const DEFAULT_RANGE_SIGMAS: f64 = 6.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemValuation {
    pub item_id: u64,
    pub optimization: OptimizationResult,
    /// Method actually used after resolving `Auto`.
    pub method: SimulationMethod,
    /// Weekly mean after averaging seasonality over the lead time.
    pub seasonal_mu_week: f64,
    pub safety_stock: u32,
    pub reorder_point: u32,
    /// Classic newsvendor target for comparison; `None` when the critical
    /// ratio is degenerate (e.g. zero margin).
    pub newsvendor_quantity: Option<u32>,
}

/// Values one item at a given order quantity.
#[derive(Debug, Clone)]
pub struct ItemValuer<'a> {
    item: &'a Item,
    params: &'a ValuationParameters,
    synth: &'a VolatilitySynthesizer,
    demand: DemandModel,
    settings: MonteCarloSettings,
}

impl<'a> ItemValuer<'a> {
    pub fn new(item: &'a Item, params: &'a ValuationParameters, synth: &'a VolatilitySynthesizer) -> Self {
        let weeks = params.lead_time_weeks;
        let mu = average_seasonal_demand(item.weekly_demand_mean, item.seasonality.as_ref(), weeks);
        Self {
            item,
            params,
            synth,
            demand: DemandModel::new(mu, item.weekly_demand_std, weeks),
            settings: MonteCarloSettings::from(params),
        }
    }

    pub fn demand(&self) -> &DemandModel {
        &self.demand
    }

    /// Option value of ordering `q` units on top of current stock.
    pub fn option_value(&self, q: u32) -> f64 {
        let item = self.item;
        let p = self.params;
        let unit = effective_purchase_price(item.unit_cost, q, &item.volume_discount_tiers);
        let on_hand = q.saturating_add(item.current_stock);
        let terms = RevenueTerms::new(unit, item.unit_margin, p.rush_probability, p.rush_unit_penalty);

        let spot = expected_revenue(on_hand, &self.demand, &terms, &self.settings);
        let qf = f64::from(q);
        let strike = qf * unit * (1.0 + p.annual_cost_of_capital * p.horizon_years())
            + qf * p.holding_cost_per_unit_per_week * p.lead_time_weeks;
        let vol = self.synth.combined_volatility(
            &self.demand,
            f64::from(on_hand),
            p.rush_probability,
            &item.currency,
            &item.supplier_class,
        );
        black_scholes_call(spot, strike, p.horizon_years(), vol, p.annual_cost_of_capital)
    }

    /// Search range: the item's order bounds, else a horizon-demand heuristic.
    pub fn quantity_bounds(&self) -> (u32, u32) {
        let min_q = self.item.min_order();
        let fallback = || {
            let reach = self.demand.horizon_mean() + DEFAULT_RANGE_SIGMAS * self.demand.horizon_std();
            reach.ceil().max(1.0) as u32
        };
        let max_q = match (self.item.max_storage_qty, self.params.max_order_units) {
            (Some(storage), Some(units)) => storage.min(units),
            (Some(storage), None) => storage,
            (None, Some(units)) => units,
            (None, None) => fallback(),
        };
        (min_q, max_q.max(min_q))
    }

    pub fn coarse_step(&self) -> u32 {
        (self.demand.mu_week / 10.0).round().max(1.0) as u32
    }
}

/// Finds the value-maximizing order quantity for one item and reports the
/// service-level figures alongside it.
pub fn evaluate_item(
    item: &Item,
    params: &ValuationParameters,
    synth: &VolatilitySynthesizer,
) -> EngineResult<ItemValuation> {
    item.validate()?;
    let valuer = ItemValuer::new(item, params, synth);
    let demand = *valuer.demand();

    let safety = safety_stock(item.weekly_demand_std, params.lead_time_weeks, params.service_level_target)?;
    let rop = reorder_point(demand.mu_week, params.lead_time_weeks, safety);
    let overage = params.holding_cost_per_unit_per_week * params.lead_time_weeks
        + item.unit_cost * params.annual_cost_of_capital * params.horizon_years();
    let newsvendor = newsvendor_quantity(item.unit_margin, overage, &demand).ok();

    let (min_q, max_q) = valuer.quantity_bounds();
    let step = valuer.coarse_step();
    debug!(item = item.id, min_q, max_q, step, "valuing item");
    let optimization = optimize_quantity(min_q, max_q, step, |q| valuer.option_value(q));

    let method = resolve_method(&demand, params.simulation_method);
    info!(
        item = item.id,
        sku = %item.sku,
        best_q = optimization.best_quantity,
        value = optimization.best_option_value,
        safety,
        ?method,
        "item valuation complete"
    );

    Ok(ItemValuation {
        item_id: item.id,
        optimization,
        method,
        seasonal_mu_week: demand.mu_week,
        safety_stock: safety,
        reorder_point: rop,
        newsvendor_quantity: newsvendor,
    })
}
