// src/portfolio/normalize.rs

//! Items restated in the base currency on a common weekly time unit.

use serde::Serialize;

use crate::config::ValuationParameters;
use crate::demand::DemandModel;
use crate::model::item::{Item, ItemId};
use crate::pricing::VolatilitySynthesizer;

/// Smallest unit cost used in budget arithmetic.
const MIN_BUDGET_UNIT_COST: f64 = 1.0;

/// Read-only option view of one item.
///
/// Carries only the item id; the full record is resolved through the
/// allocator's lookup table. `spot`, `expiry` and `sigma` are not used by the
/// greedy fill and are exported per allocated item by
/// [`allocation_rows`](crate::io::reporting::allocation_rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedItem {
    pub id: ItemId,
    pub sku: String,
    pub name: String,
    /// Expected lead-time revenue in base currency.
    pub spot: f64,
    /// Unit cost in base currency.
    pub strike: f64,
    /// Lead time in years.
    pub expiry: f64,
    pub sigma: f64,
    pub volume: f64,
    pub supplier: String,
    pub currency: String,
    pub fx_rate: f64,
}

impl NormalizedItem {
    /// Unit cost charged against the budget, floored at 1 base unit.
    pub fn budget_unit_cost(&self) -> f64 {
        self.strike.max(MIN_BUDGET_UNIT_COST)
    }

    /// Searchable lowercase text for keyword rules.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.name.to_lowercase().contains(&keyword) || self.sku.to_lowercase().contains(&keyword)
    }
}

pub fn normalize_item(item: &Item, params: &ValuationParameters, synth: &VolatilitySynthesizer) -> NormalizedItem {
    let weeks = params.lead_time_weeks;
    let tables = synth.tables();
    let fx_rate = tables.fx_rate(&item.currency);
    let demand = DemandModel::new(item.weekly_demand_mean, item.weekly_demand_std, weeks);

    NormalizedItem {
        id: item.id,
        sku: item.sku.clone(),
        name: item.name.clone(),
        spot: item.weekly_demand_mean * item.full_price() * weeks * fx_rate,
        strike: item.unit_cost * fx_rate,
        expiry: params.horizon_years(),
        sigma: synth.combined_volatility(
            &demand,
            demand.horizon_mean(),
            params.rush_probability,
            &item.currency,
            &item.supplier_class,
        ),
        volume: item.unit_volume(),
        supplier: item.supplier_class.to_lowercase(),
        currency: item.currency.to_uppercase(),
        fx_rate,
    }
}
