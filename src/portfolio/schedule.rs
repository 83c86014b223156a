// src/portfolio/schedule.rs

//! Delivery calendar for an allocation.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::config::MarketTables;
use crate::demand::effective_purchase_price;
use crate::error::{EngineError, EngineResult};
use crate::model::item::{Item, ItemId};
use crate::portfolio::logistics::{adjusted_lead_time, LogisticsEvent};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledOrder {
    pub item_id: ItemId,
    pub sku: String,
    pub quantity: u32,
    pub supplier: String,
    /// Purchase value in base currency after volume discounts.
    pub total_value: f64,
    pub lead_time_weeks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryWeek {
    /// Monday of the arrival week.
    pub week_start: NaiveDate,
    /// Sorted by supplier, then item id.
    pub orders: Vec<ScheduledOrder>,
}

impl DeliveryWeek {
    pub fn total_value(&self) -> f64 {
        self.orders.iter().map(|o| o.total_value).sum()
    }

    pub fn value_by_supplier(&self) -> BTreeMap<&str, f64> {
        let mut totals = BTreeMap::new();
        for order in &self.orders {
            *totals.entry(order.supplier.as_str()).or_insert(0.0) += order.total_value;
        }
        totals
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Buckets each order into the week it arrives, `as_of` plus the supplier's
/// lead time after logistics delays.
pub fn create_delivery_schedule(
    allocation: &BTreeMap<ItemId, u32>,
    items: &BTreeMap<ItemId, Item>,
    tables: &MarketTables,
    lead_time_weeks: f64,
    events: &[LogisticsEvent],
    as_of: NaiveDate,
) -> EngineResult<Vec<DeliveryWeek>> {
    let mut weeks: BTreeMap<NaiveDate, Vec<ScheduledOrder>> = BTreeMap::new();

    for (&id, &quantity) in allocation.iter().filter(|(_, q)| **q > 0) {
        let item = items.get(&id).ok_or(EngineError::UnknownItem(id))?;
        let supplier = item.supplier_class.to_lowercase();
        let lead = adjusted_lead_time(lead_time_weeks, &supplier, events, as_of);
        let arrival = as_of + Duration::days((lead * 7.0).round() as i64);
        let unit = effective_purchase_price(item.unit_cost, quantity, &item.volume_discount_tiers);

        weeks.entry(week_start(arrival)).or_default().push(ScheduledOrder {
            item_id: id,
            sku: item.sku.clone(),
            quantity,
            supplier,
            total_value: f64::from(quantity) * unit * tables.fx_rate(&item.currency),
            lead_time_weeks: lead,
        });
    }

    Ok(weeks
        .into_iter()
        .map(|(week_start, mut orders)| {
            orders.sort_by(|a, b| a.supplier.cmp(&b.supplier).then(a.item_id.cmp(&b.item_id)));
            DeliveryWeek { week_start, orders }
        })
        .collect())
}
