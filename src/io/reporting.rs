// src/io/reporting.rs

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::model::item::ItemId;
use crate::portfolio::{DeliveryWeek, FrontierPoint, PortfolioAllocation, PortfolioOptimizer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRow {
    pub item_id: ItemId,
    pub sku: String,
    pub quantity: u32,
    pub currency: String,
    pub supplier: String,
    /// Quantity times unit cost, in base currency.
    pub investment: f64,
    /// Option inputs of the item: lead-time revenue in base currency,
    /// combined volatility and lead time in years.
    pub expected_revenue: f64,
    pub volatility: f64,
    pub expiry_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierRow {
    pub target_risk: f64,
    pub achieved_risk: f64,
    pub return_ratio: f64,
    pub total_investment: f64,
    pub items: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub week_start: NaiveDate,
    pub supplier: String,
    pub item_id: ItemId,
    pub sku: String,
    pub quantity: u32,
    pub total_value: f64,
}

/// Flattens an allocation into one row per item, with the item's normalized
/// option view alongside the order.
pub fn allocation_rows(optimizer: &PortfolioOptimizer, allocation: &PortfolioAllocation) -> EngineResult<Vec<AllocationRow>> {
    let normalized = optimizer.normalize_all();
    allocation
        .allocations
        .iter()
        .map(|(&id, &quantity)| {
            let n = normalized.get(&id).ok_or(EngineError::UnknownItem(id))?;
            Ok(AllocationRow {
                item_id: id,
                sku: n.sku.clone(),
                quantity,
                currency: n.currency.clone(),
                supplier: n.supplier.clone(),
                investment: f64::from(quantity) * n.strike,
                expected_revenue: n.spot,
                volatility: n.sigma,
                expiry_years: n.expiry,
            })
        })
        .collect()
}

pub fn frontier_rows(points: &[FrontierPoint]) -> Vec<FrontierRow> {
    points
        .iter()
        .map(|p| FrontierRow {
            target_risk: p.target_risk,
            achieved_risk: p.achieved_risk,
            return_ratio: p.return_ratio,
            total_investment: p.total_investment,
            items: p.allocation.len(),
        })
        .collect()
}

pub fn schedule_rows(schedule: &[DeliveryWeek]) -> Vec<ScheduleRow> {
    schedule
        .iter()
        .flat_map(|week| {
            week.orders.iter().map(move |o| ScheduleRow {
                week_start: week.week_start,
                supplier: o.supplier.clone(),
                item_id: o.item_id,
                sku: o.sku.clone(),
                quantity: o.quantity,
                total_value: o.total_value,
            })
        })
        .collect()
}

/// Writes serializable rows to a CSV file with a header line.
///
/// # Arguments
/// * `file_path` - Where to save the file (e.g., "out/allocation.csv").
/// * `rows` - One record per line.
pub fn write_csv<T: Serialize>(file_path: impl AsRef<Path>, rows: &[T]) -> EngineResult<usize> {
    let path = file_path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    info!(rows = rows.len(), path = %path.display(), "report written");
    Ok(rows.len())
}
