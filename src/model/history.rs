// src/model/history.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One dated sale of an item, in the item's own currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub units: f64,
    /// Recorded revenue; absent or non-positive values are priced from units.
    pub revenue: Option<f64>,
}

impl SalesRecord {
    pub fn new(date: NaiveDate, units: f64, revenue: Option<f64>) -> Self {
        Self { date, units, revenue }
    }

    /// Recorded revenue, else `units * unit_price`; never negative.
    pub fn revenue_or(&self, unit_price: f64) -> f64 {
        match self.revenue {
            Some(r) if r > 0.0 => r,
            _ => (self.units * unit_price).max(0.0),
        }
    }
}
