// src/model/item.rs

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

pub type ItemId = u64;

/// A quantity threshold that unlocks a percentage discount on the unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeDiscountTier {
    pub min_qty: u32,
    /// Discount in percent, e.g. `10.0` for 10%.
    pub discount_pct: f64,
}

impl VolumeDiscountTier {
    pub fn new(min_qty: u32, discount_pct: f64) -> Self {
        Self {
            min_qty,
            discount_pct,
        }
    }
}

/// Monthly demand multipliers (1.0 = normal demand) anchored at the current month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityProfile {
    pub monthly_factors: [f64; 12],
    /// Zero-based month index (0 = January).
    pub current_month: usize,
}

/// A stock-keeping unit as handed over by the data-ingestion side.
///
/// The engine never mutates or persists items; every computation takes them
/// by reference and returns fresh results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub sku: String,
    pub name: String,

    // Demand model (units per week)
    pub weekly_demand_mean: f64,
    pub weekly_demand_std: f64,

    // Economics, in the item's own currency
    pub unit_cost: f64,
    pub unit_margin: f64,
    pub currency: String,
    pub supplier_class: String,

    // Ordering constraints
    pub volume_per_unit: Option<f64>,
    pub min_order_qty: Option<u32>,
    pub max_storage_qty: Option<u32>,
    #[serde(default)]
    pub volume_discount_tiers: Vec<VolumeDiscountTier>,
    pub seasonality: Option<SeasonalityProfile>,
    #[serde(default)]
    pub current_stock: u32,
}

impl Item {
    /// Creates an item priced in RUB from a domestic supplier with no
    /// ordering constraints.
    pub fn new(
        id: ItemId,
        sku: impl Into<String>,
        weekly_demand_mean: f64,
        weekly_demand_std: f64,
        unit_cost: f64,
        unit_margin: f64,
    ) -> Self {
        let sku = sku.into();
        Self {
            id,
            name: sku.clone(),
            sku,
            weekly_demand_mean,
            weekly_demand_std,
            unit_cost,
            unit_margin,
            currency: "RUB".to_string(),
            supplier_class: "domestic".to_string(),
            volume_per_unit: None,
            min_order_qty: None,
            max_storage_qty: None,
            volume_discount_tiers: Vec::new(),
            seasonality: None,
            current_stock: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_supplier(mut self, supplier_class: impl Into<String>) -> Self {
        self.supplier_class = supplier_class.into();
        self
    }

    pub fn with_volume(mut self, volume_per_unit: f64) -> Self {
        self.volume_per_unit = Some(volume_per_unit);
        self
    }

    pub fn with_order_bounds(mut self, min_qty: Option<u32>, max_qty: Option<u32>) -> Self {
        self.min_order_qty = min_qty;
        self.max_storage_qty = max_qty;
        self
    }

    pub fn with_discount_tiers(mut self, tiers: Vec<VolumeDiscountTier>) -> Self {
        self.volume_discount_tiers = tiers;
        self
    }

    pub fn with_seasonality(mut self, profile: SeasonalityProfile) -> Self {
        self.seasonality = Some(profile);
        self
    }

    pub fn with_current_stock(mut self, units: u32) -> Self {
        self.current_stock = units;
        self
    }

    /// Selling price per unit: cost plus margin.
    pub fn full_price(&self) -> f64 {
        self.unit_cost + self.unit_margin
    }

    /// Storage volume per unit; missing or non-positive volumes count as 1.
    pub fn unit_volume(&self) -> f64 {
        match self.volume_per_unit {
            Some(v) if v > 0.0 => v,
            _ => 1.0,
        }
    }

    pub fn min_order(&self) -> u32 {
        self.min_order_qty.unwrap_or(0)
    }

    /// Boundary check for records coming from outside the engine.
    pub fn validate(&self) -> EngineResult<()> {
        let finite = [
            self.weekly_demand_mean,
            self.weekly_demand_std,
            self.unit_cost,
            self.unit_margin,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::validation(format!(
                "item {} has non-finite demand or price fields",
                self.id
            )));
        }
        if self.weekly_demand_mean < 0.0 || self.weekly_demand_std < 0.0 {
            return Err(EngineError::validation(format!(
                "item {} has negative weekly demand mean or std",
                self.id
            )));
        }
        if let (Some(min), Some(max)) = (self.min_order_qty, self.max_storage_qty) {
            if min > max {
                return Err(EngineError::validation(format!(
                    "item {}: min order {} exceeds max storage {}",
                    self.id, min, max
                )));
            }
        }
        if let Some(tier) = self
            .volume_discount_tiers
            .iter()
            .find(|t| !(0.0..=100.0).contains(&t.discount_pct))
        {
            return Err(EngineError::validation(format!(
                "item {}: discount {}% out of range",
                self.id, tier.discount_pct
            )));
        }
        if let Some(profile) = &self.seasonality {
            if profile.current_month >= 12 {
                return Err(EngineError::validation(format!(
                    "item {}: current month {} out of range",
                    self.id, profile.current_month
                )));
            }
            if profile.monthly_factors.iter().any(|f| !f.is_finite() || *f < 0.0) {
                return Err(EngineError::validation(format!(
                    "item {}: seasonality factors must be finite and non-negative",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_inverted_order_bounds() {
        let item = Item::new(1, "A-1", 10.0, 2.0, 100.0, 50.0).with_order_bounds(Some(20), Some(10));
        assert!(matches!(item.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn validate_rejects_negative_std() {
        let item = Item::new(1, "A-1", 10.0, -1.0, 100.0, 50.0);
        assert!(item.validate().is_err());
    }

    #[test]
    fn unit_volume_defaults_to_one() {
        let item = Item::new(1, "A-1", 10.0, 2.0, 100.0, 50.0);
        assert_eq!(item.unit_volume(), 1.0);
        assert_eq!(item.clone().with_volume(0.0).unit_volume(), 1.0);
        assert_eq!(item.with_volume(2.5).unit_volume(), 2.5);
    }
}
