// src/portfolio/frontier.rs

//! Approximate risk/return frontier for visualization.
//!
//! Each point rescales the optimized allocation uniformly by
//! `target_risk / base_risk` and re-measures it. Because the risk metric is
//! a coefficient of variation over investment shares, uniform scaling leaves
//! the achieved risk nearly unchanged; both the target and the achieved value
//! are reported so callers can see the gap. Scaled points are not re-checked
//! against budget or capacity.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::error::EngineResult;
use crate::model::item::ItemId;
use crate::portfolio::allocator::{PortfolioAllocation, PortfolioOptimizer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierPoint {
    pub target_risk: f64,
    pub achieved_risk: f64,
    /// Expected return per unit invested.
    pub return_ratio: f64,
    pub total_investment: f64,
    pub allocation: BTreeMap<ItemId, u32>,
}

/// `points` evenly spaced levels over `[min, max]`, both ends included.
pub fn risk_levels(min: f64, max: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![min],
        n => {
            let step = (max - min) / (n - 1) as f64;
            (0..n).map(|i| min + step * i as f64).collect()
        }
    }
}

impl PortfolioOptimizer {
    /// Optimizes once, then builds `points` frontier points around the result.
    pub fn build_efficient_frontier(&self, points: usize) -> EngineResult<Vec<FrontierPoint>> {
        let base = self.optimize()?;
        self.frontier_from(&base, points)
    }

    /// Frontier points derived from an already optimized allocation.
    ///
    /// With a riskless base allocation every point reports it unscaled.
    pub fn frontier_from(&self, base: &PortfolioAllocation, points: usize) -> EngineResult<Vec<FrontierPoint>> {
        let settings = self.settings();
        let normalized = self.normalize_all();

        risk_levels(settings.frontier_min_risk, settings.frontier_max_risk, points)
            .into_iter()
            .map(|target_risk| {
                let ratio = if base.portfolio_risk > 0.0 {
                    target_risk / base.portfolio_risk
                } else {
                    1.0
                };
                let scaled: BTreeMap<ItemId, u32> = base
                    .allocations
                    .iter()
                    .map(|(id, qty)| (*id, (f64::from(*qty) * ratio).round().max(0.0) as u32))
                    .filter(|(_, qty)| *qty > 0)
                    .collect();
                let measured = self.evaluate_allocation(scaled, &normalized)?;
                debug!(target_risk, ratio, achieved = measured.portfolio_risk, "frontier point");
                Ok(FrontierPoint {
                    target_risk,
                    achieved_risk: measured.portfolio_risk,
                    return_ratio: measured.return_ratio(),
                    total_investment: measured.total_investment,
                    allocation: measured.allocations,
                })
            })
            .collect()
    }
}
