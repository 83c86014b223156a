// src/portfolio/metrics.rs

//! Portfolio risk as the coefficient of variation of weekly revenue.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::demand::stats::bucket_by_week;
use crate::error::EngineResult;
use crate::io::demand::generate_seeded_demand;
use crate::math::mean_std;
use crate::model::history::SalesRecord;
use crate::model::item::{Item, ItemId};
use crate::portfolio::normalize::NormalizedItem;

/// Externally estimated pairwise correlations, `rho[i][j]`.
pub type CorrelationMatrix = BTreeMap<ItemId, BTreeMap<ItemId, f64>>;

/// Weekly revenue in base currency for the `lookback` weeks ending at `as_of`.
///
/// Items without history get a synthetic unit series drawn from their
/// weekly demand model with `seed`, priced at full price.
pub fn weekly_revenue_series(
    item: &Item,
    history: &[SalesRecord],
    fx_rate: f64,
    as_of: NaiveDate,
    lookback: usize,
    seed: u64,
) -> EngineResult<Vec<f64>> {
    let price = item.full_price();
    if history.is_empty() {
        let units = generate_seeded_demand(lookback, item.weekly_demand_mean, item.weekly_demand_std, seed)?;
        return Ok(units.into_iter().map(|u| u * price * fx_rate).collect());
    }
    let records: Vec<(NaiveDate, f64)> = history
        .iter()
        .map(|r| (r.date, r.revenue_or(price) * fx_rate))
        .collect();
    Ok(bucket_by_week(&records, as_of, lookback))
}

/// Investment share per allocated item; empty when nothing is invested.
pub fn investment_weights(
    allocation: &BTreeMap<ItemId, u32>,
    items: &BTreeMap<ItemId, NormalizedItem>,
) -> BTreeMap<ItemId, f64> {
    let investments: BTreeMap<ItemId, f64> = allocation
        .iter()
        .filter_map(|(id, qty)| items.get(id).map(|n| (*id, f64::from(*qty) * n.strike)))
        .collect();
    let total: f64 = investments.values().sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    investments.into_iter().map(|(id, inv)| (id, inv / total)).collect()
}

/// CV of investment-weighted weekly revenue.
///
/// With a non-empty correlation matrix the variance is `Σ wᵢwⱼρᵢⱼσᵢσⱼ`
/// (missing pairs count as uncorrelated, the diagonal as 1); otherwise the
/// weighted series are summed week by week and measured directly.
pub fn portfolio_risk(
    weights: &BTreeMap<ItemId, f64>,
    series: &BTreeMap<ItemId, Vec<f64>>,
    correlations: Option<&CorrelationMatrix>,
) -> f64 {
    if weights.is_empty() {
        return 0.0;
    }
    match correlations.filter(|m| !m.is_empty()) {
        Some(rho) => covariance_risk(weights, series, rho),
        None => series_risk(weights, series),
    }
}

fn correlation(rho: &CorrelationMatrix, i: ItemId, j: ItemId) -> f64 {
    rho.get(&i)
        .and_then(|row| row.get(&j))
        .or_else(|| rho.get(&j).and_then(|row| row.get(&i)))
        .copied()
        .unwrap_or(if i == j { 1.0 } else { 0.0 })
}

fn covariance_risk(weights: &BTreeMap<ItemId, f64>, series: &BTreeMap<ItemId, Vec<f64>>, rho: &CorrelationMatrix) -> f64 {
    let moments: Vec<(ItemId, f64, f64, f64)> = weights
        .iter()
        .map(|(id, w)| {
            let (mean, std) = series.get(id).map(|s| mean_std(s)).unwrap_or((0.0, 0.0));
            (*id, *w, mean, std)
        })
        .collect();

    let mean: f64 = moments.iter().map(|(_, w, m, _)| w * m).sum();
    if mean <= 0.0 {
        return 0.0;
    }
    let variance: f64 = moments
        .iter()
        .flat_map(|a| moments.iter().map(move |b| (a, b)))
        .map(|((i, wi, _, si), (j, wj, _, sj))| wi * wj * correlation(rho, *i, *j) * si * sj)
        .sum();
    variance.max(0.0).sqrt() / mean
}

fn series_risk(weights: &BTreeMap<ItemId, f64>, series: &BTreeMap<ItemId, Vec<f64>>) -> f64 {
    let len = weights
        .keys()
        .filter_map(|id| series.get(id).map(Vec::len))
        .max()
        .unwrap_or(0);
    let mut portfolio = vec![0.0; len];
    for (id, w) in weights {
        if let Some(s) = series.get(id) {
            for (total, value) in portfolio.iter_mut().zip(s) {
                *total += w * value;
            }
        }
    }
    let (mean, std) = mean_std(&portfolio);
    if mean <= 0.0 {
        0.0
    } else {
        std / mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn weights(pairs: &[(ItemId, f64)]) -> BTreeMap<ItemId, f64> {
        pairs.iter().copied().collect()
    }

    fn series(pairs: &[(ItemId, Vec<f64>)]) -> BTreeMap<ItemId, Vec<f64>> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn offsetting_series_cancel_out() {
        let w = weights(&[(1, 0.5), (2, 0.5)]);
        let s = series(&[(1, vec![10.0, 20.0, 10.0, 20.0]), (2, vec![20.0, 10.0, 20.0, 10.0])]);
        assert_relative_eq!(portfolio_risk(&w, &s, None), 0.0);
    }

    #[test]
    fn perfect_correlation_adds_stds() {
        let w = weights(&[(1, 0.5), (2, 0.5)]);
        let s = series(&[(1, vec![10.0, 20.0]), (2, vec![30.0, 50.0])]);
        let mut rho = CorrelationMatrix::new();
        rho.entry(1).or_default().insert(2, 1.0);
        // means 15, 40; stds 7.07, 14.14
        let expected = (0.5 * 50f64.sqrt() + 0.5 * 200f64.sqrt()) / 27.5;
        assert_relative_eq!(portfolio_risk(&w, &s, Some(&rho)), expected, epsilon = 1e-12);
    }

    #[test]
    fn empty_matrix_uses_the_series() {
        let w = weights(&[(1, 1.0)]);
        let s = series(&[(1, vec![10.0, 20.0])]);
        let direct = portfolio_risk(&w, &s, None);
        assert_relative_eq!(portfolio_risk(&w, &s, Some(&CorrelationMatrix::new())), direct);
    }

    #[test]
    fn zero_revenue_is_riskless() {
        let w = weights(&[(1, 1.0)]);
        let s = series(&[(1, vec![0.0; 5])]);
        assert_eq!(portfolio_risk(&w, &s, None), 0.0);
        assert_eq!(portfolio_risk(&BTreeMap::new(), &s, None), 0.0);
    }

    #[test]
    fn history_is_bucketed_and_converted() {
        let item = Item::new(1, "A", 5.0, 1.0, 2.0, 1.0);
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let history = vec![
            SalesRecord::new(as_of, 2.0, None),
            SalesRecord::new(as_of - chrono::Duration::days(8), 1.0, Some(10.0)),
        ];
        let s = weekly_revenue_series(&item, &history, 2.0, as_of, 3, 1).unwrap();
        assert_eq!(s, vec![0.0, 20.0, 12.0]);
    }

    #[test]
    fn missing_history_is_synthesized_reproducibly() {
        let item = Item::new(1, "A", 50.0, 10.0, 2.0, 1.0);
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let a = weekly_revenue_series(&item, &[], 1.0, as_of, 26, 9).unwrap();
        let b = weekly_revenue_series(&item, &[], 1.0, as_of, 26, 9).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 26);
        assert!(a.iter().all(|r| r % 3.0 == 0.0));
    }
}
