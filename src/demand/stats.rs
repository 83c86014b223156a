// src/demand/stats.rs

//! Moment estimation of weekly demand from sales history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::math::mean_std;

/// Weeks with less availability than this are scaled as if it were this.
const MIN_AVAILABILITY: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyStats {
    pub mu_week: f64,
    pub sigma_week: f64,
    pub total_units: f64,
}

/// Sums dated amounts into `weeks` consecutive weekly buckets ending at `end`.
///
/// Records outside `(end - weeks*7 days, end]` are dropped; bucket 0 is the oldest week.
pub fn bucket_by_week(records: &[(NaiveDate, f64)], end: NaiveDate, weeks: usize) -> Vec<f64> {
    let mut buckets = vec![0.0; weeks];
    if weeks == 0 {
        return buckets;
    }
    let span_days = weeks as i64 * 7;
    for (date, amount) in records {
        let age_days = (end - *date).num_days();
        if age_days < 0 || age_days >= span_days {
            continue;
        }
        let idx = weeks - 1 - (age_days / 7) as usize;
        buckets[idx] += amount.max(0.0);
    }
    buckets
}

/// Mean and sample std of a weekly unit series.
pub fn weekly_stats(series: &[f64]) -> WeeklyStats {
    let (mu_week, sigma_week) = mean_std(series);
    WeeklyStats {
        mu_week,
        sigma_week,
        total_units: series.iter().sum(),
    }
}

/// Weekly stats corrected for stock-outs.
///
/// `availability[i]` is the in-stock fraction of week `i` (`None` when no stock
/// data exists). Sales are divided by the availability so a half-stocked week
/// counts as half observed demand; weeks fully out of stock with no sales
/// carry no information and are dropped.
pub fn weekly_stats_adjusted(sales: &[f64], availability: &[Option<f64>]) -> WeeklyStats {
    let total_units = sales.iter().sum();
    let adjusted: Vec<f64> = sales
        .iter()
        .enumerate()
        .filter_map(|(i, &units)| match availability.get(i).copied().flatten() {
            None => Some(units),
            Some(a) if a <= 0.0 && units == 0.0 => None,
            Some(a) => Some(units / a.clamp(MIN_AVAILABILITY, 1.0)),
        })
        .collect();

    if adjusted.is_empty() {
        return WeeklyStats {
            mu_week: 0.0,
            sigma_week: 0.0,
            total_units: 0.0,
        };
    }
    let (mu_week, sigma_week) = mean_std(&adjusted);
    WeeklyStats {
        mu_week,
        sigma_week,
        total_units,
    }
}
