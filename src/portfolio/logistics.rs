// src/portfolio/logistics.rs

//! Lead-time adjustment from a calendar of logistics disruptions.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A known disruption (holiday, port closure) that delays shipments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsEvent {
    /// Country or supplier class affected; `None` or `"global"` hits everyone.
    pub country: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub delay_days: u32,
}

impl LogisticsEvent {
    fn applies_to(&self, country: &str) -> bool {
        match &self.country {
            None => true,
            Some(c) => c.eq_ignore_ascii_case(country) || c.eq_ignore_ascii_case("global"),
        }
    }
}

/// Lead time in weeks after adding the delays of every matching event whose
/// window overlaps the shipment window `[from, from + base]`.
///
/// Never shorter than `base_weeks`.
pub fn adjusted_lead_time(base_weeks: f64, country: &str, events: &[LogisticsEvent], from: NaiveDate) -> f64 {
    if events.is_empty() || base_weeks <= 0.0 {
        return base_weeks.max(0.0);
    }
    let arrival = from + Duration::days((base_weeks * 7.0).round() as i64);

    let delay_days: u32 = events
        .iter()
        .filter(|e| e.applies_to(country))
        .filter(|e| from <= e.end && arrival >= e.start)
        .map(|e| e.delay_days)
        .sum();

    base_weeks + f64::from(delay_days) / 7.0
}
