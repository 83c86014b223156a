// src/demand/seasonality.rs

use crate::model::item::SeasonalityProfile;

pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Weekly demand `weeks_ahead` weeks from now under the profile's monthly factor.
pub fn seasonal_demand(base_weekly: f64, profile: Option<&SeasonalityProfile>, weeks_ahead: f64) -> f64 {
    match profile {
        Some(p) => {
            let months_ahead = (weeks_ahead.max(0.0) / WEEKS_PER_MONTH).floor() as usize;
            base_weekly * p.monthly_factors[(p.current_month + months_ahead) % 12]
        }
        None => base_weekly,
    }
}

/// Mean weekly demand across the next `weeks` weeks, month by month.
pub fn average_seasonal_demand(base_weekly: f64, profile: Option<&SeasonalityProfile>, weeks: f64) -> f64 {
    let Some(p) = profile else {
        return base_weekly;
    };
    let n = weeks.ceil().max(1.0) as usize;
    let total: f64 = (0..n)
        .map(|week| seasonal_demand(base_weekly, Some(p), week as f64))
        .sum();
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn summer_peak() -> SeasonalityProfile {
        let mut factors = [1.0; 12];
        factors[5] = 2.0;
        factors[6] = 2.0;
        SeasonalityProfile {
            monthly_factors: factors,
            current_month: 5,
        }
    }

    #[test]
    fn no_profile_keeps_base_demand() {
        assert_eq!(seasonal_demand(10.0, None, 20.0), 10.0);
        assert_eq!(average_seasonal_demand(10.0, None, 20.0), 10.0);
    }

    #[test]
    fn demand_follows_month_offsets() {
        let p = summer_peak();
        assert_eq!(seasonal_demand(10.0, Some(&p), 0.0), 20.0);
        assert_eq!(seasonal_demand(10.0, Some(&p), 5.0), 20.0);
        assert_eq!(seasonal_demand(10.0, Some(&p), 9.0), 10.0);
    }

    #[test]
    fn month_index_wraps_around_the_year() {
        let mut p = summer_peak();
        p.current_month = 11;
        p.monthly_factors[0] = 0.5;
        assert_eq!(seasonal_demand(10.0, Some(&p), 4.5), 5.0);
    }

    #[test]
    fn average_blends_peak_and_off_season() {
        let p = summer_peak();
        // weeks 0..8 fall in June/July (factor 2), weeks 9..12 in August
        let avg = average_seasonal_demand(10.0, Some(&p), 13.0);
        assert_relative_eq!(avg, (9.0 * 20.0 + 4.0 * 10.0) / 13.0);
    }
}
