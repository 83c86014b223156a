// src/model/scenario.rs

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

const WEIGHT_TOLERANCE: f64 = 1e-3;

/// A named demand regime: weekly mean and std are scaled by the multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandScenario {
    pub name: String,
    /// Probability of this regime; weights across a set sum to 1.
    pub weight: f64,
    pub mu_multiplier: f64,
    pub sigma_multiplier: f64,
}

impl DemandScenario {
    pub fn new(name: impl Into<String>, weight: f64, mu_multiplier: f64, sigma_multiplier: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            mu_multiplier,
            sigma_multiplier,
        }
    }

    /// The single weight-1 scenario that leaves demand untouched.
    pub fn baseline() -> Self {
        Self::new("baseline", 1.0, 1.0, 1.0)
    }
}

/// Returns the scenarios to value with, substituting the baseline for an empty set.
pub fn scenarios_or_baseline(scenarios: &[DemandScenario]) -> Vec<DemandScenario> {
    if scenarios.is_empty() {
        vec![DemandScenario::baseline()]
    } else {
        scenarios.to_vec()
    }
}

/// Checks that weights are non-negative and sum to 1.
pub fn validate_scenarios(scenarios: &[DemandScenario]) -> EngineResult<()> {
    if let Some(bad) = scenarios
        .iter()
        .find(|s| !s.weight.is_finite() || s.weight < 0.0 || s.mu_multiplier < 0.0 || s.sigma_multiplier < 0.0)
    {
        return Err(EngineError::validation(format!(
            "scenario '{}' has a negative or non-finite weight/multiplier",
            bad.name
        )));
    }
    if scenarios.is_empty() {
        return Ok(());
    }
    let total: f64 = scenarios.iter().map(|s| s.weight).sum();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(EngineError::validation(format!(
            "scenario weights sum to {total:.4}, expected 1"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_must_sum_to_one() {
        let ok = vec![
            DemandScenario::new("low", 0.3, 0.7, 1.0),
            DemandScenario::new("base", 0.5, 1.0, 1.0),
            DemandScenario::new("high", 0.2, 1.4, 1.2),
        ];
        assert!(validate_scenarios(&ok).is_ok());

        let bad = vec![DemandScenario::new("half", 0.5, 1.0, 1.0)];
        assert!(validate_scenarios(&bad).is_err());
    }

    #[test]
    fn empty_set_falls_back_to_baseline() {
        let set = scenarios_or_baseline(&[]);
        assert_eq!(set, vec![DemandScenario::baseline()]);
    }
}
