// src/io/demand.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{EngineError, EngineResult};

/// Weekly unit history drawn from a Normal distribution, reproducible for a
/// given `seed`.
///
/// # Arguments
/// * `weeks` - Length of the history.
/// * `mean` - Average units per week (e.g., 60.0).
/// * `std_dev` - Standard deviation of weekly units (e.g., 20.0); must be
///   finite and >= 0.
/// * `seed` - Generator seed.
pub fn generate_seeded_demand(weeks: usize, mean: f64, std_dev: f64, seed: u64) -> EngineResult<Vec<f64>> {
    sample_weeks(&mut StdRng::seed_from_u64(seed), weeks, mean, std_dev)
}

fn sample_weeks<R: Rng>(rng: &mut R, weeks: usize, mean: f64, std_dev: f64) -> EngineResult<Vec<f64>> {
    // rand_distr accepts a negative std and mirrors the samples
    if std_dev < 0.0 {
        return Err(EngineError::distribution(format!(
            "N({mean}, {std_dev}): standard deviation is negative"
        )));
    }
    let normal = Normal::new(mean, std_dev)
        .map_err(|e| EngineError::distribution(format!("N({mean}, {std_dev}): {e}")))?;

    // Round to whole units; demand cannot be negative.
    Ok((0..weeks)
        .map(|_| normal.sample(rng).round().max(0.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_history_is_reproducible_and_non_negative() {
        let a = generate_seeded_demand(52, 5.0, 10.0, 42).unwrap();
        let b = generate_seeded_demand(52, 5.0, 10.0, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 52);
        assert!(a.iter().all(|u| *u >= 0.0 && u.fract() == 0.0));
    }

    #[test]
    fn zero_std_gives_the_mean() {
        let h = generate_seeded_demand(4, 12.0, 0.0, 9).unwrap();
        assert_eq!(h, vec![12.0; 4]);
    }

    #[test]
    fn negative_std_is_a_distribution_error() {
        assert!(matches!(
            generate_seeded_demand(4, 1.0, -1.0, 1),
            Err(EngineError::Distribution(_))
        ));
    }

    #[test]
    fn non_finite_std_is_a_distribution_error() {
        assert!(matches!(
            generate_seeded_demand(4, 1.0, f64::NAN, 1),
            Err(EngineError::Distribution(_))
        ));
    }
}
