// src/math/random.rs

//! Pseudo-random sources shared by every sampling path.

use std::f64::consts::TAU;
use std::fmt::Debug;

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// A stream of uniform draws in `(0, 1]`.
///
/// The half-open interval keeps `ln(u)` finite in Box-Muller.
pub trait RandomSource: Debug {
    fn next_uniform(&mut self) -> f64;

    /// One standard normal draw via Box-Muller (cosine branch).
    fn next_standard_normal(&mut self) -> f64 {
        let u1 = self.next_uniform();
        let u2 = self.next_uniform();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }
}

/// Reproducible source seeded from a `u64`.
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn next_uniform(&mut self) -> f64 {
        1.0 - self.rng.gen::<f64>()
    }
}

/// Non-reproducible source backed by the thread-local generator.
#[derive(Debug)]
pub struct EntropySource {
    rng: ThreadRng,
}

impl EntropySource {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropySource {
    fn next_uniform(&mut self) -> f64 {
        1.0 - self.rng.gen::<f64>()
    }
}

/// Seeded source when a seed is given, entropy source otherwise.
pub fn source_for(seed: Option<u64>) -> Box<dyn RandomSource> {
    match seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(EntropySource::new()),
    }
}
