// src/pricing/optimizer.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Window width at which ternary narrowing stops and a full scan takes over.
const SCAN_WINDOW: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_quantity: u32,
    pub best_option_value: f64,
}

/// Integer search for the quantity maximizing `evaluate` on `[min_q, max_q]`.
///
/// Two phases: a coarse grid every `coarse_step` units (always including
/// `max_q`), then ternary narrowing inside ±3 steps of the coarse winner
/// until the window is at most 6 wide, then an exhaustive scan of what is
/// left. The objective may be noisy or multi-modal, so this trades a global
/// guarantee for a bounded number of evaluations. Each quantity is evaluated
/// at most once per call; the best value seen anywhere wins, ties going to
/// the first quantity evaluated.
pub fn optimize_quantity<F>(min_q: u32, max_q: u32, coarse_step: u32, mut evaluate: F) -> OptimizationResult
where
    F: FnMut(u32) -> f64,
{
    let max_q = max_q.max(min_q);
    let step = coarse_step.max(1);
    let mut cache: HashMap<u32, f64> = HashMap::new();
    let mut best = OptimizationResult {
        best_quantity: min_q,
        best_option_value: f64::NEG_INFINITY,
    };

    let mut eval = |q: u32, best: &mut OptimizationResult| -> f64 {
        let value = *cache.entry(q).or_insert_with(|| evaluate(q));
        if value > best.best_option_value {
            best.best_quantity = q;
            best.best_option_value = value;
        }
        value
    };

    // Phase 1: coarse grid
    let mut q = min_q;
    loop {
        eval(q, &mut best);
        match q.checked_add(step) {
            Some(next) if next <= max_q => q = next,
            _ => break,
        }
    }
    eval(max_q, &mut best);

    // Phase 2: ternary narrowing around the coarse winner
    let reach = step.saturating_mul(3);
    let mut left = best.best_quantity.saturating_sub(reach).max(min_q);
    let mut right = best.best_quantity.saturating_add(reach).min(max_q);
    while right - left > SCAN_WINDOW {
        let third = (right - left) / 3;
        let m1 = left + third;
        let m2 = right - third;
        let v1 = eval(m1, &mut best);
        let v2 = eval(m2, &mut best);
        if v1 < v2 {
            left = m1 + 1;
        } else {
            right = m2 - 1;
        }
    }

    // Phase 3: exhaustive scan of the remaining window
    for q in left..=right {
        eval(q, &mut best);
    }

    debug!(
        min_q,
        max_q,
        step,
        evaluations = cache.len(),
        best_q = best.best_quantity,
        best_value = best.best_option_value,
        "quantity search finished"
    );
    best
}
