// src/risk/mod.rs

pub mod estimator;
pub mod mixture;

pub use estimator::{implied_weekly_revenue, normal_var_es, RiskEstimator, RiskReport, RiskSource};
pub use mixture::{mixture_var_es, MixtureTail, NormalState};
