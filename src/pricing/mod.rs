// src/pricing/mod.rs

pub mod black_scholes;
pub mod item;
pub mod mixture;
pub mod optimizer;
pub mod volatility;

pub use black_scholes::black_scholes_call;
pub use item::{evaluate_item, ItemValuation, ItemValuer};
pub use mixture::{strict_bs_mixture_option_value, MixtureValuation, ScenarioValue};
pub use optimizer::{optimize_quantity, OptimizationResult};
pub use volatility::VolatilitySynthesizer;
