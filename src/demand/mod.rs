// src/demand/mod.rs

pub mod estimator;
pub mod seasonality;
pub mod service_level;
pub mod stats;

pub use estimator::{
    effective_purchase_price, expected_revenue, mc_demand_loss, DemandModel, MonteCarloSettings,
    RevenueTerms,
};
