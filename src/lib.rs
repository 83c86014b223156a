// src/lib.rs

//! Inventory purchasing treated as a call option on future sales revenue.
//!
//! Layers, leaves first: [`demand`] estimates lead-time sales and revenue,
//! [`pricing`] turns them into Black-Scholes option values and searches the
//! best order quantity, [`portfolio`] spreads a budget across many items,
//! and [`risk`] reports VaR/ES of weekly revenue.

pub mod config;
pub mod demand;
pub mod error;
pub mod io;
pub mod math;
pub mod model;
pub mod portfolio;
pub mod pricing;
pub mod risk;
pub mod telemetry;

pub use config::{AllocatorSettings, MarketTables, PortfolioConstraints, SimulationMethod, ValuationParameters};
pub use error::{EngineError, EngineResult};
pub use model::history::SalesRecord;
pub use model::item::{Item, ItemId, SeasonalityProfile, VolumeDiscountTier};
pub use model::scenario::DemandScenario;
