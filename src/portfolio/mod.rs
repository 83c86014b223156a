// src/portfolio/mod.rs

pub mod allocator;
pub mod frontier;
pub mod logistics;
pub mod metrics;
pub mod normalize;
pub mod rules;
pub mod schedule;

pub use allocator::{PortfolioAllocation, PortfolioOptimizer, RankedItem};
pub use frontier::FrontierPoint;
pub use logistics::{adjusted_lead_time, LogisticsEvent};
pub use metrics::CorrelationMatrix;
pub use normalize::{normalize_item, NormalizedItem};
pub use rules::{default_rules, CorrelationRule, RuleKind};
pub use schedule::{create_delivery_schedule, DeliveryWeek, ScheduledOrder};
