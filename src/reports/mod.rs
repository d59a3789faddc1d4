//! Report generation modules

pub mod exposure;

pub use exposure::{build_report, AggregatedHolding, PortfolioAggregator, PortfolioReport};
