//! Lookthru - ETF portfolio look-through
//!
//! This library decomposes a portfolio of fund positions into consolidated
//! company-level exposure: each fund's reported holdings are fetched (with
//! caching and bounded retry against a browser-rendered provider),
//! normalized into a common schema and aggregated, weighted by position
//! value, into one ranked table.

pub mod cli;
pub mod config;
pub mod error;
pub mod holdings;
pub mod pipeline;
pub mod positions;
pub mod reports;
pub mod scraping;
pub mod utils;
