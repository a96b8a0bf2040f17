//! Comparison pipeline: scrape every retailer, keep what is available, rank.

mod aggregate;
mod rank;
mod service;

pub use aggregate::{Aggregator, AggregatorConfig};
pub use rank::rank_listings;
pub use service::{CompareService, Comparison, Source};
