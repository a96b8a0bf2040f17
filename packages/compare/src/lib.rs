//! Retailer Price Comparison Library
//!
//! Searches a fixed set of online retailers for a product query through a
//! browser, extracts the first listing from each, and ranks the available
//! ones by total cost (price + shipping).
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use compare_core::{default_retailers, Aggregator, CompareService, MemoryResultCache, Query};
//! use compare_core::browser::{WebDriverConfig, WebDriverLauncher};
//!
//! let launcher = WebDriverLauncher::new(WebDriverConfig::new("http://localhost:9515"))?;
//! let aggregator = Aggregator::new(Arc::new(launcher), default_retailers());
//! let service = CompareService::new(Arc::new(aggregator), Arc::new(MemoryResultCache::new()));
//!
//! let query = Query::parse("iphone 15").unwrap();
//! let comparison = service.lookup(&query).await?;
//! println!("{:?}: {} offers", comparison.source, comparison.data.len());
//! ```
//!
//! # Modules
//!
//! - [`browser`] - Browser automation traits plus WebDriver and plain-HTTP backends
//! - [`retailers`] - Retailer trait, selector profiles and the built-in catalog
//! - [`pipeline`] - Aggregation, ranking and cache write-through
//! - [`cache`] - Result cache with a fixed time-to-live
//! - [`types`] - Queries and listings
//! - [`testing`] - Fixture browsers and stub retailers for tests

pub mod browser;
pub mod cache;
pub mod error;
pub mod pipeline;
pub mod price;
pub mod retailers;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use browser::{Browser, BrowserLauncher, Page};
pub use cache::{MemoryResultCache, ResultCache};
pub use error::{BrowserError, CompareError, ScrapeError};
pub use pipeline::{
    rank_listings, Aggregator, AggregatorConfig, CompareService, Comparison, Source,
};
pub use price::parse_price;
pub use retailers::{default_retailers, Retailer, RetailerProfile, SelectorAdapter};
pub use types::{
    listing::{NormalizedResult, RawListing},
    query::Query,
};
