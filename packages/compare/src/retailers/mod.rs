//! Retailer adapters.
//!
//! Every retailer goes through the same three steps: navigate to its search
//! page, locate the first result container, extract fields from it. What
//! differs per site is data (URL template, selectors, shipping and delivery
//! constants), captured in a [`RetailerProfile`] and run by
//! [`SelectorAdapter`].

mod catalog;
mod profile;

use async_trait::async_trait;

use crate::browser::Page;
use crate::error::ScrapeResult;
use crate::types::{listing::RawListing, query::Query};

pub use catalog::{
    default_retailers, AMAZON_IN, BUILTIN_PROFILES, CROMA, FLIPKART, OFFICIAL_STORE,
    RELIANCE_DIGITAL,
};
pub use profile::{
    FieldRule, FieldSource, ListingKind, PriceRule, RetailerProfile, SelectorAdapter,
};

/// A retailer that can be searched for one candidate listing.
#[async_trait]
pub trait Retailer: Send + Sync {
    /// Display name, also used in log fields.
    fn name(&self) -> &str;

    /// Search URL for `query`.
    fn search_url(&self, query: &Query) -> String;

    /// Navigate `page` to the retailer's results and extract the first match.
    ///
    /// `Ok(None)` means the page loaded but held no result container.
    /// Errors mean the retailer should be dropped from this comparison.
    async fn scrape(&self, page: &dyn Page, query: &Query) -> ScrapeResult<Option<RawListing>>;
}
