//! Built-in retailer profiles.
//!
//! Selectors track each site's current markup and will need updating when
//! the sites change. Shipping and delivery figures are flat business
//! assumptions, not read from the page.

use std::sync::Arc;

use crate::retailers::{
    FieldRule, ListingKind, PriceRule, Retailer, RetailerProfile, SelectorAdapter,
};

pub const AMAZON_IN: RetailerProfile = RetailerProfile {
    name: "Amazon.in",
    search_url: "https://www.amazon.in/s?k={query}",
    query_suffix: "",
    container: r#"div.s-main-slot div[data-component-type="s-search-result"]"#,
    title: Some(FieldRule::text("h2 a span")),
    price: Some(PriceRule {
        main: FieldRule::text(".a-price-whole"),
        suffix: Some(FieldRule::text(".a-price-fraction")),
    }),
    link: FieldRule::property("h2 a", "href"),
    kind: ListingKind::Priced,
    shipping: 0,
    delivery_days: None,
};

pub const FLIPKART: RetailerProfile = RetailerProfile {
    name: "Flipkart",
    search_url: "https://www.flipkart.com/search?q={query}",
    query_suffix: "",
    container: "div[data-id]",
    title: Some(FieldRule::property("a[title]", "title")),
    price: Some(PriceRule {
        main: FieldRule::text("div._30jeq3"),
        suffix: None,
    }),
    link: FieldRule::property("a[title]", "href"),
    kind: ListingKind::Priced,
    shipping: 599,
    delivery_days: Some(2),
};

pub const RELIANCE_DIGITAL: RetailerProfile = RetailerProfile {
    name: "Reliance Digital",
    search_url: "https://www.reliancedigital.in/search?q={query}",
    query_suffix: "",
    container: "div.sp__product",
    title: Some(FieldRule::text("p.sp__name")),
    price: Some(PriceRule {
        main: FieldRule::text("span.TextWeb__Text-sc-1cyx778-0"),
        suffix: None,
    }),
    link: FieldRule::property("a", "href"),
    kind: ListingKind::Priced,
    shipping: 499,
    delivery_days: Some(3),
};

pub const CROMA: RetailerProfile = RetailerProfile {
    name: "Croma",
    search_url: "https://www.croma.com/search/?text={query}",
    query_suffix: "",
    container: "li.product-item",
    title: Some(FieldRule::text("a.product__list--name")),
    price: Some(PriceRule {
        main: FieldRule::text("span.amount"),
        suffix: None,
    }),
    link: FieldRule::property("a.product__list--name", "href"),
    kind: ListingKind::Priced,
    shipping: 799,
    delivery_days: Some(4),
};

/// Web-search fallback that surfaces the brand's own store link.
pub const OFFICIAL_STORE: RetailerProfile = RetailerProfile {
    name: "Official Store",
    search_url: "https://www.google.com/search?q={query}",
    query_suffix: " official site",
    container: "div.g a",
    title: None,
    price: None,
    link: FieldRule::own_property("href"),
    kind: ListingKind::LinkOnly,
    shipping: 0,
    delivery_days: Some(5),
};

/// Built-in profiles in the order they are scraped.
pub const BUILTIN_PROFILES: [RetailerProfile; 5] =
    [AMAZON_IN, FLIPKART, RELIANCE_DIGITAL, CROMA, OFFICIAL_STORE];

/// Adapters for every built-in retailer, in scrape order.
pub fn default_retailers() -> Vec<Arc<dyn Retailer>> {
    BUILTIN_PROFILES
        .into_iter()
        .map(|profile| Arc::new(SelectorAdapter::new(profile)) as Arc<dyn Retailer>)
        .collect()
}
