//! Listings: what an adapter scrapes and what the API returns.

use serde::{Deserialize, Serialize};

use crate::price::parse_price;

/// Label rendered next to every result link.
pub const LINK_TEXT: &str = "Open";

/// One retailer's candidate match, straight from the page.
///
/// Lives only for the duration of an adapter call; the aggregator turns it
/// into a [`NormalizedResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    /// Retailer display name
    pub retailer: String,

    /// Product title if the title selector matched
    pub title: Option<String>,

    /// Price exactly as rendered (e.g. "₹1,299.50")
    pub price_text: Option<String>,

    /// Product link, or the search URL when no link could be read
    pub link: String,

    /// Fixed per-retailer shipping cost
    pub shipping: u64,

    /// Fixed per-retailer delivery estimate
    pub delivery_days: Option<u32>,

    /// Whether the listing can be ranked
    pub available: bool,
}

impl RawListing {
    /// Create a listing with no title, price or delivery estimate.
    pub fn new(retailer: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            retailer: retailer.into(),
            title: None,
            price_text: None,
            link: link.into(),
            shipping: 0,
            delivery_days: None,
            available: false,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the raw price text.
    pub fn with_price_text(mut self, price: impl Into<String>) -> Self {
        self.price_text = Some(price.into());
        self
    }

    /// Set the shipping cost.
    pub fn with_shipping(mut self, shipping: u64) -> Self {
        self.shipping = shipping;
        self
    }

    /// Set the delivery estimate.
    pub fn with_delivery_days(mut self, days: u32) -> Self {
        self.delivery_days = Some(days);
        self
    }

    /// Set the availability flag.
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Parsed price, if the raw text holds a number.
    pub fn price(&self) -> Option<u64> {
        parse_price(self.price_text.as_deref())
    }

    /// Price plus shipping, with an unknown price counted as zero.
    pub fn total_cost(&self) -> u64 {
        self.price().unwrap_or(0).saturating_add(self.shipping)
    }

    /// Convert into the ranked output shape.
    pub fn normalize(self) -> NormalizedResult {
        let price = self.price().unwrap_or(0);
        NormalizedResult {
            retailer: self.retailer,
            price,
            shipping: self.shipping,
            total_cost: price.saturating_add(self.shipping),
            available: self.available,
            link: self.link,
            link_text: LINK_TEXT.to_string(),
            delivery_days: self.delivery_days,
        }
    }
}

/// A ranked, client-facing comparison entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub retailer: String,
    pub price: u64,
    pub shipping: u64,
    pub total_cost: u64,
    pub available: bool,
    pub link: String,
    pub link_text: String,
    pub delivery_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_shipping() {
        let result = RawListing::new("Flipkart", "https://www.flipkart.com/p/1")
            .with_price_text("₹69,999")
            .with_shipping(599)
            .with_delivery_days(2)
            .with_available(true)
            .normalize();

        assert_eq!(result.price, 69_999);
        assert_eq!(result.shipping, 599);
        assert_eq!(result.total_cost, 70_598);
        assert_eq!(result.delivery_days, Some(2));
        assert_eq!(result.link_text, "Open");
    }

    #[test]
    fn test_normalize_defaults_missing_price() {
        let result = RawListing::new("Official Store", "https://apple.com").normalize();
        assert_eq!(result.price, 0);
        assert_eq!(result.total_cost, 0);
        assert_eq!(result.delivery_days, None);
    }

    #[test]
    fn test_serializes_camel_case_with_null_delivery() {
        let result = RawListing::new("Amazon.in", "https://www.amazon.in/dp/X")
            .with_price_text("1,000")
            .with_available(true)
            .normalize();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalCost"], 1000);
        assert_eq!(json["linkText"], "Open");
        assert!(json["deliveryDays"].is_null());
    }
}
