//! Selector-driven retailer adapter.

use async_trait::async_trait;
use tracing::debug;

use crate::browser::{ElementHandle, NavigationOptions, Page};
use crate::error::ScrapeResult;
use crate::retailers::Retailer;
use crate::types::{listing::RawListing, query::Query};

/// Where a field's value comes from once its element is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Rendered text (`innerText`)
    Text,
    /// A DOM property such as `href` or `title`
    Property(&'static str),
}

/// How to read one field relative to the result container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Sub-selector inside the container; `None` reads the container itself
    pub selector: Option<&'static str>,
    pub source: FieldSource,
}

impl FieldRule {
    pub const fn text(selector: &'static str) -> Self {
        Self {
            selector: Some(selector),
            source: FieldSource::Text,
        }
    }

    pub const fn property(selector: &'static str, name: &'static str) -> Self {
        Self {
            selector: Some(selector),
            source: FieldSource::Property(name),
        }
    }

    pub const fn own_property(name: &'static str) -> Self {
        Self {
            selector: None,
            source: FieldSource::Property(name),
        }
    }
}

/// Price split over one or two elements (e.g. whole + fraction).
///
/// The suffix only contributes when the main part is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRule {
    pub main: FieldRule,
    pub suffix: Option<FieldRule>,
}

/// Whether a retailer can produce a ranked, priced listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    /// Available when a price was extracted and parsed
    Priced,
    /// Surfaces a link only; never priced, never available
    LinkOnly,
}

/// Everything site-specific about a retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetailerProfile {
    pub name: &'static str,
    /// Search URL with a `{query}` placeholder for the percent-encoded query
    pub search_url: &'static str,
    /// Text appended to the query before encoding
    pub query_suffix: &'static str,
    /// Selector of the first result container
    pub container: &'static str,
    /// Title rule; `None` uses the query text as the title
    pub title: Option<FieldRule>,
    pub price: Option<PriceRule>,
    pub link: FieldRule,
    pub kind: ListingKind,
    /// Flat shipping charge assumed for this retailer
    pub shipping: u64,
    /// Delivery estimate assumed for this retailer
    pub delivery_days: Option<u32>,
}

impl RetailerProfile {
    pub fn search_url_for(&self, query: &Query) -> String {
        let term = format!("{}{}", query.as_str(), self.query_suffix);
        self.search_url
            .replace("{query}", &urlencoding::encode(&term))
    }
}

/// Runs a [`RetailerProfile`] against a page: navigate, locate, extract.
#[derive(Debug, Clone)]
pub struct SelectorAdapter {
    profile: RetailerProfile,
    navigation: NavigationOptions,
}

impl SelectorAdapter {
    pub fn new(profile: RetailerProfile) -> Self {
        Self {
            profile,
            navigation: NavigationOptions::default(),
        }
    }

    /// Override navigation timeout / wait condition.
    pub fn with_navigation(mut self, navigation: NavigationOptions) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn profile(&self) -> &RetailerProfile {
        &self.profile
    }

    async fn navigate(&self, page: &dyn Page, url: &str) -> ScrapeResult<()> {
        page.goto(url, &self.navigation).await?;
        Ok(())
    }

    async fn locate(&self, page: &dyn Page) -> ScrapeResult<Option<ElementHandle>> {
        Ok(page.query_selector(self.profile.container).await?)
    }

    async fn extract(
        &self,
        page: &dyn Page,
        container: &ElementHandle,
        query: &Query,
        search_url: &str,
    ) -> RawListing {
        let profile = &self.profile;

        let title = match &profile.title {
            Some(rule) => self.read_field(page, container, rule, "title").await,
            None => Some(query.as_str().to_string()),
        };

        let price_text = match (&profile.kind, &profile.price) {
            (ListingKind::Priced, Some(rule)) => self.read_price(page, container, rule).await,
            _ => None,
        };

        let link = self
            .read_field(page, container, &profile.link, "link")
            .await
            .unwrap_or_else(|| search_url.to_string());

        let mut listing = RawListing::new(profile.name, link).with_shipping(profile.shipping);
        listing.title = title;
        listing.price_text = price_text;
        listing.delivery_days = profile.delivery_days;
        listing.available = match profile.kind {
            ListingKind::Priced => listing.price().is_some(),
            ListingKind::LinkOnly => false,
        };
        listing
    }

    async fn read_price(
        &self,
        page: &dyn Page,
        container: &ElementHandle,
        rule: &PriceRule,
    ) -> Option<String> {
        let main = self.read_field(page, container, &rule.main, "price").await?;
        let suffix = match &rule.suffix {
            Some(suffix) => self
                .read_field(page, container, suffix, "price suffix")
                .await
                .unwrap_or_default(),
            None => String::new(),
        };
        Some(main + &suffix)
    }

    /// Read one field; any failure is "no value" rather than an adapter error.
    async fn read_field(
        &self,
        page: &dyn Page,
        container: &ElementHandle,
        rule: &FieldRule,
        field: &str,
    ) -> Option<String> {
        let element = match rule.selector {
            Some(selector) => match page.query_selector_within(container, selector).await {
                Ok(Some(element)) => element,
                Ok(None) => {
                    debug!(retailer = self.profile.name, field, selector, "field not found");
                    return None;
                }
                Err(e) => {
                    debug!(retailer = self.profile.name, field, error = %e, "field lookup failed");
                    return None;
                }
            },
            None => container.clone(),
        };

        let value = match rule.source {
            FieldSource::Text => page.inner_text(&element).await.map(Some),
            FieldSource::Property(name) => page.property(&element, name).await,
        };

        match value {
            Ok(Some(v)) if !v.trim().is_empty() => Some(v),
            Ok(_) => None,
            Err(e) => {
                debug!(retailer = self.profile.name, field, error = %e, "field read failed");
                None
            }
        }
    }
}

#[async_trait]
impl Retailer for SelectorAdapter {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn search_url(&self, query: &Query) -> String {
        self.profile.search_url_for(query)
    }

    async fn scrape(&self, page: &dyn Page, query: &Query) -> ScrapeResult<Option<RawListing>> {
        let url = self.search_url(query);
        self.navigate(page, &url).await?;

        let Some(container) = self.locate(page).await? else {
            debug!(retailer = self.profile.name, url = %url, "no result container");
            return Ok(None);
        };

        Ok(Some(self.extract(page, &container, query, &url).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Browser, BrowserLauncher};
    use crate::testing::FixtureLauncher;

    const SHOP: RetailerProfile = RetailerProfile {
        name: "Test Shop",
        search_url: "https://shop.test/search?q={query}",
        query_suffix: "",
        container: "li.item",
        title: Some(FieldRule::property("a.name", "title")),
        price: Some(PriceRule {
            main: FieldRule::text("span.whole"),
            suffix: Some(FieldRule::text("span.frac")),
        }),
        link: FieldRule::property("a.name", "href"),
        kind: ListingKind::Priced,
        shipping: 99,
        delivery_days: Some(3),
    };

    async fn scrape_with(html: &str, profile: RetailerProfile) -> ScrapeResult<Option<RawListing>> {
        let launcher = FixtureLauncher::new().with_html("https://shop.test/", html);
        let browser = launcher.launch().await.unwrap();
        let page = browser.new_page().await.unwrap();
        let query = Query::parse("usb cable").unwrap();
        let result = SelectorAdapter::new(profile).scrape(page.as_ref(), &query).await;
        page.close().await.unwrap();
        browser.close().await.unwrap();
        result
    }

    #[test]
    fn test_search_url_encodes_query_and_suffix() {
        let query = Query::parse("iphone 15 & case").unwrap();
        assert_eq!(
            SHOP.search_url_for(&query),
            "https://shop.test/search?q=iphone%2015%20%26%20case"
        );

        let with_suffix = RetailerProfile {
            query_suffix: " official site",
            ..SHOP
        };
        assert_eq!(
            with_suffix.search_url_for(&Query::parse("pixel").unwrap()),
            "https://shop.test/search?q=pixel%20official%20site"
        );
    }

    #[tokio::test]
    async fn test_extracts_first_container() {
        let html = r#"
            <ul>
              <li class="item">
                <a class="name" title="USB-C Cable 1m" href="/p/1">USB-C Cable</a>
                <span class="whole">1,299.</span><span class="frac">50</span>
              </li>
              <li class="item"><a class="name" title="Second" href="/p/2">x</a></li>
            </ul>
        "#;

        let listing = scrape_with(html, SHOP).await.unwrap().unwrap();
        assert_eq!(listing.retailer, "Test Shop");
        assert_eq!(listing.title.as_deref(), Some("USB-C Cable 1m"));
        assert_eq!(listing.price_text.as_deref(), Some("1,299.50"));
        assert_eq!(listing.price(), Some(1300));
        assert_eq!(listing.link, "https://shop.test/p/1");
        assert_eq!(listing.shipping, 99);
        assert_eq!(listing.delivery_days, Some(3));
        assert!(listing.available);
    }

    #[tokio::test]
    async fn test_missing_container_is_no_match() {
        let result = scrape_with("<p>No results</p>", SHOP).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_degrade_to_no_value() {
        let html = r#"<li class="item"><span class="other">?</span></li>"#;

        let listing = scrape_with(html, SHOP).await.unwrap().unwrap();
        assert_eq!(listing.title, None);
        assert_eq!(listing.price_text, None);
        assert_eq!(listing.link, "https://shop.test/search?q=usb%20cable");
        assert!(!listing.available);
    }

    #[tokio::test]
    async fn test_fraction_without_whole_is_ignored() {
        let html = r#"<li class="item"><span class="frac">50</span></li>"#;
        let listing = scrape_with(html, SHOP).await.unwrap().unwrap();
        assert_eq!(listing.price_text, None);
    }

    #[tokio::test]
    async fn test_link_only_profile_is_never_available() {
        let profile = RetailerProfile {
            container: "div.g a",
            title: None,
            price: None,
            link: FieldRule::own_property("href"),
            kind: ListingKind::LinkOnly,
            shipping: 0,
            delivery_days: Some(5),
            ..SHOP
        };
        let html = r#"<div class="g"><a href="https://brand.test/">Brand</a></div>"#;

        let listing = scrape_with(html, profile).await.unwrap().unwrap();
        assert_eq!(listing.title.as_deref(), Some("usb cable"));
        assert_eq!(listing.link, "https://brand.test/");
        assert_eq!(listing.price_text, None);
        assert!(!listing.available);
    }

    #[tokio::test]
    async fn test_navigation_failure_is_an_error() {
        let launcher = FixtureLauncher::new();
        let browser = launcher.launch().await.unwrap();
        let page = browser.new_page().await.unwrap();
        let query = Query::parse("usb cable").unwrap();

        let result = SelectorAdapter::new(SHOP).scrape(page.as_ref(), &query).await;
        assert!(result.is_err());
    }
}
