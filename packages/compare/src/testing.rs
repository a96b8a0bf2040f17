//! Testing utilities including fixture browsers and stub retailers.
//!
//! These let applications exercise the comparison pipeline without a real
//! browser or network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use crate::browser::{
    Browser, BrowserLauncher, Document, ElementHandle, NavigationOptions, Page, Viewport,
};
use crate::error::{BrowserError, BrowserResult, ScrapeError, ScrapeResult};
use crate::retailers::Retailer;
use crate::types::{listing::RawListing, query::Query};

/// What a fixture page does when navigated to a matching URL.
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    /// Serve this HTML
    Html(String),
    /// Fail navigation with this reason
    Fail(String),
    /// Fail navigation with a timeout
    Timeout,
}

/// Lifecycle counters recorded by a [`FixtureLauncher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixtureStats {
    pub launches: usize,
    pub browsers_closed: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
}

#[derive(Default)]
struct FixtureState {
    routes: Mutex<Vec<(String, FixtureResponse)>>,
    navigations: Mutex<Vec<String>>,
    user_agents: Mutex<Vec<String>>,
    viewports: Mutex<Vec<Viewport>>,
    fail_launch: AtomicBool,
    launches: AtomicUsize,
    browsers_closed: AtomicUsize,
    pages_opened: AtomicUsize,
    pages_closed: AtomicUsize,
}

impl FixtureState {
    fn route(&self, url: &str) -> Option<FixtureResponse> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
    }
}

/// Browser launcher that serves canned responses by URL prefix.
///
/// # Example
///
/// ```rust
/// use compare_core::testing::FixtureLauncher;
///
/// let launcher = FixtureLauncher::new()
///     .with_html("https://www.croma.com/", "<li class=\"product-item\"></li>")
///     .with_failure("https://www.flipkart.com/", "connection reset");
/// assert_eq!(launcher.stats().launches, 0);
/// ```
#[derive(Clone, Default)]
pub struct FixtureLauncher {
    state: Arc<FixtureState>,
}

impl FixtureLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for URLs starting with `prefix`.
    pub fn with_html(self, prefix: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_response(prefix, FixtureResponse::Html(html.into()))
    }

    /// Fail navigation for URLs starting with `prefix`.
    pub fn with_failure(self, prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        self.with_response(prefix, FixtureResponse::Fail(reason.into()))
    }

    /// Time out navigation for URLs starting with `prefix`.
    pub fn with_timeout(self, prefix: impl Into<String>) -> Self {
        self.with_response(prefix, FixtureResponse::Timeout)
    }

    pub fn with_response(self, prefix: impl Into<String>, response: FixtureResponse) -> Self {
        self.state
            .routes
            .lock()
            .unwrap()
            .push((prefix.into(), response));
        self
    }

    /// Make every launch fail.
    pub fn failing_launch(self) -> Self {
        self.state.fail_launch.store(true, Ordering::SeqCst);
        self
    }

    pub fn stats(&self) -> FixtureStats {
        FixtureStats {
            launches: self.state.launches.load(Ordering::SeqCst),
            browsers_closed: self.state.browsers_closed.load(Ordering::SeqCst),
            pages_opened: self.state.pages_opened.load(Ordering::SeqCst),
            pages_closed: self.state.pages_closed.load(Ordering::SeqCst),
        }
    }

    /// URLs navigated to, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.lock().unwrap().clone()
    }

    /// User agents set on pages, in order.
    pub fn user_agents(&self) -> Vec<String> {
        self.state.user_agents.lock().unwrap().clone()
    }

    /// Viewports set on pages, in order.
    pub fn viewports(&self) -> Vec<Viewport> {
        self.state.viewports.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FixtureLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(BrowserError::Launch("fixture launch failure".to_string()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureBrowser {
            state: self.state.clone(),
        }))
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

struct FixtureBrowser {
    state: Arc<FixtureState>,
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        self.state.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixturePage {
            state: self.state.clone(),
            document: Mutex::new(None),
        }))
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.state.browsers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FixturePage {
    state: Arc<FixtureState>,
    document: Mutex<Option<Document>>,
}

impl FixturePage {
    fn current(&self) -> BrowserResult<Document> {
        self.document
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BrowserError::Protocol("no document loaded".to_string()))
    }
}

#[async_trait]
impl Page for FixturePage {
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        self.state
            .user_agents
            .lock()
            .unwrap()
            .push(user_agent.to_string());
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> BrowserResult<()> {
        self.state.viewports.lock().unwrap().push(viewport);
        Ok(())
    }

    async fn goto(&self, url: &str, options: &NavigationOptions) -> BrowserResult<()> {
        self.state.navigations.lock().unwrap().push(url.to_string());

        match self.state.route(url) {
            Some(FixtureResponse::Html(html)) => {
                *self.document.lock().unwrap() = Some(Document::new(html, Url::parse(url).ok()));
                Ok(())
            }
            Some(FixtureResponse::Fail(reason)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason,
            }),
            Some(FixtureResponse::Timeout) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: options.timeout.as_millis() as u64,
            }),
            None => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "no fixture registered".to_string(),
            }),
        }
    }

    async fn query_selector(&self, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        self.current()?.select_first(selector)
    }

    async fn query_selector_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Option<ElementHandle>> {
        self.current()?.select_first_within(scope, selector)
    }

    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        self.current()?.text(element)
    }

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        self.current()?.property(element, name)
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted outcome for a [`StubRetailer`].
#[derive(Debug, Clone)]
pub enum StubOutcome {
    Listing(RawListing),
    NoMatch,
    Fail(String),
    /// Never completes; only the aggregator's timeout ends it
    Hang,
}

/// A retailer that ignores the page and returns a scripted outcome.
pub struct StubRetailer {
    name: String,
    outcome: StubOutcome,
    calls: AtomicUsize,
}

impl StubRetailer {
    pub fn new(name: impl Into<String>, outcome: StubOutcome) -> Self {
        Self {
            name: name.into(),
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    /// An available listing with the given price and shipping.
    pub fn priced(name: impl Into<String>, price: u64, shipping: u64) -> Self {
        let name = name.into();
        let listing = RawListing::new(name.clone(), format!("https://{}/item", slug(&name)))
            .with_price_text(price.to_string())
            .with_shipping(shipping)
            .with_available(true);
        Self::new(name, StubOutcome::Listing(listing))
    }

    /// A listing that was found but is not available.
    pub fn unavailable(name: impl Into<String>) -> Self {
        let name = name.into();
        let listing = RawListing::new(name.clone(), format!("https://{}/", slug(&name)));
        Self::new(name, StubOutcome::Listing(listing))
    }

    pub fn failing(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(name, StubOutcome::Fail(reason.into()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

#[async_trait]
impl Retailer for StubRetailer {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_url(&self, query: &Query) -> String {
        format!(
            "https://{}/search?q={}",
            slug(&self.name),
            urlencoding::encode(query.as_str())
        )
    }

    async fn scrape(&self, _page: &dyn Page, _query: &Query) -> ScrapeResult<Option<RawListing>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            StubOutcome::Listing(listing) => Ok(Some(listing.clone())),
            StubOutcome::NoMatch => Ok(None),
            StubOutcome::Fail(reason) => Err(ScrapeError::Browser(BrowserError::Navigation {
                url: format!("https://{}/", slug(&self.name)),
                reason: reason.clone(),
            })),
            StubOutcome::Hang => {
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }
}
