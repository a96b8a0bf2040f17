//! Browser automation contract consumed by retailer adapters.
//!
//! The pipeline never drives a browser directly. It goes through three
//! traits that mirror the lifecycle of a real headless browser:
//!
//! - [`BrowserLauncher`] starts one browser per comparison request
//! - [`Browser`] hands out isolated pages (tabs)
//! - [`Page`] navigates and answers CSS-selector lookups
//!
//! # Backends
//!
//! - `WebDriverLauncher` - real browser via a W3C WebDriver endpoint
//! - `HttpLauncher` - plain HTTP fetch + HTML parsing, no JavaScript
//! - `testing::FixtureLauncher` - canned HTML for tests
//!
//! ```rust,ignore
//! let browser = launcher.launch().await?;
//! let page = browser.new_page().await?;
//! page.goto("https://example.com", &NavigationOptions::default()).await?;
//! let item = page.query_selector("li.product").await?;
//! page.close().await?;
//! browser.close().await?;
//! ```

mod document;
mod http;
mod webdriver;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::BrowserResult;

pub use document::Document;
pub use http::HttpLauncher;
pub use webdriver::{WebDriverConfig, WebDriverKind, WebDriverLauncher};

/// User agent set on every page before an adapter runs.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/117.0 Safari/537.36";

/// Navigation timeout used by the retailer adapters.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Page viewport in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
        }
    }
}

/// Point in the page lifecycle at which navigation is considered done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    /// Initial HTML parsed (DOMContentLoaded); subresources may still load
    #[default]
    DomContentLoaded,
    /// Full `load` event
    Load,
}

/// Options for [`Page::goto`].
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    pub timeout: Duration,
    pub wait_until: WaitUntil,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout: NAVIGATION_TIMEOUT,
            wait_until: WaitUntil::DomContentLoaded,
        }
    }
}

/// Opaque reference to an element found on a page.
///
/// Only meaningful to the page that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Starts browsers. One launch per comparison request.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a fresh browser process (or session).
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>>;

    /// Backend name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// A running browser.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a new isolated page.
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;

    /// Shut the browser down, releasing every page it still holds.
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}

/// A single tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Override the user agent for subsequent navigations.
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()>;

    /// Resize the page viewport.
    async fn set_viewport(&self, viewport: Viewport) -> BrowserResult<()>;

    /// Navigate to `url`, failing if `options.timeout` elapses first.
    async fn goto(&self, url: &str, options: &NavigationOptions) -> BrowserResult<()>;

    /// First element in the document matching `selector`.
    async fn query_selector(&self, selector: &str) -> BrowserResult<Option<ElementHandle>>;

    /// First descendant of `scope` matching `selector`.
    async fn query_selector_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Option<ElementHandle>>;

    /// Rendered text of an element, whitespace-trimmed.
    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String>;

    /// DOM property of an element (`href` comes back as an absolute URL).
    async fn property(&self, element: &ElementHandle, name: &str)
        -> BrowserResult<Option<String>>;

    /// Close the tab.
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}
