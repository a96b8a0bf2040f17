//! HTTP-only browser backend.
//!
//! Fetches the raw HTML with reqwest and answers selector lookups against it.
//! No JavaScript runs, so sites that render their results client-side will
//! simply produce "no match". Useful where no WebDriver endpoint is available.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::browser::{
    Browser, BrowserLauncher, Document, ElementHandle, NavigationOptions, Page, Viewport,
    DEFAULT_USER_AGENT,
};
use crate::error::{BrowserError, BrowserResult};

/// Launcher for [`HttpBrowser`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpLauncher {
    client: reqwest::Client,
}

impl HttpLauncher {
    /// Create a launcher with a default client.
    pub fn new() -> BrowserResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BrowserError::Launch(format!("http client build failed: {e}")))?;
        Ok(Self { client })
    }

    /// Use a custom HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        Ok(Box::new(HttpBrowser {
            client: self.client.clone(),
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// A "browser" that is just a shared HTTP client.
pub struct HttpBrowser {
    client: reqwest::Client,
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            user_agent: RwLock::new(DEFAULT_USER_AGENT.to_string()),
            document: RwLock::new(None),
        }))
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        Ok(())
    }
}

/// A tab holding the last fetched document.
pub struct HttpPage {
    client: reqwest::Client,
    user_agent: RwLock<String>,
    document: RwLock<Option<Document>>,
}

impl HttpPage {
    async fn current(&self) -> BrowserResult<Document> {
        self.document
            .read()
            .await
            .clone()
            .ok_or_else(|| BrowserError::Protocol("no document loaded".to_string()))
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        *self.user_agent.write().await = user_agent.to_string();
        Ok(())
    }

    async fn set_viewport(&self, _viewport: Viewport) -> BrowserResult<()> {
        Ok(())
    }

    async fn goto(&self, url: &str, options: &NavigationOptions) -> BrowserResult<()> {
        let user_agent = self.user_agent.read().await.clone();
        debug!(url = %url, "HTTP navigation starting");

        let fetch = async {
            let response = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, user_agent)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: format!("HTTP {}", status),
                });
            }

            let final_url = response.url().clone();
            let html = response.text().await?;
            Ok::<_, BrowserError>((final_url, html))
        };

        let (final_url, html) = tokio::time::timeout(options.timeout, fetch)
            .await
            .map_err(|_| {
                warn!(url = %url, "HTTP navigation timed out");
                BrowserError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: options.timeout.as_millis() as u64,
                }
            })??;

        *self.document.write().await = Some(Document::new(html, Some(final_url)));
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        self.current().await?.select_first(selector)
    }

    async fn query_selector_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Option<ElementHandle>> {
        self.current().await?.select_first_within(scope, selector)
    }

    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        self.current().await?.text(element)
    }

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        self.current().await?.property(element, name)
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.document.write().await.take();
        Ok(())
    }
}
