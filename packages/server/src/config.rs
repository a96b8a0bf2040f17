use anyhow::{anyhow, Context, Result};
use compare_core::browser::{
    BrowserLauncher, HttpLauncher, WebDriverConfig, WebDriverKind, WebDriverLauncher,
};
use compare_core::AggregatorConfig;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which browser backend serves page loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserBackend {
    /// A real browser behind a W3C WebDriver endpoint
    WebDriver,
    /// Plain HTTP fetch, no JavaScript
    Http,
}

impl FromStr for BrowserBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "webdriver" => Ok(Self::WebDriver),
            "http" => Ok(Self::Http),
            other => Err(anyhow!("unknown browser backend: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub browser_backend: BrowserBackend,
    pub webdriver_url: String,
    pub webdriver_browser: WebDriverKind,
    pub browser_headless: bool,
    pub cache_ttl: Duration,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub max_concurrent_pages: usize,
    pub adapter_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            port: var("PORT", "3000")
                .parse()
                .context("PORT must be a valid number")?,
            browser_backend: var("BROWSER_BACKEND", "webdriver")
                .parse()
                .context("BROWSER_BACKEND must be webdriver or http")?,
            webdriver_url: var("WEBDRIVER_URL", "http://localhost:9515"),
            webdriver_browser: var("WEBDRIVER_BROWSER", "chrome")
                .parse()
                .map_err(|e: String| anyhow!(e))
                .context("WEBDRIVER_BROWSER must be chrome or firefox")?,
            browser_headless: var("BROWSER_HEADLESS", "true")
                .parse()
                .context("BROWSER_HEADLESS must be true or false")?,
            cache_ttl: Duration::from_secs(
                var("CACHE_TTL_SECS", "1800")
                    .parse()
                    .context("CACHE_TTL_SECS must be a number of seconds")?,
            ),
            rate_limit_max: var("RATE_LIMIT_MAX", "30")
                .parse()
                .context("RATE_LIMIT_MAX must be a positive number")?,
            rate_limit_window: Duration::from_secs(
                var("RATE_LIMIT_WINDOW_SECS", "60")
                    .parse()
                    .context("RATE_LIMIT_WINDOW_SECS must be a number of seconds")?,
            ),
            max_concurrent_pages: var("MAX_CONCURRENT_PAGES", "1")
                .parse()
                .context("MAX_CONCURRENT_PAGES must be a positive number")?,
            adapter_timeout: Duration::from_secs(
                var("ADAPTER_TIMEOUT_SECS", "45")
                    .parse()
                    .context("ADAPTER_TIMEOUT_SECS must be a number of seconds")?,
            ),
        })
    }

    /// Launcher for the configured backend.
    pub fn browser_launcher(&self) -> Result<Arc<dyn BrowserLauncher>> {
        match self.browser_backend {
            BrowserBackend::WebDriver => {
                let config = WebDriverConfig::new(self.webdriver_url.clone())
                    .with_kind(self.webdriver_browser)
                    .with_headless(self.browser_headless);
                let launcher =
                    WebDriverLauncher::new(config).context("Failed to create WebDriver launcher")?;
                Ok(Arc::new(launcher))
            }
            BrowserBackend::Http => {
                let launcher = HttpLauncher::new().context("Failed to create HTTP launcher")?;
                Ok(Arc::new(launcher))
            }
        }
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            max_concurrent_pages: self.max_concurrent_pages,
            adapter_timeout: self.adapter_timeout,
            ..AggregatorConfig::default()
        }
    }
}
