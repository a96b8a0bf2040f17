//! Drives every retailer adapter over isolated pages of one browser.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{Browser, BrowserLauncher, Page, Viewport, DEFAULT_USER_AGENT};
use crate::error::{CompareError, CompareResult, ScrapeError, ScrapeResult};
use crate::pipeline::rank::rank_listings;
use crate::retailers::Retailer;
use crate::types::listing::{NormalizedResult, RawListing};
use crate::types::query::Query;

/// Tuning for [`Aggregator`].
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// User agent applied to every page
    pub user_agent: String,
    /// Viewport applied to every page
    pub viewport: Viewport,
    /// How many retailers may be scraped at once; 1 is strictly sequential
    pub max_concurrent_pages: usize,
    /// Outer bound on one adapter call, on top of its navigation timeout
    pub adapter_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport: Viewport::default(),
            max_concurrent_pages: 1,
            adapter_timeout: Duration::from_secs(45),
        }
    }
}

/// Runs a comparison: one browser per call, one page per retailer.
///
/// A failing retailer is logged and left out; it never fails the batch.
/// Only a browser that cannot be launched fails the whole comparison.
pub struct Aggregator {
    launcher: Arc<dyn BrowserLauncher>,
    retailers: Vec<Arc<dyn Retailer>>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, retailers: Vec<Arc<dyn Retailer>>) -> Self {
        Self {
            launcher,
            retailers,
            config: AggregatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Retailer names in scrape order.
    pub fn retailer_names(&self) -> Vec<String> {
        self.retailers.iter().map(|r| r.name().to_string()).collect()
    }

    /// Scrape every retailer for `query` and return the ranked results.
    pub async fn compare(&self, query: &Query) -> CompareResult<Vec<NormalizedResult>> {
        let browser = self.launcher.launch().await.map_err(|e| {
            warn!(backend = self.launcher.name(), error = %e, "browser launch failed");
            CompareError::Launch(e)
        })?;

        let listings = self.scrape_all(browser.as_ref(), query).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser close failed");
        }

        let ranked = rank_listings(listings);
        info!(query = %query, results = ranked.len(), "comparison finished");
        Ok(ranked)
    }

    async fn scrape_all(&self, browser: &dyn Browser, query: &Query) -> Vec<RawListing> {
        let concurrency = self.config.max_concurrent_pages.max(1);

        let tasks: Vec<_> = self
            .retailers
            .iter()
            .map(|retailer| self.scrape_one(browser, retailer.as_ref(), query))
            .collect();

        // buffered() yields in input order, so ranking ties follow retailer order
        stream::iter(tasks)
            .buffered(concurrency)
            .filter_map(futures::future::ready)
            .collect()
            .await
    }

    async fn scrape_one(
        &self,
        browser: &dyn Browser,
        retailer: &dyn Retailer,
        query: &Query,
    ) -> Option<RawListing> {
        let page = match browser.new_page().await {
            Ok(page) => page,
            Err(e) => {
                warn!(retailer = retailer.name(), error = %e, "failed to open page");
                return None;
            }
        };

        let outcome = self.run_adapter(page.as_ref(), retailer, query).await;

        if let Err(e) = page.close().await {
            warn!(retailer = retailer.name(), error = %e, "page close failed");
        }

        match outcome {
            Ok(Some(listing)) if listing.available => {
                debug!(retailer = retailer.name(), total = listing.total_cost(), "listing kept");
                Some(listing)
            }
            Ok(Some(_)) => {
                debug!(retailer = retailer.name(), "listing unavailable");
                None
            }
            Ok(None) => {
                debug!(retailer = retailer.name(), "no match");
                None
            }
            Err(e) => {
                warn!(retailer = retailer.name(), error = %e, "retailer scrape failed");
                None
            }
        }
    }

    async fn run_adapter(
        &self,
        page: &dyn Page,
        retailer: &dyn Retailer,
        query: &Query,
    ) -> ScrapeResult<Option<RawListing>> {
        page.set_user_agent(&self.config.user_agent).await?;
        page.set_viewport(self.config.viewport).await?;

        tokio::time::timeout(self.config.adapter_timeout, retailer.scrape(page, query))
            .await
            .unwrap_or_else(|_| {
                Err(ScrapeError::Timeout {
                    retailer: retailer.name().to_string(),
                    timeout_ms: self.config.adapter_timeout.as_millis() as u64,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retailers::default_retailers;
    use crate::testing::{FixtureLauncher, StubOutcome, StubRetailer};

    fn query() -> Query {
        Query::parse("iphone15").unwrap()
    }

    fn aggregator(launcher: &FixtureLauncher, retailers: Vec<Arc<dyn Retailer>>) -> Aggregator {
        Aggregator::new(Arc::new(launcher.clone()), retailers)
    }

    #[tokio::test]
    async fn test_ranks_available_results() {
        let launcher = FixtureLauncher::new();
        let agg = aggregator(
            &launcher,
            vec![
                Arc::new(StubRetailer::priced("Amazon.in", 70_000, 0)),
                Arc::new(StubRetailer::priced("Flipkart", 68_000, 599)),
                Arc::new(StubRetailer::unavailable("Official Store")),
            ],
        );

        let results = agg.compare(&query()).await.unwrap();

        let names: Vec<_> = results.iter().map(|r| r.retailer.as_str()).collect();
        assert_eq!(names, ["Flipkart", "Amazon.in"]);
        assert_eq!(results[0].total_cost, 68_599);
        assert!(results.iter().all(|r| r.available));
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let launcher = FixtureLauncher::new();
        let failing = Arc::new(StubRetailer::failing("Croma", "net::ERR_CONNECTION_RESET"));
        let after = Arc::new(StubRetailer::priced("Reliance Digital", 60_000, 499));
        let agg = aggregator(&launcher, vec![failing.clone(), after.clone()]);

        let results = agg.compare(&query()).await.unwrap();

        assert_eq!(failing.call_count(), 1);
        assert_eq!(after.call_count(), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].retailer, "Reliance Digital");
    }

    #[tokio::test]
    async fn test_all_failing_is_empty_not_error() {
        let launcher = FixtureLauncher::new();
        let agg = aggregator(
            &launcher,
            vec![
                Arc::new(StubRetailer::failing("A", "boom")),
                Arc::new(StubRetailer::new("B", StubOutcome::NoMatch)),
                Arc::new(StubRetailer::unavailable("C")),
            ],
        );

        let results = agg.compare(&query()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_pages_and_browser_always_closed() {
        let launcher = FixtureLauncher::new();
        let agg = aggregator(
            &launcher,
            vec![
                Arc::new(StubRetailer::priced("A", 10, 0)),
                Arc::new(StubRetailer::failing("B", "boom")),
                Arc::new(StubRetailer::new("C", StubOutcome::NoMatch)),
            ],
        );

        agg.compare(&query()).await.unwrap();

        let stats = launcher.stats();
        assert_eq!(stats.launches, 1);
        assert_eq!(stats.browsers_closed, 1);
        assert_eq!(stats.pages_opened, 3);
        assert_eq!(stats.pages_closed, 3);
    }

    #[tokio::test]
    async fn test_pages_get_user_agent_and_viewport() {
        let launcher = FixtureLauncher::new();
        let agg = aggregator(&launcher, vec![Arc::new(StubRetailer::priced("A", 1, 0))]);

        agg.compare(&query()).await.unwrap();

        assert_eq!(launcher.user_agents(), [DEFAULT_USER_AGENT]);
        assert_eq!(
            launcher.viewports(),
            [Viewport {
                width: 1200,
                height: 800
            }]
        );
    }

    #[tokio::test]
    async fn test_launch_failure_is_an_error() {
        let launcher = FixtureLauncher::new().failing_launch();
        let agg = aggregator(&launcher, vec![Arc::new(StubRetailer::priced("A", 1, 0))]);

        let err = agg.compare(&query()).await.unwrap_err();
        assert!(matches!(err, CompareError::Launch(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_adapter_times_out() {
        let launcher = FixtureLauncher::new();
        let agg = aggregator(
            &launcher,
            vec![
                Arc::new(StubRetailer::new("Slow", StubOutcome::Hang)),
                Arc::new(StubRetailer::priced("Fast", 5, 0)),
            ],
        )
        .with_config(AggregatorConfig {
            adapter_timeout: Duration::from_secs(2),
            ..AggregatorConfig::default()
        });

        let results = agg.compare(&query()).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].retailer, "Fast");
        assert_eq!(launcher.stats().pages_closed, 2);
    }

    #[tokio::test]
    async fn test_concurrent_fan_out_matches_sequential() {
        let retailers = || -> Vec<Arc<dyn Retailer>> {
            vec![
                Arc::new(StubRetailer::priced("A", 300, 0)),
                Arc::new(StubRetailer::priced("B", 100, 200)),
                Arc::new(StubRetailer::failing("C", "boom")),
                Arc::new(StubRetailer::priced("D", 100, 0)),
            ]
        };

        let sequential = aggregator(&FixtureLauncher::new(), retailers())
            .compare(&query())
            .await
            .unwrap();
        let concurrent = aggregator(&FixtureLauncher::new(), retailers())
            .with_config(AggregatorConfig {
                max_concurrent_pages: 4,
                ..AggregatorConfig::default()
            })
            .compare(&query())
            .await
            .unwrap();

        assert_eq!(sequential, concurrent);
        let names: Vec<_> = concurrent.iter().map(|r| r.retailer.as_str()).collect();
        assert_eq!(names, ["D", "A", "B"]);
    }

    #[tokio::test]
    async fn test_builtin_retailers_against_fixtures() {
        let launcher = FixtureLauncher::new()
            .with_html(
                "https://www.amazon.in/",
                r#"<div class="s-main-slot"><div data-component-type="s-search-result">
                     <h2><a href="/dp/A1"><span>iPhone 15</span></a></h2>
                     <span class="a-price-whole">71,290.</span><span class="a-price-fraction">00</span>
                   </div></div>"#,
            )
            .with_html(
                "https://www.flipkart.com/",
                r#"<div data-id="X"><a title="iPhone 15" href="/p/X"></a><div class="_30jeq3">₹69,999</div></div>"#,
            )
            .with_timeout("https://www.reliancedigital.in/")
            .with_html("https://www.croma.com/", "<p>Sorry, no results</p>")
            .with_html(
                "https://www.google.com/",
                r#"<div class="g"><a href="https://www.apple.com/in/">Apple</a></div>"#,
            );
        let agg = aggregator(&launcher, default_retailers());

        let results = agg.compare(&query()).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].retailer, "Flipkart");
        assert_eq!(results[0].total_cost, 69_999 + 599);
        assert_eq!(results[0].link, "https://www.flipkart.com/p/X");
        assert_eq!(results[1].retailer, "Amazon.in");
        assert_eq!(results[1].total_cost, 71_290);
        assert_eq!(results[1].delivery_days, None);

        assert_eq!(launcher.navigations().len(), 5);
        assert_eq!(launcher.stats().pages_closed, 5);
    }
}
