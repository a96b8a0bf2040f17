//! W3C WebDriver browser backend.
//!
//! Talks JSON over HTTP to chromedriver/geckodriver. A launched browser is a
//! WebDriver session; each page is a tab opened with `window/new`. WebDriver
//! has a single "current window" per session, so every page command takes the
//! session lock and switches to its own tab first.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::{
    Browser, BrowserLauncher, ElementHandle, NavigationOptions, Page, Viewport, WaitUntil,
    DEFAULT_USER_AGENT,
};
use crate::error::{BrowserError, BrowserResult};

/// JSON key WebDriver uses for element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735d6ed2d6";

/// Slack added on top of the page-load timeout for the HTTP round trip.
const NAVIGATION_GRACE: Duration = Duration::from_secs(5);

const READY_STATE_POLL: Duration = Duration::from_millis(200);

/// Which browser the WebDriver endpoint drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WebDriverKind {
    #[default]
    Chrome,
    Firefox,
}

impl std::str::FromStr for WebDriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Self::Chrome),
            "firefox" | "gecko" => Ok(Self::Firefox),
            other => Err(format!("unsupported webdriver browser: {other}")),
        }
    }
}

/// Settings for [`WebDriverLauncher`].
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Endpoint such as `http://localhost:9515`
    pub endpoint: String,
    pub kind: WebDriverKind,
    pub headless: bool,
    /// User agent passed at launch; pages may still override it
    pub user_agent: String,
    /// Upper bound on any single WebDriver HTTP call
    pub request_timeout: Duration,
}

impl WebDriverConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind: WebDriverKind::Chrome,
            headless: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_kind(mut self, kind: WebDriverKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Capabilities payload for `POST /session`.
    ///
    /// `pageLoadStrategy: eager` makes navigation return at DOMContentLoaded.
    pub fn capabilities(&self) -> Value {
        match self.kind {
            WebDriverKind::Firefox => {
                let mut args = Vec::<String>::new();
                if self.headless {
                    args.push("-headless".to_string());
                }
                json!({
                    "capabilities": {
                        "alwaysMatch": {
                            "browserName": "firefox",
                            "acceptInsecureCerts": true,
                            "pageLoadStrategy": "eager",
                            "moz:firefoxOptions": {
                                "args": args,
                                "prefs": {
                                    "general.useragent.override": self.user_agent
                                }
                            }
                        }
                    }
                })
            }
            WebDriverKind::Chrome => {
                let mut args = Vec::<String>::new();
                if self.headless {
                    args.push("--headless=new".to_string());
                }
                args.push("--no-sandbox".to_string());
                args.push("--disable-setuid-sandbox".to_string());
                args.push("--disable-gpu".to_string());
                args.push("--disable-dev-shm-usage".to_string());
                args.push("--no-first-run".to_string());
                args.push("--no-default-browser-check".to_string());
                args.push(format!("--user-agent={}", self.user_agent));
                json!({
                    "capabilities": {
                        "alwaysMatch": {
                            "browserName": "chrome",
                            "acceptInsecureCerts": true,
                            "pageLoadStrategy": "eager",
                            "goog:chromeOptions": { "args": args }
                        }
                    }
                })
            }
        }
    }
}

/// Starts WebDriver sessions.
pub struct WebDriverLauncher {
    config: WebDriverConfig,
    client: reqwest::Client,
}

impl WebDriverLauncher {
    pub fn new(config: WebDriverConfig) -> BrowserResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BrowserError::Launch(format!("webdriver client build failed: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &WebDriverConfig {
        &self.config
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        let caps = self.config.capabilities();

        let value = send(
            &self.client,
            Method::POST,
            &format!("{endpoint}/session"),
            Some(caps),
        )
        .await
        .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let session_id = value
            .pointer("/sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrowserError::Launch("session id missing in response".to_string()))?
            .to_string();

        let mut session = Session {
            client: self.client.clone(),
            base: format!("{endpoint}/session/{session_id}"),
            session_id,
            kind: self.config.kind,
            home_window: String::new(),
            current_window: Mutex::new(None),
            closed: AtomicBool::new(false),
        };

        // Tabs are opened from, and fall back to, the session's initial window
        let home = session
            .command(Method::GET, "/window", None)
            .await
            .map_err(|e| BrowserError::Launch(format!("initial window lookup failed: {e}")))?;
        let home = home
            .as_str()
            .ok_or_else(|| BrowserError::Launch("initial window handle missing".to_string()))?
            .to_string();
        session.home_window = home.clone();
        *session.current_window.get_mut() = Some(home);

        info!(session_id = %session.session_id, endpoint = %endpoint, "WebDriver session started");

        Ok(Box::new(WebDriverBrowser {
            session: Arc::new(session),
        }))
    }

    fn name(&self) -> &str {
        "webdriver"
    }
}

struct Session {
    client: reqwest::Client,
    base: String,
    session_id: String,
    kind: WebDriverKind,
    /// Window open when the session started; never closed by a page
    home_window: String,
    /// Tab WebDriver currently targets; held for the duration of a page command
    current_window: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl Session {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> BrowserResult<Value> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrowserError::Closed("browser"));
        }
        send(&self.client, method, &format!("{}{}", self.base, path), body).await
    }

    /// Make `handle` the current window unless it already is.
    async fn switch(&self, current: &mut Option<String>, handle: &str) -> BrowserResult<()> {
        if current.as_deref() != Some(handle) {
            self.command(Method::POST, "/window", Some(json!({ "handle": handle })))
                .await?;
            *current = Some(handle.to_string());
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        // Browser was dropped without close(); end the session in the background
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(session_id = %self.session_id, "WebDriver session leaked (no runtime)");
            return;
        };
        let client = self.client.clone();
        let url = self.base.clone();
        handle.spawn(async move {
            let _ = client.delete(url).send().await;
        });
    }
}

/// A live WebDriver session.
pub struct WebDriverBrowser {
    session: Arc<Session>,
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        let mut current = self.session.current_window.lock().await;
        // window/new fails while the current window is a closed tab
        if current.is_none() {
            self.session
                .switch(&mut current, &self.session.home_window)
                .await?;
        }
        let value = self
            .session
            .command(Method::POST, "/window/new", Some(json!({ "type": "tab" })))
            .await?;
        let handle = value
            .pointer("/handle")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BrowserError::Protocol("window/new returned no handle".to_string()))?
            .to_string();

        debug!(window = %handle, "WebDriver tab opened");
        Ok(Box::new(WebDriverPage {
            session: self.session.clone(),
            handle,
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let result = self.session.command(Method::DELETE, "", None).await;
        self.session.closed.store(true, Ordering::Release);
        debug!(session_id = %self.session.session_id, "WebDriver session closed");
        result.map(|_| ())
    }
}

/// One browser tab.
pub struct WebDriverPage {
    session: Arc<Session>,
    handle: String,
    closed: AtomicBool,
}

impl WebDriverPage {
    /// Run a command against this tab, switching to it first if needed.
    async fn exec(&self, method: Method, path: &str, body: Option<Value>) -> BrowserResult<Value> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BrowserError::Closed("page"));
        }
        let mut current = self.session.current_window.lock().await;
        self.switch_to(&mut current).await?;
        self.session.command(method, path, body).await
    }

    async fn switch_to(&self, current: &mut Option<String>) -> BrowserResult<()> {
        self.session.switch(current, &self.handle).await
    }

    async fn find(&self, path: &str, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        let body = json!({ "using": "css selector", "value": selector });
        match self.exec(Method::POST, path, Some(body)).await {
            Ok(value) => value
                .get(ELEMENT_KEY)
                .and_then(|v| v.as_str())
                .map(|id| Some(ElementHandle::new(id)))
                .ok_or_else(|| BrowserError::Protocol("element reference missing".to_string())),
            Err(BrowserError::WebDriver { error, .. }) if error == "no such element" => Ok(None),
            Err(BrowserError::WebDriver { error, message }) if error == "invalid selector" => {
                Err(BrowserError::InvalidSelector(format!("{selector}: {message}")))
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_load(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self
                .exec(
                    Method::POST,
                    "/execute/sync",
                    Some(json!({ "script": "return document.readyState", "args": [] })),
                )
                .await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(READY_STATE_POLL).await;
        }
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        match self.session.kind {
            WebDriverKind::Chrome => {
                let body = json!({
                    "cmd": "Network.setUserAgentOverride",
                    "params": { "userAgent": user_agent }
                });
                self.exec(Method::POST, "/goog/cdp/execute", Some(body))
                    .await
                    .map(|_| ())
            }
            WebDriverKind::Firefox => {
                // No per-tab override; the launch preference already carries it
                debug!("per-page user agent unsupported on firefox, using launch value");
                Ok(())
            }
        }
    }

    async fn set_viewport(&self, viewport: Viewport) -> BrowserResult<()> {
        match self.session.kind {
            WebDriverKind::Chrome => {
                // Sizes the layout viewport itself, not the outer window frame
                let body = json!({
                    "cmd": "Emulation.setDeviceMetricsOverride",
                    "params": {
                        "width": viewport.width,
                        "height": viewport.height,
                        "deviceScaleFactor": 0,
                        "mobile": false
                    }
                });
                self.exec(Method::POST, "/goog/cdp/execute", Some(body))
                    .await
                    .map(|_| ())
            }
            WebDriverKind::Firefox => {
                let body = json!({ "width": viewport.width, "height": viewport.height });
                self.exec(Method::POST, "/window/rect", Some(body))
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn goto(&self, url: &str, options: &NavigationOptions) -> BrowserResult<()> {
        let timeout_ms = options.timeout.as_millis() as u64;
        self.exec(
            Method::POST,
            "/timeouts",
            Some(json!({ "pageLoad": timeout_ms })),
        )
        .await?;

        let navigate = self.exec(Method::POST, "/url", Some(json!({ "url": url })));
        match tokio::time::timeout(options.timeout + NAVIGATION_GRACE, navigate).await {
            Ok(Ok(_)) => {}
            Ok(Err(BrowserError::WebDriver { error, .. })) if error == "timeout" => {
                return Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms,
                })
            }
            Ok(Err(BrowserError::WebDriver { error, message })) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: format!("{error}: {message}"),
                })
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms,
                })
            }
        }

        if options.wait_until == WaitUntil::Load {
            self.wait_for_load(url, options.timeout).await?;
        }
        Ok(())
    }

    async fn query_selector(&self, selector: &str) -> BrowserResult<Option<ElementHandle>> {
        self.find("/element", selector).await
    }

    async fn query_selector_within(
        &self,
        scope: &ElementHandle,
        selector: &str,
    ) -> BrowserResult<Option<ElementHandle>> {
        self.find(&format!("/element/{}/element", scope.as_str()), selector)
            .await
    }

    async fn inner_text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let value = self
            .exec(Method::GET, &format!("/element/{}/text", element.as_str()), None)
            .await
            .map_err(|e| stale_or(e, element))?;
        Ok(value.as_str().unwrap_or_default().trim().to_string())
    }

    async fn property(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        let value = self
            .exec(
                Method::GET,
                &format!("/element/{}/property/{}", element.as_str(), name),
                None,
            )
            .await
            .map_err(|e| stale_or(e, element))?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let mut current = self.session.current_window.lock().await;
        self.switch_to(&mut current).await?;
        let result = self.session.command(Method::DELETE, "/window", None).await;
        *current = None;
        self.closed.store(true, Ordering::Release);
        debug!(window = %self.handle, "WebDriver tab closed");

        if let Err(e) = self
            .session
            .switch(&mut current, &self.session.home_window)
            .await
        {
            // Left unset; the next new_page retries the switch
            warn!(error = %e, "failed to return to initial window");
        }
        result.map(|_| ())
    }
}

fn stale_or(err: BrowserError, element: &ElementHandle) -> BrowserError {
    match err {
        BrowserError::WebDriver { error, .. } if error == "stale element reference" => {
            BrowserError::StaleElement(element.as_str().to_string())
        }
        other => other,
    }
}

/// Send one WebDriver command and unwrap its `value` field.
async fn send(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> BrowserResult<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    let parsed: Value = serde_json::from_str(&text).unwrap_or_default();
    if let Some(error) = parsed.pointer("/value/error").and_then(|v| v.as_str()) {
        let message = parsed
            .pointer("/value/message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown webdriver error");
        return Err(BrowserError::WebDriver {
            error: error.to_string(),
            message: truncate_for_log(message, 260),
        });
    }
    if !status.is_success() {
        return Err(BrowserError::Protocol(format!(
            "HTTP {}: {}",
            status.as_u16(),
            truncate_for_log(&text, 260)
        )));
    }

    Ok(parsed.get("value").cloned().unwrap_or(Value::Null))
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let mut out: String = input.chars().take(max_chars).collect();
    out.push('…');
    out
}
