//! Chromium session management
//!
//! Launches a hardened Chromium, keeps one page for the whole run, and
//! implements [`PageDriver`] over in-page script evaluation. All element
//! lookups happen inside the page so role/text matching sees the live DOM.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::browser::DriverError;
use crate::config::Config;
use crate::page::{Locator, PageDriver};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const VIEWPORT_WIDTH: u32 = 1280;
const VIEWPORT_HEIGHT: u32 = 800;

const JS_TIMEOUT: Duration = Duration::from_secs(30);
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const VISIBILITY_POLL: Duration = Duration::from_millis(200);
const NETWORK_POLL: Duration = Duration::from_millis(250);

// Headed Chrome passes these probes on its own; only headless needs the
// patch-up, and patching a headed browser is itself a detectable tell.
const STEALTH_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false });
window.chrome = window.chrome || { runtime: {} };
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) =>
    parameters.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : originalQuery(parameters);
"#;

/// One Chromium instance plus the single page the session drives.
pub struct BrowserSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    slow_mo: Duration,
}

impl BrowserSession {
    /// Launch Chromium and prepare the session page.
    pub async fn launch(config: &Config) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-infobars")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--mute-audio")
            .arg("--lang=en-US")
            .arg(format!("--user-agent={USER_AGENT}"));

        if let Some(chrome) = find_chrome() {
            info!("using chrome at {}", chrome.display());
            builder = builder.chrome_executable(chrome);
        }
        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder.build().map_err(DriverError::LaunchFailed)?;
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        let headers = Headers::new(serde_json::json!({
            "Accept-Language": "en-US,en;q=0.9",
        }));
        page.execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        if config.headless {
            page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
                STEALTH_INIT_SCRIPT,
            ))
            .await
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;
        }

        info!(
            headless = config.headless,
            "browser session ready ({VIEWPORT_WIDTH}x{VIEWPORT_HEIGHT})"
        );
        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            slow_mo: config.slow_mo,
        })
    }

    /// Shut the browser down. Safe to call once the run is over regardless of
    /// how it ended.
    pub async fn close(&self) {
        if let Err(e) = self.page.clone().close().await {
            debug!("closing page: {e}");
        }
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                warn!("closing browser: {e}");
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            if let Some(Err(e)) = browser.kill().await {
                debug!("killing browser process: {e}");
            }
        }
        info!("browser session closed");
    }

    async fn execute_js(&self, script: &str) -> Result<Value, DriverError> {
        let result = tokio::time::timeout(JS_TIMEOUT, self.page.evaluate(script))
            .await
            .map_err(|_| {
                DriverError::Timeout(format!("script evaluation exceeded {JS_TIMEOUT:?}"))
            })?
            .map_err(|e| DriverError::JavaScriptError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }
}

fn find_chrome() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
            "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    };
    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

fn js_string(value: &str) -> String {
    // serde_json produces a valid JS string literal, quotes included.
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression yielding the array of elements a locator matches.
fn collector(locator: &Locator) -> String {
    match locator {
        Locator::Css { selector } => {
            format!("Array.from(document.querySelectorAll({}))", js_string(selector))
        }
        Locator::CssText {
            selector,
            substring,
        } => format!(
            "Array.from(document.querySelectorAll({sel})).filter(el => \
             (el.textContent || '').toLowerCase().includes({text}))",
            sel = js_string(selector),
            text = js_string(&substring.to_lowercase()),
        ),
        Locator::Text { substring } => format!(
            "(() => {{\n\
                const needle = {text};\n\
                const hits = Array.from(document.querySelectorAll('body, body *'))\n\
                    .filter(el => (el.textContent || '').toLowerCase().includes(needle));\n\
                return hits.filter(el =>\n\
                    !Array.from(el.children).some(child =>\n\
                        (child.textContent || '').toLowerCase().includes(needle)));\n\
             }})()",
            text = js_string(&substring.to_lowercase()),
        ),
        Locator::Role { role, name } => format!(
            "(() => {{\n\
                const wanted = {name};\n\
                const accName = (el) => {{\n\
                    const label = el.getAttribute('aria-label');\n\
                    if (label) return label.trim();\n\
                    if (el.tagName === 'INPUT') return (el.value || '').trim();\n\
                    return (el.textContent || '').trim();\n\
                }};\n\
                const candidates = {role} === 'button'\n\
                    ? 'button, [role=\"button\"], input[type=\"submit\"], input[type=\"button\"], a'\n\
                    : '[role=' + JSON.stringify({role}) + ']';\n\
                return Array.from(document.querySelectorAll(candidates))\n\
                    .filter(el => accName(el).toLowerCase() === wanted);\n\
             }})()",
            name = js_string(&name.to_lowercase()),
            role = js_string(&role.to_lowercase()),
        ),
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.pace().await;
        debug!("navigating to {url}");
        self.page
            .goto(url)
            .await
            .map_err(|e| DriverError::NavigationFailed(format!("{url}: {e}")))?;
        // Some portal pages keep long-polling and never fire the load event;
        // a missed deadline here is tolerated.
        if tokio::time::timeout(NAVIGATION_TIMEOUT, self.page.wait_for_navigation())
            .await
            .is_err()
        {
            debug!("load event not seen for {url} within {NAVIGATION_TIMEOUT:?}");
        }
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<bool, DriverError> {
        let deadline = Instant::now() + timeout;
        let mut last_resources: Option<u64> = None;
        while Instant::now() < deadline {
            let snapshot = self
                .execute_js(
                    "({ resources: performance.getEntriesByType('resource').length, \
                       ready: document.readyState })",
                )
                .await?;
            let resources = snapshot
                .get("resources")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let complete = snapshot.get("ready").and_then(Value::as_str) == Some("complete");
            if complete && last_resources == Some(resources) {
                return Ok(true);
            }
            last_resources = Some(resources);
            tokio::time::sleep(NETWORK_POLL).await;
        }
        debug!("network did not settle within {timeout:?}");
        Ok(false)
    }

    async fn count(&self, locator: &Locator) -> Result<usize, DriverError> {
        let script = format!("(() => {{ const els = {}; return els.length; }})()", collector(locator));
        let n = self.execute_js(&script).await?.as_u64().unwrap_or(0);
        Ok(n as usize)
    }

    async fn click_first(&self, locator: &Locator, force: bool) -> Result<(), DriverError> {
        self.pace().await;
        let scroll = if force {
            ""
        } else {
            "el.scrollIntoView({ block: 'center', inline: 'center' });"
        };
        let script = format!(
            "(() => {{\n\
                const els = {collect};\n\
                if (!els.length) return false;\n\
                const el = els[0];\n\
                {scroll}\n\
                el.click();\n\
                return true;\n\
             }})()",
            collect = collector(locator),
        );
        match self.execute_js(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(DriverError::ElementNotFound(format!("{locator:?}"))),
        }
    }

    async fn fill_first(&self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.pace().await;
        let script = format!(
            "(() => {{\n\
                const els = {collect};\n\
                if (!els.length) return false;\n\
                const el = els[0];\n\
                el.focus();\n\
                el.value = {value};\n\
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n\
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n\
                return true;\n\
             }})()",
            collect = collector(locator),
            value = js_string(value),
        );
        match self.execute_js(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(DriverError::ElementNotFound(format!("{locator:?}"))),
        }
    }

    async fn press_enter(&self, locator: &Locator) -> Result<(), DriverError> {
        self.pace().await;
        let script = format!(
            "(() => {{\n\
                const els = {collect};\n\
                if (!els.length) return false;\n\
                const el = els[0];\n\
                const opts = {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }};\n\
                el.dispatchEvent(new KeyboardEvent('keydown', opts));\n\
                el.dispatchEvent(new KeyboardEvent('keyup', opts));\n\
                if (el.form) el.form.submit();\n\
                return true;\n\
             }})()",
            collect = collector(locator),
        );
        match self.execute_js(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(DriverError::ElementNotFound(format!("{locator:?}"))),
        }
    }

    async fn wait_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<bool, DriverError> {
        let script = format!(
            "(() => {{ const els = {}; \
               return els.some(el => el.offsetParent !== null); }})()",
            collector(locator),
        );
        let deadline = Instant::now() + timeout;
        loop {
            if self.execute_js(&script).await? == Value::Bool(true) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                debug!("{locator:?} not visible within {timeout:?}");
                return Ok(false);
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }
}
