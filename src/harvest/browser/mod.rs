
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{PageRenderer, RenderedPage};

/// Headless Chrome settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Render pages through Chrome before falling back to plain HTTP
    pub enabled: bool,
    pub headless: bool,
    /// Timeout for page navigation in seconds
    pub navigation_timeout_seconds: u64,
    /// Extra wait after navigation for scripts to populate the page
    pub settle_millis: u64,
    /// Idle time after which Chrome shuts itself down
    pub idle_timeout_seconds: u64,
    pub window_width: u32,
    pub window_height: u32,
    /// Additional Chrome arguments
    pub chrome_args: Vec<String>,
    pub user_agent: String,
}

impl Default for BrowserConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: true,
            headless: true,
            navigation_timeout_seconds: 30,
            settle_millis: 1000,
            idle_timeout_seconds: 60,
            window_width: 1280,
            window_height: 720,
            chrome_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-extensions".to_string(),
                "--blink-settings=imagesEnabled=false".to_string(),
                "--disable-background-timer-throttling".to_string(),
                "--disable-renderer-backgrounding".to_string(),
            ],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl BrowserConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.navigation_timeout_seconds == 0 || self.navigation_timeout_seconds > 300 {
            bail!("Navigation timeout must be between 1 and 300 seconds");
        }

        if self.settle_millis > 30_000 {
            bail!("Settle time must be at most 30000 milliseconds");
        }

        if self.window_width < 100 || self.window_width > 4096 {
            bail!("Window width must be between 100 and 4096 pixels");
        }

        if self.window_height < 100 || self.window_height > 4096 {
            bail!("Window height must be between 100 and 4096 pixels");
        }

        if self.user_agent.trim().is_empty() {
            bail!("Browser user agent cannot be empty");
        }

        Ok(())
    }

    fn launch_options(&self) -> LaunchOptions<'_> {
        let args: Vec<&OsStr> = self.chrome_args.iter().map(OsStr::new).collect();
        LaunchOptions {
            headless: self.headless,
            window_size: Some((self.window_width, self.window_height)),
            args,
            idle_browser_timeout: Duration::from_secs(self.idle_timeout_seconds),
            ..Default::default()
        }
    }
}

/// Renders pages through a lazily launched headless Chrome.
///
/// The browser is started on first use and reused for every later page. A
/// browser that stops accepting tabs is discarded and relaunched on the next
/// request.
pub struct BrowserRenderer {
    config: BrowserConfig,
    browser: Mutex<Option<Browser>>,
}

impl BrowserRenderer {
    #[inline]
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            browser: Mutex::new(None),
        }
    }

    #[inline]
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    fn open_tab(&self) -> Result<Arc<Tab>> {
        let mut browser = self
            .browser
            .lock()
            .map_err(|e| anyhow!("Browser lock poisoned: {}", e))?;

        if browser.is_none() {
            info!("Launching headless browser");
            let launched = Browser::new(self.config.launch_options())
                .with_context(|| "Failed to launch browser instance")?;
            *browser = Some(launched);
        }

        let tab = match browser.as_ref().map(Browser::new_tab) {
            Some(Ok(tab)) => tab,
            Some(Err(e)) => {
                *browser = None;
                return Err(e).with_context(|| "Failed to create new browser tab");
            }
            None => bail!("Browser is not running"),
        };

        tab.set_user_agent(&self.config.user_agent, None, None)
            .with_context(|| "Failed to set user agent")?;
        tab.set_default_timeout(Duration::from_secs(self.config.navigation_timeout_seconds));

        Ok(tab)
    }

    async fn navigate_and_wait(&self, tab: &Tab, url: &str) -> Result<String> {
        let navigation_timeout = Duration::from_secs(self.config.navigation_timeout_seconds);

        tokio::time::timeout(navigation_timeout, async {
            tab.navigate_to(url)
                .with_context(|| format!("Failed to navigate to {}", url))?;
            tab.wait_until_navigated()
                .with_context(|| format!("Navigation to {} did not complete", url))?;

            if let Err(e) = tab.wait_for_element("body") {
                warn!("Failed to wait for body element: {}", e);
            }

            Ok::<(), anyhow::Error>(())
        })
        .await
        .map_err(|_| anyhow!("Navigation timeout after {:?}", navigation_timeout))??;

        tokio::time::sleep(Duration::from_millis(self.config.settle_millis)).await;

        tab.get_content()
            .with_context(|| "Failed to get page content")
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    #[inline]
    fn name(&self) -> &'static str {
        "browser"
    }

    #[inline]
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let start_time = Instant::now();
        let tab = self.open_tab()?;

        let content = self.navigate_and_wait(&tab, url).await;
        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab for {}: {}", url, e);
        }
        let html = content?;

        debug!(
            "Rendered {} ({} bytes) in {:?}",
            url,
            html.len(),
            start_time.elapsed()
        );
        Ok(RenderedPage::new(url, html))
    }
}
