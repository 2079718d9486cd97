pub mod browser;
pub mod extractor;
pub mod http;
pub mod markdown;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use self::browser::{BrowserConfig, BrowserRenderer};
use self::extractor::StrategySet;
use self::http::{HttpConfig, HttpRenderer};

/// Placeholder content some renderers produce for pages with nothing in them
pub const NO_CONTENT_SENTINEL: &str = "No content found.";

/// A fetched page before extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
    /// Markdown produced by the renderer, when it has its own converter
    pub markdown: Option<String>,
}

impl RenderedPage {
    #[inline]
    pub fn new(url: &str, html: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            html: html.into(),
            markdown: None,
        }
    }

    /// Markdown form of the page, converting the HTML when the renderer gave none
    #[inline]
    pub fn markdown(&self) -> Cow<'_, str> {
        match &self.markdown {
            Some(markdown) => Cow::Borrowed(markdown),
            None => Cow::Owned(markdown::html_to_markdown(&self.html)),
        }
    }
}

/// Fetches a URL and returns the page as the browser would see it
#[async_trait]
pub trait PageRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn render(&self, url: &str) -> Result<RenderedPage>;
}

/// Cleaned text from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub url: String,
    pub content: String,
}

/// A page that contributed nothing, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub url: String,
    pub reason: String,
}

impl fmt::Display for PageFailure {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}

/// Outcome of harvesting a list of URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub pages: Vec<ScrapedPage>,
    pub failures: Vec<PageFailure>,
}

impl HarvestReport {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    #[inline]
    pub fn urls(&self) -> Vec<&str> {
        self.pages.iter().map(|page| page.url.as_str()).collect()
    }
}

/// Sequential page harvester.
///
/// Renderers are tried in order for each URL until one succeeds; the page is
/// then handed to the first matching extraction strategy.
pub struct Harvester {
    renderers: Vec<Arc<dyn PageRenderer>>,
    strategies: StrategySet,
}

impl Harvester {
    #[inline]
    pub fn new(renderers: Vec<Arc<dyn PageRenderer>>, strategies: StrategySet) -> Self {
        Self {
            renderers,
            strategies,
        }
    }

    /// Browser first when enabled, plain HTTP as the fallback
    #[inline]
    pub fn from_config(browser: &BrowserConfig, http: &HttpConfig) -> Self {
        let mut renderers: Vec<Arc<dyn PageRenderer>> = Vec::new();
        if browser.enabled {
            renderers.push(Arc::new(BrowserRenderer::new(browser.clone())));
        }
        renderers.push(Arc::new(HttpRenderer::new(http.clone())));

        Self::new(renderers, StrategySet::default())
    }

    /// Harvest every URL in order. Failures are recorded, never fatal.
    #[inline]
    pub async fn harvest(&self, urls: &[String]) -> HarvestReport {
        let mut report = HarvestReport::default();

        for url in urls {
            info!("Using: {}", url);
            match self.harvest_page(url).await {
                Ok(page) => report.pages.push(page),
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    report.failures.push(PageFailure {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Harvested {} of {} pages ({} failed)",
            report.pages.len(),
            urls.len(),
            report.failures.len()
        );
        report
    }

    /// Render and extract a single page
    #[inline]
    pub async fn harvest_page(&self, url: &str) -> Result<ScrapedPage> {
        validate_url(url)?;
        let page = self.render(url).await?;

        let strategy = self.strategies.select(url);
        debug!("Extracting {} with the {} strategy", url, strategy.name());
        let content = strategy
            .extract(&page)
            .with_context(|| format!("Failed to extract content from {}", url))?;

        if content.trim().is_empty() {
            return Err(anyhow!("No content extracted"));
        }

        Ok(ScrapedPage {
            url: url.to_string(),
            content,
        })
    }

    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let mut last_error = None;

        for renderer in &self.renderers {
            match renderer.render(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    debug!("{} renderer failed for {}: {}", renderer.name(), url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("No page renderer configured")))
    }
}

/// Only absolute http(s) URLs with a host are harvested
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}
