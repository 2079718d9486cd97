
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::SearchBackend;
use super::transport::{ClientIdentity, build_agent, resolve_result_href, transport_error};
use crate::{AnswerError, Result};

static LITE_RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result-link").expect("valid selector"));
static RESULT_BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.links_main").expect("valid selector"));
static AD_BADGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.badge--ad").expect("valid selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2 a").expect("valid selector"));
static SNIPPET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__snippet").expect("valid selector"));
static URL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__url").expect("valid selector"));

/// One organic search result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// DuckDuckGo through the lite endpoint
#[derive(Debug, Clone)]
pub struct DuckDuckGoLiteBackend {
    endpoint: String,
    agent: ureq::Agent,
}

impl DuckDuckGoLiteBackend {
    #[inline]
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            agent: build_agent(timeout_seconds),
        }
    }
}

impl SearchBackend for DuckDuckGoLiteBackend {
    #[inline]
    fn links(&self, query: &str, max_results: usize, region: &str) -> Result<Vec<String>> {
        let identity = ClientIdentity::random();
        let html = self
            .agent
            .post(&self.endpoint)
            .header("User-Agent", identity.user_agent)
            .header("Accept-Language", identity.accept_language)
            .send_form([("q", query), ("kl", region)])
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|e| transport_error("ddg", &e))?;

        parse_lite_results(&html, &self.endpoint, max_results)
    }
}

/// Extract result URLs from a DuckDuckGo lite page
#[inline]
pub fn parse_lite_results(html: &str, endpoint: &str, max_results: usize) -> Result<Vec<String>> {
    let base = parse_endpoint(endpoint)?;
    let document = Html::parse_document(html);

    let links: Vec<String> = document
        .select(&LITE_RESULT_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| resolve_result_href(href, &base))
        .take(max_results)
        .collect();

    debug!("Parsed {} links from DuckDuckGo lite page", links.len());
    Ok(links)
}

/// Self-hosted scraper for the DuckDuckGo HTML endpoint.
///
/// Every request carries a freshly randomized client identity. Any
/// non-success status is surfaced as a transport error.
#[derive(Debug, Clone)]
pub struct DuckDuckGoHtmlBackend {
    endpoint: String,
    agent: ureq::Agent,
}

impl DuckDuckGoHtmlBackend {
    #[inline]
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            agent: build_agent(timeout_seconds),
        }
    }

    fn fetch_page(&self, query: &str, region: &str) -> Result<String> {
        let identity = ClientIdentity::random();
        debug!("Posting DuckDuckGo HTML query as '{}'", identity.user_agent);

        self.agent
            .post(&self.endpoint)
            .header("User-Agent", identity.user_agent)
            .header("Accept-Language", identity.accept_language)
            .header("Accept", "text/html,application/xhtml+xml")
            .send_form([("q", query), ("kl", region)])
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|e| transport_error("ddg_custom", &e))
    }
}

impl SearchBackend for DuckDuckGoHtmlBackend {
    #[inline]
    fn links(&self, query: &str, max_results: usize, region: &str) -> Result<Vec<String>> {
        super::SearchEngine::DdgCustom.validate_max_results(max_results)?;

        let html = self.fetch_page(query, region)?;
        let base = parse_endpoint(&self.endpoint)?;

        Ok(parse_html_results(&html, max_results)
            .into_iter()
            .filter_map(|hit| resolve_result_href(&hit.url, &base))
            .collect())
    }
}

/// Parse a DuckDuckGo HTML results page into (title, description, URL) hits.
///
/// Ads and blocks missing any of the three parts are skipped.
#[inline]
pub fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for block in document.select(&RESULT_BLOCK_SELECTOR) {
        if block.select(&AD_BADGE_SELECTOR).next().is_some() {
            continue;
        }

        let Some(hit) = parse_result_block(block) else {
            continue;
        };
        results.push(hit);

        if results.len() >= max_results {
            break;
        }
    }

    debug!("Parsed {} hits from DuckDuckGo HTML page", results.len());
    results
}

fn parse_result_block(block: ElementRef<'_>) -> Option<SearchHit> {
    let title = element_text(block.select(&TITLE_SELECTOR).next()?);
    let description = element_text(block.select(&SNIPPET_SELECTOR).next()?);
    let url = block
        .select(&URL_SELECTOR)
        .next()?
        .value()
        .attr("href")?
        .trim()
        .to_string();

    if title.is_empty() || url.is_empty() {
        return None;
    }

    Some(SearchHit {
        title,
        description,
        url,
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint)
        .map_err(|e| AnswerError::Validation(format!("Invalid search endpoint {}: {}", endpoint, e)))
}
