
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::SearchBackend;
use super::transport::{ClientIdentity, build_agent, resolve_result_href, transport_error};
use crate::{AnswerError, Result};

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Google result pages
#[derive(Debug, Clone)]
pub struct GoogleBackend {
    endpoint: String,
    agent: ureq::Agent,
}

impl GoogleBackend {
    #[inline]
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            agent: build_agent(timeout_seconds),
        }
    }
}

impl SearchBackend for GoogleBackend {
    #[inline]
    fn links(&self, query: &str, max_results: usize, region: &str) -> Result<Vec<String>> {
        let identity = ClientIdentity::random();
        // Google drops a couple of slots for its own widgets
        let num = (max_results + 2).to_string();

        let mut request = self
            .agent
            .get(&self.endpoint)
            .query("q", query)
            .query("num", &num)
            .header("User-Agent", identity.user_agent)
            .header("Accept-Language", identity.accept_language);
        if !region.is_empty() {
            request = request.query("gl", region);
        }

        let html = request
            .call()
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|e| transport_error("google", &e))?;

        parse_results(&html, &self.endpoint, max_results)
    }
}

/// Extract organic result URLs from a Google result page.
///
/// Links back into Google itself are dropped and duplicates keep their first
/// position.
#[inline]
pub fn parse_results(html: &str, endpoint: &str, max_results: usize) -> Result<Vec<String>> {
    let base = Url::parse(endpoint).map_err(|e| {
        AnswerError::Validation(format!("Invalid search endpoint {}: {}", endpoint, e))
    })?;
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for href in document
        .select(&LINK_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
    {
        let Some(link) = resolve_result_href(href, &base) else {
            continue;
        };
        if is_search_engine_link(&link, &base) || links.contains(&link) {
            continue;
        }

        links.push(link);
        if links.len() >= max_results {
            break;
        }
    }

    debug!("Parsed {} links from Google result page", links.len());
    Ok(links)
}

fn is_search_engine_link(link: &str, base: &Url) -> bool {
    let Ok(url) = Url::parse(link) else {
        return true;
    };
    let Some(host) = url.host_str() else {
        return true;
    };

    url.host() == base.host()
        || host.contains(".google.")
        || host.starts_with("google.")
        || host.ends_with(".googleusercontent.com")
}
