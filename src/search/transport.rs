use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::AnswerError;

/// Desktop browser identities rotated across search requests
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-US,en;q=0.7,it;q=0.5",
    "en;q=0.9,de;q=0.6",
];

/// Request headers that vary from one request to the next
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
}

impl ClientIdentity {
    /// Pick a random identity for a single request
    #[inline]
    pub fn random() -> Self {
        Self {
            user_agent: USER_AGENTS[rand::random_range(0..USER_AGENTS.len())],
            accept_language: ACCEPT_LANGUAGES[rand::random_range(0..ACCEPT_LANGUAGES.len())],
        }
    }
}

/// Build an HTTP agent for search endpoints
#[inline]
pub fn build_agent(timeout_seconds: u64) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_seconds)))
        .build()
        .into()
}

/// Convert a transport failure into the crate error, keeping the engine name
#[inline]
pub fn transport_error(engine: &str, error: &ureq::Error) -> AnswerError {
    match error {
        ureq::Error::StatusCode(status) => {
            AnswerError::Transport(format!("{}: failed to retrieve content: {}", engine, status))
        }
        other => AnswerError::Transport(format!("{}: request failed: {}", engine, other)),
    }
}

/// Resolve a result href into an absolute http(s) URL.
///
/// Search pages often wrap results in redirect links carrying the real target
/// in a query parameter (`uddg` for DuckDuckGo, `q` for Google).
#[inline]
pub fn resolve_result_href(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute = if href.starts_with("//") {
        Url::parse(&format!("{}:{}", base.scheme(), href)).ok()?
    } else {
        base.join(href).ok()?
    };

    let target = absolute
        .query_pairs()
        .find(|(key, _)| key == "uddg" || (key == "q" && absolute.path() == "/url"))
        .map(|(_, value)| value.into_owned());

    let resolved = match target {
        Some(target) => Url::parse(&target).ok()?,
        None => absolute,
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        debug!("Skipping non-http result link: {}", resolved);
        return None;
    }

    Some(resolved.to_string())
}
