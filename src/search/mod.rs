pub mod duckduckgo;
pub mod google;
pub mod transport;


use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{AnswerError, Result};

use self::duckduckgo::{DuckDuckGoHtmlBackend, DuckDuckGoLiteBackend};
use self::google::GoogleBackend;

/// Results per DuckDuckGo HTML page, the hard limit for the self-hosted scraper
pub const DDG_HTML_PAGE_SIZE: usize = 10;

/// Language used when none is given
pub const DEFAULT_LANGUAGE: &str = "global";

/// Search engines a query can be resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngine {
    /// DuckDuckGo through its lite endpoint
    Ddg,
    /// Google result pages
    Google,
    /// Self-hosted DuckDuckGo HTML scraper with rotating client identity
    DdgCustom,
}

impl SearchEngine {
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ddg => "ddg",
            Self::Google => "google",
            Self::DdgCustom => "ddg_custom",
        }
    }

    #[inline]
    pub fn all() -> &'static [SearchEngine] {
        &[Self::Ddg, Self::Google, Self::DdgCustom]
    }

    /// The engine tried when this one returns no links
    #[inline]
    pub fn fallback(self) -> Self {
        match self {
            Self::Ddg | Self::DdgCustom => Self::Google,
            Self::Google => Self::Ddg,
        }
    }

    /// Maximum number of results a single call may request, if bounded
    #[inline]
    pub fn page_size_limit(self) -> Option<usize> {
        match self {
            Self::DdgCustom => Some(DDG_HTML_PAGE_SIZE),
            Self::Ddg | Self::Google => None,
        }
    }

    /// Self-hosted scrapers surface transport failures instead of falling back
    #[inline]
    pub fn is_self_hosted(self) -> bool {
        matches!(self, Self::DdgCustom)
    }

    /// Validate a requested result count for this engine
    #[inline]
    pub fn validate_max_results(self, max_results: usize) -> Result<()> {
        if max_results == 0 {
            return Err(AnswerError::Validation(
                "max_results must be greater than 0".to_string(),
            ));
        }

        if let Some(limit) = self.page_size_limit() {
            if max_results > limit {
                return Err(AnswerError::Validation(format!(
                    "max_results for {} must be less than or equal to {}",
                    self, limit
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for SearchEngine {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchEngine {
    type Err = AnswerError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|engine| engine.name() == s.trim().to_lowercase())
            .ok_or_else(|| {
                AnswerError::Validation(format!(
                    "Unsupported search engine: {}. Supported engines are: {}",
                    s,
                    Self::all()
                        .iter()
                        .map(|engine| engine.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Language to region-code lookup, one table per engine family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionTable {
    /// DuckDuckGo `kl` codes
    pub ddg: BTreeMap<String, String>,
    /// Google `gl` codes; the global entry is empty
    pub google: BTreeMap<String, String>,
}

impl Default for RegionTable {
    fn default() -> Self {
        let table = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(language, region)| ((*language).to_string(), (*region).to_string()))
                .collect()
        };

        Self {
            ddg: table(&[
                ("global", "wt-wt"),
                ("italian", "it-it"),
                ("english", "en-us"),
                ("spanish", "es-es"),
                ("french", "fr-fr"),
                ("german", "de-de"),
            ]),
            google: table(&[
                ("global", ""),
                ("italian", "it"),
                ("english", "en"),
                ("spanish", "es"),
                ("french", "fr"),
                ("german", "de"),
            ]),
        }
    }
}

impl RegionTable {
    #[inline]
    pub fn table_for(&self, engine: SearchEngine) -> &BTreeMap<String, String> {
        match engine {
            SearchEngine::Ddg | SearchEngine::DdgCustom => &self.ddg,
            SearchEngine::Google => &self.google,
        }
    }

    /// Map a human-readable language to the engine's region code.
    ///
    /// Empty or unknown languages resolve to the global code with a warning.
    #[inline]
    pub fn region_for(&self, engine: SearchEngine, language: &str) -> String {
        let table = self.table_for(engine);
        let global = || table.get(DEFAULT_LANGUAGE).cloned().unwrap_or_default();

        let language = language.trim().to_lowercase();
        if language.is_empty() {
            warn!("Language not specified. Using '{}'.", DEFAULT_LANGUAGE);
            return global();
        }

        table.get(&language).cloned().unwrap_or_else(|| {
            warn!(
                "Language '{}' not recognized. Using '{}'.",
                language, DEFAULT_LANGUAGE
            );
            global()
        })
    }
}

/// Search transport: turns a query into an ordered list of result URLs
pub trait SearchBackend: Send + Sync {
    /// Fetch at most `max_results` result URLs for `query` in `region`
    fn links(&self, query: &str, max_results: usize, region: &str) -> Result<Vec<String>>;
}

/// Search-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Engine used for every query
    pub engine: SearchEngine,
    /// Number of result pages to harvest per query
    pub max_pages: usize,
    /// Timeout for a single search request in seconds
    pub timeout_seconds: u64,
    /// DuckDuckGo lite endpoint
    pub ddg_url: String,
    /// DuckDuckGo HTML endpoint used by the self-hosted scraper
    pub ddg_html_url: String,
    /// Google search endpoint
    pub google_url: String,
    pub regions: RegionTable,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engine: SearchEngine::Ddg,
            max_pages: 5,
            timeout_seconds: 20,
            ddg_url: "https://lite.duckduckgo.com/lite/".to_string(),
            ddg_html_url: "https://html.duckduckgo.com/html".to_string(),
            google_url: "https://www.google.com/search".to_string(),
            regions: RegionTable::default(),
        }
    }
}

/// Resolves a query to candidate URLs, falling back to a second engine once
pub struct SearchResolver {
    ddg: Arc<dyn SearchBackend>,
    google: Arc<dyn SearchBackend>,
    ddg_custom: Arc<dyn SearchBackend>,
    regions: RegionTable,
}

impl SearchResolver {
    #[inline]
    pub fn new(
        ddg: Arc<dyn SearchBackend>,
        google: Arc<dyn SearchBackend>,
        ddg_custom: Arc<dyn SearchBackend>,
        regions: RegionTable,
    ) -> Self {
        Self {
            ddg,
            google,
            ddg_custom,
            regions,
        }
    }

    /// Build a resolver backed by the real search endpoints
    #[inline]
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            Arc::new(DuckDuckGoLiteBackend::new(
                &config.ddg_url,
                config.timeout_seconds,
            )),
            Arc::new(GoogleBackend::new(&config.google_url, config.timeout_seconds)),
            Arc::new(DuckDuckGoHtmlBackend::new(
                &config.ddg_html_url,
                config.timeout_seconds,
            )),
            config.regions.clone(),
        )
    }

    #[inline]
    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Resolve `query` into at most `max_results` URLs.
    ///
    /// The requested engine is tried first. If it yields no links its fallback
    /// engine is tried exactly once; an engine is never re-entered within a
    /// call. An empty result is returned, not an error, when both come back
    /// empty.
    #[inline]
    pub fn resolve(
        &self,
        query: &str,
        engine: SearchEngine,
        max_results: usize,
        language: &str,
    ) -> Result<Vec<String>> {
        engine.validate_max_results(max_results)?;

        let mut tried: Vec<SearchEngine> = Vec::with_capacity(2);
        for candidate in [engine, engine.fallback()] {
            if tried.contains(&candidate) {
                continue;
            }
            if let Some(previous) = tried.last() {
                warn!(
                    "No results found on {}. Falling back to {}.",
                    previous, candidate
                );
            }
            tried.push(candidate);

            let links = self.search_with(candidate, query, max_results, language)?;
            if !links.is_empty() {
                info!(
                    "Found {} links for '{}' using {}",
                    links.len(),
                    query,
                    candidate
                );
                return Ok(links);
            }
        }

        warn!("No link found for '{}'", query);
        Ok(Vec::new())
    }

    fn backend(&self, engine: SearchEngine) -> &dyn SearchBackend {
        match engine {
            SearchEngine::Ddg => self.ddg.as_ref(),
            SearchEngine::Google => self.google.as_ref(),
            SearchEngine::DdgCustom => self.ddg_custom.as_ref(),
        }
    }

    fn search_with(
        &self,
        engine: SearchEngine,
        query: &str,
        max_results: usize,
        language: &str,
    ) -> Result<Vec<String>> {
        let region = self.regions.region_for(engine, language);
        debug!(
            "Searching '{}' on {} (region '{}', max {})",
            query, engine, region, max_results
        );

        match self.backend(engine).links(query, max_results, &region) {
            Ok(mut links) => {
                links.truncate(max_results);
                Ok(links)
            }
            Err(AnswerError::Transport(message)) if !engine.is_self_hosted() => {
                warn!("Search on {} failed: {}", engine, message);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
