
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::harvest::{HarvestReport, Harvester, NO_CONTENT_SENTINEL, ScrapedPage};
use crate::llm::{Answerer, OllamaGenerator};
use crate::ollama::OllamaClient;
use crate::retrieval::RelevanceRetriever;
use crate::retrieval::embedder::OllamaEmbedder;
use crate::search::{DEFAULT_LANGUAGE, SearchEngine, SearchResolver};
use crate::{AnswerError, Result};

pub const NO_RELEVANT_CHUNKS_WARNING: &str =
    "No relevant chunks found. LLM will answer using the question only.";

/// A question and the language its sources should be searched in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    language: String,
}

impl Query {
    #[inline]
    pub fn new(text: &str, language: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnswerError::Validation(
                "Query cannot be empty".to_string(),
            ));
        }

        let language = language.trim();
        Ok(Self {
            text: text.to_string(),
            language: if language.is_empty() {
                DEFAULT_LANGUAGE.to_string()
            } else {
                language.to_lowercase()
            },
        })
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl fmt::Display for Query {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// How much web evidence backed an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    /// Nothing usable could be harvested
    NoWebContent,
    /// Pages were harvested but no chunk cleared the relevance threshold
    NoRelevantChunks,
}

impl Status {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoWebContent => "NO_WEB_CONTENT",
            Self::NoRelevantChunks => "NO_RELEVANT_CHUNKS",
        }
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for Status {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus the document handed to the language model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: Status,
    pub document: String,
}

fn is_placeholder(page: &ScrapedPage) -> bool {
    page.content.trim() == NO_CONTENT_SENTINEL
}

/// Decide the status of a run from what was harvested and retrieved
#[inline]
pub fn classify(pages: &[ScrapedPage], chunks: &[String]) -> Outcome {
    if pages.iter().all(is_placeholder) {
        return Outcome {
            status: Status::NoWebContent,
            document: String::new(),
        };
    }

    let relevant: Vec<&str> = chunks
        .iter()
        .map(String::as_str)
        .filter(|chunk| !chunk.trim().is_empty())
        .collect();

    if relevant.is_empty() {
        return Outcome {
            status: Status::NoRelevantChunks,
            document: String::new(),
        };
    }

    Outcome {
        status: Status::Ok,
        document: relevant.join("\n\n"),
    }
}

/// Concatenated content of the harvested pages, empty when none has any
#[inline]
pub fn scraped_document(pages: &[ScrapedPage]) -> String {
    pages
        .iter()
        .filter(|page| !is_placeholder(page))
        .map(|page| page.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Everything gathered for a query before the language model is asked
#[derive(Debug, Clone)]
pub struct Evidence {
    pub query: Query,
    pub urls: Vec<String>,
    pub report: HarvestReport,
    pub chunks: Vec<String>,
    pub outcome: Outcome,
    /// User-facing message for a degraded outcome, also logged by `gather`
    pub warning: Option<String>,
}

/// Final answer of a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineAnswer {
    pub answer: String,
    pub status: Status,
    /// Pages that contributed content
    pub sources: Vec<String>,
}

/// Knobs of a run taken from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub engine: SearchEngine,
    pub max_pages: usize,
    pub max_chunks: usize,
    pub save_content: bool,
    pub artifacts_dir: PathBuf,
}

impl Default for PipelineSettings {
    #[inline]
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    #[inline]
    fn from(config: &Config) -> Self {
        Self {
            engine: config.search.engine,
            max_pages: config.search.max_pages,
            max_chunks: config.retrieval.max_chunks,
            save_content: config.output.save_content,
            artifacts_dir: config.output.artifacts_dir.clone(),
        }
    }
}

/// Search, harvest, retrieve, classify, answer
pub struct Pipeline {
    resolver: SearchResolver,
    harvester: Harvester,
    retriever: RelevanceRetriever,
    answerer: Answerer,
    settings: PipelineSettings,
}

impl Pipeline {
    #[inline]
    pub fn new(
        resolver: SearchResolver,
        harvester: Harvester,
        retriever: RelevanceRetriever,
        answerer: Answerer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            harvester,
            retriever,
            answerer,
            settings,
        }
    }

    /// Wire the real collaborators from a validated configuration
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let model = config.llm.final_model().cloned().ok_or_else(|| {
            AnswerError::Config(format!(
                "Model config not found: {}",
                config.llm.final_answer_model
            ))
        })?;

        let client = OllamaClient::new(&config.ollama)?;
        let embedder = OllamaEmbedder::new(client.clone(), config.embedding.clone());
        let retriever = RelevanceRetriever::new(Arc::new(embedder), &config.retrieval)?;

        let thinking_enabled = model.thinking_enabled;
        let generator = OllamaGenerator::new(client, model);
        let answerer = Answerer::new(Arc::new(generator), &config.llm.template, thinking_enabled)?;

        Ok(Self::new(
            SearchResolver::from_config(&config.search),
            Harvester::from_config(&config.browser, &config.http),
            retriever,
            answerer,
            PipelineSettings::from(config),
        ))
    }

    /// Confirm Ollama is reachable and serves the embedding and answer models.
    ///
    /// Run before the first query so a missing model fails before any search.
    #[inline]
    pub fn check_models(config: &Config) -> Result<()> {
        config.validate()?;

        let client = OllamaClient::new(&config.ollama)?;
        let models = [
            config.embedding.model.as_str(),
            config.llm.final_answer_model.as_str(),
        ];
        client
            .health_check(&models)
            .map_err(|e| AnswerError::Config(format!("Ollama is not ready: {:#}", e)))
    }

    #[inline]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[inline]
    pub fn resolver(&self) -> &SearchResolver {
        &self.resolver
    }

    /// Collect and classify web evidence for `query`
    #[inline]
    pub async fn gather(&self, query: &Query) -> Result<Evidence> {
        info!(
            "Scraping {} pages for query: '{}' in '{}'",
            self.settings.max_pages,
            query.text(),
            query.language()
        );

        let urls = self.resolver.resolve(
            query.text(),
            self.settings.engine,
            self.settings.max_pages,
            query.language(),
        )?;
        let report = self.harvester.harvest(&urls).await;

        let document = scraped_document(&report.pages);
        self.save_artifact(query, "scraped_content", &document);

        let chunks = self
            .retriever
            .retrieve(&document, query.text(), self.settings.max_chunks)?;
        let outcome = classify(&report.pages, &chunks);

        let warning = match outcome.status {
            Status::NoRelevantChunks => Some(NO_RELEVANT_CHUNKS_WARNING.to_string()),
            Status::NoWebContent => Some(format!("No web content found for '{}'", query.text())),
            Status::Ok => None,
        };
        match &warning {
            Some(message) => warn!("{}", message),
            None => debug!(
                "{} relevant chunks for '{}'",
                chunks.len(),
                query.text()
            ),
        }
        self.save_artifact(query, "relevant_content", &outcome.document);

        Ok(Evidence {
            query: query.clone(),
            urls,
            report,
            chunks,
            outcome,
            warning,
        })
    }

    /// Ask the language model using gathered evidence
    #[inline]
    pub fn answer_evidence(&self, evidence: &Evidence) -> Result<PipelineAnswer> {
        let answer = self.answerer.answer(
            evidence.query.language(),
            evidence.query.text(),
            &evidence.outcome.document,
        )?;

        Ok(PipelineAnswer {
            answer,
            status: evidence.outcome.status,
            sources: evidence
                .report
                .urls()
                .into_iter()
                .map(str::to_string)
                .collect(),
        })
    }

    #[inline]
    pub async fn answer(&self, query: &Query) -> Result<PipelineAnswer> {
        let evidence = self.gather(query).await?;
        self.answer_evidence(&evidence)
    }

    fn save_artifact(&self, query: &Query, kind: &str, content: &str) {
        if !self.settings.save_content {
            return;
        }

        let path = artifact_path(&self.settings.artifacts_dir, query.text(), kind);
        match fs::create_dir_all(&self.settings.artifacts_dir)
            .and_then(|()| fs::write(&path, content))
        {
            Ok(()) => debug!("Saved {}", path.display()),
            Err(e) => warn!("Failed to save {}: {}", path.display(), e),
        }
    }
}

/// `<dir>/<query>_<kind>.md`, with characters unsafe in file names replaced
#[inline]
pub fn artifact_path(dir: &Path, query: &str, kind: &str) -> PathBuf {
    let stem: String = query
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    dir.join(format!("{}_{}.md", stem, kind))
}
