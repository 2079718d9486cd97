#![allow(dead_code, reason = "each test binary uses a different subset")]

// In-memory collaborators for end-to-end pipeline tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use web_answer::harvest::extractor::StrategySet;
use web_answer::harvest::{Harvester, PageRenderer, RenderedPage};
use web_answer::llm::{Answerer, LanguageModel};
use web_answer::pipeline::{Pipeline, PipelineSettings};
use web_answer::retrieval::embedder::Embedder;
use web_answer::retrieval::{RelevanceRetriever, RetrievalConfig};
use web_answer::search::{RegionTable, SearchBackend, SearchEngine, SearchResolver};
use web_answer::{AnswerError, Result};

pub const TEMPLATE: &str = "Language: {language}\nQuestion: {question}\nDocument: [{document}]";

/// Search backend returning fixed links and counting calls
#[derive(Default)]
pub struct FixedBackend {
    links: Vec<String>,
    pub calls: AtomicUsize,
    pub regions: Mutex<Vec<String>>,
}

impl FixedBackend {
    pub fn new(links: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            links: links.iter().map(|l| (*l).to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SearchBackend for FixedBackend {
    fn links(&self, _query: &str, max_results: usize, region: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.regions
            .lock()
            .expect("lock")
            .push(region.to_string());
        Ok(self.links.iter().take(max_results).cloned().collect())
    }
}

/// Serves HTML from a map; unknown URLs fail like a 404
#[derive(Default)]
pub struct HtmlSite {
    pages: HashMap<String, String>,
    pub rendered: Mutex<Vec<String>>,
}

impl HtmlSite {
    pub fn new(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages
                .iter()
                .map(|(url, html)| ((*url).to_string(), (*html).to_string()))
                .collect(),
            ..Default::default()
        })
    }
}

#[async_trait]
impl PageRenderer for HtmlSite {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn render(&self, url: &str) -> anyhow::Result<RenderedPage> {
        self.rendered.lock().expect("lock").push(url.to_string());
        let html = self
            .pages
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("HTTP error 404"))?;
        Ok(RenderedPage::new(url, html.clone()))
    }
}

/// Bag-of-words embedder over a fixed vocabulary; query encoding fails for
/// queries containing `fail_on`
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    fail_on: Option<String>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            vocabulary: vocabulary.iter().map(|w| (*w).to_string()).collect(),
            fail_on: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing_on(vocabulary: &[&str], marker: &str) -> Arc<Self> {
        Arc::new(Self {
            vocabulary: vocabulary.iter().map(|w| (*w).to_string()).collect(),
            fail_on: Some(marker.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocabulary
            .iter()
            .map(|word| lower.matches(word.as_str()).count() as f32)
            .collect()
    }
}

impl Embedder for KeywordEmbedder {
    fn encode_documents(&self, documents: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(documents.iter().map(|d| self.vector(d)).collect())
    }

    fn encode_query(&self, query: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_on {
            if query.contains(marker.as_str()) {
                return Err(AnswerError::Embedding("ollama down".to_string()));
            }
        }
        Ok(self.vector(query))
    }
}

/// Records prompts; fails for prompts containing `fail_on`
pub struct RecordingModel {
    reply: String,
    fail_on: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingModel {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail_on: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(reply: &str, marker: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail_on: Some(marker.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

impl LanguageModel for RecordingModel {
    fn name(&self) -> &str {
        "recording"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        if let Some(marker) = &self.fail_on {
            if prompt.contains(marker.as_str()) {
                return Err(AnswerError::Transport("connection refused".to_string()));
            }
        }
        Ok(self.reply.clone())
    }
}

pub struct World {
    pub ddg: Arc<FixedBackend>,
    pub google: Arc<FixedBackend>,
    pub ddg_custom: Arc<FixedBackend>,
    pub site: Arc<HtmlSite>,
    pub embedder: Arc<KeywordEmbedder>,
    pub model: Arc<RecordingModel>,
}

impl World {
    pub fn new(links: &[&str], pages: &[(&str, &str)], vocabulary: &[&str]) -> Self {
        Self {
            ddg: FixedBackend::new(links),
            google: FixedBackend::new(&[]),
            ddg_custom: FixedBackend::new(&[]),
            site: HtmlSite::new(pages),
            embedder: KeywordEmbedder::new(vocabulary),
            model: RecordingModel::new("The answer."),
        }
    }

    pub fn pipeline(&self, settings: PipelineSettings) -> Pipeline {
        let resolver = SearchResolver::new(
            Arc::clone(&self.ddg) as Arc<dyn SearchBackend>,
            Arc::clone(&self.google) as Arc<dyn SearchBackend>,
            Arc::clone(&self.ddg_custom) as Arc<dyn SearchBackend>,
            RegionTable::default(),
        );
        let harvester = Harvester::new(
            vec![Arc::clone(&self.site) as Arc<dyn PageRenderer>],
            StrategySet::default(),
        );
        let retrieval = RetrievalConfig {
            chunk_size: 60,
            chunk_overlap: 0,
            ..Default::default()
        };
        let retriever = RelevanceRetriever::new(
            Arc::clone(&self.embedder) as Arc<dyn Embedder>,
            &retrieval,
        )
        .expect("retriever");
        let answerer = Answerer::new(
            Arc::clone(&self.model) as Arc<dyn LanguageModel>,
            TEMPLATE,
            false,
        )
        .expect("answerer");

        Pipeline::new(resolver, harvester, retriever, answerer, settings)
    }
}

pub fn settings(engine: SearchEngine, artifacts_dir: PathBuf) -> PipelineSettings {
    PipelineSettings {
        engine,
        max_pages: 3,
        max_chunks: 3,
        save_content: false,
        artifacts_dir,
    }
}

pub const ROME_HTML: &str = "<html><head><title>Rome</title><script>var x = 1;</script></head>\
<body><nav>Home | About</nav><h1>Rome</h1>\
<p>Rome is the capital of Italy.</p>\
<p>Bananas are a tropical fruit.</p></body></html>";

pub const FRUIT_HTML: &str = "<html><body><h1>Fruit</h1>\
<p>Bananas are yellow and sweet.</p>\
<p>Apples grow on trees.</p></body></html>";

pub const WIKI_HTML: &str = "<html><body><div id=\"toc\">Contents</div>\
<p>Italy is a country in Europe.</p><dl><dd>Its capital is Rome.</dd></dl>\
<p>   </p></body></html>";
