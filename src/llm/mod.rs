pub mod template;


use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use self::template::{PromptTemplate, PromptValues};
use crate::config::ConfigError;
use crate::ollama::OllamaClient;
use crate::{AnswerError, Result};

pub const SUPPORTED_PROVIDERS: [&str; 1] = ["ollama"];
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));

const DEFAULT_TEMPLATE: &str = "You are a helpful assistant. Answer the question in {language}.\n\
Use the document below when it is relevant. If the document is empty or unrelated, \
answer from your own knowledge and keep the answer short.\n\n\
Document:\n{document}\n\n\
Question: {question}\n\n\
Answer:";

/// A text-completion model
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Per-model generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// The model emits `<think>` blocks that must not reach the answer
    #[serde(default)]
    pub thinking_enabled: bool,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl ModelConfig {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            thinking_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub final_answer_model: String,
    pub template: String,
    pub models: Vec<ModelConfig>,
}

impl Default for LlmConfig {
    #[inline]
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            final_answer_model: "llama3.2:latest".to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            models: vec![ModelConfig::new("llama3.2:latest")],
        }
    }
}

impl LlmConfig {
    /// Settings of the model that writes the final answer
    #[inline]
    pub fn final_model(&self) -> Option<&ModelConfig> {
        self.models
            .iter()
            .find(|model| model.name == self.final_answer_model)
    }

    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !SUPPORTED_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(ConfigError::UnsupportedProvider(self.provider.clone()));
        }

        if self.template.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }
        PromptTemplate::parse(&self.template)
            .map_err(|e| ConfigError::InvalidTemplate(e.to_string()))?;

        let Some(model) = self.final_model() else {
            return Err(ConfigError::UnknownModel(self.final_answer_model.clone()));
        };

        if !(0.0..=2.0).contains(&model.temperature) {
            return Err(ConfigError::InvalidTemperature(model.temperature));
        }

        Ok(())
    }
}

/// Renders the prompt, calls the model and cleans up its reply
pub struct Answerer {
    model: Arc<dyn LanguageModel>,
    template: PromptTemplate,
    thinking_enabled: bool,
}

impl Answerer {
    #[inline]
    pub fn new(model: Arc<dyn LanguageModel>, template: &str, thinking_enabled: bool) -> Result<Self> {
        Ok(Self {
            model,
            template: PromptTemplate::parse(template)?,
            thinking_enabled,
        })
    }

    #[inline]
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    #[inline]
    pub fn render_prompt(&self, language: &str, question: &str, document: &str) -> String {
        self.template.render(&PromptValues {
            language,
            question,
            document,
        })
    }

    #[inline]
    pub fn answer(&self, language: &str, question: &str, document: &str) -> Result<String> {
        let prompt = self.render_prompt(language, question, document);
        info!("Generating answer with model: {}...", self.model.name());

        let response = self.model.generate(&prompt).map_err(|e| {
            let detail = match e {
                AnswerError::Llm(message) => message,
                other => other.to_string(),
            };
            AnswerError::Llm(format!(
                "Error invoking {}: {}. Check the provider is reachable and the template is correctly formatted.",
                self.model.name(),
                detail
            ))
        })?;

        if self.thinking_enabled {
            return strip_thinking(&response);
        }
        Ok(response.trim().to_string())
    }
}

/// Remove `<think>...</think>` blocks and trim
#[inline]
pub fn strip_thinking(text: &str) -> Result<String> {
    let stripped = THINK_BLOCK
        .try_replacen(text, 0, "")
        .map_err(|e| AnswerError::Llm(format!("Failed to strip reasoning blocks: {}", e)))?;
    Ok(stripped.trim().to_string())
}

/// Completions from a local Ollama model
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    model: ModelConfig,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(client: OllamaClient, model: ModelConfig) -> Self {
        Self { client, model }
    }
}

impl LanguageModel for OllamaGenerator {
    #[inline]
    fn name(&self) -> &str {
        &self.model.name
    }

    #[inline]
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            "Prompting {} ({} characters, temperature {})",
            self.model.name,
            prompt.len(),
            self.model.temperature
        );

        self.client
            .generate(&self.model.name, prompt, self.model.temperature)
            .map_err(|e| AnswerError::Llm(format!("{:#}", e)))
    }
}
