
use anyhow::{Result, bail};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::PathBuf;

use super::Config;
use crate::batch::BatchOptions;
use crate::search::DEFAULT_LANGUAGE;

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Search:").bold().yellow());
    eprintln!("  Engine: {}", style(config.search.engine).cyan());
    eprintln!("  Max pages: {}", style(config.search.max_pages).cyan());
    eprintln!(
        "  Timeout: {}s",
        style(config.search.timeout_seconds).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!(
        "  Chunk size / overlap: {} / {}",
        style(config.retrieval.chunk_size).cyan(),
        style(config.retrieval.chunk_overlap).cyan()
    );
    eprintln!("  Min score: {}", style(config.retrieval.min_score).cyan());
    eprintln!("  Max chunks: {}", style(config.retrieval.max_chunks).cyan());

    eprintln!();
    eprintln!("{}", style("Ollama:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Embedding model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Language model:").bold().yellow());
    eprintln!("  Provider: {}", style(&config.llm.provider).cyan());
    eprintln!(
        "  Final answer model: {}",
        style(&config.llm.final_answer_model).cyan()
    );
    for model in &config.llm.models {
        eprintln!(
            "    - {} (temperature {}, thinking {})",
            model.name,
            model.temperature,
            if model.thinking_enabled { "on" } else { "off" }
        );
    }

    eprintln!();
    eprintln!("{}", style("Harvesting:").bold().yellow());
    eprintln!(
        "  Browser: {}",
        if config.browser.enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        }
    );
    eprintln!(
        "  HTTP timeout: {}s",
        style(config.http.timeout_seconds).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Output:").bold().yellow());
    eprintln!(
        "  Save content: {}",
        style(config.output.save_content).cyan()
    );
    eprintln!(
        "  Artifacts dir: {}",
        style(config.output.artifacts_dir.display()).cyan()
    );
    eprintln!("  Separator: {:?}", config.output.separator);

    eprintln!();
    match &config.source {
        Some(path) => eprintln!("Config file: {}", style(path.display()).dim()),
        None => eprintln!("{}", style("No config file found, using defaults.").dim()),
    }
}

/// Batch options as given on the command line; gaps are prompted for
#[derive(Debug, Clone, Default)]
pub struct BatchPrompt {
    pub input: Option<PathBuf>,
    pub language: Option<String>,
    pub expansion: Option<String>,
    /// Skip the expansion question
    pub no_expansion: bool,
}

impl BatchPrompt {
    /// Fill gaps with defaults, without prompting
    #[inline]
    pub fn into_options(self) -> Result<BatchOptions> {
        let Some(input) = self.input else {
            bail!("No input file given. Pass the path of a file with one query per line.");
        };

        Ok(BatchOptions {
            input,
            language: self
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            expansion: self.expansion.filter(|e| !e.trim().is_empty()),
        })
    }
}

/// Complete batch options, asking on the terminal for whatever is missing.
///
/// Unattended runs never prompt and fall back to [`BatchPrompt::into_options`].
#[inline]
pub fn prompt_batch_options(prompt: BatchPrompt, languages: &[String]) -> Result<BatchOptions> {
    if !console::user_attended() {
        return prompt.into_options();
    }

    let language = match prompt.language {
        Some(language) => language,
        None => {
            let index = Select::new()
                .with_prompt("Select the query language")
                .default(default_language_index(languages))
                .items(languages)
                .interact()?;
            languages
                .get(index)
                .cloned()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
        }
    };

    let input = match prompt.input {
        Some(input) => input,
        None => {
            let path: String = Input::new()
                .with_prompt("Path of the file with one query per line")
                .validate_with(|input: &String| -> Result<(), &str> {
                    if PathBuf::from(input.trim()).is_file() {
                        Ok(())
                    } else {
                        Err("File not found")
                    }
                })
                .interact_text()?;
            PathBuf::from(path.trim())
        }
    };

    let expansion = if prompt.expansion.is_some() || prompt.no_expansion {
        prompt.expansion
    } else if Confirm::new()
        .with_prompt("Prefix every query with an expansion template?")
        .default(false)
        .interact()?
    {
        let template: String = Input::new()
            .with_prompt("Expansion template")
            .interact_text()?;
        Some(template)
    } else {
        None
    };

    BatchPrompt {
        input: Some(input),
        language: Some(language),
        expansion,
        no_expansion: prompt.no_expansion,
    }
    .into_options()
}

fn default_language_index(languages: &[String]) -> usize {
    languages
        .iter()
        .position(|language| language == DEFAULT_LANGUAGE)
        .unwrap_or(0)
}
