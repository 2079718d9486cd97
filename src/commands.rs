use anyhow::{Context, Result, bail};
use console::style;
use std::path::Path;
use tracing::info;

use crate::batch::BatchRunner;
use crate::config::{BatchPrompt, Config, prompt_batch_options};
use crate::pipeline::{Pipeline, Query};
use crate::search::SearchEngine;

/// Answer a single query and print the result with its status
#[inline]
pub async fn ask(config: &Config, text: &str, language: &str) -> Result<()> {
    let query = Query::new(text, language)?;
    let pipeline = Pipeline::from_config(config).context("Failed to set up the pipeline")?;
    Pipeline::check_models(config)?;

    let answer = pipeline.answer(&query).await?;

    println!();
    println!(
        "{} Final answer with status {}:",
        style("[OK]").green(),
        style(answer.status).bold()
    );
    println!();
    println!("{}", answer.answer);

    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").dim());
        for source in &answer.sources {
            println!("  {}", style(source).dim());
        }
    }

    info!("Done.");
    Ok(())
}

/// Answer every line of a query file, prompting for missing options
#[inline]
pub async fn batch(config: &Config, prompt: BatchPrompt) -> Result<()> {
    info!("Batch mode enabled.");

    let languages: Vec<String> = config.search.regions.ddg.keys().cloned().collect();
    let options = prompt_batch_options(prompt, &languages)?;
    let pipeline = Pipeline::from_config(config).context("Failed to set up the pipeline")?;
    Pipeline::check_models(config)?;

    let summary = BatchRunner::new(&pipeline, &config.output.separator)
        .with_progress(true)
        .run_file(&options)
        .await?;

    if !summary.warnings.is_empty() {
        println!();
        println!("{}", style("Some queries had issues:").yellow());
        for warning in &summary.warnings {
            println!("  {} {}", style("[WARNING]").yellow(), warning);
        }
    }

    println!();
    println!(
        "{} {} of {} answers saved to {}",
        style("[OK]").green(),
        summary.written,
        summary.processed,
        summary
            .report_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    );

    Ok(())
}

/// Print the language to region mapping of every engine
#[inline]
pub fn list_languages(config: &Config) {
    for engine in [SearchEngine::Ddg, SearchEngine::Google] {
        println!(
            "{}",
            style(format!("Supported languages for {}:", engine)).bold()
        );
        for (language, region) in config.search.regions.table_for(engine) {
            let region = if region.is_empty() { "(none)" } else { region.as_str() };
            println!("  {:<10} {}", language, style(region).cyan());
        }
        println!();
    }
}

/// Write the default configuration, refusing to replace an existing file
/// unless `force` is set
#[inline]
pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    if path.exists() && !force {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(&path)?;
    eprintln!(
        "{} Configuration written to {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    Ok(())
}
