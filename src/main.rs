use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use web_answer::Result;
use web_answer::commands::{ask, batch, init_config, list_languages};
use web_answer::config::{BatchPrompt, Config, show_config};
use web_answer::search::DEFAULT_LANGUAGE;

#[derive(Parser)]
#[command(name = "web-answer")]
#[command(about = "Answer questions using web search, passage retrieval and a local LLM")]
#[command(version)]
struct Cli {
    /// Path to a config.toml (defaults to ./config.toml, then ~/.web-answer/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        query: String,
        /// Language used to pick search regions
        #[arg(short, long, default_value = DEFAULT_LANGUAGE)]
        language: String,
    },
    /// Answer every line of a text file, writing <input>_answers.csv
    Batch {
        /// File with one query per line; prompted for when missing
        input: Option<PathBuf>,
        /// Language used to pick search regions; prompted for when missing
        #[arg(short, long)]
        language: Option<String>,
        /// Template prefixed to every query, e.g. "Definition of"
        #[arg(long)]
        expand: Option<String>,
        /// Do not ask about query expansion
        #[arg(long, conflicts_with = "expand")]
        no_expand: bool,
    },
    /// List supported languages and their region codes
    Languages,
    /// Show or create the configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write a default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { query, language } => {
            let config = Config::load(cli.config.as_deref())?;
            ask(&config, &query, &language).await?;
        }
        Commands::Batch {
            input,
            language,
            expand,
            no_expand,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let prompt = BatchPrompt {
                input,
                language,
                expansion: expand,
                no_expansion: no_expand,
            };
            batch(&config, prompt).await?;
        }
        Commands::Languages => {
            let config = Config::load(cli.config.as_deref())?;
            list_languages(&config);
        }
        Commands::Config { init: true, force, .. } => {
            init_config(cli.config.as_deref(), force)?;
        }
        Commands::Config { .. } => {
            let config = Config::load(cli.config.as_deref())?;
            show_config(&config);
        }
    }

    Ok(())
}
