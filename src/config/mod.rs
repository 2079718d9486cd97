// TOML settings plus the interactive helpers built on them

pub mod interactive;
pub mod settings;

pub use interactive::{BatchPrompt, prompt_batch_options, show_config};
pub use settings::{Config, ConfigError, OllamaConfig, OutputConfig};
