// Configuration management module
// TOML settings for the embedding server, HTTP server, datasets and retrieval


pub mod settings;

pub use settings::{
    Config, ConfigError, DatasetConfig, OllamaConfig, RetrievalConfig, ServerConfig,
};

use anyhow::Result;
use console::style;

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding (Ollama) Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Server Settings:").bold().yellow());
    eprintln!(
        "  Listen: {}",
        style(format!("{}:{}", config.server.host, config.server.port)).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Datasets:").bold().yellow());
    for source in config.dataset.resolved_sources() {
        let marker = if source.path.exists() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        eprintln!(
            "  {} {}: {}",
            marker,
            source.book,
            style(source.path.display()).cyan()
        );
    }

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Filter Strategy: {}",
        style(format!("{:?}", config.retrieval.filter_strategy)).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Answer Generation:").bold().yellow());
    match crate::generation::GenerationConfig::from_env() {
        Ok(generation) => {
            eprintln!("  Model: {}", style(&generation.model_name).cyan());
            match generation.predict_url() {
                Ok(url) => eprintln!("  Endpoint: {}", style(url).cyan()),
                Err(e) => eprintln!("  Endpoint: {} ({})", style("Invalid").red(), e),
            }
        }
        Err(e) => eprintln!("  {} ({})", style("Not configured").red(), e),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}
