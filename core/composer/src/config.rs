use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::llm_providers::{ClaudeProvider, OllamaProvider, OpenAIProvider, SummaryGenerator};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Openai,
    Ollama,
    Claude,
}

/// Weekly Journal service configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "journal-server")]
#[command(about = "Journal entries and AI-generated weekly summaries over HTTP")]
pub struct Config {
    /// Path to SQLite database file
    #[arg(long, env = "JOURNAL_DB_PATH", default_value = "journal.db")]
    pub db_path: PathBuf,

    /// Address to listen on
    #[arg(long, env = "JOURNAL_ADDR", default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// Text generation provider used for weekly summaries
    #[arg(long, env = "SUMMARY_PROVIDER", value_enum, default_value_t = ProviderKind::Openai)]
    pub provider: ProviderKind,

    /// Model name; each provider has its own default
    #[arg(long, env = "SUMMARY_MODEL")]
    pub model: Option<String>,

    /// Ollama base URL
    #[arg(long, env = "OLLAMA_HOST")]
    pub ollama_url: Option<String>,

    /// Give up on the generator after this many seconds
    #[arg(long, env = "SUMMARY_TIMEOUT_SECS", default_value_t = 60)]
    pub generation_timeout_secs: u64,
}

impl Config {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Build the configured generator, reading credentials from the environment.
    pub fn build_generator(&self) -> Result<Arc<dyn SummaryGenerator>> {
        self.build_generator_with(|key| std::env::var(key).ok())
    }

    /// Like [`Config::build_generator`] with an explicit credential lookup.
    /// A missing credential is a startup error.
    pub fn build_generator_with<F>(&self, lookup: F) -> Result<Arc<dyn SummaryGenerator>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => bail!(
                    "{} must be set to use the {:?} summary provider",
                    key,
                    self.provider
                ),
            }
        };

        let generator: Arc<dyn SummaryGenerator> = match self.provider {
            ProviderKind::Openai => Arc::new(OpenAIProvider::new(
                credential(OPENAI_API_KEY)?,
                self.model.clone(),
            )),
            ProviderKind::Claude => Arc::new(ClaudeProvider::new(
                credential(ANTHROPIC_API_KEY)?,
                self.model.clone(),
            )),
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(
                self.model.clone(),
                self.ollama_url.clone(),
            )),
        };

        Ok(generator)
    }
}
