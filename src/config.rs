// file: src/config.rs
// description: application configuration management with toml and environment support
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
    pub ai: AiConfig,
    pub pipeline: PipelineConfig,
    pub checklist: ChecklistConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    pub uri: String,
    pub name_prefix: String,
    pub embedding_dim: usize,
    pub embedding_batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub page_writers: usize,
    pub identity_window_pages: usize,
    pub consumer_timeout_secs: u64,
    pub scratch_dir: PathBuf,
    pub retrieval_top_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChecklistConfig {
    pub path: PathBuf,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new("config/default.toml")).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DRHP_NOTES")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.apply_api_key_fallback(std::env::var("OPENAI_API_KEY").ok());
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            store: StoreConfig {
                root: PathBuf::from("data/records"),
            },
            index: IndexConfig {
                uri: "data/lancedb".to_string(),
                name_prefix: "drhp_notes_".to_string(),
                embedding_dim: 1536,
                embedding_batch_size: 64,
            },
            ai: AiConfig {
                api_base: "https://api.openai.com/v1".to_string(),
                api_key: None,
                chat_model: "gpt-4o-mini".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
                request_timeout_secs: 120,
            },
            pipeline: PipelineConfig {
                page_writers: 5,
                identity_window_pages: 10,
                consumer_timeout_secs: 600,
                scratch_dir: PathBuf::from("data/scratch"),
                retrieval_top_k: 6,
            },
            checklist: ChecklistConfig {
                path: PathBuf::from("config/checklists/ipo_notes.yaml"),
            },
        }
    }

    fn apply_api_key_fallback(&mut self, fallback: Option<String>) {
        let missing = self
            .ai
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty());
        if missing {
            self.ai.api_key = fallback.filter(|key| !key.trim().is_empty());
        }
    }

    pub fn consumer_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.consumer_timeout_secs)
    }

    /// Checks the settings every external collaborator needs before any work starts.
    pub fn validate_environment(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self
            .ai
            .api_key
            .as_deref()
            .is_none_or(|key| key.trim().is_empty())
        {
            missing.push("ai.api_key (or OPENAI_API_KEY)");
        }
        if self.index.uri.trim().is_empty() {
            missing.push("index.uri");
        }
        if self.store.root.as_os_str().is_empty() {
            missing.push("store.root");
        }
        if self.ai.api_base.trim().is_empty() {
            missing.push("ai.api_base");
        }

        if !missing.is_empty() {
            return Err(PipelineError::Environment(missing.join(", ")));
        }

        Validator::validate_url(&self.ai.api_base)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.page_writers == 0 {
            return Err(PipelineError::Config(
                "page_writers must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.identity_window_pages == 0 {
            return Err(PipelineError::Config(
                "identity_window_pages must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.consumer_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "consumer_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.index.embedding_dim == 0 || self.index.embedding_batch_size == 0 {
            return Err(PipelineError::Config(
                "embedding_dim and embedding_batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
