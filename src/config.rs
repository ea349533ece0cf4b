//! Pipeline configuration
//!
//! One TOML file with a section per pipeline stage, loaded from
//! `~/.coderag/config.toml` and created with defaults when missing.
//! Every field has a serde default so a partial file stays valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::embedding::EmbeddingConfig;
use crate::errors::{RagError, Result};
use crate::generation::ollama::GenerationConfig;
use crate::index::DistanceMetric;
use crate::prompt::PromptConfig;
use crate::retrieval::SearchParams;

/// Index configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Distance metric used for scoring
    #[serde(default)]
    pub metric: DistanceMetric,
}

/// Top-level configuration for the whole pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: SearchParams,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl RagConfig {
    /// Load configuration from file, creating a default one if it
    /// doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = RagConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&config_path)?;

        let config: RagConfig = toml::from_str(&contents)
            .map_err(|e| RagError::InvalidConfig(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RagError::InvalidConfig(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, toml_string)?;
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RagError::InvalidConfig("Could not determine home directory".into()))?;
        Ok(home.join(".coderag").join("config.toml"))
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "chunking.max_chunk_size must be positive".to_string(),
            ));
        }
        if self.chunking.overlap >= self.chunking.max_chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "chunking.overlap ({}) must be smaller than max_chunk_size ({})",
                self.chunking.overlap, self.chunking.max_chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(RagError::InvalidConfig(
                "retrieval.top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RagConfig::default().validate().is_ok());
    }

    #[test]
    fn test_overlap_must_stay_below_chunk_size() {
        let mut config = RagConfig::default();
        config.chunking.overlap = config.chunking.max_chunk_size;
        assert!(matches!(
            config.validate(),
            Err(RagError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RagConfig::default();
        config.generation.model = "llama3.1:8b".to_string();
        config.chunking.max_chunk_size = 1200;

        let toml_string = toml::to_string_pretty(&config).unwrap();
        let restored: RagConfig = toml::from_str(&toml_string).unwrap();
        assert_eq!(restored.generation.model, "llama3.1:8b");
        assert_eq!(restored.chunking.max_chunk_size, 1200);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: RagConfig = toml::from_str("[generation]\nmodel = \"mistral\"\n").unwrap();
        assert_eq!(config.generation.model, "mistral");
        assert_eq!(config.chunking.max_chunk_size, 750);
        assert_eq!(config.retrieval.top_k, 4);
    }
}
