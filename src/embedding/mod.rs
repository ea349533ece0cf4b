//! Text embedding
//!
//! The [`Embedder`] trait maps text to fixed-dimension dense vectors,
//! deterministically for identical input. [`BertEmbedder`] runs a local
//! BERT-style model through Candle; [`HashingEmbedder`] is a dependency-free
//! fallback used by tests and offline runs.

use serde::{Deserialize, Serialize};

pub mod engine;
pub mod hashing;

pub use engine::BertEmbedder;
pub use hashing::HashingEmbedder;

/// Maps text to a fixed-dimension vector. Pure function of the input:
/// embedding the same text twice yields bit-identical vectors.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, persisted into index manifests
    fn model_name(&self) -> &str;

    /// Output vector dimension
    fn dim(&self) -> usize;

    /// Maximum input length in tokens; longer input is truncated
    fn max_seq_len(&self) -> usize;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// HuggingFace Hub model id
    pub model_id: String,
    /// Use the hashing embedder instead of the neural model
    pub use_hashing: bool,
    /// Vector dimension for the hashing embedder
    pub hashing_dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            use_hashing: false,
            hashing_dim: 256,
        }
    }
}

/// Build the embedder selected by the configuration.
pub fn embedder_from_config(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    if config.use_hashing {
        return Ok(Box::new(HashingEmbedder::new(config.hashing_dim)));
    }
    Ok(Box::new(BertEmbedder::new(&config.model_id)?))
}
