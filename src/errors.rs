//! Error types for the coderag pipeline
//!
//! One error enum covers the whole pipeline so callers match on a single
//! type. Conversions from transport and serialization errors are provided
//! via `#[from]`; embedding-model internals surface through `anyhow`.

use thiserror::Error;

/// Main error type for the retrieval-augmented generation pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Configuration validation errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Source file could not be read
    #[error("Failed to load document {path}: {source}")]
    DocumentLoad {
        path: String,
        source: std::io::Error,
    },

    /// Embedding model errors (loading, tokenization, inference)
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Persisted index built with a different vector dimension
    #[error("Index dimension mismatch: index holds {expected}-dim vectors, embedder produces {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Persisted index built with a different embedding model
    #[error("Index was built with embedding model '{expected}', configured model is '{actual}'")]
    ModelMismatch { expected: String, actual: String },

    /// Persisted index missing or unreadable
    #[error("Unreadable index at {path}: {reason}")]
    IndexFormat { path: String, reason: String },

    /// No index has been built or loaded yet
    #[error("No index available: build or load one first")]
    IndexNotBuilt,

    /// Generation endpoint refused the connection
    #[error("Generation endpoint unreachable at {0}")]
    GenerationUnreachable(String),

    /// Generation request exceeded the client timeout
    #[error("Generation request timed out after {duration_ms}ms")]
    GenerationTimeout { duration_ms: u64 },

    /// Ollama API returned a non-success status
    #[error("Ollama API error: {0}")]
    OllamaApi(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors from the embedding layer
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Embedding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = RagError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert!(err.to_string().contains("384"));
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn test_timeout_display() {
        let err = RagError::GenerationTimeout { duration_ms: 30000 };
        assert!(err.to_string().contains("30000"));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: RagError = anyhow::anyhow!("tokenizer exploded").into();
        assert!(matches!(err, RagError::Embedding(_)));
        assert!(err.to_string().contains("tokenizer exploded"));
    }
}
