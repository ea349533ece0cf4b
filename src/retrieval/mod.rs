//! Query-time retrieval
//!
//! Wraps the vector index with a text-in, chunks-out interface: embed the
//! query, search under the configured strategy, return the top results
//! best-first. Ranking is purely mechanical; there is no relevance-quality
//! guarantee beyond the metric.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::errors::Result;
use crate::index::{SearchHit, SearchStrategy, VectorIndex};

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of chunks to return
    pub top_k: usize,
    /// Retrieval strategy
    #[serde(default)]
    pub strategy: SearchStrategy,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 4,
            strategy: SearchStrategy::TopK,
        }
    }
}

/// Ordered retrieval result for one query, best-first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedSet {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

impl RetrievedSet {
    /// Chunk texts in rank order, for prompt assembly
    pub fn texts(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.text.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Retrieval engine over a built index and a shared embedder
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    default_params: SearchParams,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            default_params: SearchParams::default(),
        }
    }

    pub fn with_params(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        params: SearchParams,
    ) -> Self {
        Self {
            embedder,
            index,
            default_params: params,
        }
    }

    /// Retrieve the best `k` chunks for a query under the default
    /// strategy. Fewer than `k` are returned when the index is smaller.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievedSet> {
        let params = SearchParams {
            top_k: k,
            strategy: self.default_params.strategy.clone(),
        };
        self.retrieve_with_params(query, &params)
    }

    /// Retrieve with explicit parameters
    pub fn retrieve_with_params(&self, query: &str, params: &SearchParams) -> Result<RetrievedSet> {
        let query_vector = self.embedder.embed(query)?;
        let hits = self
            .index
            .search(&query_vector, params.top_k, &params.strategy)?;

        tracing::debug!(query, hits = hits.len(), "retrieval complete");
        Ok(RetrievedSet {
            query: query.to_string(),
            hits,
        })
    }

    pub fn default_params(&self) -> &SearchParams {
        &self.default_params
    }
}
