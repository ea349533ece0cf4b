//! Embedded vector index
//!
//! Stores (embedding, chunk text, metadata) entries in memory, built in
//! one pass and read-only afterwards; there is no upsert or delete path,
//! re-indexing is a full rebuild. Supports plain nearest-neighbor search
//! and diversity-aware MMR re-ranking, and persists to a directory as a
//! JSON manifest plus entries file. Loading checks the manifest's
//! dimension and model tag before any vector is touched.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::errors::{RagError, Result};

pub mod distance;
mod mmr;

const MANIFEST_FILE: &str = "manifest.json";
const ENTRIES_FILE: &str = "entries.json";
const FORMAT_VERSION: u32 = 1;

/// String key/value metadata attached to an index entry
pub type Metadata = HashMap<String, String>;

/// One indexed chunk: embedding, text payload, metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Distance metric used for scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance on raw embeddings (default)
    SquaredEuclidean,
    /// Cosine similarity
    Cosine,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::SquaredEuclidean
    }
}

/// Retrieval strategy for [`VectorIndex::search`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Plain top-k by score
    TopK,
    /// Oversample `k * fetch_multiplier` candidates, then re-rank for
    /// diversity with maximal marginal relevance
    Mmr { lambda: f32, fetch_multiplier: f32 },
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::TopK
    }
}

impl SearchStrategy {
    /// Balanced MMR: lambda 0.5, 4x oversampling
    pub fn mmr() -> Self {
        SearchStrategy::Mmr {
            lambda: 0.5,
            fetch_multiplier: 4.0,
        }
    }
}

/// A search result. `score` is higher-is-better under every metric
/// (negated distance for Euclidean).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    dim: usize,
    metric: DistanceMetric,
    model_name: String,
    entry_count: usize,
    created_at: DateTime<Utc>,
}

/// In-memory vector index over chunk embeddings
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dim: usize,
    metric: DistanceMetric,
    model_name: String,
    created_at: DateTime<Utc>,
}

impl VectorIndex {
    /// Build an index from all entries in one pass.
    ///
    /// `dim` is the embedder's output dimension; every entry must match
    /// it. `model_name` is persisted so a later load can reject an index
    /// built with a different embedding model.
    pub fn build(
        entries: Vec<IndexEntry>,
        dim: usize,
        metric: DistanceMetric,
        model_name: impl Into<String>,
    ) -> Result<Self> {
        for entry in &entries {
            if entry.vector.len() != dim {
                return Err(RagError::DimensionMismatch {
                    expected: dim,
                    actual: entry.vector.len(),
                });
            }
        }
        tracing::info!(entries = entries.len(), dim, "vector index built");
        Ok(Self {
            entries,
            dim,
            metric,
            model_name: model_name.into(),
            created_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Fail fast when this index cannot serve an embedder's queries.
    pub fn check_compatibility(&self, embedder: &dyn Embedder) -> Result<()> {
        if self.dim != embedder.dim() {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: embedder.dim(),
            });
        }
        if self.model_name != embedder.model_name() {
            return Err(RagError::ModelMismatch {
                expected: self.model_name.clone(),
                actual: embedder.model_name().to_string(),
            });
        }
        Ok(())
    }

    /// Return the `k` entries closest to `query`, best-first.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        strategy: &SearchStrategy,
    ) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        // Score everything; flat exact scan is plenty for the corpus
        // sizes this index holds.
        let mut scored: Vec<mmr::MmrCandidate> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| mmr::MmrCandidate {
                index,
                relevance: self.score(query, &entry.vector),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let selected = match strategy {
            SearchStrategy::TopK => {
                scored.truncate(k);
                scored
            }
            SearchStrategy::Mmr {
                lambda,
                fetch_multiplier,
            } => {
                let fetch = ((k as f32 * fetch_multiplier.max(1.0)).ceil() as usize)
                    .max(k)
                    .min(scored.len());
                scored.truncate(fetch);
                mmr::rerank(query, scored, k, *lambda, |i| {
                    self.entries[i].vector.as_slice()
                })
            }
        };

        Ok(selected
            .into_iter()
            .map(|c| {
                let entry = &self.entries[c.index];
                SearchHit {
                    id: entry.id.clone(),
                    score: c.relevance,
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                }
            })
            .collect())
    }

    fn score(&self, query: &[f32], vector: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::SquaredEuclidean => -distance::squared_euclidean(query, vector),
            DistanceMetric::Cosine => distance::cosine_similarity(query, vector, None, None),
        }
    }

    /// Persist the index into `dir` (created if missing).
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            dim: self.dim,
            metric: self.metric,
            model_name: self.model_name.clone(),
            entry_count: self.entries.len(),
            created_at: self.created_at,
        };
        let manifest_file = File::create(dir.join(MANIFEST_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(manifest_file), &manifest)?;

        let entries_file = File::create(dir.join(ENTRIES_FILE))?;
        serde_json::to_writer(BufWriter::new(entries_file), &self.entries)?;

        tracing::info!(dir = %dir.display(), entries = self.entries.len(), "index saved");
        Ok(())
    }

    /// Restore an index previously written by [`VectorIndex::save`].
    ///
    /// Aborts with [`RagError::IndexFormat`] on a missing or corrupt
    /// manifest and with [`RagError::DimensionMismatch`] when the stored
    /// vectors disagree with the manifest.
    pub fn load(dir: &Path) -> Result<Self> {
        let format_err = |reason: String| RagError::IndexFormat {
            path: dir.display().to_string(),
            reason,
        };

        let manifest_file = File::open(dir.join(MANIFEST_FILE))
            .map_err(|e| format_err(format!("cannot open manifest: {}", e)))?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(manifest_file))
            .map_err(|e| format_err(format!("cannot parse manifest: {}", e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(format_err(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }

        let entries_file = File::open(dir.join(ENTRIES_FILE))
            .map_err(|e| format_err(format!("cannot open entries: {}", e)))?;
        let entries: Vec<IndexEntry> = serde_json::from_reader(BufReader::new(entries_file))
            .map_err(|e| format_err(format!("cannot parse entries: {}", e)))?;

        if entries.len() != manifest.entry_count {
            return Err(format_err(format!(
                "manifest lists {} entries, file holds {}",
                manifest.entry_count,
                entries.len()
            )));
        }
        for entry in &entries {
            if entry.vector.len() != manifest.dim {
                return Err(RagError::DimensionMismatch {
                    expected: manifest.dim,
                    actual: entry.vector.len(),
                });
            }
        }

        tracing::info!(dir = %dir.display(), entries = entries.len(), "index loaded");
        Ok(Self {
            entries,
            dim: manifest.dim,
            metric: manifest.metric,
            model_name: manifest.model_name,
            created_at: manifest.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            text: format!("text for {}", id),
            metadata: Metadata::new(),
        }
    }

    fn small_index() -> VectorIndex {
        VectorIndex::build(
            vec![
                entry("a", vec![1.0, 0.0]),
                entry("b", vec![0.0, 1.0]),
                entry("c", vec![0.9, 0.1]),
            ],
            2,
            DistanceMetric::SquaredEuclidean,
            "hashing",
        )
        .unwrap()
    }

    #[test]
    fn test_build_rejects_wrong_dimension() {
        let result = VectorIndex::build(
            vec![entry("a", vec![1.0, 0.0, 0.0])],
            2,
            DistanceMetric::SquaredEuclidean,
            "hashing",
        );
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_search_orders_best_first() {
        let index = small_index();
        let hits = index
            .search(&[1.0, 0.0], 3, &SearchStrategy::TopK)
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_search_returns_at_most_k() {
        let index = small_index();
        let hits = index
            .search(&[1.0, 0.0], 2, &SearchStrategy::TopK)
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = index
            .search(&[1.0, 0.0], 10, &SearchStrategy::TopK)
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_rejects_wrong_query_dimension() {
        let index = small_index();
        let result = index.search(&[1.0, 0.0, 0.0], 1, &SearchStrategy::TopK);
        assert!(matches!(result, Err(RagError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_mmr_strategy_prefers_diverse_second_hit() {
        // "near" nearly duplicates "best"; "other" is orthogonal. Top-k
        // would return (best, near), MMR must return (best, other).
        let index = VectorIndex::build(
            vec![
                entry("best", vec![0.99, 0.01, 0.0]),
                entry("near", vec![0.98, 0.02, 0.0]),
                entry("other", vec![0.0, 0.0, 1.0]),
            ],
            3,
            DistanceMetric::SquaredEuclidean,
            "hashing",
        )
        .unwrap();

        let query = [1.0, 0.0, 0.0];
        let topk = index.search(&query, 2, &SearchStrategy::TopK).unwrap();
        assert_eq!(topk[1].id, "near");

        let hits = index.search(&query, 2, &SearchStrategy::mmr()).unwrap();
        assert_eq!(hits[0].id, "best");
        assert_eq!(hits[1].id, "other");
    }

    #[test]
    fn test_empty_index_search() {
        let index =
            VectorIndex::build(vec![], 2, DistanceMetric::SquaredEuclidean, "hashing").unwrap();
        let hits = index.search(&[0.0, 0.0], 5, &SearchStrategy::TopK).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_save_load_round_trip_preserves_search() {
        let tmp = TempDir::new().unwrap();
        let index = small_index();
        index.save(tmp.path()).unwrap();

        let restored = VectorIndex::load(tmp.path()).unwrap();
        assert_eq!(restored.len(), index.len());
        assert_eq!(restored.dim(), index.dim());
        assert_eq!(restored.model_name(), index.model_name());

        for query in [[1.0f32, 0.0], [0.2, 0.8], [0.5, 0.5]] {
            let before = index.search(&query, 3, &SearchStrategy::TopK).unwrap();
            let after = restored.search(&query, 3, &SearchStrategy::TopK).unwrap();
            let before: Vec<(String, f32)> =
                before.into_iter().map(|h| (h.id, h.score)).collect();
            let after: Vec<(String, f32)> =
                after.into_iter().map(|h| (h.id, h.score)).collect();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_load_missing_directory_fails() {
        let tmp = TempDir::new().unwrap();
        let result = VectorIndex::load(&tmp.path().join("nope"));
        assert!(matches!(result, Err(RagError::IndexFormat { .. })));
    }

    #[test]
    fn test_load_corrupt_manifest_fails() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(MANIFEST_FILE), "not json at all").unwrap();
        let result = VectorIndex::load(tmp.path());
        assert!(matches!(result, Err(RagError::IndexFormat { .. })));
    }

    #[test]
    fn test_compatibility_rejects_other_model() {
        let index = small_index();
        let embedder = crate::embedding::HashingEmbedder::new(2);
        // Same dim, same model tag: compatible.
        assert!(index.check_compatibility(&embedder).is_ok());

        let wrong_dim = crate::embedding::HashingEmbedder::new(8);
        assert!(matches!(
            index.check_compatibility(&wrong_dim),
            Err(RagError::DimensionMismatch { .. })
        ));
    }
}
