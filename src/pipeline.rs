//! End-to-end pipeline
//!
//! Wires the stages into two linear flows. Offline:
//! documents -> chunks -> embeddings -> vector index. Online:
//! question -> retrieval -> prompt -> completion. Services are
//! constructed once and shared read-only; there is no hidden global
//! state and each call runs its stages sequentially.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::chunker::{Chunk, Chunker};
use crate::config::RagConfig;
use crate::embedding::{embedder_from_config, Embedder};
use crate::errors::{RagError, Result};
use crate::generation::{Generator, OllamaGenerator};
use crate::index::{IndexEntry, Metadata, VectorIndex};
use crate::loader::{Document, SourceLoader};
use crate::prompt::PromptBuilder;
use crate::retrieval::{RetrievedSet, Retriever};

/// Outcome of the offline indexing phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub dim: usize,
    pub elapsed_ms: u64,
}

/// Result of answering one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub question: String,
    /// The model's completion
    pub answer: String,
    /// The exact prompt sent to the generator
    pub prompt: String,
    /// The chunks that backed the prompt, best-first
    pub retrieved: RetrievedSet,
}

/// Retrieval-augmented generation pipeline over one source tree
pub struct RagPipeline {
    config: RagConfig,
    chunker: Chunker,
    prompt_builder: PromptBuilder,
    embedder: Arc<dyn Embedder>,
    generator: Box<dyn Generator>,
    index: Option<Arc<VectorIndex>>,
}

impl RagPipeline {
    /// Create a pipeline from explicitly constructed services.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = Chunker::new(config.chunking.clone())?;
        let prompt_builder = PromptBuilder::with_config(config.prompt.clone());

        Ok(Self {
            config,
            chunker,
            prompt_builder,
            embedder,
            generator,
            index: None,
        })
    }

    /// Create a pipeline with the embedder and generator named in the
    /// configuration.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(embedder_from_config(&config.embedding)?);
        let generator = Box::new(OllamaGenerator::with_config(&config.generation)?);
        Self::new(config, embedder, generator)
    }

    /// Offline phase: chunk and embed documents, build the index.
    ///
    /// Replaces any previously built or loaded index. A failing document
    /// aborts the whole batch.
    pub fn index_documents(&mut self, documents: &[Document]) -> Result<IndexReport> {
        let started = Instant::now();

        let mut entries = Vec::new();
        let mut chunk_count = 0usize;
        for document in documents {
            let chunks = self.chunker.chunk(document);
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let vectors = self.embedder.embed_batch(&texts)?;

            chunk_count += chunks.len();
            for (chunk, vector) in chunks.iter().zip(vectors) {
                entries.push(IndexEntry {
                    id: chunk.id.clone(),
                    vector,
                    text: chunk.text.clone(),
                    metadata: chunk_metadata(chunk),
                });
            }
        }

        let index = VectorIndex::build(
            entries,
            self.embedder.dim(),
            self.config.index.metric,
            self.embedder.model_name(),
        )?;
        self.index = Some(Arc::new(index));

        let report = IndexReport {
            documents: documents.len(),
            chunks: chunk_count,
            dim: self.embedder.dim(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            documents = report.documents,
            chunks = report.chunks,
            elapsed_ms = report.elapsed_ms,
            "indexing complete"
        );
        Ok(report)
    }

    /// Load all matching files under `root` and index them.
    pub fn index_directory(&mut self, root: &Path, suffixes: &[&str]) -> Result<IndexReport> {
        let documents = SourceLoader::new(root, suffixes).load()?;
        self.index_documents(&documents)
    }

    /// Persist the current index.
    pub fn save_index(&self, dir: &Path) -> Result<()> {
        self.index
            .as_ref()
            .ok_or(RagError::IndexNotBuilt)?
            .save(dir)
    }

    /// Restore a previously saved index, verifying it matches the
    /// configured embedder before use.
    pub fn load_index(&mut self, dir: &Path) -> Result<()> {
        let index = VectorIndex::load(dir)?;
        index.check_compatibility(self.embedder.as_ref())?;
        self.index = Some(Arc::new(index));
        Ok(())
    }

    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.index.as_ref()
    }

    /// Retriever over the current index with the configured parameters.
    pub fn retriever(&self) -> Result<Retriever> {
        let index = self.index.clone().ok_or(RagError::IndexNotBuilt)?;
        Ok(Retriever::with_params(
            self.embedder.clone(),
            index,
            self.config.retrieval.clone(),
        ))
    }

    /// Retrieve without generating, for inspection and tests.
    pub fn retrieve(&self, question: &str, k: usize) -> Result<RetrievedSet> {
        self.retriever()?.retrieve(question, k)
    }

    /// Online phase: retrieve context, assemble the prompt, generate.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let retriever = self.retriever()?;
        let retrieved = retriever.retrieve_with_params(question, &self.config.retrieval)?;
        let prompt = self.prompt_builder.assemble(question, &retrieved.texts());
        let answer = self.generator.generate(&prompt).await?;

        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            prompt,
            retrieved,
        })
    }
}

fn chunk_metadata(chunk: &Chunk) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), chunk.doc_path.clone());
    metadata.insert("language".to_string(), chunk.language.as_str().to_string());
    metadata.insert("chunk_index".to_string(), chunk.index.to_string());
    metadata
}
