//! Text generation
//!
//! The [`Generator`] trait is the seam between the pipeline and whatever
//! model runtime produces completions. [`OllamaGenerator`] talks to a
//! locally hosted Ollama server; tests substitute scripted generators.

use async_trait::async_trait;

use crate::errors::Result;

pub mod ollama;

pub use ollama::OllamaGenerator;

/// Produces a completion for an assembled prompt. One blocking call per
/// prompt; failures surface to the caller, nothing is retried.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}
