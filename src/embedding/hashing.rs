//! Feature-hashing embedder
//!
//! A deterministic bag-of-tokens embedding: each lowercased alphanumeric
//! token is hashed into one of `dim` buckets and the vector is
//! L2-normalized. No model files, no network, stable across runs, which
//! is what the test suite and offline environments need. Similarity is
//! purely lexical.

use std::hash::Hasher;

use twox_hash::XxHash64;

use super::Embedder;

const HASH_SEED: u64 = 0;

/// Deterministic hashing embedder
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
    }
}

impl Embedder for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_seq_len(&self) -> usize {
        usize::MAX
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in Self::tokens(text) {
            let mut hasher = XxHash64::with_seed(HASH_SEED);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            v[(h as usize) % self.dim] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}
