//! BERT embedding engine via Candle
//!
//! Downloads the model from the HuggingFace Hub on first use, then runs
//! entirely locally. Output vectors are mean-pooled over the token
//! dimension and L2-normalized.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::Tokenizer;

use super::Embedder;

/// Embedding engine running a BERT-style sentence-transformer model
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_seq_len: usize,
}

impl BertEmbedder {
    /// Create a new embedder (downloads model files on first use)
    pub fn new(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HuggingFace API client")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .context("Failed to download model config")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to download model weights")?;

        let config_contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&config_contents).context("Failed to parse model config")?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };

        let dim = config.hidden_size;
        let max_seq_len = config.max_position_embeddings;
        let model = BertModel::load(vb, &config).context("Failed to create BERT model")?;

        tracing::info!(model = model_id, dim, max_seq_len, "embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            model_id: model_id.to_string(),
            dim,
            max_seq_len,
        })
    }

    fn embed_batch_inner(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let mut token_ids_vec = Vec::new();
        let mut attention_mask_vec = Vec::new();

        for (encoding, text) in encodings.iter().zip(texts) {
            let mut ids = encoding.get_ids().to_vec();
            let mut mask = encoding.get_attention_mask().to_vec();

            // The model silently drops everything past its maximum
            // sequence length; make that information loss observable.
            if ids.len() > self.max_seq_len {
                let preview: String = text.chars().take(48).collect();
                tracing::warn!(
                    tokens = ids.len(),
                    max = self.max_seq_len,
                    preview,
                    "input exceeds model sequence length, truncating"
                );
                ids.truncate(self.max_seq_len);
                mask.truncate(self.max_seq_len);
            }

            token_ids_vec.push(ids);
            attention_mask_vec.push(mask);
        }

        let max_len = token_ids_vec.iter().map(|ids| ids.len()).max().unwrap_or(0);
        let batch_size = texts.len();

        let mut padded_ids = vec![vec![0u32; max_len]; batch_size];
        let mut padded_mask = vec![vec![0u32; max_len]; batch_size];

        for (i, (ids, mask)) in token_ids_vec.iter().zip(attention_mask_vec.iter()).enumerate() {
            padded_ids[i][..ids.len()].copy_from_slice(ids);
            padded_mask[i][..mask.len()].copy_from_slice(mask);
        }

        let flat_ids: Vec<u32> = padded_ids.into_iter().flatten().collect();
        let flat_mask: Vec<u32> = padded_mask.into_iter().flatten().collect();

        let token_ids = Tensor::from_vec(flat_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(flat_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let embeddings = self
            .model
            .forward(&token_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = Self::mean_pool(&embeddings, &attention_mask)?;
        let normalized = Self::l2_normalize(&pooled)?;

        Ok(normalized.to_vec2::<f32>()?)
    }

    /// Mean pooling with attention mask
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum_embeddings.broadcast_div(&sum_mask)?)
    }

    fn l2_normalize(v: &Tensor) -> Result<Tensor> {
        let norm = v.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
        Ok(v.broadcast_div(&norm)?)
    }
}

impl Embedder for BertEmbedder {
    fn model_name(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch_inner(&[text]).map(|mut v| {
            v.pop().expect("batch of one yields one embedding")
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.embed_batch_inner(texts)
    }
}
