//! fille-embed
//!
//! Sentence embeddings for corpus snippets and user queries. `MiniLmEmbedder`
//! runs a BERT sentence encoder (all-MiniLM-L6-v2 by default) through candle;
//! `HashEmbedder` is a deterministic stand-in for tests and local development.

pub mod device;
pub mod pool;
pub mod tokenize;

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use twox_hash::XxHash64;

use fille_core::config::{expand_path, EmbeddingSettings};
pub use fille_core::traits::Embedder;

pub use device::select_device;
pub use pool::{l2_normalize, masked_mean_l2};

pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    pad_id: u32,
    id: String,
}

impl MiniLmEmbedder {
    pub fn new(model_dir: &Path, max_len: usize, device: Device) -> Result<Self> {
        tracing::info!(dir = %model_dir.display(), "Loading sentence encoder");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let raw: serde_json::Value = serde_json::from_str(&config_text)?;
        let dim = raw
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let max_positions = raw.get("max_position_embeddings").and_then(serde_json::Value::as_u64).unwrap_or(512) as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;

        let name = model_dir.file_name().and_then(|s| s.to_str()).unwrap_or(DEFAULT_MODEL_NAME);
        let id = format!("minilm:{}:d{}", name, dim);
        tracing::info!(model = %id, "Sentence encoder loaded");
        Ok(Self { model, tokenizer, device, dim, max_len: max_len.min(max_positions), pad_id, id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        for row in &rows { assert_eq!(row.len(), self.dim); }
        Ok(rows)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn model_id(&self) -> &str { &self.id }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let start = Instant::now();
        let out = self.embed_chunk(texts)?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 1000 {
            tracing::warn!(batch = texts.len(), elapsed_ms = elapsed.as_millis() as u64, "Slow embedding batch");
        } else {
            tracing::debug!(batch = texts.len(), elapsed_ms = elapsed.as_millis() as u64, "Embedded batch");
        }
        Ok(out)
    }
}

/// Deterministic bag-of-words hashing encoder.
///
/// Each lowercased alphanumeric token is hashed into a bucket; the result is
/// L2-normalized. Texts sharing words score higher under dot product, which
/// is enough to exercise retrieval without model weights. Text with no tokens
/// maps to the zero vector.
pub struct HashEmbedder { dim: usize, id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "embedding dimension must be positive");
        Self { dim, id: format!("hash:xxh64:d{}", dim) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let weight = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn model_id(&self) -> &str { &self.id }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Build the embedder selected by settings.
///
/// `embedding.fake = true` or `APP_USE_FAKE_EMBEDDINGS=1` selects `HashEmbedder`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if settings.fake || env_fake {
        tracing::warn!(dim = settings.fake_dim, "Using HashEmbedder: retrieval is lexical, not semantic");
        return Ok(Box::new(HashEmbedder::new(settings.fake_dim)));
    }
    let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
    let device = select_device(&settings.device);
    Ok(Box::new(MiniLmEmbedder::new(&model_dir, settings.max_len, device)?))
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = expand_path(dir);
        if p.exists() { return Ok(p); }
        return Err(anyhow!("embedding.model_dir {} does not exist", p.display()));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            let p = expand_path(&dir);
            if p.exists() { tracing::info!(var, dir = %p.display(), "Using model dir from env"); return Ok(p); }
        }
    }
    for candidate in [format!("models/{DEFAULT_MODEL_NAME}"), format!("../models/{DEFAULT_MODEL_NAME}")] {
        let p = PathBuf::from(&candidate);
        if p.exists() { tracing::info!(dir = %p.display(), "Using model dir"); return Ok(p); }
    }
    Err(anyhow!("Could not locate {} model directory (set embedding.model_dir or APP_MODEL_DIR)", DEFAULT_MODEL_NAME))
}
