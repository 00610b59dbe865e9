//! Embedding collaborator: a candle sentence encoder (BERT family, e.g.
//! all-MiniLM-L6-v2) and a deterministic hashing embedder for tests.
//!
//! `get_default_embedder` honours `APP_USE_FAKE_EMBEDDINGS=1`.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use shopsearch_core::config::{expand_path, EmbeddingSettings};
use shopsearch_core::error::Error;
pub use shopsearch_core::traits::{Embedder, ModelInfo};

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::{tokenize_batch, TokenBatch};

pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    info: ModelInfo,
    pad_id: u32,
}

impl EmbeddingModel {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(settings)?;
        info!(model = %settings.model_name, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let pad_id = tokenizer.get_padding().map_or(0, |p| p.pad_id);

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?)?;
        let max_sequence_length = settings.max_length.min(config.max_position_embeddings);

        let vb = VarBuilder::from_tensors(load_weights(&model_dir, &device)?, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;

        let probe = Self {
            model,
            tokenizer,
            device,
            pad_id,
            info: ModelInfo {
                model_name: settings.model_name.clone(),
                embedding_dimension: config.hidden_size,
                max_sequence_length,
                batch_size: settings.batch_size,
            },
        };
        if probe.info.embedding_dimension != settings.dimension {
            return Err(Error::Embedding(format!(
                "model produces {}-d vectors but embedding.dimension is {}",
                probe.info.embedding_dimension, settings.dimension
            )).into());
        }
        info!(dim = probe.info.embedding_dimension, "embedding model loaded");
        Ok(probe)
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch = tokenize_batch(&self.tokenizer, texts, self.info.max_sequence_length, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.info.embedding_dimension }
    fn max_len(&self) -> usize { self.info.max_sequence_length }
    fn model_info(&self) -> ModelInfo { self.info.clone() }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for (i, chunk) in texts.chunks(self.info.batch_size).enumerate() {
            out.extend(self.embed_chunk(chunk)?);
            if (i + 1) % 10 == 0 {
                debug!(batch = i + 1, total = texts.len().div_ceil(self.info.batch_size), "embedded batch");
            }
        }
        if texts.len() == 1 && start.elapsed().as_millis() > 100 {
            warn!(elapsed_ms = start.elapsed().as_millis() as u64, "slow query embedding");
        }
        Ok(out)
    }
}

/// Deterministic bag-of-tokens embedder: each whitespace token is hashed into
/// one of `dim` buckets and the result is L2-normalized. Shares no semantics
/// with a real model but is stable across runs.
pub struct FakeEmbedder { dim: usize, max_len: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, max_len: 512 } }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn model_info(&self) -> ModelInfo {
        ModelInfo { model_name: "fake-xxhash64".to_string(), embedding_dimension: self.dim, max_sequence_length: self.max_len, batch_size: 0 }
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        Ok(texts.iter().map(|text| {
            let mut v = vec![0f32; self.dim];
            for (i, token) in text.to_lowercase().split_whitespace().enumerate() {
                let mut hasher = XxHash64::with_seed(0);
                token.hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dim;
                let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                v[idx] += val + (i as f32 % 3.0) * 0.01;
            }
            let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
            for x in &mut v { *x /= norm; }
            v
        }).collect())
    }
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake {
        info!(dim = settings.dimension, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dimension)));
    }
    Ok(Box::new(EmbeddingModel::new(settings)?))
}

/// Cosine similarity of two vectors; 0.0 for mismatched lengths or zero norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() { return 0.0; }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 { return 0.0; }
    dot / (norm_a * norm_b)
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&pickle)
        .with_context(|| format!("Failed to read weights from {}", pickle.display()))?;
    weights.into_iter().map(|(name, t)| Ok((name, t.to_device(device)?))).collect()
}

fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { candidates.push(expand_path(dir)); }
    }
    if let Some(dir) = &settings.model_dir { candidates.push(expand_path(dir)); }
    candidates.push(Path::new("../models").join(&settings.model_name));
    candidates.push(Path::new("models").join(&settings.model_name));
    candidates.into_iter().find(|p| p.exists()).ok_or_else(|| {
        Error::NotFound(format!("model directory for {} (set APP_MODEL_DIR or embedding.model_dir)", settings.model_name)).into()
    })
}
