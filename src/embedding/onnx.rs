//! In-process ONNX embedding backend.
//!
//! Defaults to bge-small-en-v1.5 (384 dimensions) with mean pooling and L2
//! normalization. The model is fetched through the HuggingFace Hub cache and
//! loaded on first use, once per process.

use std::path::{Path, PathBuf};

use hf_hub::api::sync::ApiBuilder;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

use super::lazy::LazyModel;
use super::Embedder;
use crate::errors::Error;

/// Default HuggingFace model for the in-process backend.
pub const DEFAULT_LOCAL_MODEL: &str = "BAAI/bge-small-en-v1.5";

/// Embedding dimensions of the default model.
pub const EMBEDDING_DIMS: usize = 384;

/// Loaded ONNX session and tokenizer.
pub struct EmbeddingEngine {
    session: Session,
    tokenizer: Tokenizer,
    requires_token_type_ids: bool,
}

impl EmbeddingEngine {
    /// Load model from cache or download on first use.
    ///
    /// Uses the blocking `hf_hub` client. Files are cached under `cache_dir`
    /// (or the default HF Hub cache) and only downloaded once.
    pub fn new(model_id: &str, cache_dir: Option<&Path>) -> Result<Self, Error> {
        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = cache_dir {
            builder = builder.with_cache_dir(dir.to_path_buf());
        }
        let api = builder.build()?;
        let repo = api.model(model_id.to_string());

        let model_path = repo
            .get("onnx/model.onnx")
            .or_else(|_| repo.get("model.onnx"))?;
        let tokenizer_path = repo.get("tokenizer.json")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: 512,
                ..Default::default()
            }))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(ort::Error::from)?
            .commit_from_file(&model_path)?;

        // Check if model requires token_type_ids input
        let requires_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        Ok(EmbeddingEngine {
            session,
            tokenizer,
            requires_token_type_ids,
        })
    }

    /// Generate an L2-normalized embedding for a single text.
    ///
    /// The length is the model's hidden size. Texts over 512 tokens are
    /// silently truncated by the tokenizer. Input that tokenizes to nothing
    /// yields an empty vector.
    pub fn embed(&mut self, text: &str) -> Result<Vec<f32>, Error> {
        let encoding = self.tokenizer.encode(text, true)?;
        let input_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        if input_ids.is_empty() {
            return Ok(Vec::new());
        }

        let seq_len = input_ids.len();

        let input_ids_vec: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

        let input_ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids_vec))?;
        let attention_mask_tensor = Tensor::from_array(([1usize, seq_len], attention_mask_vec))?;

        let outputs = if self.requires_token_type_ids {
            let token_type_ids_tensor =
                Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))?;
            self.session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])?
        } else {
            self.session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])?
        };

        let (shape, data) = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .ok_or_else(|| {
                Error::Inference(
                    "Output tensor 'last_hidden_state' or 'token_embeddings' not found".to_string(),
                )
            })?
            .try_extract_tensor::<f32>()?;

        if shape.len() != 3 || shape[0] != 1 {
            return Err(Error::Inference(format!(
                "Expected output shape (1, seq_len, hidden), got {:?}",
                shape
            )));
        }
        let hidden_dim = shape[2] as usize;

        Ok(l2_normalize(&mean_pool(data, attention_mask, seq_len, hidden_dim)))
    }
}

/// Attention-masked mean over token vectors.
fn mean_pool(data: &[f32], attention_mask: &[u32], seq_len: usize, hidden_dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_dim];
    for (token_idx, chunk) in data.chunks(hidden_dim).take(seq_len).enumerate() {
        let mask_value = attention_mask.get(token_idx).copied().unwrap_or(0) as f32;
        for (pooled_value, value) in pooled.iter_mut().zip(chunk) {
            *pooled_value += value * mask_value;
        }
    }

    let mask_sum: f32 = attention_mask
        .iter()
        .take(seq_len)
        .map(|&m| m as f32)
        .sum::<f32>()
        .max(1e-9);

    for value in pooled.iter_mut() {
        *value /= mask_sum;
    }
    pooled
}

fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    let norm = norm.max(1e-9);

    vec.iter().map(|&x| x / norm).collect()
}

/// Zero-configuration backend: wraps [`EmbeddingEngine`] behind a load-once cell.
pub struct LocalEmbedder {
    model_id: String,
    cache_dir: Option<PathBuf>,
    dimension: usize,
    engine: LazyModel<Mutex<EmbeddingEngine>>,
}

impl LocalEmbedder {
    /// Nothing is loaded until the first `embed` call.
    pub fn new(model_id: impl Into<String>, cache_dir: Option<PathBuf>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            cache_dir,
            dimension,
            engine: LazyModel::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_ready()
    }
}

impl Embedder for LocalEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f64>, Error> {
        if text.is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }
        let engine = self.engine.get_or_try_init(|| {
            info!(model = %self.model_id, "loading local embedding model");
            EmbeddingEngine::new(&self.model_id, self.cache_dir.as_deref()).map(Mutex::new)
        })?;
        let embedding = engine.lock().embed(text)?;
        Ok(embedding.into_iter().map(f64::from).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_vector() {
        let normalized = l2_normalize(&[1.0, 0.0, 0.0]);
        let norm: f32 = normalized.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_l2_normalize_magnitude() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool_respects_mask() {
        // two tokens of width 2; the second is padding
        let data = [1.0, 3.0, 100.0, 100.0];
        let pooled = mean_pool(&data, &[1, 0], 2, 2);
        assert_eq!(pooled, vec![1.0, 3.0]);
    }

    #[test]
    fn test_local_embedder_is_lazy() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, None, EMBEDDING_DIMS);
        assert!(!embedder.is_loaded());
        assert_eq!(embedder.dimension(), 384);
        // empty input never touches the model
        assert_eq!(embedder.embed("").unwrap(), vec![0.0; 384]);
        assert!(!embedder.is_loaded());
    }

    #[ignore]
    #[test]
    fn test_integration_simple_text() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, None, EMBEDDING_DIMS);
        let embedding = embedder.embed("hello world").expect("embed text");

        assert_eq!(embedding.len(), 384);
        let norm: f64 = embedding.iter().map(|&x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "Embedding should be L2-normalized");
        assert!(embedder.is_loaded());
    }

    #[ignore]
    #[test]
    fn test_integration_long_text_truncation() {
        let embedder = LocalEmbedder::new(DEFAULT_LOCAL_MODEL, None, EMBEDDING_DIMS);
        let embedding = embedder
            .embed(&"This is a sentence. ".repeat(100))
            .expect("embed long text");
        assert_eq!(embedding.len(), 384);
    }
}
