//! ONNX-based dense sentence embeddings
//!
//! Uses all-MiniLM-L6-v2 by default for 384-dimensional embeddings. Mean
//! pooling over the attention mask, then L2 normalization.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingBackend;

use super::assets::{AssetFetcher, AssetKind, AssetSpec};

/// Session and tokenizer, used by one inference at a time
struct Encoder {
    session: Session,
    tokenizer: Tokenizer,
}

/// ONNX-based text embedder
#[derive(Clone)]
pub struct OnnxEmbedder {
    encoder: Arc<Mutex<Encoder>>,
    /// Embedding dimensions
    dimensions: usize,
    /// Maximum sequence length
    max_length: usize,
    /// Batch size
    batch_size: usize,
}

/// Asset specs for the configured model
pub fn model_assets(config: &EmbeddingConfig) -> (AssetSpec, AssetSpec) {
    let model = AssetSpec {
        name: format!("{} model", config.model),
        url: config.model_url.clone(),
        file_name: format!("{}.onnx", config.model),
        kind: AssetKind::Binary,
        min_bytes: 1024 * 1024,
        sha256: config.model_sha256.clone(),
    };
    let tokenizer = AssetSpec {
        name: format!("{} tokenizer", config.model),
        url: config.tokenizer_url.clone(),
        file_name: format!("{}.tokenizer.json", config.model),
        kind: AssetKind::Json,
        min_bytes: 1024,
        sha256: None,
    };
    (model, tokenizer)
}

impl OnnxEmbedder {
    /// Acquire model assets and load the session
    pub async fn new(config: &EmbeddingConfig, fetcher: &AssetFetcher) -> Result<Self> {
        tracing::info!("Initializing ONNX embedder with model: {}", config.model);

        let (model_spec, tokenizer_spec) = model_assets(config);
        let model_path = fetcher.ensure(&model_spec).await?;
        let tokenizer_path = fetcher.ensure(&tokenizer_spec).await?;

        let encoder = tokio::task::spawn_blocking(move || load_encoder(&model_path, &tokenizer_path))
            .await
            .map_err(|e| Error::embedding(format!("Model load panicked: {}", e)))??;

        tracing::info!("ONNX embedder initialized successfully");

        Ok(Self {
            encoder: Arc::new(Mutex::new(encoder)),
            dimensions: config.dimensions,
            max_length: config.max_length,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Embed texts on the calling thread, `batch_size` at a time
    fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut encoder = self.encoder.lock();
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let batch_embeddings = encoder.embed(batch, self.max_length, self.dimensions)?;
            all_embeddings.extend(batch_embeddings);
        }

        Ok(all_embeddings)
    }
}

fn load_encoder(model_path: &Path, tokenizer_path: &Path) -> Result<Encoder> {
    let session = Session::builder()
        .map_err(|e| Error::embedding(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::embedding(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| Error::embedding(format!("Failed to set threads: {}", e)))?
        .commit_from_file(model_path)
        .map_err(|e| Error::asset("onnx model", format!("Failed to load model: {}", e)))?;

    let tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| Error::asset("tokenizer", format!("Failed to load tokenizer: {}", e)))?;

    Ok(Encoder { session, tokenizer })
}

impl Encoder {
    fn embed(&mut self, texts: &[String], max_length: usize, dimensions: usize) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array((
            vec![batch_size, max_len],
            input_ids.into_boxed_slice(),
        ))
        .map_err(|e| Error::embedding(format!("Input tensor creation failed: {}", e)))?;

        let attention_mask_tensor = Tensor::from_array((
            vec![batch_size, max_len],
            attention_mask.clone().into_boxed_slice(),
        ))
        .map_err(|e| Error::embedding(format!("Attention mask tensor creation failed: {}", e)))?;

        let token_type_ids_tensor = Tensor::from_array((
            vec![batch_size, max_len],
            token_type_ids.into_boxed_slice(),
        ))
        .map_err(|e| Error::embedding(format!("Token type tensor creation failed: {}", e)))?;

        let inputs = vec![
            ("input_ids", input_ids_tensor.into_dyn()),
            ("attention_mask", attention_mask_tensor.into_dyn()),
            ("token_type_ids", token_type_ids_tensor.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::embedding(format!("Inference failed: {}", e)))?;

        // last_hidden_state, or the first output for exports that rename it
        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::embedding("No output tensor"))?;

        let (tensor_shape, tensor_data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::embedding(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = tensor_shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims.get(2).copied().unwrap_or(dimensions);
        if hidden_size != dimensions {
            return Err(Error::embedding(format!(
                "Model produces {} dimensions, configured for {}",
                hidden_size, dimensions
            )));
        }

        Ok(mean_pool(&tensor_data, &attention_mask, batch_size, max_len, hidden_size))
    }
}

/// Mask-weighted mean over tokens, then L2 normalize
fn mean_pool(
    hidden: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    seq_len: usize,
    hidden_size: usize,
) -> Vec<Vec<f32>> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_size];
        let mut count = 0.0f32;

        for j in 0..seq_len {
            let mask_val = attention_mask[i * seq_len + j] as f32;
            if mask_val > 0.0 {
                let offset = (i * seq_len + j) * hidden_size;
                if let Some(row) = hidden.get(offset..offset + hidden_size) {
                    for (acc, v) in sum.iter_mut().zip(row) {
                        *acc += v * mask_val;
                    }
                }
                count += mask_val;
            }
        }

        if count > 0.0 {
            for val in &mut sum {
                *val /= count;
            }
        }

        let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut sum {
                *val /= norm;
            }
        }

        embeddings.push(sum);
    }

    embeddings
}

#[async_trait]
impl EmbeddingBackend for OnnxEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || embedder.embed_blocking(&texts))
            .await
            .map_err(|e| Error::embedding(format!("Embedding task panicked: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_respects_mask() {
        // batch 1, seq 3, hidden 2; last token is padding
        let hidden = [3.0, 0.0, 1.0, 0.0, 100.0, 100.0];
        let mask = [1, 1, 0];
        let out = mean_pool(&hidden, &mask, 1, 3, 2);
        assert_eq!(out, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn test_mean_pool_normalizes() {
        let hidden = [3.0, 4.0, 0.0, 0.0];
        let mask = [1, 1];
        let out = mean_pool(&hidden, &mask, 2, 1, 2);
        assert!((out[0][0] - 0.6).abs() < 1e-6);
        assert!((out[0][1] - 0.8).abs() < 1e-6);
        // All-zero hidden state stays zero
        assert_eq!(out[1], vec![0.0, 0.0]);
    }

    #[test]
    fn test_model_assets_from_config() {
        let config = EmbeddingConfig::default();
        let (model, tokenizer) = model_assets(&config);
        assert_eq!(model.file_name, "all-MiniLM-L6-v2.onnx");
        assert_eq!(model.kind, AssetKind::Binary);
        assert!(tokenizer.url.ends_with("tokenizer.json"));
        assert_eq!(tokenizer.kind, AssetKind::Json);
    }
}
