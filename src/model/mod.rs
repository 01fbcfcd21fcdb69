//! Embedding model worker.
//!
//! Loads a BERT-style sentence-embedding model from the Hugging Face hub
//! once at startup and serves batched encode calls for the scheduler. The
//! model is a long-lived shared resource; construct it before the server
//! starts and hand it to [`BatchScheduler::new`](crate::BatchScheduler::new).

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::api::sync::Api;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::info;

use crate::batching::BatchWorker;

/// A BERT encoder plus its tokenizer, pinned to one device.
pub struct EmbeddingModel {
    bert: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: Option<usize>,
}

impl EmbeddingModel {
    /// Download (or reuse from the local hub cache) and load the model.
    ///
    /// `dimensions`, when set, truncates every embedding to its leading
    /// dimensions and re-normalizes, for models trained with Matryoshka-style
    /// nested representations.
    pub fn load(model_id: &str, dimensions: Option<usize>, force_cpu: bool) -> Result<Self> {
        let device = pick_device(force_cpu)?;
        info!(model_id, ?device, ?dimensions, "loading embedding model");

        let repo = Api::new()?.model(model_id.to_string());
        let config_path = repo.get("config.json").context("fetching config.json")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("fetching tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("fetching model.safetensors")?;

        let config: Config = serde_json::from_str(&std::fs::read_to_string(config_path)?)
            .context("parsing model config")?;
        if let Some(dim) = dimensions {
            anyhow::ensure!(
                dim <= config.hidden_size,
                "requested {dim} dimensions but the model produces {}",
                config.hidden_size
            );
        }

        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(anyhow::Error::msg)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_position_embeddings,
                ..Default::default()
            }))
            .map_err(anyhow::Error::msg)?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
        let bert = BertModel::load(vb, &config).context("loading model weights")?;
        info!(model_id, "embedding model ready");

        Ok(Self {
            bert,
            tokenizer,
            device,
            dimensions,
        })
    }

    /// Encode a batch of texts into unit-norm embedding vectors, one per
    /// text, in input order.
    pub fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(anyhow::Error::msg)?;

        let mut ids = Vec::with_capacity(encodings.len());
        let mut masks = Vec::with_capacity(encodings.len());
        for encoding in &encodings {
            ids.push(Tensor::new(encoding.get_ids(), &self.device)?);
            masks.push(Tensor::new(encoding.get_attention_mask(), &self.device)?);
        }
        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .bert
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        // Mean pooling over non-padding positions only.
        let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let mut pooled = summed.broadcast_div(&counts)?;

        if let Some(dim) = self.dimensions {
            if dim < pooled.dim(1)? {
                pooled = pooled.narrow(1, 0, dim)?;
            }
        }
        let pooled = normalize_l2(&pooled)?;

        Ok(pooled.to_vec2::<f32>()?)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl BatchWorker for EmbeddingModel {
    type Payload = String;
    type Output = Vec<f32>;

    fn process(&self, payloads: Vec<String>) -> Result<Vec<Vec<f32>>> {
        self.encode(&payloads)
    }
}

/// Prefer CUDA, then Metal, then CPU, unless the CPU was forced.
pub fn pick_device(force_cpu: bool) -> candle_core::Result<Device> {
    if force_cpu {
        Ok(Device::Cpu)
    } else if candle_core::utils::cuda_is_available() {
        Device::new_cuda(0)
    } else if candle_core::utils::metal_is_available() {
        Device::new_metal(0)
    } else {
        Ok(Device::Cpu)
    }
}

fn normalize_l2(v: &Tensor) -> candle_core::Result<Tensor> {
    v.broadcast_div(&v.sqr()?.sum_keepdim(1)?.sqrt()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_cpu_wins_over_accelerators() {
        let device = pick_device(true).unwrap();
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn normalize_l2_produces_unit_rows() {
        let v = Tensor::new(&[[3.0f32, 4.0], [0.0, 2.0]], &Device::Cpu).unwrap();
        let normalized = normalize_l2(&v).unwrap().to_vec2::<f32>().unwrap();
        assert!((normalized[0][0] - 0.6).abs() < 1e-6);
        assert!((normalized[0][1] - 0.8).abs() < 1e-6);
        assert!((normalized[1][1] - 1.0).abs() < 1e-6);
    }
}
