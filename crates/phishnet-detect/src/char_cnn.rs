//! Character-level convolutional classifier for raw URLs.
//!
//! # Architecture
//!
//! ```text
//! ids [B, L] → Embedding(E) → [B, L, E] → transpose → Conv1d(F, k) → ReLU
//!   → max over time → [B, F] → Linear(H) → ReLU → Dropout(p) → Linear(1) → sigmoid
//! ```
//!
//! Defaults: `E = 32`, `F = 64`, `k = 5`, `H = 64`, `p = 0.6`, `L = 75`.
//! Dropout is only active when `train = true` is passed to
//! [`CharCnnClassifier::forward_logits`].

use candle_core::{DType, Device, Tensor};
use candle_nn::{Conv1dConfig, Module, VarBuilder, VarMap};
use phishnet_core::{PhishnetError, Result};
use serde::{Deserialize, Serialize};

use crate::sequence_encoder::{EncodedSequence, DEFAULT_MAX_LEN};

/// Rows scored per forward pass in [`CharCnnClassifier::predict_batch`].
const INFERENCE_CHUNK: usize = 256;

/// Architecture hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceModelConfig {
    /// Character embedding width.
    pub embedding_dim: usize,
    /// Number of convolution filters (64-128).
    pub filters: usize,
    /// Convolution kernel width.
    pub kernel_size: usize,
    /// Units in the dense hidden layer.
    pub hidden_units: usize,
    /// Dropout rate after the hidden layer (0.5-0.6).
    pub dropout: f32,
    /// Encoded sequence length.
    pub max_len: usize,
}

impl Default for SequenceModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 32,
            filters: 64,
            kernel_size: 5,
            hidden_units: 64,
            dropout: 0.6,
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

impl SequenceModelConfig {
    /// Check the architecture is within its supported envelope.
    pub fn validate(&self) -> Result<()> {
        if !(64..=128).contains(&self.filters) {
            return Err(PhishnetError::Config(format!(
                "filters must be within 64..=128, got {}",
                self.filters
            )));
        }
        if !(0.5..=0.6).contains(&self.dropout) {
            return Err(PhishnetError::Config(format!(
                "dropout must be within 0.5..=0.6, got {}",
                self.dropout
            )));
        }
        if self.embedding_dim == 0 || self.hidden_units == 0 || self.kernel_size == 0 {
            return Err(PhishnetError::Config(
                "embedding_dim, hidden_units and kernel_size must be positive".to_string(),
            ));
        }
        if self.max_len < self.kernel_size {
            return Err(PhishnetError::Config(format!(
                "max_len ({}) must be at least kernel_size ({})",
                self.max_len, self.kernel_size
            )));
        }
        Ok(())
    }
}

/// Character CNN producing a phishing probability per URL.
pub struct CharCnnClassifier {
    embedding: candle_nn::Embedding,
    conv: candle_nn::Conv1d,
    hidden: candle_nn::Linear,
    dropout: candle_nn::Dropout,
    output: candle_nn::Linear,
    config: SequenceModelConfig,
    device: Device,
}

fn model_err(context: &str) -> impl Fn(candle_core::Error) -> PhishnetError + '_ {
    move |e| PhishnetError::Model(format!("{context}: {e}"))
}

impl CharCnnClassifier {
    fn build(vb: VarBuilder, config: &SequenceModelConfig, vocab_size: usize) -> Result<Self> {
        config.validate()?;
        let device = vb.device().clone();

        let embedding = candle_nn::embedding(vocab_size, config.embedding_dim, vb.pp("embedding"))
            .map_err(model_err("Failed to create embedding"))?;
        let conv = candle_nn::conv1d(
            config.embedding_dim,
            config.filters,
            config.kernel_size,
            Conv1dConfig::default(),
            vb.pp("conv"),
        )
        .map_err(model_err("Failed to create conv1d"))?;
        let hidden = candle_nn::linear(config.filters, config.hidden_units, vb.pp("hidden"))
            .map_err(model_err("Failed to create hidden layer"))?;
        let output = candle_nn::linear(config.hidden_units, 1, vb.pp("output"))
            .map_err(model_err("Failed to create output layer"))?;

        Ok(Self {
            embedding,
            conv,
            hidden,
            dropout: candle_nn::Dropout::new(config.dropout),
            output,
            config: config.clone(),
            device,
        })
    }

    /// Create a classifier whose variables live in `varmap`, for training.
    pub fn new_trainable(
        varmap: &VarMap,
        config: &SequenceModelConfig,
        vocab_size: usize,
        device: &Device,
    ) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::build(vb, config, vocab_size)
    }

    /// Create a classifier with random weights. Suitable for shape checks only.
    pub fn new_random(
        config: &SequenceModelConfig,
        vocab_size: usize,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        Self::new_trainable(&varmap, config, vocab_size, device)
    }

    /// Load trained weights from a safetensors file.
    ///
    /// `vocab_size` must equal the embedding size of the vocabulary the
    /// weights were trained with; a mismatch fails on the embedding shape.
    pub fn load(
        path: &std::path::Path,
        config: &SequenceModelConfig,
        vocab_size: usize,
        device: &Device,
    ) -> Result<Self> {
        // SAFETY: memory-mapping safetensors is the standard candle pattern.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[path.to_path_buf()], DType::F32, device)
                .map_err(model_err("Failed to load sequence model weights"))?
        };
        Self::build(vb, config, vocab_size)
    }

    /// Raw logits of shape `[batch]` for ids of shape `[batch, max_len]` (u32).
    pub fn forward_logits(&self, ids: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let embedded = self.embedding.forward(ids)?;
        // Conv1d expects [batch, channels, time].
        let embedded = embedded.transpose(1, 2)?.contiguous()?;
        let conv = self.conv.forward(&embedded)?.relu()?;
        let pooled = conv.max(2)?;
        let hidden = self.hidden.forward(&pooled)?.relu()?;
        let hidden = self.dropout.forward(&hidden, train)?;
        self.output.forward(&hidden)?.squeeze(1)
    }

    /// Phishing probabilities for a batch of encoded sequences.
    pub fn predict_batch(&self, sequences: &[EncodedSequence]) -> Result<Vec<f64>> {
        let mut probabilities = Vec::with_capacity(sequences.len());
        for chunk in sequences.chunks(INFERENCE_CHUNK) {
            let flat: Vec<u32> = chunk
                .iter()
                .flat_map(|s| s.as_slice().iter().copied())
                .collect();
            let ids = Tensor::from_vec(flat, (chunk.len(), self.config.max_len), &self.device)
                .map_err(model_err("Failed to build id tensor"))?;
            let logits = self
                .forward_logits(&ids, false)
                .map_err(model_err("Sequence model forward failed"))?;
            let probs: Vec<f32> = candle_nn::ops::sigmoid(&logits)
                .and_then(|p| p.to_vec1())
                .map_err(model_err("Failed to extract probabilities"))?;
            probabilities.extend(probs.into_iter().map(f64::from));
        }
        Ok(probabilities)
    }

    /// Phishing probability for a single encoded sequence.
    pub fn predict(&self, sequence: &EncodedSequence) -> Result<f64> {
        if sequence.len() != self.config.max_len {
            return Err(PhishnetError::Model(format!(
                "sequence length {} does not match model max_len {}",
                sequence.len(),
                self.config.max_len
            )));
        }
        self.predict_batch(std::slice::from_ref(sequence))?
            .first()
            .copied()
            .ok_or_else(|| PhishnetError::Model("empty prediction".to_string()))
    }

    pub fn config(&self) -> &SequenceModelConfig {
        &self.config
    }

    /// Returns a reference to the device this classifier runs on.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
