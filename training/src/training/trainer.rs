//! Training loop for the character-level sequence classifier.
//!
//! Fixed-epoch mini-batch training with AdamW on a label-smoothed binary
//! cross-entropy. Held-out rows are scored after every epoch at a 0.5
//! cutoff; the final report applies the domain-length dependent thresholds
//! used at inference time.

use candle_core::{DType, Device, Tensor};
use candle_nn::{Optimizer, VarMap};
use phishnet_core::{Label, LabeledUrl, PhishnetError, Result};
use phishnet_detect::char_cnn::{CharCnnClassifier, SequenceModelConfig};
use phishnet_detect::decision::{normalize_url, DetectorConfig};
use phishnet_detect::sequence_encoder::Vocabulary;
use serde::{Deserialize, Serialize};

use crate::training::data::{id_tensor, select, stratified_split, target_tensor, BatchIterator};
use crate::training::metrics::ClassificationReport;

/// Rows per forward pass during evaluation.
const EVAL_CHUNK: usize = 512;

/// Training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceTrainConfig {
    pub lr: f64,
    /// AdamW weight decay; 0 makes the optimizer plain Adam.
    pub weight_decay: f64,
    pub batch_size: usize,
    /// Number of passes over the training rows (3-10).
    pub epochs: usize,
    /// Targets become `y * (1 - s) + s / 2`.
    pub label_smoothing: f64,
    pub test_ratio: f64,
    pub seed: u64,
    pub model: SequenceModelConfig,
}

impl Default for SequenceTrainConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            weight_decay: 0.0,
            batch_size: 64,
            epochs: 10,
            label_smoothing: 0.05,
            test_ratio: 0.2,
            seed: 42,
            model: SequenceModelConfig::default(),
        }
    }
}

impl SequenceTrainConfig {
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        if !(3..=10).contains(&self.epochs) {
            return Err(PhishnetError::Config(format!(
                "epochs must be within 3..=10, got {}",
                self.epochs
            )));
        }
        if self.batch_size == 0 {
            return Err(PhishnetError::Config("batch_size must be positive".to_string()));
        }
        if self.lr.is_nan() || self.lr <= 0.0 {
            return Err(PhishnetError::Config(format!(
                "lr must be positive, got {}",
                self.lr
            )));
        }
        if !(0.0..1.0).contains(&self.label_smoothing) {
            return Err(PhishnetError::Config(format!(
                "label_smoothing must be within [0, 1), got {}",
                self.label_smoothing
            )));
        }
        Ok(())
    }
}

/// Per-epoch metrics logged during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

/// A trained sequence model, its vocabulary and its held-out evaluation.
pub struct SequenceTrainingOutcome {
    pub model: CharCnnClassifier,
    pub vocabulary: Vocabulary,
    /// Variables backing `model`, for saving.
    pub varmap: VarMap,
    /// Accuracy under the dynamic thresholds.
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub history: Vec<EpochMetrics>,
}

fn model_err(context: &'static str) -> impl Fn(candle_core::Error) -> PhishnetError {
    move |e| PhishnetError::Model(format!("{context}: {e}"))
}

/// Numerically stable binary cross-entropy on logits with label smoothing.
///
/// `mean(max(x, 0) - x * y' + ln(1 + e^-|x|))` with `y' = y (1 - s) + s / 2`.
pub fn smoothed_bce_with_logits(
    logits: &Tensor,
    targets: &Tensor,
    smoothing: f64,
) -> candle_core::Result<Tensor> {
    let targets = targets.affine(1.0 - smoothing, smoothing / 2.0)?;
    let relu = logits.relu()?;
    let log_term = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    relu.sub(&logits.mul(&targets)?)?
        .add(&log_term)?
        .mean_all()
}

/// Run the full pipeline: split, fit the vocabulary, train, evaluate.
///
/// The vocabulary is fit over every URL in `records` so held-out rows use
/// the same id space as training rows.
pub fn train_sequence(
    records: &[LabeledUrl],
    config: &SequenceTrainConfig,
    detector: &DetectorConfig,
    device: &Device,
) -> Result<SequenceTrainingOutcome> {
    config.validate()?;
    if records.is_empty() {
        return Err(PhishnetError::DataQuality(
            "no labeled URLs to train on".to_string(),
        ));
    }
    if let Err(e) = device.set_seed(config.seed) {
        tracing::debug!(error = %e, "Device RNG not seedable, weight init is not reproducible");
    }

    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    let targets: Vec<u8> = records.iter().map(|r| r.label.target()).collect();
    let split = stratified_split(&targets, config.test_ratio, config.seed)?;

    let vocabulary = Vocabulary::fit(&urls);
    let max_len = config.model.max_len;
    tracing::info!(characters = vocabulary.len(), max_len, "Vocabulary fitted");

    let train_urls = select(&urls, &split.train);
    let test_urls = select(&urls, &split.test);
    let train_targets = select(&targets, &split.train);
    let test_targets = select(&targets, &split.test);

    let train_ids = id_tensor(
        vocabulary.encode_batch(&train_urls, max_len),
        train_urls.len(),
        max_len,
        device,
    )?;
    let test_ids = id_tensor(
        vocabulary.encode_batch(&test_urls, max_len),
        test_urls.len(),
        max_len,
        device,
    )?;
    let train_y = target_tensor(&train_targets, device)?;
    let test_y = target_tensor(&test_targets, device)?;

    let varmap = VarMap::new();
    let model = CharCnnClassifier::new_trainable(
        &varmap,
        &config.model,
        vocabulary.embedding_size(),
        device,
    )?;

    let mut optimizer = candle_nn::AdamW::new(
        varmap.all_vars(),
        candle_nn::ParamsAdamW {
            lr: config.lr,
            weight_decay: config.weight_decay,
            ..Default::default()
        },
    )
    .map_err(model_err("Failed to create optimizer"))?;

    let mut batch_iter = BatchIterator::new(train_ids, train_y, config.batch_size)
        .map_err(model_err("Failed to build batches"))?;
    let mut history: Vec<EpochMetrics> = Vec::with_capacity(config.epochs);

    println!(
        "\nTraining: lr={}, wd={}, batch={}, epochs={}, smoothing={}, filters={}, dropout={}",
        config.lr,
        config.weight_decay,
        config.batch_size,
        config.epochs,
        config.label_smoothing,
        config.model.filters,
        config.model.dropout,
    );
    println!("{:-<80}", "");

    for epoch in 0..config.epochs {
        batch_iter.reshuffle(config.seed, epoch);

        let mut epoch_loss = 0.0;
        let mut batch_count = 0usize;
        let mut correct = 0.0;
        let mut seen = 0usize;

        while let Some((batch_ids, batch_targets)) = batch_iter
            .next_batch()
            .map_err(model_err("Batch selection failed"))?
        {
            let logits = model
                .forward_logits(&batch_ids, true)
                .map_err(model_err("Forward pass failed"))?;
            let loss = smoothed_bce_with_logits(&logits, &batch_targets, config.label_smoothing)
                .map_err(model_err("Loss computation failed"))?;
            optimizer
                .backward_step(&loss)
                .map_err(model_err("Backward step failed"))?;

            epoch_loss += f64::from(
                loss.to_scalar::<f32>()
                    .map_err(model_err("Loss scalar failed"))?,
            );
            batch_count += 1;
            correct += count_correct(&logits, &batch_targets)
                .map_err(model_err("Accuracy computation failed"))?;
            seen += batch_targets.dim(0).map_err(model_err("Batch dim failed"))?;
        }

        let train_loss = if batch_count > 0 {
            epoch_loss / batch_count as f64
        } else {
            0.0
        };
        let train_accuracy = if seen > 0 { correct / seen as f64 } else { 0.0 };

        let (val_loss, probabilities) =
            evaluate(&model, &test_ids, &test_y, config.label_smoothing)?;
        let val_accuracy = accuracy_at(&probabilities, &test_targets, 0.5);

        println!(
            "  epoch {:3} | train_loss={:.4} train_acc={:.4} | val_loss={:.4} val_acc={:.4}",
            epoch + 1,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
        );

        history.push(EpochMetrics {
            epoch: epoch + 1,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
        });
    }
    println!("{:-<80}", "");

    let (_, probabilities) = evaluate(&model, &test_ids, &test_y, config.label_smoothing)?;
    let predicted: Vec<u8> = probabilities
        .iter()
        .zip(&test_urls)
        .map(|(&p, url)| {
            let domain_length = normalize_url(url, detector.strip_www).domain_length();
            Label::from(detector.thresholds.decide(p, domain_length)).target()
        })
        .collect();
    let report = ClassificationReport::from_targets(&test_targets, &predicted);
    tracing::info!(
        accuracy = report.accuracy,
        test = test_targets.len(),
        "Sequence model evaluated with dynamic thresholds"
    );

    Ok(SequenceTrainingOutcome {
        model,
        vocabulary,
        varmap,
        accuracy: report.accuracy,
        report,
        history,
    })
}

fn count_correct(logits: &Tensor, targets: &Tensor) -> candle_core::Result<f64> {
    let predicted = logits.ge(0f32)?.to_dtype(DType::F32)?;
    let correct = predicted.eq(targets)?.to_dtype(DType::F32)?.sum_all()?;
    Ok(f64::from(correct.to_scalar::<f32>()?))
}

fn accuracy_at(probabilities: &[f64], targets: &[u8], cutoff: f64) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(targets)
        .filter(|(p, t)| u8::from(**p > cutoff) == **t)
        .count();
    correct as f64 / targets.len() as f64
}

/// Mean smoothed loss and per-row probabilities over `ids`, without dropout.
fn evaluate(
    model: &CharCnnClassifier,
    ids: &Tensor,
    targets: &Tensor,
    smoothing: f64,
) -> Result<(f64, Vec<f64>)> {
    let n = ids.dim(0).map_err(model_err("Eval dim failed"))?;
    if n == 0 {
        return Ok((0.0, Vec::new()));
    }

    let mut loss_sum = 0.0;
    let mut probabilities = Vec::with_capacity(n);
    let mut start = 0;
    while start < n {
        let len = EVAL_CHUNK.min(n - start);
        let chunk_ids = ids.narrow(0, start, len).map_err(model_err("Eval slice failed"))?;
        let chunk_targets = targets
            .narrow(0, start, len)
            .map_err(model_err("Eval slice failed"))?;

        let logits = model
            .forward_logits(&chunk_ids, false)
            .map_err(model_err("Eval forward failed"))?;
        let loss = smoothed_bce_with_logits(&logits, &chunk_targets, smoothing)
            .and_then(|l| l.to_scalar::<f32>())
            .map_err(model_err("Eval loss failed"))?;
        loss_sum += f64::from(loss) * len as f64;

        let probs: Vec<f32> = candle_nn::ops::sigmoid(&logits)
            .and_then(|p| p.to_vec1())
            .map_err(model_err("Eval probabilities failed"))?;
        probabilities.extend(probs.into_iter().map(f64::from));
        start += len;
    }

    Ok((loss_sum / n as f64, probabilities))
}
