//! Classical pipeline: lexical features + random forest.

use phishnet_core::{LabeledUrl, PhishnetError, Result};
use phishnet_detect::feature_extraction::{FeatureExtractor, FeatureRow, FEATURE_NAMES};
use phishnet_detect::forest::{ForestConfig, RandomForest};
use serde::{Deserialize, Serialize};

use crate::training::data::{select, stratified_split};
use crate::training::metrics::ClassificationReport;

/// Protocol parameters for [`train_classical`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassicalTrainConfig {
    pub forest: ForestConfig,
    /// Fraction of each class held out for evaluation.
    pub test_ratio: f64,
    /// Split seed.
    pub seed: u64,
}

impl Default for ClassicalTrainConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

/// A fitted forest with its held-out evaluation.
#[derive(Debug, Clone)]
pub struct ClassicalTrainingOutcome {
    pub model: RandomForest,
    pub accuracy: f64,
    pub report: ClassificationReport,
    /// `(feature name, importance)` sorted descending.
    pub feature_importances: Vec<(String, f64)>,
    pub train_size: usize,
    pub test_size: usize,
}

/// Extract one feature row per labeled URL.
pub fn build_feature_rows(records: &[LabeledUrl], extractor: &FeatureExtractor) -> Vec<FeatureRow> {
    records
        .iter()
        .map(|r| extractor.extract_row(&r.url, r.label))
        .collect()
}

/// Split, fit and evaluate a random forest.
///
/// # Errors
///
/// [`PhishnetError::DataQuality`] for an empty corpus or a single class.
pub fn train_classical(
    records: &[LabeledUrl],
    extractor: &FeatureExtractor,
    config: &ClassicalTrainConfig,
) -> Result<ClassicalTrainingOutcome> {
    if records.is_empty() {
        return Err(PhishnetError::DataQuality(
            "no labeled URLs to train on".to_string(),
        ));
    }

    let rows = build_feature_rows(records, extractor);
    let x: Vec<Vec<f64>> = rows.iter().map(|r| r.features.to_vec()).collect();
    let y: Vec<u8> = rows.iter().map(|r| r.target).collect();

    let split = stratified_split(&y, config.test_ratio, config.seed)?;
    let x_train = select(&x, &split.train);
    let y_train = select(&y, &split.train);
    let x_test = select(&x, &split.test);
    let y_test = select(&y, &split.test);

    let model = RandomForest::fit(&x_train, &y_train, &config.forest)?;

    let predicted = x_test
        .iter()
        .map(|row| model.predict(row))
        .collect::<Result<Vec<u8>>>()?;
    let report = ClassificationReport::from_targets(&y_test, &predicted);

    let feature_importances = model
        .ranked_importances(&FEATURE_NAMES)
        .into_iter()
        .map(|(name, v)| (name.to_string(), v))
        .collect();

    tracing::info!(
        accuracy = report.accuracy,
        train = split.train.len(),
        test = split.test.len(),
        "Classical model evaluated"
    );

    Ok(ClassicalTrainingOutcome {
        model,
        accuracy: report.accuracy,
        report,
        feature_importances,
        train_size: split.train.len(),
        test_size: split.test.len(),
    })
}
