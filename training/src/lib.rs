//! phishnet training pipelines
//!
//! Loads labeled URL datasets, trains the classical (random forest) and
//! sequence (character CNN) models with a seeded stratified split, and
//! reports held-out metrics.
//!
//! # Modules
//!
//! - [`datasets`]: JSON / JSON Lines loading, popular-domain augmentation, sampling, summaries
//! - [`training`]: split, batching, metrics and both trainers
//! - [`config`]: YAML configuration shared with the `phishnet` CLI

pub mod config;
pub mod datasets;
pub mod training;

/// Re-export commonly used types for callers driving a full run.
pub mod prelude {
    pub use crate::config::{load_config, PhishnetConfig};
    pub use crate::datasets::{DatasetLoader, DatasetSummary, LoadedDataset};
    pub use crate::training::classical::{train_classical, ClassicalTrainConfig};
    pub use crate::training::metrics::{ClassificationReport, ConfusionMatrix};
    pub use crate::training::trainer::{train_sequence, EpochMetrics, SequenceTrainConfig};
}
