//! Phishing URL detection engines
//!
//! Two model families share one decision layer:
//!
//! - **Classical**: [`feature_extraction`] turns a URL into ten lexical
//!   features scored by a [`forest::RandomForest`].
//! - **Sequence**: [`sequence_encoder`] turns a URL into a fixed-length id
//!   sequence scored by a [`char_cnn::CharCnnClassifier`].
//!
//! Both are wrapped as [`decision::UrlScorer`]s and driven by
//! [`decision::UrlDetector`], which applies the whitelist and the
//! domain-length dependent [`thresholds::ThresholdPolicy`].
//!
//! # Feature Gate
//!
//! `cuda` and `metal` enable the matching candle backends for the sequence
//! model. Without them everything runs on the CPU.

pub mod artifacts;
pub mod char_cnn;
pub mod decision;
pub mod device;
pub mod feature_extraction;
pub mod forest;
pub mod scorers;
pub mod sequence_encoder;
pub mod thresholds;

pub use artifacts::{ClassicalArtifact, SequenceArtifactManifest};
pub use char_cnn::{CharCnnClassifier, SequenceModelConfig};
pub use decision::{normalize_url, top_level_domain, DetectorConfig, UrlDetector, UrlScorer};
pub use device::{select_device, DevicePreference};
pub use feature_extraction::{FeatureConfig, FeatureExtractor, FeatureVector, FEATURE_NAMES};
pub use forest::{ForestConfig, RandomForest};
pub use scorers::{ClassicalScorer, SequenceScorer};
pub use sequence_encoder::{EncodedSequence, Vocabulary};
pub use thresholds::ThresholdPolicy;
