//! Persistence of trained models.
//!
//! # Layout
//!
//! Classical model: a single JSON file holding the forest together with the
//! word lists its features were extracted with.
//!
//! Sequence model: a directory with
//!
//! | File                  | Content                                        |
//! |-----------------------|------------------------------------------------|
//! | `weights.safetensors` | CNN parameters                                 |
//! | `vocabulary.json`     | Character vocabulary and its fingerprint       |
//! | `manifest.json`       | Architecture, vocabulary fingerprint, weights hash |
//!
//! Loading verifies that the three files belong together and fails with
//! [`PhishnetError::ArtifactMismatch`] otherwise.

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::Device;
use candle_nn::VarMap;
use phishnet_core::{PhishnetError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::char_cnn::{CharCnnClassifier, SequenceModelConfig};
use crate::feature_extraction::{FeatureConfig, FeatureExtractor, FEATURE_DIM, FEATURE_NAMES};
use crate::forest::RandomForest;
use crate::scorers::{ClassicalScorer, SequenceScorer};
use crate::sequence_encoder::Vocabulary;

/// Artifact format version written by this crate.
pub const FORMAT_VERSION: u32 = 1;

pub const WEIGHTS_FILE: &str = "weights.safetensors";
pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const CLASSICAL_HINT: &str = "train the classical model first (`phishnet train-classical`)";
const SEQUENCE_HINT: &str = "train the sequence model first (`phishnet train-sequence`)";

fn ensure_exists(path: &Path, hint: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PhishnetError::ArtifactMissing {
            path: path.to_path_buf(),
            hint: hint.to_string(),
        })
    }
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Classical
// ---------------------------------------------------------------------------

/// On-disk form of a trained classical model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassicalArtifact {
    pub format_version: u32,
    /// Feature order the forest was trained on.
    pub feature_names: Vec<String>,
    /// Word lists used during extraction.
    pub features: FeatureConfig,
    pub forest: RandomForest,
}

impl ClassicalArtifact {
    pub fn new(forest: RandomForest, features: FeatureConfig) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|n| n.to_string()).collect(),
            features,
            forest,
        }
    }

    fn verify(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(PhishnetError::ArtifactMismatch(format!(
                "classical artifact format {} is not supported (expected {FORMAT_VERSION})",
                self.format_version
            )));
        }
        if self.feature_names != FEATURE_NAMES || self.forest.n_features() != FEATURE_DIM {
            return Err(PhishnetError::ArtifactMismatch(format!(
                "forest was trained on features {:?}, this build extracts {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        self.forest.validate()
    }

    /// Build a scorer with the stored word lists.
    pub fn into_scorer(self) -> ClassicalScorer {
        let extractor = FeatureExtractor::new(&self.features);
        ClassicalScorer::new(self.forest, extractor)
    }
}

/// Write a classical artifact as pretty JSON, creating parent directories.
pub fn save_classical(path: &Path, artifact: &ClassicalArtifact) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(artifact)?;
    fs::write(path, json)?;
    tracing::info!(
        path = %path.display(),
        trees = artifact.forest.n_trees(),
        "Saved classical model"
    );
    Ok(())
}

/// Read and verify a classical artifact.
///
/// # Errors
///
/// [`PhishnetError::ArtifactMissing`] if the file does not exist,
/// [`PhishnetError::ArtifactMismatch`] if it was written for a different
/// feature layout.
pub fn load_classical(path: &Path) -> Result<ClassicalArtifact> {
    ensure_exists(path, CLASSICAL_HINT)?;
    let content = fs::read_to_string(path)?;
    let artifact: ClassicalArtifact = serde_json::from_str(&content)?;
    artifact.verify()?;
    tracing::debug!(path = %path.display(), "Loaded classical model");
    Ok(artifact)
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

/// Metadata binding sequence weights to their vocabulary and architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceArtifactManifest {
    pub format_version: u32,
    pub vocabulary_fingerprint: String,
    pub vocabulary_size: usize,
    /// Hex SHA-256 of `weights.safetensors`.
    pub weights_sha256: String,
    pub model: SequenceModelConfig,
}

/// Paths of the files in a sequence artifact directory.
#[derive(Debug, Clone)]
pub struct SequenceArtifactPaths {
    pub weights: PathBuf,
    pub vocabulary: PathBuf,
    pub manifest: PathBuf,
}

impl SequenceArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            weights: dir.join(WEIGHTS_FILE),
            vocabulary: dir.join(VOCABULARY_FILE),
            manifest: dir.join(MANIFEST_FILE),
        }
    }
}

/// Save weights, vocabulary and manifest into `dir`.
pub fn save_sequence(
    dir: &Path,
    varmap: &VarMap,
    vocabulary: &Vocabulary,
    config: &SequenceModelConfig,
) -> Result<SequenceArtifactManifest> {
    fs::create_dir_all(dir)?;
    let paths = SequenceArtifactPaths::in_dir(dir);

    varmap
        .save(&paths.weights)
        .map_err(|e| PhishnetError::Model(format!("Failed to save sequence weights: {e}")))?;
    fs::write(&paths.vocabulary, serde_json::to_string_pretty(vocabulary)?)?;

    let manifest = SequenceArtifactManifest {
        format_version: FORMAT_VERSION,
        vocabulary_fingerprint: vocabulary.fingerprint(),
        vocabulary_size: vocabulary.len(),
        weights_sha256: sha256_file(&paths.weights)?,
        model: config.clone(),
    };
    fs::write(&paths.manifest, serde_json::to_string_pretty(&manifest)?)?;

    tracing::info!(
        dir = %dir.display(),
        vocabulary = vocabulary.len(),
        "Saved sequence model"
    );
    Ok(manifest)
}

/// Load and cross-check a sequence artifact directory.
///
/// # Errors
///
/// [`PhishnetError::ArtifactMissing`] if any file is absent and
/// [`PhishnetError::ArtifactMismatch`] if the vocabulary, weights, or
/// manifest disagree.
pub fn load_sequence(dir: &Path, device: &Device) -> Result<SequenceScorer> {
    let paths = SequenceArtifactPaths::in_dir(dir);
    for path in [&paths.manifest, &paths.vocabulary, &paths.weights] {
        ensure_exists(path, SEQUENCE_HINT)?;
    }

    let manifest: SequenceArtifactManifest =
        serde_json::from_str(&fs::read_to_string(&paths.manifest)?)?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(PhishnetError::ArtifactMismatch(format!(
            "sequence artifact format {} is not supported (expected {FORMAT_VERSION})",
            manifest.format_version
        )));
    }

    let vocabulary: Vocabulary = serde_json::from_str(&fs::read_to_string(&paths.vocabulary)?)
        .map_err(|e| PhishnetError::ArtifactMismatch(format!("invalid vocabulary: {e}")))?;
    if vocabulary.fingerprint() != manifest.vocabulary_fingerprint
        || vocabulary.len() != manifest.vocabulary_size
    {
        return Err(PhishnetError::ArtifactMismatch(format!(
            "vocabulary fingerprint {} does not match the one the weights were trained with ({})",
            vocabulary.fingerprint(),
            manifest.vocabulary_fingerprint
        )));
    }

    let weights_sha256 = sha256_file(&paths.weights)?;
    if weights_sha256 != manifest.weights_sha256 {
        return Err(PhishnetError::ArtifactMismatch(format!(
            "weights hash {weights_sha256} does not match manifest ({})",
            manifest.weights_sha256
        )));
    }

    let model = CharCnnClassifier::load(
        &paths.weights,
        &manifest.model,
        vocabulary.embedding_size(),
        device,
    )?;
    tracing::debug!(dir = %dir.display(), "Loaded sequence model");
    Ok(SequenceScorer::new(model, vocabulary))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
