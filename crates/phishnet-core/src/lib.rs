//! Core types for phishnet
//!
//! This crate holds the data model shared by the detection engines and the
//! training pipeline: labels and labeled URLs, classification outcomes, and
//! the error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Ground-truth class of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Legitimate URL.
    Benign,
    /// Phishing / malicious URL.
    Phishing,
}

/// Raw label spellings accepted at ingestion and the class each maps to.
///
/// Matching is exact and case-sensitive. Anything not listed here is dropped.
pub const LABEL_MAP: [(&str, Label); 4] = [
    ("good", Label::Benign),
    ("benign", Label::Benign),
    ("bad", Label::Phishing),
    ("phishing", Label::Phishing),
];

impl Label {
    /// Normalise a raw label string through [`LABEL_MAP`].
    ///
    /// Returns `None` for unrecognised spellings.
    ///
    /// # Examples
    ///
    /// ```
    /// use phishnet_core::Label;
    ///
    /// assert_eq!(Label::from_raw("bad"), Some(Label::Phishing));
    /// assert_eq!(Label::from_raw("Bad"), None);
    /// ```
    pub fn from_raw(raw: &str) -> Option<Self> {
        LABEL_MAP
            .iter()
            .find(|(spelling, _)| *spelling == raw)
            .map(|(_, label)| *label)
    }

    /// Binary training target: 1 for phishing, 0 for benign.
    pub fn target(self) -> u8 {
        match self {
            Self::Benign => 0,
            Self::Phishing => 1,
        }
    }

    /// Inverse of [`Label::target`]. Any non-zero value is phishing.
    pub fn from_target(target: u8) -> Self {
        if target == 0 {
            Self::Benign
        } else {
            Self::Phishing
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Benign => write!(f, "benign"),
            Self::Phishing => write!(f, "phishing"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A training record as it appears in the source data, before label
/// normalisation.
///
/// Accepts both lower-case (`url`, `label`) and capitalised (`URL`, `Label`)
/// column names. Missing or null fields deserialize as `None` and the
/// record is dropped at normalisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// The URL exactly as stored.
    #[serde(default, alias = "URL", alias = "Url")]
    pub url: Option<String>,
    /// Textual label (`good`, `bad`, `benign`, `phishing`, ...).
    #[serde(default, alias = "Label")]
    pub label: Option<String>,
}

/// A URL with a normalised label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledUrl {
    /// The raw URL string.
    pub url: String,
    /// Normalised class.
    pub label: Label,
}

impl LabeledUrl {
    /// Create a labeled URL.
    pub fn new(url: impl Into<String>, label: Label) -> Self {
        Self {
            url: url.into(),
            label,
        }
    }

    /// Normalise a raw record. Returns `None` when either field is missing
    /// or the label is not in [`LABEL_MAP`].
    pub fn from_raw(record: RawRecord) -> Option<Self> {
        let label = Label::from_raw(record.label.as_deref()?)?;
        Some(Self {
            url: record.url?,
            label,
        })
    }
}

// ---------------------------------------------------------------------------
// Classification outcome
// ---------------------------------------------------------------------------

/// Final decision for a scored URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The URL is considered safe.
    Benign,
    /// The URL is considered phishing.
    Phishing,
}

impl From<Verdict> for Label {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Benign => Label::Benign,
            Verdict::Phishing => Label::Phishing,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Benign => write!(f, "BENIGN"),
            Self::Phishing => write!(f, "PHISHING"),
        }
    }
}

/// Why a verdict was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    /// The domain matched the whitelist; no model was consulted.
    Whitelisted {
        /// The normalised domain that matched.
        domain: String,
    },
    /// The model score was compared against a domain-length dependent threshold.
    ModelScore {
        /// Threshold that was applied.
        threshold: f64,
        /// Length of the normalised domain that selected the threshold.
        domain_length: usize,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whitelisted { .. } => write!(f, "whitelisted"),
            Self::ModelScore {
                threshold,
                domain_length,
            } => write!(
                f,
                "model score against threshold {threshold:.2} (domain length {domain_length})"
            ),
        }
    }
}

/// Result of classifying a single URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Final verdict.
    pub verdict: Verdict,
    /// Phishing probability in `[0, 1]`. `0.0` when whitelisted.
    pub probability: f64,
    /// Explanation of how the verdict was reached.
    pub reason: Reason,
}

impl Classification {
    /// Whether this classification came from the whitelist short-circuit.
    pub fn is_whitelisted(&self) -> bool {
        matches!(self.reason, Reason::Whitelisted { .. })
    }

    /// Probability as a percentage, for display.
    pub fn probability_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by phishnet.
#[derive(Debug, thiserror::Error)]
pub enum PhishnetError {
    /// The training data cannot produce a meaningful model (single class,
    /// empty corpus, ...).
    #[error("Data quality error: {0}")]
    DataQuality(String),

    /// A trained artifact was not found where it was expected.
    #[error("Artifact not found at {}: {hint}", .path.display())]
    ArtifactMissing {
        /// Location that was probed.
        path: PathBuf,
        /// Actionable guidance for the caller.
        hint: String,
    },

    /// Artifacts were found but do not belong together.
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    /// Input rejected before scoring (e.g. empty URL).
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Model construction or inference failure.
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization / deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, PhishnetError>`.
pub type Result<T> = std::result::Result<T, PhishnetError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_map_accepts_all_spellings() {
        assert_eq!(Label::from_raw("good"), Some(Label::Benign));
        assert_eq!(Label::from_raw("benign"), Some(Label::Benign));
        assert_eq!(Label::from_raw("bad"), Some(Label::Phishing));
        assert_eq!(Label::from_raw("phishing"), Some(Label::Phishing));
    }

    #[test]
    fn test_label_map_is_case_sensitive() {
        assert_eq!(Label::from_raw("GOOD"), None);
        assert_eq!(Label::from_raw("Phishing"), None);
        assert_eq!(Label::from_raw(""), None);
        assert_eq!(Label::from_raw("malicious"), None);
    }

    #[test]
    fn test_target_round_trip() {
        assert_eq!(Label::Benign.target(), 0);
        assert_eq!(Label::Phishing.target(), 1);
        assert_eq!(Label::from_target(0), Label::Benign);
        assert_eq!(Label::from_target(1), Label::Phishing);
    }

    #[test]
    fn test_labeled_url_drops_unknown_labels() {
        let kept = LabeledUrl::from_raw(RawRecord {
            url: Some("example.com".to_string()),
            label: Some("good".to_string()),
        });
        assert_eq!(kept, Some(LabeledUrl::new("example.com", Label::Benign)));

        let dropped = LabeledUrl::from_raw(RawRecord {
            url: Some("example.com".to_string()),
            label: Some("unknown".to_string()),
        });
        assert!(dropped.is_none());
    }

    #[test]
    fn test_labeled_url_drops_missing_fields() {
        let no_url = RawRecord {
            url: None,
            label: Some("bad".to_string()),
        };
        assert!(LabeledUrl::from_raw(no_url).is_none());

        let null_label: RawRecord =
            serde_json::from_str(r#"{"url": "example.com", "label": null}"#).unwrap();
        assert!(LabeledUrl::from_raw(null_label).is_none());
    }

    #[test]
    fn test_raw_record_accepts_capitalised_columns() {
        let record: RawRecord =
            serde_json::from_str(r#"{"URL": "paypal-login.xyz", "Label": "bad"}"#).unwrap();
        assert_eq!(record.url.as_deref(), Some("paypal-login.xyz"));
        assert_eq!(record.label.as_deref(), Some("bad"));
    }

    #[test]
    fn test_reason_display() {
        let whitelisted = Reason::Whitelisted {
            domain: "github.com".to_string(),
        };
        assert_eq!(whitelisted.to_string(), "whitelisted");

        let scored = Reason::ModelScore {
            threshold: 0.85,
            domain_length: 10,
        };
        assert!(scored.to_string().contains("0.85"));
    }

    #[test]
    fn test_artifact_missing_message_includes_hint() {
        let err = PhishnetError::ArtifactMissing {
            path: PathBuf::from("/models/forest.json"),
            hint: "train the classical model first".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/models/forest.json"));
        assert!(msg.contains("train the classical model first"));
    }
}
