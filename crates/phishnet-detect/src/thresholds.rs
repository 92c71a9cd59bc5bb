//! Domain-length dependent decision thresholds.
//!
//! The character-level model scores short legitimate domains
//! disproportionately high, so short domains need a higher probability
//! before they are flagged. [`ThresholdPolicy`] selects the cutoff from the
//! length of the normalised domain; a probability strictly above the cutoff
//! is phishing.

use phishnet_core::{PhishnetError, Result, Verdict};
use serde::{Deserialize, Serialize};

/// Length-dependent threshold policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdPolicy {
    /// Domains up to and including this length use `short_domain_threshold`.
    pub short_domain_max_len: usize,
    /// Cutoff for short domains.
    pub short_domain_threshold: f64,
    /// Cutoff for all other domains.
    pub long_domain_threshold: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            short_domain_max_len: 15,
            short_domain_threshold: 0.85,
            long_domain_threshold: 0.65,
        }
    }
}

impl ThresholdPolicy {
    /// A single cutoff regardless of domain length.
    pub fn fixed(threshold: f64) -> Self {
        Self {
            short_domain_max_len: 0,
            short_domain_threshold: threshold,
            long_domain_threshold: threshold,
        }
    }

    /// Both thresholds must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("short_domain_threshold", self.short_domain_threshold),
            ("long_domain_threshold", self.long_domain_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PhishnetError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Threshold applied to a domain of `domain_length` characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use phishnet_detect::thresholds::ThresholdPolicy;
    ///
    /// let policy = ThresholdPolicy::default();
    /// assert_eq!(policy.threshold_for(10), 0.85);
    /// assert_eq!(policy.threshold_for(20), 0.65);
    /// ```
    #[must_use]
    pub fn threshold_for(&self, domain_length: usize) -> f64 {
        if domain_length <= self.short_domain_max_len {
            self.short_domain_threshold
        } else {
            self.long_domain_threshold
        }
    }

    /// Verdict for `probability` on a domain of `domain_length` characters.
    #[must_use]
    pub fn decide(&self, probability: f64, domain_length: usize) -> Verdict {
        if probability > self.threshold_for(domain_length) {
            Verdict::Phishing
        } else {
            Verdict::Benign
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
