//! Inference decision logic shared by both model families.
//!
//! [`UrlDetector::classify`] runs, in order:
//!
//! 1. Reject empty / whitespace-only input.
//! 2. Normalise the URL (strip scheme, optional `www.`, trailing `/`).
//! 3. Exact-match the normalised domain against the whitelist. A match
//!    returns [`Verdict::Benign`] without invoking the model.
//! 4. Score the URL with the configured [`UrlScorer`].
//! 5. Apply the domain-length dependent [`ThresholdPolicy`].

use std::collections::HashSet;

use phishnet_core::{Classification, PhishnetError, Reason, Result, Verdict};
use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdPolicy;

/// Domains trusted without scoring.
pub const DEFAULT_WHITELIST: [&str; 12] = [
    "google.com",
    "youtube.com",
    "github.com",
    "wikipedia.org",
    "spotify.com",
    "apple.com",
    "linkedin.com",
    "instagram.com",
    "facebook.com",
    "x.com",
    "edu.tr",
    "gov.tr",
];

// ---------------------------------------------------------------------------
// Scorer seam
// ---------------------------------------------------------------------------

/// A trained model that maps a raw URL to a phishing probability.
///
/// Implementations must be read-only after construction so a single
/// detector can be shared across threads.
pub trait UrlScorer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Phishing probability in `[0, 1]` for a raw URL.
    fn score(&self, url: &str) -> Result<f64>;
}

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// A URL reduced to the form used for whitelist lookup and thresholding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// URL without scheme, optional `www.`, and trailing slashes.
    pub normalized: String,
    /// Lower-cased portion of `normalized` before the first `/`.
    pub domain: String,
}

impl NormalizedUrl {
    /// Character length of the domain.
    pub fn domain_length(&self) -> usize {
        self.domain.chars().count()
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// Normalise a raw URL.
///
/// # Examples
///
/// ```
/// use phishnet_detect::decision::normalize_url;
///
/// let n = normalize_url("https://www.GitHub.com/foo/", true);
/// assert_eq!(n.normalized, "GitHub.com/foo");
/// assert_eq!(n.domain, "github.com");
/// ```
pub fn normalize_url(url: &str, strip_www: bool) -> NormalizedUrl {
    let mut rest = url.trim();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = strip_prefix_ignore_case(rest, scheme) {
            rest = stripped;
            break;
        }
    }
    if strip_www {
        if let Some(stripped) = strip_prefix_ignore_case(rest, "www.") {
            rest = stripped;
        }
    }
    let normalized = rest.trim_end_matches('/');
    let domain = normalized
        .split('/')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    NormalizedUrl {
        normalized: normalized.to_string(),
        domain,
    }
}

/// Lower-cased suffix after the last dot of the domain, if any.
pub fn top_level_domain(url: &str) -> Option<String> {
    let normalized = normalize_url(url, true);
    let host = normalized.domain.split([':', '?', '#']).next()?;
    let (_, tld) = host.rsplit_once('.')?;
    if tld.is_empty() {
        None
    } else {
        Some(tld.to_string())
    }
}

// ---------------------------------------------------------------------------
// Whitelist
// ---------------------------------------------------------------------------

/// Exact-match set of trusted domains (compared lower-cased).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    domains: HashSet<String>,
}

impl Whitelist {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(&domain.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Decision-layer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Domains returned as benign without scoring.
    pub whitelist: Vec<String>,
    /// Strip a leading `www.` during normalisation.
    pub strip_www: bool,
    pub thresholds: ThresholdPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            whitelist: DEFAULT_WHITELIST.iter().map(|d| d.to_string()).collect(),
            strip_www: true,
            thresholds: ThresholdPolicy::default(),
        }
    }
}

/// Whitelist + model + threshold pipeline.
pub struct UrlDetector {
    scorer: Box<dyn UrlScorer>,
    whitelist: Whitelist,
    thresholds: ThresholdPolicy,
    strip_www: bool,
}

impl UrlDetector {
    /// Build a detector around a trained scorer.
    ///
    /// # Errors
    ///
    /// Returns [`PhishnetError::Config`] if the thresholds are out of range.
    pub fn new(scorer: Box<dyn UrlScorer>, config: &DetectorConfig) -> Result<Self> {
        config.thresholds.validate()?;
        Ok(Self {
            scorer,
            whitelist: Whitelist::new(&config.whitelist),
            thresholds: config.thresholds.clone(),
            strip_www: config.strip_www,
        })
    }

    /// Classify a single URL.
    ///
    /// # Errors
    ///
    /// Returns [`PhishnetError::MalformedInput`] for empty or whitespace-only
    /// input, and propagates scorer failures.
    pub fn classify(&self, url: &str) -> Result<Classification> {
        if url.trim().is_empty() {
            return Err(PhishnetError::MalformedInput(
                "URL is empty or whitespace".to_string(),
            ));
        }

        let normalized = normalize_url(url, self.strip_www);
        if self.whitelist.contains(&normalized.domain) {
            tracing::debug!(domain = %normalized.domain, "Whitelisted domain, model skipped");
            return Ok(Classification {
                verdict: Verdict::Benign,
                probability: 0.0,
                reason: Reason::Whitelisted {
                    domain: normalized.domain,
                },
            });
        }

        let score = self.scorer.score(url)?;
        if !score.is_finite() {
            return Err(PhishnetError::Model(format!(
                "{} scorer returned a non-finite score ({score})",
                self.scorer.name()
            )));
        }
        let probability = score.clamp(0.0, 1.0);
        let domain_length = normalized.domain_length();
        let threshold = self.thresholds.threshold_for(domain_length);
        let verdict = self.thresholds.decide(probability, domain_length);
        tracing::debug!(
            scorer = self.scorer.name(),
            probability,
            threshold,
            %verdict,
            "URL scored"
        );

        Ok(Classification {
            verdict,
            probability,
            reason: Reason::ModelScore {
                threshold,
                domain_length,
            },
        })
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
