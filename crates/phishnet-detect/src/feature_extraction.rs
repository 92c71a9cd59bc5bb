//! Lexical feature extraction for the classical classifier.
//!
//! Turns a raw URL string into a fixed-size numeric [`FeatureVector`]. Every
//! feature is total over arbitrary input: the empty string yields zeros and
//! no feature can panic or divide by zero.
//!
//! # Feature Vector Layout (10 dimensions)
//!
//! | Index | Feature                  | Type    |
//! |-------|--------------------------|---------|
//! | 0     | URL length (chars)       | Numeric |
//! | 1     | `.` count                | Numeric |
//! | 2     | `-` count                | Numeric |
//! | 3     | `/` count                | Numeric |
//! | 4     | `https` substring present| Binary  |
//! | 5     | Digit ratio              | Numeric |
//! | 6     | Shannon entropy (bits)   | Numeric |
//! | 7     | Dotted-quad IP present   | Binary  |
//! | 8     | Suspicious word count    | Numeric |
//! | 9     | Shortening service       | Binary  |
//!
//! `is_https` is a loose substring test and matches `https` anywhere in the
//! URL, not only in the scheme. The suspicious word list contains short
//! generic tokens (`wp`, `en`, `us`, `co`) that fire on many legitimate URLs;
//! they are kept as-is because trained models depend on the exact feature.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use phishnet_core::Label;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Total number of features in [`FeatureVector`].
pub const FEATURE_DIM: usize = 10;

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "length",
    "dot_count",
    "hyphen_count",
    "slash_count",
    "is_https",
    "digit_ratio",
    "entropy",
    "has_ip",
    "suspicious_word_count",
    "has_shortening_service",
];

/// Loose dotted-quad pattern. Octet values are not range-checked.
static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("ipv4 regex"));

static DEFAULT_EXTRACTOR: LazyLock<FeatureExtractor> = LazyLock::new(FeatureExtractor::default);

/// Default suspicious terms, matched case-insensitively as substrings.
pub const DEFAULT_SUSPICIOUS_WORDS: [&str; 18] = [
    "login", "wp", "paypal", "battle", "en", "us", "images", "cmd", "content", "co", "secure",
    "account", "verify", "banking", "signin", "admin", "confirm", "password",
];

/// Default URL shortening services, matched as substrings of the lower-cased URL.
pub const DEFAULT_SHORTENING_SERVICES: [&str; 64] = [
    "bit.ly",
    "goo.gl",
    "shorte.st",
    "go2l.ink",
    "x.co",
    "ow.ly",
    "t.co",
    "tinyurl",
    "tr.im",
    "is.gd",
    "cli.gs",
    "yfrog",
    "migre.me",
    "ff.im",
    "tiny.cc",
    "url4.eu",
    "twit.ac",
    "su.pr",
    "twurl.nl",
    "snipurl",
    "short.to",
    "budurl",
    "ping.fm",
    "post.ly",
    "just.as",
    "bkite.com",
    "snipr.com",
    "fic.kr",
    "loopt.us",
    "doiop.com",
    "short.ie",
    "kl.am",
    "wp.me",
    "rubyurl.com",
    "om.ly",
    "to.ly",
    "bit.do",
    "lnkd.in",
    "db.tt",
    "qr.ae",
    "adf.ly",
    "bitly.com",
    "cur.lv",
    "tinyurl.com",
    "ity.im",
    "q.gs",
    "po.st",
    "bc.vc",
    "twitthis.com",
    "u.to",
    "j.mp",
    "buzurl.com",
    "cutt.us",
    "u.bb",
    "yourls.org",
    "prettylinkpro.com",
    "scrnch.me",
    "filoops.info",
    "vzturl.com",
    "qr.net",
    "1url.com",
    "tweez.me",
    "v.gd",
    "link.zip.net",
];

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Word lists used by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Terms counted by `suspicious_word_count`.
    pub suspicious_words: Vec<String>,
    /// Shortener domains checked by `has_shortening_service`.
    pub shortening_services: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            suspicious_words: DEFAULT_SUSPICIOUS_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
            shortening_services: DEFAULT_SHORTENING_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Feature vector
// ---------------------------------------------------------------------------

/// Named lexical features of a single URL.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub length: f64,
    pub dot_count: f64,
    pub hyphen_count: f64,
    pub slash_count: f64,
    pub is_https: f64,
    pub digit_ratio: f64,
    pub entropy: f64,
    pub has_ip: f64,
    pub suspicious_word_count: f64,
    pub has_shortening_service: f64,
}

impl FeatureVector {
    /// Flatten into a `Vec<f64>` ordered as [`FEATURE_NAMES`].
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.length,
            self.dot_count,
            self.hyphen_count,
            self.slash_count,
            self.is_https,
            self.digit_ratio,
            self.entropy,
            self.has_ip,
            self.suspicious_word_count,
            self.has_shortening_service,
        ]
    }

    /// Pairs of `(name, value)` in vector order.
    pub fn named(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.to_vec()).collect()
    }
}

/// A feature vector together with its binary target, as used for training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub features: FeatureVector,
    /// 1 = phishing, 0 = benign.
    pub target: u8,
}

impl FeatureRow {
    pub fn label(&self) -> Label {
        Label::from_target(self.target)
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Computes [`FeatureVector`]s with a configurable set of word lists.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    suspicious_words: Vec<String>,
    shortening_services: Vec<String>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&FeatureConfig::default())
    }
}

impl FeatureExtractor {
    /// Build an extractor. Word lists are lower-cased once here.
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            suspicious_words: config
                .suspicious_words
                .iter()
                .map(|w| w.to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            shortening_services: config
                .shortening_services
                .iter()
                .map(|s| s.to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Extract the full feature vector for `url`.
    pub fn extract(&self, url: &str) -> FeatureVector {
        FeatureVector {
            length: url.chars().count() as f64,
            dot_count: count_char(url, '.') as f64,
            hyphen_count: count_char(url, '-') as f64,
            slash_count: count_char(url, '/') as f64,
            is_https: binary(url.contains("https")),
            digit_ratio: digit_ratio(url),
            entropy: shannon_entropy(url),
            has_ip: binary(has_ip_address(url)),
            suspicious_word_count: self.suspicious_word_count(url) as f64,
            has_shortening_service: binary(self.has_shortening_service(url)),
        }
    }

    /// Extract features for a labeled URL.
    pub fn extract_row(&self, url: &str, label: Label) -> FeatureRow {
        FeatureRow {
            features: self.extract(url),
            target: label.target(),
        }
    }

    /// Number of configured suspicious terms present in the URL.
    ///
    /// Each term counts at most once, no matter how often it repeats.
    pub fn suspicious_word_count(&self, url: &str) -> usize {
        let lower = url.to_lowercase();
        self.suspicious_words
            .iter()
            .filter(|word| lower.contains(word.as_str()))
            .count()
    }

    /// Whether the URL references a known shortening service.
    pub fn has_shortening_service(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.shortening_services
            .iter()
            .any(|service| lower.contains(service.as_str()))
    }
}

/// Extract features with the default word lists.
pub fn extract(url: &str) -> FeatureVector {
    DEFAULT_EXTRACTOR.extract(url)
}

fn binary(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Count occurrences of a literal character in the raw string.
pub fn count_char(url: &str, needle: char) -> usize {
    url.chars().filter(|&c| c == needle).count()
}

/// Fraction of characters that are ASCII digits. `0.0` for empty input.
pub fn digit_ratio(url: &str) -> f64 {
    let total = url.chars().count();
    if total == 0 {
        return 0.0;
    }
    let digits = url.chars().filter(|c| c.is_ascii_digit()).count();
    digits as f64 / total as f64
}

/// Shannon entropy in bits of the character distribution of the
/// whitespace-trimmed URL. `0.0` for empty (or all-whitespace) input.
pub fn shannon_entropy(url: &str) -> f64 {
    let trimmed = url.trim();
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in trimmed.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let entropy = counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>();
    // A single repeated character sums to -0.0.
    entropy.max(0.0)
}

/// Whether a dotted-quad (`d.d.d.d`, 1-3 digits each) occurs anywhere.
pub fn has_ip_address(url: &str) -> bool {
    IPV4_RE.is_match(url)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
