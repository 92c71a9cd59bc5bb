//! Dataset loading and preparation for training.
//!
//! # Formats
//!
//! | Layout | Detection | Example |
//! |--------|-----------|---------|
//! | JSON array | first non-blank character is `[` | `[{"url": "...", "label": "bad"}]` |
//! | JSON Lines | anything else; blank lines skipped | `{"URL": "...", "Label": "good"}` |
//!
//! Labels are normalised once through [`phishnet_core::LABEL_MAP`]; records
//! with a missing field or an unrecognised label are dropped and counted.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use phishnet_core::{Label, LabeledUrl, PhishnetError, RawRecord, Result};
use phishnet_detect::decision::top_level_domain;
use phishnet_detect::feature_extraction::FeatureExtractor;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Widely used short domains added as benign samples by
/// [`augment_with_popular_domains`].
pub const POPULAR_DOMAINS: [&str; 35] = [
    "google.com",
    "youtube.com",
    "facebook.com",
    "baidu.com",
    "wikipedia.org",
    "qq.com",
    "taobao.com",
    "yahoo.com",
    "tmall.com",
    "amazon.com",
    "twitter.com",
    "sohu.com",
    "jd.com",
    "live.com",
    "weibo.com",
    "sina.com.cn",
    "vk.com",
    "360.cn",
    "login.tmall.com",
    "blogspot.com",
    "yandex.ru",
    "instagram.com",
    "linkedin.com",
    "netflix.com",
    "twitch.tv",
    "microsoft.com",
    "ebay.com",
    "bing.com",
    "office.com",
    "apple.com",
    "msn.com",
    "wordpress.com",
    "stackoverflow.com",
    "github.com",
    "ibu.edu.tr",
];

/// Normalised records plus the number of rows that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedDataset {
    pub records: Vec<LabeledUrl>,
    /// Rows with a missing field or an unrecognised label.
    pub dropped: usize,
}

impl LoadedDataset {
    fn from_raw(raw: Vec<RawRecord>) -> Self {
        let total = raw.len();
        let records: Vec<LabeledUrl> = raw.into_iter().filter_map(LabeledUrl::from_raw).collect();
        let dropped = total - records.len();
        if dropped > 0 {
            tracing::warn!(dropped, "Dropped records with missing fields or unknown labels");
        }
        Self { records, dropped }
    }
}

/// Loads labeled URL datasets from JSON / JSON Lines.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a dataset from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<LoadedDataset> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PhishnetError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {}: {e}", path.display()),
            ))
        })?;
        let dataset = Self::load_from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            records = dataset.records.len(),
            dropped = dataset.dropped,
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Load from an in-memory JSON array or JSON Lines document.
    pub fn load_from_str(content: &str) -> Result<LoadedDataset> {
        if content.trim_start().starts_with('[') {
            let raw: Vec<RawRecord> = serde_json::from_str(content)?;
            return Ok(LoadedDataset::from_raw(raw));
        }

        let mut raw = Vec::new();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: RawRecord = serde_json::from_str(line).map_err(|e| {
                PhishnetError::DataQuality(format!("line {}: invalid record: {e}", n + 1))
            })?;
            raw.push(record);
        }
        Ok(LoadedDataset::from_raw(raw))
    }
}

/// Append each of [`POPULAR_DOMAINS`] as a benign record unless a record
/// with exactly that URL already exists. Returns the number added.
pub fn augment_with_popular_domains(records: &mut Vec<LabeledUrl>) -> usize {
    let before = records.len();
    for domain in POPULAR_DOMAINS {
        if !records.iter().any(|r| r.url == domain) {
            records.push(LabeledUrl::new(domain, Label::Benign));
        }
    }
    let added = records.len() - before;
    tracing::info!(added, "Added popular domains as benign samples");
    added
}

/// Seeded random subset of `size` records. Returns everything when `size`
/// is at least the number of records.
pub fn sample(records: &[LabeledUrl], size: usize, seed: u64) -> Vec<LabeledUrl> {
    if size >= records.len() {
        return records.to_vec();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    index::sample(&mut rng, records.len(), size)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Mean of selected features over one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassFeatureMeans {
    pub count: usize,
    pub length: f64,
    pub digit_ratio: f64,
    pub suspicious_word_count: f64,
}

impl ClassFeatureMeans {
    fn compute<'a>(urls: impl Iterator<Item = &'a str>, extractor: &FeatureExtractor) -> Self {
        let mut means = Self::default();
        for url in urls {
            let f = extractor.extract(url);
            means.count += 1;
            means.length += f.length;
            means.digit_ratio += f.digit_ratio;
            means.suspicious_word_count += f.suspicious_word_count;
        }
        if means.count > 0 {
            let n = means.count as f64;
            means.length /= n;
            means.digit_ratio /= n;
            means.suspicious_word_count /= n;
        }
        means
    }
}

/// Label distribution, feature means per class, and most common TLDs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub dropped: usize,
    pub benign: ClassFeatureMeans,
    pub phishing: ClassFeatureMeans,
    /// `(tld, count)` sorted by count descending, then TLD.
    pub top_tlds: Vec<(String, usize)>,
}

impl DatasetSummary {
    pub fn compute(dataset: &LoadedDataset, extractor: &FeatureExtractor, top_n: usize) -> Self {
        let of_class = |label: Label| {
            dataset
                .records
                .iter()
                .filter(move |r| r.label == label)
                .map(|r| r.url.as_str())
        };

        let mut tld_counts: HashMap<String, usize> = HashMap::new();
        for record in &dataset.records {
            if let Some(tld) = top_level_domain(&record.url) {
                *tld_counts.entry(tld).or_default() += 1;
            }
        }
        let mut top_tlds: Vec<(String, usize)> = tld_counts.into_iter().collect();
        top_tlds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_tlds.truncate(top_n);

        Self {
            total: dataset.records.len(),
            dropped: dataset.dropped,
            benign: ClassFeatureMeans::compute(of_class(Label::Benign), extractor),
            phishing: ClassFeatureMeans::compute(of_class(Label::Phishing), extractor),
            top_tlds,
        }
    }
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Records: {} ({} benign, {} phishing, {} dropped)",
            self.total, self.benign.count, self.phishing.count, self.dropped
        )?;
        writeln!(
            f,
            "{:>10} {:>10} {:>12} {:>16}",
            "class", "length", "digit_ratio", "suspicious_words"
        )?;
        for (name, m) in [("benign", &self.benign), ("phishing", &self.phishing)] {
            writeln!(
                f,
                "{:>10} {:>10.2} {:>12.4} {:>16.4}",
                name, m.length, m.digit_ratio, m.suspicious_word_count
            )?;
        }
        let tlds: Vec<String> = self
            .top_tlds
            .iter()
            .map(|(tld, n)| format!(".{tld}={n}"))
            .collect();
        write!(f, "Top TLDs: {}", tlds.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_array() {
        let json = r#"[
            {"url": "example.com", "label": "good"},
            {"URL": "paypal-login.xyz", "Label": "bad"},
            {"url": "odd.example", "label": "suspicious"}
        ]"#;
        let ds = DatasetLoader::load_from_str(json).unwrap();
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.dropped, 1);
        assert_eq!(ds.records[1].label, Label::Phishing);
    }

    #[test]
    fn test_load_json_lines() {
        let jsonl = "{\"url\": \"a.com\", \"label\": \"benign\"}\n\n\
                     {\"url\": \"b.xyz\", \"label\": \"phishing\"}\n\
                     {\"url\": null, \"label\": \"bad\"}\n";
        let ds = DatasetLoader::load_from_str(jsonl).unwrap();
        assert_eq!(ds.records.len(), 2);
        assert_eq!(ds.dropped, 1);
    }

    #[test]
    fn test_load_json_lines_reports_line() {
        let err = DatasetLoader::load_from_str("{\"url\": \"a\", \"label\": \"good\"}\nnot json")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_from_file_missing() {
        let err = DatasetLoader::load_from_file(Path::new("/nonexistent/urls.json")).unwrap_err();
        assert!(matches!(err, PhishnetError::Io(_)));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(br#"[{"url": "example.com", "label": "good"}]"#)
            .unwrap();
        let ds = DatasetLoader::load_from_file(f.path()).unwrap();
        assert_eq!(ds.records, vec![LabeledUrl::new("example.com", Label::Benign)]);
    }

    #[test]
    fn test_augment_skips_existing() {
        let mut records = vec![
            LabeledUrl::new("google.com", Label::Benign),
            LabeledUrl::new("evil.xyz", Label::Phishing),
        ];
        let added = augment_with_popular_domains(&mut records);
        assert_eq!(added, POPULAR_DOMAINS.len() - 1);
        assert_eq!(records.len(), 2 + added);
        assert_eq!(records.iter().filter(|r| r.url == "google.com").count(), 1);
        assert!(records[2..].iter().all(|r| r.label == Label::Benign));

        assert_eq!(augment_with_popular_domains(&mut records), 0);
    }

    #[test]
    fn test_sample_is_seeded() {
        let records: Vec<LabeledUrl> = (0..100)
            .map(|i| LabeledUrl::new(format!("u{i}.com"), Label::Benign))
            .collect();
        let a = sample(&records, 10, 42);
        let b = sample(&records, 10, 42);
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        assert_eq!(sample(&records, 500, 42).len(), 100);
    }

    #[test]
    fn test_summary() {
        let ds = LoadedDataset {
            records: vec![
                LabeledUrl::new("https://example.com", Label::Benign),
                LabeledUrl::new("https://rust-lang.org", Label::Benign),
                LabeledUrl::new("http://secure-login.com/123", Label::Phishing),
            ],
            dropped: 4,
        };
        let s = DatasetSummary::compute(&ds, &FeatureExtractor::default(), 5);
        assert_eq!(s.total, 3);
        assert_eq!(s.dropped, 4);
        assert_eq!(s.benign.count, 2);
        assert_eq!(s.phishing.count, 1);
        assert!((s.benign.length - 20.0).abs() < 1e-9);
        // "secure", "login" and "co" (from ".com").
        assert!((s.phishing.suspicious_word_count - 3.0).abs() < 1e-9);
        assert_eq!(s.top_tlds[0], ("com".to_string(), 2));
        assert_eq!(s.top_tlds[1], ("org".to_string(), 1));
        assert!(s.to_string().contains(".com=2"));
    }
}
