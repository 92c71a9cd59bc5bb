//! End-to-end: fit a forest, persist it, reload it, and classify through the
//! detector.

use std::sync::Arc;
use std::thread;

use phishnet_core::{PhishnetError, Reason, Verdict};
use phishnet_detect::artifacts::{load_classical, save_classical};
use phishnet_detect::{
    ClassicalArtifact, DetectorConfig, FeatureConfig, FeatureExtractor, ForestConfig,
    RandomForest, ThresholdPolicy, UrlDetector,
};

const BENIGN: [&str; 8] = [
    "https://www.rust-lang.org/learn",
    "https://docs.rs/serde/latest/serde",
    "https://crates.io/crates/tokio",
    "https://news.ycombinator.com",
    "https://www.bbc.co.uk/news",
    "https://example.org/about",
    "https://www.mozilla.org/en-US/firefox",
    "https://stackoverflow.com/questions",
];

const PHISHING: [&str; 8] = [
    "http://192.168.10.5/secure-login-verify-account.php?id=88123",
    "http://bit.ly/paypal-confirm-billing-update",
    "http://free-lucky-bonus-winner.top/signin/webscr?cmd=1234567",
    "http://10.0.0.77/banking/login/verify/update.html",
    "http://account-update-secure.xyz/ebayisapi/signin?u=9981",
    "http://tinyurl.com/secure-account-verify-2024",
    "http://203.0.113.9/login-confirm-password-reset-77881",
    "http://paypal-verify-account-secure-login.club/update/8812",
];

fn trained_artifact() -> ClassicalArtifact {
    let extractor = FeatureExtractor::default();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for url in BENIGN {
        x.push(extractor.extract(url).to_vec());
        y.push(0u8);
    }
    for url in PHISHING {
        x.push(extractor.extract(url).to_vec());
        y.push(1u8);
    }
    let forest = RandomForest::fit(
        &x,
        &y,
        &ForestConfig {
            n_trees: 25,
            ..Default::default()
        },
    )
    .unwrap();
    ClassicalArtifact::new(forest, FeatureConfig::default())
}

fn detector_from_disk(config: &DetectorConfig) -> UrlDetector {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forest.json");
    save_classical(&path, &trained_artifact()).unwrap();
    let scorer = load_classical(&path).unwrap().into_scorer();
    UrlDetector::new(Box::new(scorer), config).unwrap()
}

#[test]
fn test_reloaded_forest_separates_training_urls() {
    let detector = detector_from_disk(&DetectorConfig {
        thresholds: ThresholdPolicy::fixed(0.5),
        ..Default::default()
    });
    for url in PHISHING {
        let c = detector.classify(url).unwrap();
        assert_eq!(c.verdict, Verdict::Phishing, "{url} scored {}", c.probability);
    }
    for url in BENIGN {
        let c = detector.classify(url).unwrap();
        assert_eq!(c.verdict, Verdict::Benign, "{url} scored {}", c.probability);
    }
}

#[test]
fn test_whitelisted_domain_is_benign_regardless_of_features() {
    let detector = detector_from_disk(&DetectorConfig::default());
    let c = detector
        .classify("https://github.com/secure-login-verify-account/update?id=123456789")
        .unwrap();
    assert_eq!(c.verdict, Verdict::Benign);
    assert_eq!(
        c.reason,
        Reason::Whitelisted {
            domain: "github.com".to_string()
        }
    );
}

#[test]
fn test_model_reason_reports_threshold() {
    let detector = detector_from_disk(&DetectorConfig::default());
    let c = detector.classify("http://example.org/about").unwrap();
    match c.reason {
        Reason::ModelScore {
            threshold,
            domain_length,
        } => {
            assert_eq!(domain_length, "example.org".len());
            assert_eq!(threshold, 0.85);
        }
        other => panic!("expected a model score, got {other:?}"),
    }
}

#[test]
fn test_empty_url_rejected() {
    let detector = detector_from_disk(&DetectorConfig::default());
    assert!(matches!(
        detector.classify("  "),
        Err(PhishnetError::MalformedInput(_))
    ));
}

#[test]
fn test_detector_shared_across_threads() {
    let detector = Arc::new(detector_from_disk(&DetectorConfig::default()));
    let handles: Vec<_> = PHISHING
        .iter()
        .map(|url| {
            let detector = Arc::clone(&detector);
            let url = url.to_string();
            thread::spawn(move || detector.classify(&url).unwrap().probability)
        })
        .collect();
    for (handle, url) in handles.into_iter().zip(PHISHING) {
        let threaded = handle.join().unwrap();
        assert_eq!(threaded, detector.classify(url).unwrap().probability);
    }
}
