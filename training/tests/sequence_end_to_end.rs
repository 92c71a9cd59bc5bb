//! Sequence pipeline on a tiny corpus: train a few epochs on CPU, persist
//! the artifact directory, reload it and classify.

use candle_core::Device;
use phishnet_core::{Label, LabeledUrl, PhishnetError, Verdict};
use phishnet_detect::artifacts::{load_sequence, save_sequence, MANIFEST_FILE};
use phishnet_detect::{DetectorConfig, UrlDetector};
use phishnet_training::training::trainer::{train_sequence, SequenceTrainConfig};

fn tiny_corpus() -> Vec<LabeledUrl> {
    let mut records = Vec::new();
    for i in 0..40 {
        records.push(LabeledUrl::new(
            format!("https://www.site{i}.org/about"),
            Label::Benign,
        ));
        records.push(LabeledUrl::new(
            format!("http://10.0.{i}.7/secure-login-verify.php?id={i}"),
            Label::Phishing,
        ));
    }
    records
}

fn fast_config() -> SequenceTrainConfig {
    let mut config = SequenceTrainConfig {
        epochs: 3,
        batch_size: 16,
        ..Default::default()
    };
    config.model.embedding_dim = 8;
    config.model.hidden_units = 8;
    config.model.max_len = 64;
    config
}

#[test]
fn test_train_save_load_classify() {
    let device = Device::Cpu;
    let config = fast_config();
    let outcome =
        train_sequence(&tiny_corpus(), &config, &DetectorConfig::default(), &device).unwrap();

    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.history.iter().all(|m| m.train_loss.is_finite()));
    assert!((0.0..=1.0).contains(&outcome.accuracy));
    assert_eq!(outcome.report.confusion.total(), 16);

    let dir = tempfile::tempdir().unwrap();
    let manifest =
        save_sequence(dir.path(), &outcome.varmap, &outcome.vocabulary, &config.model).unwrap();
    assert_eq!(manifest.vocabulary_size, outcome.vocabulary.len());
    assert!(dir.path().join(MANIFEST_FILE).exists());

    let scorer = load_sequence(dir.path(), &device).unwrap();
    let detector = UrlDetector::new(Box::new(scorer), &DetectorConfig::default()).unwrap();
    assert_eq!(detector.scorer_name(), "sequence");

    let c = detector.classify("http://10.0.99.7/secure-login-verify.php?id=99").unwrap();
    assert!((0.0..=1.0).contains(&c.probability));

    let c = detector.classify("https://www.youtube.com").unwrap();
    assert_eq!(c.verdict, Verdict::Benign);
}

#[test]
fn test_missing_artifact_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_sequence(&dir.path().join("absent"), &Device::Cpu)
        .err()
        .unwrap();
    assert!(matches!(err, PhishnetError::ArtifactMissing { .. }));
}
