use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use phishnet_core::{Label, LabeledUrl};
use phishnet_detect::feature_extraction::FeatureExtractor;
use phishnet_detect::forest::ForestConfig;
use phishnet_detect::sequence_encoder::{Vocabulary, DEFAULT_MAX_LEN};
use phishnet_training::training::classical::{train_classical, ClassicalTrainConfig};
use std::hint::black_box;

const URLS: [&str; 6] = [
    "https://www.rust-lang.org/learn/get-started",
    "http://192.168.4.20/secure-login-verify-account.php?id=99812",
    "http://bit.ly/paypal-update-billing-confirm",
    "docs.rs/serde/latest/serde/trait.Deserialize.html",
    "http://free-bonus-lucky-winner.xyz/signin/ebayisapi/webscr?cmd=_login",
    "github.com",
];

fn synthetic_corpus(n: usize) -> Vec<LabeledUrl> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                LabeledUrl::new(format!("https://site{i}.example.org/page"), Label::Benign)
            } else {
                LabeledUrl::new(
                    format!("http://10.{}.0.1/login-verify-{i}.php?acct={i}", i % 250),
                    Label::Phishing,
                )
            }
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    c.bench_function("feature_extraction_batch", |b| {
        b.iter(|| {
            for url in URLS {
                black_box(extractor.extract(black_box(url)));
            }
        })
    });
}

fn bench_encode(c: &mut Criterion) {
    let vocab = Vocabulary::fit(URLS);
    c.bench_function("sequence_encode_batch", |b| {
        b.iter(|| black_box(vocab.encode_batch(black_box(&URLS), DEFAULT_MAX_LEN)))
    });
}

fn bench_forest_training(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let mut group = c.benchmark_group("classical_training");
    group.sample_size(10);
    for n in [200usize, 1000] {
        let corpus = synthetic_corpus(n);
        let config = ClassicalTrainConfig {
            forest: ForestConfig {
                n_trees: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &corpus, |b, corpus| {
            b.iter(|| train_classical(corpus, &extractor, &config).expect("training failed"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extract, bench_encode, bench_forest_training);
criterion_main!(benches);
