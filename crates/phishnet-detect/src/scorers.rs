//! [`UrlScorer`] adapters for the two model families.

use phishnet_core::Result;

use crate::char_cnn::CharCnnClassifier;
use crate::decision::UrlScorer;
use crate::feature_extraction::FeatureExtractor;
use crate::forest::RandomForest;
use crate::sequence_encoder::Vocabulary;

/// Lexical features + random forest.
#[derive(Debug, Clone)]
pub struct ClassicalScorer {
    forest: RandomForest,
    extractor: FeatureExtractor,
}

impl ClassicalScorer {
    pub fn new(forest: RandomForest, extractor: FeatureExtractor) -> Self {
        Self { forest, extractor }
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }
}

impl UrlScorer for ClassicalScorer {
    fn name(&self) -> &'static str {
        "classical"
    }

    fn score(&self, url: &str) -> Result<f64> {
        let features = self.extractor.extract(url).to_vec();
        self.forest.predict_proba(&features)
    }
}

/// Character vocabulary + character CNN.
///
/// The vocabulary must be the one the model was trained with; the artifact
/// loader checks this before a scorer is built.
pub struct SequenceScorer {
    model: CharCnnClassifier,
    vocabulary: Vocabulary,
}

impl SequenceScorer {
    pub fn new(model: CharCnnClassifier, vocabulary: Vocabulary) -> Self {
        Self { model, vocabulary }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn model(&self) -> &CharCnnClassifier {
        &self.model
    }
}

impl UrlScorer for SequenceScorer {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn score(&self, url: &str) -> Result<f64> {
        let encoded = self.vocabulary.encode(url, self.model.config().max_len);
        self.model.predict(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::char_cnn::SequenceModelConfig;
    use crate::forest::ForestConfig;
    use candle_core::Device;

    fn tiny_forest(extractor: &FeatureExtractor) -> RandomForest {
        let urls = [
            ("https://example.com", 0u8),
            ("https://docs.rs/serde", 0),
            ("https://crates.io", 0),
            ("http://192.168.4.20/secure-login-verify-account.php?id=99812", 1),
            ("http://bit.ly/paypal-update-billing-confirm", 1),
            ("http://free-bonus-lucky-winner.xyz/signin/ebayisapi/webscr", 1),
        ];
        let x: Vec<Vec<f64>> = urls
            .iter()
            .map(|(u, _)| extractor.extract(u).to_vec())
            .collect();
        let y: Vec<u8> = urls.iter().map(|(_, t)| *t).collect();
        let config = ForestConfig {
            n_trees: 10,
            ..Default::default()
        };
        RandomForest::fit(&x, &y, &config).unwrap()
    }

    #[test]
    fn test_classical_scorer_returns_probability() {
        let extractor = FeatureExtractor::default();
        let scorer = ClassicalScorer::new(tiny_forest(&extractor), extractor);
        let p = scorer
            .score("http://10.0.0.1/secure-login-verify-account.php")
            .unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(scorer.name(), "classical");
    }

    #[test]
    fn test_sequence_scorer_handles_unseen_characters() {
        let vocab = Vocabulary::fit(["http://example.com"]);
        let cfg = SequenceModelConfig::default();
        let model =
            CharCnnClassifier::new_random(&cfg, vocab.embedding_size(), &Device::Cpu).unwrap();
        let scorer = SequenceScorer::new(model, vocab);
        let p = scorer.score("ZZZ-ünïcödé-🦀.qq").unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_scorers_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClassicalScorer>();
        assert_send_sync::<SequenceScorer>();
    }
}
