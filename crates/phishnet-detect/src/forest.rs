//! Random forest classifier over lexical URL features.
//!
//! A bagged ensemble of CART trees grown on Gini impurity, with a random
//! subset of candidate features per split and per-class sample weights.
//! With [`ClassWeight::Balanced`] each class is weighted by
//! `n_samples / (2 * n_class_samples)`, so an imbalanced corpus does not pull
//! every leaf towards the majority class.
//!
//! The phishing probability of a sample is the mean, over trees, of the
//! weighted phishing fraction in the leaf it reaches.

use phishnet_core::{PhishnetError, Result};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease for a split to be accepted.
const MIN_IMPURITY_DECREASE: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How samples are weighted per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    /// Every sample has weight 1.
    Uniform,
    /// Weights inversely proportional to class frequency.
    #[default]
    Balanced,
}

/// Hyper-parameters for [`RandomForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs to be split.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
    /// Candidate features per split; `None` means `sqrt(n_features)`.
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample per tree.
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    /// Base seed; tree `t` uses `seed + t`.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            class_weight: ClassWeight::Balanced,
            seed: 42,
        }
    }
}

impl ForestConfig {
    /// Check that the parameters describe a buildable forest.
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(PhishnetError::Config("n_trees must be at least 1".to_string()));
        }
        if self.min_samples_split < 2 {
            return Err(PhishnetError::Config(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(PhishnetError::Config(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(PhishnetError::Config(
                "max_features must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn features_per_split(&self, n_features: usize) -> usize {
        let k = self
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize);
        k.clamp(1, n_features)
    }
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        phishing_probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    phishing_probability,
                } => return *phishing_probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Structural check for trees read from disk: every split names an
    /// existing feature and points forward to nodes inside the tree, and
    /// every leaf holds a probability.
    fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf {
                    phishing_probability,
                } => {
                    if !(0.0..=1.0).contains(phishing_probability) {
                        return Err(format!(
                            "node {idx}: leaf probability {phishing_probability} outside [0, 1]"
                        ));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {idx}: feature {feature} out of range ({n_features} features)"
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("node {idx}: threshold is NaN"));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!(
                                "node {idx}: child {child} must lie in {}..{}",
                                idx + 1,
                                self.nodes.len()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

/// Grows a single tree over a (possibly bootstrapped) index set.
struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    sample_weight: &'a [f64],
    config: &'a ForestConfig,
    features_per_split: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

fn gini(w0: f64, w1: f64) -> f64 {
    let total = w0 + w1;
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = w0 / total;
    let p1 = w1 / total;
    1.0 - p0 * p0 - p1 * p1
}

impl<'a> TreeBuilder<'a> {
    fn class_totals(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(w0, w1), &i| {
            if self.y[i] == 0 {
                (w0 + self.sample_weight[i], w1)
            } else {
                (w0, w1 + self.sample_weight[i])
            }
        })
    }

    fn push_leaf(&mut self, w0: f64, w1: f64) -> usize {
        let total = w0 + w1;
        let phishing_probability = if total > 0.0 { w1 / total } else { 0.5 };
        self.nodes.push(Node::Leaf {
            phishing_probability,
        });
        self.nodes.len() - 1
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let (w0, w1) = self.class_totals(&indices);
        let depth_exhausted = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_exhausted
            || indices.len() < self.config.min_samples_split
            || w0 <= 0.0
            || w1 <= 0.0
        {
            return self.push_leaf(w0, w1);
        }

        let Some(split) = self.best_split(&indices, w0, w1) else {
            return self.push_leaf(w0, w1);
        };
        self.importances[split.feature] += split.decrease;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        // Reserve the slot so children get higher indices than their parent.
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf {
            phishing_probability: 0.5,
        });
        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }

    fn best_split(
        &mut self,
        indices: &[usize],
        total0: f64,
        total1: f64,
    ) -> Option<SplitCandidate> {
        let n_features = self.importances.len();
        let candidates = index::sample(&mut self.rng, n_features, self.features_per_split);
        let total = total0 + total1;
        let parent = total * gini(total0, total1);
        let min_leaf = self.config.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature in candidates.iter() {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left0 = 0.0;
            let mut left1 = 0.0;
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                if self.y[i] == 0 {
                    left0 += self.sample_weight[i];
                } else {
                    left1 += self.sample_weight[i];
                }

                let value = self.x[i][feature];
                let next = self.x[order[pos + 1]][feature];
                if next <= value {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < min_leaf || order.len() - n_left < min_leaf {
                    continue;
                }

                let right0 = total0 - left0;
                let right1 = total1 - left1;
                let children =
                    (left0 + left1) * gini(left0, left1) + (right0 + right1) * gini(right0, right1);
                let decrease = (parent - children) / total;

                let improves = best
                    .as_ref()
                    .map_or(true, |b| decrease > b.decrease + MIN_IMPURITY_DECREASE);
                if decrease > MIN_IMPURITY_DECREASE && improves {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }

        best
    }
}

// ---------------------------------------------------------------------------
// Forest
// ---------------------------------------------------------------------------

/// Trained random forest. Immutable after [`RandomForest::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on row-major features `x` and binary targets `y`
    /// (0 = benign, 1 = phishing).
    ///
    /// # Errors
    ///
    /// Returns [`PhishnetError::DataQuality`] when the data is empty,
    /// ragged, or contains a single class, and [`PhishnetError::Config`]
    /// for invalid hyper-parameters.
    pub fn fit(x: &[Vec<f64>], y: &[u8], config: &ForestConfig) -> Result<Self> {
        config.validate()?;
        if x.is_empty() {
            return Err(PhishnetError::DataQuality(
                "cannot fit a forest on an empty training set".to_string(),
            ));
        }
        if x.len() != y.len() {
            return Err(PhishnetError::DataQuality(format!(
                "feature rows ({}) and targets ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(PhishnetError::DataQuality(
                "feature rows must be non-empty and of equal width".to_string(),
            ));
        }

        let n = y.len();
        let n_phishing = y.iter().filter(|&&t| t != 0).count();
        let n_benign = n - n_phishing;
        if n_phishing == 0 || n_benign == 0 {
            return Err(PhishnetError::DataQuality(format!(
                "training set has a single class ({n_benign} benign, {n_phishing} phishing)"
            )));
        }

        let (weight0, weight1) = match config.class_weight {
            ClassWeight::Uniform => (1.0, 1.0),
            ClassWeight::Balanced => (
                n as f64 / (2.0 * n_benign as f64),
                n as f64 / (2.0 * n_phishing as f64),
            ),
        };
        let sample_weight: Vec<f64> = y
            .iter()
            .map(|&t| if t == 0 { weight0 } else { weight1 })
            .collect();

        tracing::info!(
            samples = n,
            benign = n_benign,
            phishing = n_phishing,
            trees = config.n_trees,
            "Fitting random forest"
        );

        let features_per_split = config.features_per_split(n_features);
        let mut trees = Vec::with_capacity(config.n_trees);
        let mut importances = vec![0.0; n_features];

        for t in 0..config.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(t as u64));
            let indices: Vec<usize> = if config.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let mut builder = TreeBuilder {
                x,
                y,
                sample_weight: &sample_weight,
                config,
                features_per_split,
                rng,
                nodes: Vec::new(),
                importances: vec![0.0; n_features],
            };
            builder.build(indices, 0);

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&builder.importances) {
                    *acc += v / tree_total;
                }
            }
            trees.push(DecisionTree {
                nodes: builder.nodes,
            });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        let forest = Self {
            trees,
            n_features,
            feature_importances: importances,
        };
        tracing::debug!(max_depth = forest.max_depth(), "Random forest fitted");
        Ok(forest)
    }

    /// Phishing probability for one feature row.
    ///
    /// # Errors
    ///
    /// Returns [`PhishnetError::Model`] if the row width differs from the
    /// width the forest was trained on.
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(PhishnetError::Model(format!(
                "forest expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Hard prediction at a 0.5 cutoff (1 = phishing).
    pub fn predict(&self, features: &[f64]) -> Result<u8> {
        Ok(u8::from(self.predict_proba(features)? > 0.5))
    }

    /// Normalised mean impurity decrease per feature, in input order.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Feature importances paired with `names`, sorted descending.
    pub fn ranked_importances<'n>(&self, names: &[&'n str]) -> Vec<(&'n str, f64)> {
        let mut ranked: Vec<(&str, f64)> = names
            .iter()
            .copied()
            .zip(self.feature_importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Check a deserialized forest before it is used for scoring.
    ///
    /// # Errors
    ///
    /// Returns [`PhishnetError::ArtifactMismatch`] if the forest has no
    /// trees, if importances do not match the feature count, or if any tree
    /// is malformed.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(PhishnetError::ArtifactMismatch(
                "forest contains no trees".to_string(),
            ));
        }
        if self.feature_importances.len() != self.n_features {
            return Err(PhishnetError::ArtifactMismatch(format!(
                "forest has {} importances for {} features",
                self.feature_importances.len(),
                self.n_features
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.check(self.n_features)
                .map_err(|e| PhishnetError::ArtifactMismatch(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Depth of the deepest tree.
    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
