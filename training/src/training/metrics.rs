//! Evaluation metrics for held-out predictions.
//!
//! Builds a 2x2 confusion matrix from binary targets (0 = benign,
//! 1 = phishing) and derives per-class precision, recall, F1 and support,
//! plus macro and support-weighted averages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Confusion matrix for binary classification. Phishing is the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Phishing correctly flagged.
    pub tp: usize,
    /// Benign correctly passed.
    pub tn: usize,
    /// Benign incorrectly flagged.
    pub fp: usize,
    /// Phishing missed.
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a prediction.
    pub fn record(&mut self, actual_phishing: bool, predicted_phishing: bool) {
        match (actual_phishing, predicted_phishing) {
            (true, true) => self.tp += 1,
            (false, false) => self.tn += 1,
            (false, true) => self.fp += 1,
            (true, false) => self.fn_ += 1,
        }
    }

    /// Build from parallel slices of targets.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    pub fn from_targets(actual: &[u8], predicted: &[u8]) -> Self {
        assert_eq!(
            actual.len(),
            predicted.len(),
            "predictions and targets must have same length"
        );
        let mut cm = Self::new();
        for (&a, &p) in actual.iter().zip(predicted) {
            cm.record(a != 0, p != 0);
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Rows are actual (benign, phishing), columns predicted (benign, phishing).
    pub fn as_matrix(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>18} {:>10} {:>10}", "", "pred_benign", "pred_phish")?;
        writeln!(f, "{:>18} {:>10} {:>10}", "actual_benign", self.tn, self.fp)?;
        write!(f, "{:>18} {:>10} {:>10}", "actual_phishing", self.fn_, self.tp)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of actual samples of the class.
    pub support: usize,
}

impl ClassMetrics {
    fn new(true_pos: usize, false_pos: usize, false_neg: usize) -> Self {
        let precision = ratio(true_pos, true_pos + false_pos);
        let recall = ratio(true_pos, true_pos + false_neg);
        Self {
            precision,
            recall,
            f1: f1(precision, recall),
            support: true_pos + false_neg,
        }
    }
}

/// Per-class report over a held-out set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub benign: ClassMetrics,
    pub phishing: ClassMetrics,
    pub accuracy: f64,
    /// Unweighted mean over both classes.
    pub macro_avg: ClassMetrics,
    /// Mean over both classes weighted by support.
    pub weighted_avg: ClassMetrics,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let benign = ClassMetrics::new(cm.tn, cm.fn_, cm.fp);
        let phishing = ClassMetrics::new(cm.tp, cm.fp, cm.fn_);
        let total = cm.total();

        let macro_avg = ClassMetrics {
            precision: (benign.precision + phishing.precision) / 2.0,
            recall: (benign.recall + phishing.recall) / 2.0,
            f1: (benign.f1 + phishing.f1) / 2.0,
            support: total,
        };
        let weighted = |b: f64, p: f64| {
            if total > 0 {
                (b * benign.support as f64 + p * phishing.support as f64) / total as f64
            } else {
                0.0
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weighted(benign.precision, phishing.precision),
            recall: weighted(benign.recall, phishing.recall),
            f1: weighted(benign.f1, phishing.f1),
            support: total,
        };

        Self {
            benign,
            phishing,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
            confusion: *cm,
        }
    }

    /// Report for parallel slices of binary targets.
    pub fn from_targets(actual: &[u8], predicted: &[u8]) -> Self {
        Self::from_confusion(&ConfusionMatrix::from_targets(actual, predicted))
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (name, m) in [("benign", &self.benign), ("phishing", &self.phishing)] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        )?;
        for (name, m) in [
            ("macro avg", &self.macro_avg),
            ("weighted avg", &self.weighted_avg),
        ] {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        write!(f, "{}", self.confusion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let r = ClassificationReport::from_targets(&[0, 0, 1, 1], &[0, 0, 1, 1]);
        assert!((r.accuracy - 1.0).abs() < 1e-9);
        assert!((r.phishing.f1 - 1.0).abs() < 1e-9);
        assert!((r.benign.f1 - 1.0).abs() < 1e-9);
        assert_eq!(r.confusion.as_matrix(), [[2, 0], [0, 2]]);
    }

    #[test]
    fn test_mixed() {
        // 3 TP, 1 FP, 2 TN, 1 FN
        let predicted = [1, 1, 1, 1, 0, 0, 0];
        let actual = [1, 1, 1, 0, 0, 0, 1];
        let r = ClassificationReport::from_targets(&actual, &predicted);
        let cm = r.confusion;
        assert_eq!((cm.tp, cm.fp, cm.tn, cm.fn_), (3, 1, 2, 1));
        assert!((r.accuracy - 5.0 / 7.0).abs() < 1e-9);
        assert!((r.phishing.precision - 0.75).abs() < 1e-9);
        assert!((r.phishing.recall - 0.75).abs() < 1e-9);
        assert!((r.benign.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((r.benign.recall - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(r.phishing.support, 4);
        assert_eq!(r.benign.support, 3);
    }

    #[test]
    fn test_weighted_average_uses_support() {
        // benign: 1 of 1 correct; phishing: 0 of 3 correct.
        let r = ClassificationReport::from_targets(&[0, 1, 1, 1], &[0, 0, 0, 0]);
        assert!((r.benign.recall - 1.0).abs() < 1e-9);
        assert!(r.phishing.recall.abs() < 1e-9);
        assert!((r.macro_avg.recall - 0.5).abs() < 1e-9);
        assert!((r.weighted_avg.recall - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_empty() {
        let r = ClassificationReport::from_targets(&[], &[]);
        assert!(r.accuracy.abs() < 1e-9);
        assert!(r.weighted_avg.f1.abs() < 1e-9);
    }

    #[test]
    fn test_display_contains_both_classes() {
        let r = ClassificationReport::from_targets(&[0, 1], &[0, 1]);
        let text = r.to_string();
        assert!(text.contains("benign"));
        assert!(text.contains("phishing"));
        assert!(text.contains("weighted avg"));
    }
}
