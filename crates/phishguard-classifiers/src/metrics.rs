//! Binary classification scores. Class `1` is the positive class.
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize]) -> Self {
        let mut counts = ConfusionCounts::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        (self.true_positive + self.true_negative) as f64 / self.total() as f64
    }

    /// Zero when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        let predicted = self.true_positive + self.false_positive;
        if predicted == 0 {
            return 0.0;
        }
        self.true_positive as f64 / predicted as f64
    }

    pub fn recall(&self) -> f64 {
        let actual = self.true_positive + self.false_negative;
        if actual == 0 {
            return 0.0;
        }
        self.true_positive as f64 / actual as f64
    }
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    ConfusionCounts::from_predictions(y_true, y_pred).accuracy()
}

pub fn precision(y_true: &[usize], y_pred: &[usize]) -> f64 {
    ConfusionCounts::from_predictions(y_true, y_pred).precision()
}

/// Held-out scores of one fitted candidate.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl Scores {
    pub fn evaluate(y_true: &[usize], y_pred: &[usize]) -> Self {
        let counts = ConfusionCounts::from_predictions(y_true, y_pred);
        Scores {
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_and_ratios() {
        let y_true = [1, 1, 0, 0, 1];
        let y_pred = [1, 0, 1, 0, 1];
        let c = ConfusionCounts::from_predictions(&y_true, &y_pred);
        assert_eq!(c.true_positive, 2);
        assert_eq!(c.false_positive, 1);
        assert_eq!(c.false_negative, 1);
        assert_eq!(c.true_negative, 1);
        assert!((c.accuracy() - 0.6).abs() < 1e-12);
        assert!((c.precision() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn precision_without_positive_predictions_is_zero() {
        assert_eq!(precision(&[1, 0, 1], &[0, 0, 0]), 0.0);
        assert!((accuracy(&[1, 0, 1], &[0, 0, 0]) - 1.0 / 3.0).abs() < 1e-12);
    }
}
