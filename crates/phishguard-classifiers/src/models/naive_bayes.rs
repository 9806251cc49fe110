//! Naive Bayes family: Gaussian, multinomial and Bernoulli event models.
//!
//! All three share the same decision rule: the predicted class maximizes
//! `log prior + log likelihood(x | class)`, and exact ties go to the lowest
//! class index.
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

use crate::config::ModelSpec;
use crate::error::{PipelineError, Result, Stage};
use crate::models::classifier_trait::ClassifierModel;

/// Floor for Gaussian variances when every feature is constant.
const MIN_VARIANCE: f64 = 1e-12;

/// Distinct labels (ascending) with their row indices and log priors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct ClassPriors {
    classes: Vec<usize>,
    log_prior: Vec<f64>,
}

fn class_rows(y: &[usize]) -> (ClassPriors, Vec<Vec<usize>>) {
    let mut classes: Vec<usize> = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let rows: Vec<Vec<usize>> = classes
        .iter()
        .map(|c| (0..y.len()).filter(|&i| y[i] == *c).collect())
        .collect();
    let n = y.len() as f64;
    let log_prior = rows.iter().map(|r| (r.len() as f64 / n).ln()).collect();
    (ClassPriors { classes, log_prior }, rows)
}

fn check_input(model: &str, x: &Array2<f64>, y: &[usize]) -> Result<()> {
    if x.nrows() == 0 || x.nrows() != y.len() {
        return Err(PipelineError::model(
            Stage::Selection,
            model,
            format!("{} rows but {} labels", x.nrows(), y.len()),
        ));
    }
    Ok(())
}

fn check_width(model: &str, expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(PipelineError::model(
            Stage::Prediction,
            model,
            format!("fitted on {} features, got {}", expected, x.ncols()),
        ));
    }
    Ok(())
}

fn not_fitted(model: &str) -> PipelineError {
    PipelineError::model(Stage::Prediction, model, "model has not been fitted")
}

/// Argmax per row of a (rows x classes) score matrix.
fn argmax_classes(scores: &Array2<f64>, classes: &[usize]) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (k, &s) in row.iter().enumerate() {
                if s > row[best] {
                    best = k;
                }
            }
            classes[best]
        })
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct GaussianState {
    priors: ClassPriors,
    /// (classes x features)
    means: Array2<f64>,
    variances: Array2<f64>,
}

/// Gaussian naive Bayes. Per-class variances are inflated by
/// `var_smoothing` times the largest feature variance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GaussianNb {
    var_smoothing: f64,
    state: Option<GaussianState>,
}

impl GaussianNb {
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            var_smoothing: spec.param("var_smoothing"),
            state: None,
        }
    }
}

impl ClassifierModel for GaussianNb {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        check_input(self.name(), x, y)?;
        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0f64, f64::max);
        let epsilon = self.var_smoothing * max_var;

        let (priors, rows) = class_rows(y);
        let mut means = Array2::<f64>::zeros((priors.classes.len(), x.ncols()));
        let mut variances = Array2::<f64>::zeros((priors.classes.len(), x.ncols()));
        for (k, idx) in rows.iter().enumerate() {
            let subset = x.select(Axis(0), idx);
            let mean = subset.mean_axis(Axis(0)).ok_or_else(|| {
                PipelineError::model(Stage::Selection, "GaussianNB", "empty class")
            })?;
            let var = subset.var_axis(Axis(0), 0.0);
            means.row_mut(k).assign(&mean);
            variances
                .row_mut(k)
                .assign(&var.mapv(|v| (v + epsilon).max(MIN_VARIANCE)));
        }

        self.state = Some(GaussianState {
            priors,
            means,
            variances,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let state = self.state.as_ref().ok_or_else(|| not_fitted("GaussianNB"))?;
        check_width(self.name(), state.means.ncols(), x)?;

        let n_classes = state.priors.classes.len();
        let mut normals = Vec::with_capacity(n_classes);
        for k in 0..n_classes {
            let row = state
                .means
                .row(k)
                .iter()
                .zip(state.variances.row(k).iter())
                .map(|(&m, &v)| Normal::new(m, v.sqrt()))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| PipelineError::model(Stage::Prediction, "GaussianNB", e))?;
            normals.push(row);
        }

        let mut scores = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (r, sample) in x.axis_iter(Axis(0)).enumerate() {
            for (k, dists) in normals.iter().enumerate() {
                let log_likelihood: f64 = sample
                    .iter()
                    .zip(dists)
                    .map(|(&value, dist)| dist.ln_pdf(value))
                    .sum();
                scores[[r, k]] = state.priors.log_prior[k] + log_likelihood;
            }
        }
        Ok(argmax_classes(&scores, &state.priors.classes))
    }

    fn name(&self) -> &str {
        "GaussianNB"
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct DiscreteState {
    priors: ClassPriors,
    /// (classes x features) log feature probabilities
    feature_log_prob: Array2<f64>,
    /// Bernoulli only: log(1 - p)
    neg_log_prob: Option<Array2<f64>>,
}

/// Multinomial naive Bayes with additive (Laplace) smoothing. Features must
/// be non-negative counts or weights.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MultinomialNb {
    alpha: f64,
    state: Option<DiscreteState>,
}

impl MultinomialNb {
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            alpha: spec.param("alpha"),
            state: None,
        }
    }
}

impl ClassifierModel for MultinomialNb {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        check_input(self.name(), x, y)?;
        if x.iter().any(|&v| v < 0.0) {
            return Err(PipelineError::model(
                Stage::Selection,
                self.name(),
                "negative feature values",
            ));
        }

        let (priors, rows) = class_rows(y);
        let mut feature_log_prob = Array2::<f64>::zeros((priors.classes.len(), x.ncols()));
        for (k, idx) in rows.iter().enumerate() {
            let counts = x.select(Axis(0), idx).sum_axis(Axis(0)) + self.alpha;
            let total = counts.sum();
            feature_log_prob
                .row_mut(k)
                .assign(&counts.mapv(|c| c.ln() - total.ln()));
        }

        self.state = Some(DiscreteState {
            priors,
            feature_log_prob,
            neg_log_prob: None,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| not_fitted("MultinomialNB"))?;
        check_width(self.name(), state.feature_log_prob.ncols(), x)?;

        let mut scores = x.dot(&state.feature_log_prob.t());
        for mut row in scores.axis_iter_mut(Axis(0)) {
            for (k, s) in row.iter_mut().enumerate() {
                *s += state.priors.log_prior[k];
            }
        }
        Ok(argmax_classes(&scores, &state.priors.classes))
    }

    fn name(&self) -> &str {
        "MultinomialNB"
    }
}

/// Bernoulli naive Bayes over features binarized at `binarize`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BernoulliNb {
    alpha: f64,
    binarize: f64,
    state: Option<DiscreteState>,
}

impl BernoulliNb {
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            alpha: spec.param("alpha"),
            binarize: spec.param("binarize"),
            state: None,
        }
    }

    fn binarized(&self, x: &Array2<f64>) -> Array2<f64> {
        x.mapv(|v| if v > self.binarize { 1.0 } else { 0.0 })
    }
}

impl ClassifierModel for BernoulliNb {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        check_input(self.name(), x, y)?;
        let xb = self.binarized(x);

        let (priors, rows) = class_rows(y);
        let n_classes = priors.classes.len();
        let mut log_p = Array2::<f64>::zeros((n_classes, x.ncols()));
        let mut log_not_p = Array2::<f64>::zeros((n_classes, x.ncols()));
        for (k, idx) in rows.iter().enumerate() {
            let counts = xb.select(Axis(0), idx).sum_axis(Axis(0));
            let denom = idx.len() as f64 + 2.0 * self.alpha;
            let p = counts.mapv(|c| (c + self.alpha) / denom);
            log_p.row_mut(k).assign(&p.mapv(f64::ln));
            log_not_p.row_mut(k).assign(&p.mapv(|v| (1.0 - v).ln()));
        }

        self.state = Some(DiscreteState {
            priors,
            feature_log_prob: log_p,
            neg_log_prob: Some(log_not_p),
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| not_fitted("BernoulliNB"))?;
        check_width(self.name(), state.feature_log_prob.ncols(), x)?;
        let neg = state
            .neg_log_prob
            .as_ref()
            .ok_or_else(|| not_fitted("BernoulliNB"))?;

        let xb = self.binarized(x);
        // x log p + (1 - x) log(1 - p) = x (log p - log(1 - p)) + sum log(1 - p)
        let diff = &state.feature_log_prob - neg;
        let mut scores = xb.dot(&diff.t());
        let neg_sum = neg.sum_axis(Axis(1));
        for mut row in scores.axis_iter_mut(Axis(0)) {
            for (k, s) in row.iter_mut().enumerate() {
                *s += neg_sum[k] + state.priors.log_prior[k];
            }
        }
        Ok(argmax_classes(&scores, &state.priors.classes))
    }

    fn name(&self) -> &str {
        "BernoulliNB"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelKind;
    use ndarray::array;

    #[test]
    fn gaussian_separates_two_blobs() {
        let x = array![[0.0, 0.1], [0.2, -0.1], [-0.1, 0.0], [5.0, 5.1], [5.2, 4.9], [4.9, 5.0]];
        let y = [0, 0, 0, 1, 1, 1];
        let mut nb = GaussianNb::new(&ModelSpec::new(ModelKind::GaussianNb));
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.predict(&array![[0.1, 0.0], [5.1, 5.0]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn gaussian_handles_constant_features() {
        let x = array![[1.0], [1.0], [1.0], [1.0]];
        let mut nb = GaussianNb::new(&ModelSpec::new(ModelKind::GaussianNb));
        nb.fit(&x, &[0, 1, 1, 1]).unwrap();
        // Identical likelihoods: the larger prior wins.
        assert_eq!(nb.predict(&x).unwrap(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn multinomial_prefers_class_with_shared_terms() {
        let x = array![[0.0, 0.577, 0.577, 0.0, 0.577], [0.707, 0.0, 0.0, 0.707, 0.0]];
        let mut nb = MultinomialNb::new(&ModelSpec::new(ModelKind::MultinomialNb));
        nb.fit(&x, &[1, 0]).unwrap();
        assert_eq!(nb.predict(&array![[0.0, 0.0, 1.0, 0.0, 0.0]]).unwrap(), vec![1]);
        assert_eq!(nb.predict(&array![[0.0, 0.0, 0.0, 1.0, 0.0]]).unwrap(), vec![0]);
    }

    #[test]
    fn multinomial_rejects_negative_features() {
        let mut nb = MultinomialNb::new(&ModelSpec::new(ModelKind::MultinomialNb));
        let err = nb.fit(&array![[-1.0], [1.0]], &[0, 1]).unwrap_err();
        assert!(matches!(err, PipelineError::ModelFailure { .. }));
    }

    #[test]
    fn bernoulli_uses_presence_only() {
        let x = array![[3.0, 0.0], [1.0, 0.0], [0.0, 2.0], [0.0, 0.5]];
        let mut nb = BernoulliNb::new(&ModelSpec::new(ModelKind::BernoulliNb));
        nb.fit(&x, &[0, 0, 1, 1]).unwrap();
        assert_eq!(nb.predict(&array![[9.0, 0.0], [0.0, 9.0]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn predict_before_fit_fails() {
        let nb = BernoulliNb::new(&ModelSpec::new(ModelKind::BernoulliNb));
        assert!(nb.predict(&array![[1.0]]).is_err());
    }
}
