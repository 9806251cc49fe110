use linfa::prelude::*;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::ModelSpec;
use crate::error::{PipelineError, Result, Stage};
use crate::models::classifier_trait::ClassifierModel;

/// L2-regularized binary logistic regression (L-BFGS via `linfa-logistic`).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LogisticClassifier {
    alpha: f64,
    max_iterations: u64,
    model: Option<FittedLogisticRegression<f64, usize>>,
}

impl LogisticClassifier {
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            alpha: spec.param("alpha"),
            max_iterations: spec.param("max_iterations").max(1.0) as u64,
            model: None,
        }
    }
}

impl ClassifierModel for LogisticClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        let dataset = Dataset::new(x.clone(), Array1::from_vec(y.to_vec()));
        let fitted = LogisticRegression::default()
            .alpha(self.alpha)
            .max_iterations(self.max_iterations)
            .fit(&dataset)
            .map_err(|e| PipelineError::model(Stage::Selection, self.name(), e))?;
        self.model = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let model = self.model.as_ref().ok_or_else(|| {
            PipelineError::model(Stage::Prediction, self.name(), "model has not been fitted")
        })?;
        Ok(model.predict(x).to_vec())
    }

    fn name(&self) -> &str {
        "LogisticRegression"
    }
}
