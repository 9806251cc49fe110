use ndarray::Array2;

use crate::error::Result;

/// Contract shared by every candidate model. Labels are encoded class
/// indices (`0`/`1`); rows of `x` are samples.
pub trait ClassifierModel {
    /// Fit on `x`/`y`, replacing any previous fit.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()>;

    /// Predicted class index per row. Fails if the model was never fitted.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>>;

    /// Human readable name for logs and reports
    fn name(&self) -> &str {
        "classifier"
    }
}
