use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::{ModelKind, ModelSpec};
use crate::error::Result;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::gbdt::GbdtClassifier;
use crate::models::logistic::LogisticClassifier;
use crate::models::naive_bayes::{BernoulliNb, GaussianNb, MultinomialNb};

/// Any candidate model. A closed enum rather than a trait object so that a
/// fitted model can be persisted and restored without a type registry.
#[derive(Serialize, Deserialize)]
pub enum Classifier {
    LogisticRegression(LogisticClassifier),
    GaussianNb(GaussianNb),
    MultinomialNb(MultinomialNb),
    BernoulliNb(BernoulliNb),
    GradientBoostedTrees(GbdtClassifier),
}

/// Build an unfitted classifier from a `ModelSpec`.
pub fn build_model(spec: &ModelSpec) -> Classifier {
    match spec.kind {
        ModelKind::LogisticRegression => {
            Classifier::LogisticRegression(LogisticClassifier::new(spec))
        }
        ModelKind::GaussianNb => Classifier::GaussianNb(GaussianNb::new(spec)),
        ModelKind::MultinomialNb => Classifier::MultinomialNb(MultinomialNb::new(spec)),
        ModelKind::BernoulliNb => Classifier::BernoulliNb(BernoulliNb::new(spec)),
        ModelKind::GradientBoostedTrees => {
            Classifier::GradientBoostedTrees(GbdtClassifier::new(spec))
        }
    }
}

impl Classifier {
    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::LogisticRegression(_) => ModelKind::LogisticRegression,
            Classifier::GaussianNb(_) => ModelKind::GaussianNb,
            Classifier::MultinomialNb(_) => ModelKind::MultinomialNb,
            Classifier::BernoulliNb(_) => ModelKind::BernoulliNb,
            Classifier::GradientBoostedTrees(_) => ModelKind::GradientBoostedTrees,
        }
    }

    fn inner(&self) -> &dyn ClassifierModel {
        match self {
            Classifier::LogisticRegression(m) => m,
            Classifier::GaussianNb(m) => m,
            Classifier::MultinomialNb(m) => m,
            Classifier::BernoulliNb(m) => m,
            Classifier::GradientBoostedTrees(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ClassifierModel {
        match self {
            Classifier::LogisticRegression(m) => m,
            Classifier::GaussianNb(m) => m,
            Classifier::MultinomialNb(m) => m,
            Classifier::BernoulliNb(m) => m,
            Classifier::GradientBoostedTrees(m) => m,
        }
    }
}

impl ClassifierModel for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        self.inner().predict(x)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Classifier").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn factory_builds_every_kind() {
        for kind in [
            ModelKind::LogisticRegression,
            ModelKind::GaussianNb,
            ModelKind::MultinomialNb,
            ModelKind::BernoulliNb,
            ModelKind::GradientBoostedTrees,
        ] {
            let model = build_model(&ModelSpec::new(kind));
            assert_eq!(model.kind(), kind);
            assert_eq!(model.name(), kind.name());
        }
    }

    #[test]
    fn fitted_model_survives_bincode() {
        let x = array![[0.0, 1.0], [0.1, 0.9], [1.0, 0.0], [0.9, 0.1]];
        let y = [0, 0, 1, 1];
        let mut model = build_model(&ModelSpec::new(ModelKind::GaussianNb));
        model.fit(&x, &y).unwrap();

        let bytes = bincode::serialize(&model).unwrap();
        let restored: Classifier = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
