//! Pipeline configuration, candidate model registry and hyperparameter grids.
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Input domain a pipeline run works on. Each variant brings its own feature
/// schema, preprocessor and candidate registry.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVariant {
    /// Phishing-indicator rows (and URLs reduced to the same indicators).
    Tabular,
    /// Free-text SMS/email messages.
    Text,
}

impl PipelineVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineVariant::Tabular => "tabular",
            PipelineVariant::Text => "text",
        }
    }

    /// Candidate models evaluated for this variant, in tie-break order.
    pub fn registry(&self) -> &'static [ModelKind] {
        match self {
            PipelineVariant::Tabular => &[
                ModelKind::LogisticRegression,
                ModelKind::GaussianNb,
                ModelKind::GradientBoostedTrees,
            ],
            PipelineVariant::Text => &[
                ModelKind::GaussianNb,
                ModelKind::MultinomialNb,
                ModelKind::BernoulliNb,
            ],
        }
    }
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tabular" | "phishing" => Ok(PipelineVariant::Tabular),
            "text" | "spam" => Ok(PipelineVariant::Text),
            _ => Err(format!(
                "Unknown pipeline variant: {}. Valid options are: tabular, text",
                s
            )),
        }
    }
}

/// Supported classifier families.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelKind {
    #[serde(rename = "LogisticRegression")]
    LogisticRegression,
    #[serde(rename = "GaussianNB")]
    GaussianNb,
    #[serde(rename = "MultinomialNB")]
    MultinomialNb,
    #[serde(rename = "BernoulliNB")]
    BernoulliNb,
    #[serde(rename = "GradientBoostedTrees")]
    GradientBoostedTrees,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "LogisticRegression",
            ModelKind::GaussianNb => "GaussianNB",
            ModelKind::MultinomialNb => "MultinomialNB",
            ModelKind::BernoulliNb => "BernoulliNB",
            ModelKind::GradientBoostedTrees => "GradientBoostedTrees",
        }
    }

    /// Default hyper-parameters. Every tunable parameter of a model appears
    /// here, which is also what grid validation checks against.
    pub fn default_params(&self) -> BTreeMap<String, f64> {
        let pairs: &[(&str, f64)] = match self {
            ModelKind::LogisticRegression => &[("alpha", 1.0), ("max_iterations", 100.0)],
            ModelKind::GaussianNb => &[("var_smoothing", 1e-9)],
            ModelKind::MultinomialNb => &[("alpha", 1.0)],
            ModelKind::BernoulliNb => &[("alpha", 1.0), ("binarize", 0.0)],
            ModelKind::GradientBoostedTrees => &[
                ("learning_rate", 0.1),
                ("max_depth", 6.0),
                ("num_boost_round", 50.0),
                ("min_leaf_size", 1.0),
            ],
        };
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logisticregression" | "logistic" => Ok(ModelKind::LogisticRegression),
            "gaussiannb" => Ok(ModelKind::GaussianNb),
            "multinomialnb" => Ok(ModelKind::MultinomialNb),
            "bernoullinb" => Ok(ModelKind::BernoulliNb),
            "gradientboostedtrees" | "gbdt" => Ok(ModelKind::GradientBoostedTrees),
            _ => Err(format!("Unknown model type: {}", s)),
        }
    }
}

/// A concrete model choice: family plus resolved hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub params: BTreeMap<String, f64>,
}

impl ModelSpec {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            params: kind.default_params(),
        }
    }

    /// Defaults overridden by `overrides`.
    pub fn with_params(kind: ModelKind, overrides: &BTreeMap<String, f64>) -> Self {
        let mut spec = Self::new(kind);
        for (name, value) in overrides {
            spec.params.insert(name.clone(), *value);
        }
        spec
    }

    pub fn param(&self, name: &str) -> f64 {
        self.params
            .get(name)
            .copied()
            .or_else(|| self.kind.default_params().get(name).copied())
            .unwrap_or_default()
    }
}

/// Candidate values per parameter name.
pub type ParamGrid = BTreeMap<String, Vec<f64>>;

/// Settings for one training run and the artifacts it produces.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of rows held out for testing.
    pub test_size: f64,
    pub seed: u64,
    /// Minimum held-out accuracy for a model to be persisted.
    pub expected_accuracy: f64,
    /// TF-IDF vocabulary cap.
    pub max_features: usize,
    /// Run the cross-validated grid search on the tabular winner.
    pub tune: bool,
    pub cv_folds: usize,
    pub target_column: String,
    pub drop_columns: Vec<String>,
    pub text_column: String,
    pub label_column: String,
    pub param_grids: BTreeMap<ModelKind, ParamGrid>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut param_grids = BTreeMap::new();
        param_grids.insert(
            ModelKind::LogisticRegression,
            grid(&[("alpha", &[0.01, 0.1, 1.0]), ("max_iterations", &[100.0, 300.0])]),
        );
        param_grids.insert(
            ModelKind::GaussianNb,
            grid(&[("var_smoothing", &[1e-9, 1e-7, 1e-5])]),
        );
        param_grids.insert(
            ModelKind::GradientBoostedTrees,
            grid(&[
                ("learning_rate", &[0.1, 0.3]),
                ("max_depth", &[3.0, 6.0]),
                ("num_boost_round", &[30.0, 60.0]),
            ]),
        );

        Self {
            test_size: 0.2,
            seed: 42,
            expected_accuracy: 0.45,
            max_features: 3000,
            tune: true,
            cv_folds: 5,
            target_column: "Result".to_string(),
            drop_columns: vec!["index".to_string()],
            text_column: "v2".to_string(),
            label_column: "v1".to_string(),
            param_grids,
        }
    }
}

fn grid(entries: &[(&str, &[f64])]) -> ParamGrid {
    entries
        .iter()
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect()
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_size must lie in (0, 1), got {}",
                self.test_size
            )));
        }
        if !(0.0..=1.0).contains(&self.expected_accuracy) {
            return Err(PipelineError::InvalidConfig(format!(
                "expected_accuracy must lie in [0, 1], got {}",
                self.expected_accuracy
            )));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        if self.max_features == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_features must be positive".to_string(),
            ));
        }
        for (kind, grid) in &self.param_grids {
            let known = kind.default_params();
            for (name, values) in grid {
                if !known.contains_key(name) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "{} has no parameter '{}'",
                        kind, name
                    )));
                }
                if values.is_empty() {
                    return Err(PipelineError::InvalidConfig(format!(
                        "grid for {}.{} is empty",
                        kind, name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Load a pipeline configuration from a JSON file. Missing keys fall back to
/// the defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    let config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
        PipelineError::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"expected_accuracy": 0.9, "seed": 7}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.expected_accuracy, 0.9);
        assert_eq!(config.max_features, 3000);
        assert_eq!(config.cv_folds, 5);
        assert!(config.param_grids.contains_key(&ModelKind::GaussianNb));
    }

    #[test]
    fn grids_are_keyed_by_model_name() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"param_grids": {"GaussianNB": {"var_smoothing": [1e-9, 1e-3]}}}"#,
        )
        .unwrap();
        assert_eq!(config.param_grids.len(), 1);
        assert_eq!(
            config.param_grids[&ModelKind::GaussianNb]["var_smoothing"],
            vec![1e-9, 1e-3]
        );
        config.validate().unwrap();
    }

    #[test]
    fn unknown_grid_parameter_is_rejected() {
        let mut config = PipelineConfig::default();
        config
            .param_grids
            .insert(ModelKind::GaussianNb, grid(&[("depth", &[1.0])]));
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn model_kind_parses_case_insensitively() {
        assert_eq!(
            ModelKind::from_str("gaussiannb").unwrap(),
            ModelKind::GaussianNb
        );
        assert_eq!(
            ModelKind::from_str("GBDT").unwrap(),
            ModelKind::GradientBoostedTrees
        );
        assert!(ModelKind::from_str("svm").is_err());
    }

    #[test]
    fn spec_overrides_only_named_params() {
        let mut overrides = BTreeMap::new();
        overrides.insert("max_depth".to_string(), 3.0);
        let spec = ModelSpec::with_params(ModelKind::GradientBoostedTrees, &overrides);
        assert_eq!(spec.param("max_depth"), 3.0);
        assert_eq!(spec.param("num_boost_round"), 50.0);
    }
}
