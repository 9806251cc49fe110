use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::ModelSpec;
use crate::error::{PipelineError, Result, Stage};
use crate::models::classifier_trait::ClassifierModel;

/// Gradient Boosting Decision Tree (GBDT) classifier
#[derive(Serialize, Deserialize)]
pub struct GbdtClassifier {
    learning_rate: f64,
    max_depth: u32,
    num_boost_round: usize,
    min_leaf_size: usize,
    model: Option<GBDT>,
}

impl GbdtClassifier {
    pub fn new(spec: &ModelSpec) -> Self {
        GbdtClassifier {
            learning_rate: spec.param("learning_rate"),
            max_depth: spec.param("max_depth").max(1.0) as u32,
            num_boost_round: spec.param("num_boost_round").max(1.0) as usize,
            min_leaf_size: spec.param("min_leaf_size").max(1.0) as usize,
            model: None,
        }
    }

    fn to_data(x: &Array2<f64>, y: Option<&[usize]>) -> DataVec {
        let mut data = DataVec::with_capacity(x.nrows());
        for (i, row) in x.axis_iter(Axis(0)).enumerate() {
            let features: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            // LogLikelyhood loss expects labels in {-1, 1}.
            let label = match y {
                Some(y) if y[i] == 1 => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
            data.push(Data::new_training_data(features, 1.0, label, None));
        }
        data
    }
}

impl ClassifierModel for GbdtClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(PipelineError::model(
                Stage::Selection,
                self.name(),
                format!("{} rows but {} labels", x.nrows(), y.len()),
            ));
        }

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.learning_rate as f32);
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.num_boost_round);
        config.set_min_leaf_size(self.min_leaf_size);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("LogLikelyhood");
        // No row/column subsampling: gbdt samples with an unseeded generator.
        config.set_data_sample_ratio(1.0);
        config.set_feature_sample_ratio(1.0);

        let mut gbdt = GBDT::new(&config);
        let mut train_x = Self::to_data(x, Some(y));
        gbdt.fit(&mut train_x);

        self.model = Some(gbdt);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let model = self.model.as_ref().ok_or_else(|| {
            PipelineError::model(Stage::Prediction, self.name(), "model has not been fitted")
        })?;
        let test_x = Self::to_data(x, None);
        let probabilities = model.predict(&test_x);
        Ok(probabilities
            .into_iter()
            .map(|p| usize::from(p >= 0.5))
            .collect())
    }

    fn name(&self) -> &str {
        "GradientBoostedTrees"
    }
}
