//! Inference against trained artifacts.
use std::path::Path;

use crate::artifacts::{ArtifactStore, ModelArtifact};
use crate::config::PipelineVariant;
use crate::context::RunContext;
use crate::data_handling::{read_csv, write_csv, RecordFrame};
use crate::error::{PipelineError, Result, Stage};
use crate::features::{PageFetcher, UrlFeatureExtractor};
use crate::models::ClassifierModel;
use crate::preprocessing::Preprocessor;

/// Column appended to text batch predictions.
pub const TEXT_PREDICTION_COLUMN: &str = "prediction";

/// Label of one URL, with whether its page could be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPrediction {
    pub label: String,
    pub degraded: bool,
}

/// Loads the artifact pair for a variant on every call, so a retrained model
/// is picked up without restarting.
pub struct PredictionService {
    store: ArtifactStore,
    extractor: UrlFeatureExtractor,
    log_target: String,
}

impl PredictionService {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            store: ArtifactStore::new(ctx.artifact_root()),
            extractor: UrlFeatureExtractor::default().with_log_target(ctx.log_target()),
            log_target: ctx.log_target().to_string(),
        }
    }

    /// Replace the page fetcher used for URL predictions.
    pub fn with_fetcher(mut self, fetcher: Box<dyn PageFetcher>) -> Self {
        self.extractor = UrlFeatureExtractor::new(fetcher).with_log_target(self.log_target.clone());
        self
    }

    fn load(&self, variant: PipelineVariant) -> Result<(Preprocessor, ModelArtifact)> {
        self.store.load_pair(variant)
    }

    fn label_rows(
        &self,
        preprocessor: &Preprocessor,
        model: &ModelArtifact,
        frame: &RecordFrame,
    ) -> Result<Vec<String>> {
        let x = preprocessor.transform(frame)?;
        let predictions = model.model.predict(&x)?;
        predictions
            .into_iter()
            .map(|class| {
                model
                    .label_mapping
                    .name(class)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        PipelineError::schema(
                            Stage::Prediction,
                            format!("model predicted unknown class {}", class),
                        )
                    })
            })
            .collect()
    }

    /// Label every row of `frame`; the frame must carry the fitted schema.
    pub fn predict_frame(&self, variant: PipelineVariant, frame: &RecordFrame) -> Result<Vec<String>> {
        let (preprocessor, model) = self.load(variant)?;
        self.label_rows(&preprocessor, &model, frame)
    }

    /// Read `input`, append a label column and write the table to `output`.
    /// Tabular labels go under the target column the model was trained with,
    /// text labels under `prediction`.
    pub fn predict_batch<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        variant: PipelineVariant,
        input: P,
        output: Q,
    ) -> Result<RecordFrame> {
        let frame = read_csv(input.as_ref())?;
        let (preprocessor, model) = self.load(variant)?;
        let labels = self.label_rows(&preprocessor, &model, &frame)?;
        let column = match variant {
            PipelineVariant::Tabular => model.target_column.as_str(),
            PipelineVariant::Text => TEXT_PREDICTION_COLUMN,
        };
        let labeled = frame.with_column(column, labels)?;

        let output = output.as_ref();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        write_csv(&labeled, output)?;
        log::info!(
            target: &self.log_target,
            "Wrote {} predictions to {}",
            labeled.nrows(),
            output.display()
        );
        Ok(labeled)
    }

    /// Extract indicators from a live URL and score them with the tabular
    /// artifacts.
    pub fn predict_url(&self, url: &str) -> Result<UrlPrediction> {
        let (preprocessor, model) = self.load(PipelineVariant::Tabular)?;
        let extraction = self.extractor.extract(url);
        let frame = extraction.features.to_frame()?;
        let label = self
            .label_rows(&preprocessor, &model, &frame)?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::schema(Stage::Prediction, "no prediction produced"))?;
        Ok(UrlPrediction {
            label,
            degraded: extraction.degraded,
        })
    }

    /// Score one free-text message with the text artifacts.
    pub fn predict_message(&self, message: &str) -> Result<String> {
        if message.trim().is_empty() {
            return Err(PipelineError::schema(Stage::Prediction, "input cannot be empty"));
        }
        let (preprocessor, model) = self.load(PipelineVariant::Text)?;
        let column = preprocessor.schema.columns.first().cloned().ok_or_else(|| {
            PipelineError::schema(Stage::Prediction, "text schema has no message column")
        })?;
        let frame = RecordFrame::new(vec![column], vec![vec![message.to_string()]])?;
        self.label_rows(&preprocessor, &model, &frame)?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::schema(Stage::Prediction, "no prediction produced"))
    }
}
