//! Offline training run shared by both pipeline variants.
//!
//! `ingest -> split -> balance (train only) -> fit preprocessor (train only)
//! -> transform -> validation report -> model selection -> persist`.
//!
//! Artifacts other than the validation report are written only after the
//! selected model passes the quality gate, so a rejected run leaves any
//! previously trained artifacts untouched.
use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::artifacts::{ArrayArtifact, ArtifactKind, ArtifactLayout, ArtifactStore, ModelArtifact};
use crate::balancer::{BalanceReport, RandomOverSampler};
use crate::config::{ModelKind, PipelineConfig, PipelineVariant};
use crate::context::RunContext;
use crate::data_handling::{read_csv, train_test_split, LabelMapping, LabeledDataset, RecordFrame};
use crate::error::Result;
use crate::features::text::log_text_statistics;
use crate::features::{prepare_tabular, prepare_text};
use crate::metrics::Scores;
use crate::preprocessing::Preprocessor;
use crate::report::training_report;
use crate::selection::{CandidateScore, ModelSelector, SelectionMetric, TuningResult};
use crate::validation::ValidationReport;

const SPLIT_STREAM: u64 = 0;
const BALANCE_STREAM: u64 = 1;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub variant: PipelineVariant,
    pub winner: ModelKind,
    pub params: BTreeMap<String, f64>,
    pub metric: SelectionMetric,
    pub held_out: Scores,
    pub candidates: Vec<CandidateScore>,
    pub tuning: Option<TuningResult>,
    pub balance: BalanceReport,
    pub label_mapping: LabelMapping,
    pub validation: ValidationReport,
    pub artifacts: ArtifactLayout,
    pub finished_at: DateTime<Utc>,
}

pub struct TrainingPipeline {
    variant: PipelineVariant,
    config: PipelineConfig,
    ctx: RunContext,
    store: ArtifactStore,
}

impl TrainingPipeline {
    pub fn new(variant: PipelineVariant, config: PipelineConfig, ctx: RunContext) -> Result<Self> {
        config.validate()?;
        let store = ArtifactStore::new(ctx.artifact_root());
        Ok(Self {
            variant,
            config,
            ctx,
            store,
        })
    }

    pub fn run_from_csv<P: AsRef<Path>>(&self, path: P) -> Result<TrainingOutcome> {
        let path = path.as_ref();
        log::info!(target: self.ctx.log_target(), "Reading {} data from {}", self.variant, path.display());
        let frame = read_csv(path)?;
        self.run(&frame)
    }

    pub fn run(&self, raw: &RecordFrame) -> Result<TrainingOutcome> {
        let target = self.ctx.log_target();
        let layout = self.store.layout(self.variant);

        // Ingestion
        let dataset = self.ingest(raw)?;
        dataset.log_summary(target);
        if self.variant == PipelineVariant::Text {
            log_text_statistics(&dataset, target);
        }

        // Split, then balance the training side only
        let split = train_test_split(&dataset, self.config.test_size, &mut self.ctx.rng(SPLIT_STREAM))?;
        let (train, balance) =
            RandomOverSampler::new().fit_resample(&split.train, &mut self.ctx.rng(BALANCE_STREAM))?;
        log::info!(
            target: target,
            "Oversampled training split {:?} -> {:?} ({} rows added)",
            balance.before,
            balance.after,
            balance.rows_added()
        );
        let test = split.test;

        // Transformation
        let preprocessor = Preprocessor::fit(self.variant, &train.features, self.config.max_features)?;
        let x_train = preprocessor.transform(&train.features)?;
        let x_test = preprocessor.transform(&test.features)?;
        log::info!(
            target: target,
            "Transformed train {:?} and test {:?} into {} features",
            x_train.dim(),
            x_test.dim(),
            preprocessor.n_features()
        );

        // Validation report
        layout.create_dirs()?;
        let validation = ValidationReport::build(
            &train.features,
            &test.features,
            x_train.dim(),
            x_test.dim(),
            &train.class_counts(),
            &test.class_counts(),
        );
        validation.write_csv(&layout.validation_report)?;

        // Selection, tuning and the quality gate
        let mut selector = ModelSelector::new(self.variant, &self.config, &self.ctx);
        let selection = selector.run(&x_train, &train.labels, &x_test, &test.labels)?;

        // Persistence
        let fingerprint = preprocessor.fingerprint()?;
        self.store.save_preprocessor(&preprocessor)?;
        let winner = selection.spec.kind;
        let params = selection.spec.params.clone();
        let model_artifact = ModelArtifact {
            model: selection.model,
            spec: selection.spec,
            label_mapping: dataset.label_mapping.clone(),
            preprocessor_fingerprint: fingerprint,
            schema: preprocessor.schema.clone(),
            held_out: selection.held_out,
            target_column: self.config.target_column.clone(),
        };
        self.store.save_model(self.variant, &model_artifact)?;
        self.store.save_arrays(
            self.variant,
            ArtifactKind::TrainArrays,
            &ArrayArtifact {
                x: x_train,
                y: train.labels.clone(),
            },
        )?;
        self.store.save_arrays(
            self.variant,
            ArtifactKind::TestArrays,
            &ArrayArtifact {
                x: x_test,
                y: test.labels.clone(),
            },
        )?;
        log::info!(target: target, "Artifacts written to {}", layout.dir.display());

        let outcome = TrainingOutcome {
            variant: self.variant,
            winner,
            params,
            metric: selection.metric,
            held_out: selection.held_out,
            candidates: selection.candidates,
            tuning: selection.tuning,
            balance,
            label_mapping: dataset.label_mapping,
            validation,
            artifacts: layout,
            finished_at: Utc::now(),
        };

        let report = training_report(&outcome, &self.config)?;
        report.save_to_file(&outcome.artifacts.training_report)?;
        log::info!(
            target: target,
            "Training report written to {}",
            outcome.artifacts.training_report.display()
        );

        Ok(outcome)
    }

    fn ingest(&self, raw: &RecordFrame) -> Result<LabeledDataset> {
        match self.variant {
            PipelineVariant::Tabular => prepare_tabular(
                raw,
                &self.config.target_column,
                &self.config.drop_columns,
            ),
            PipelineVariant::Text => {
                prepare_text(raw, &self.config.text_column, &self.config.label_column)
            }
        }
    }
}
