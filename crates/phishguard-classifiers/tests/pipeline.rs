mod common;

use phishguard_classifiers::artifacts::{ArrayArtifact, ArtifactKind, ArtifactStore};
use phishguard_classifiers::validation::ValidationReport;
use phishguard_classifiers::{
    PipelineConfig, PipelineError, PipelineVariant, RunContext, TrainingPipeline,
};
use tempfile::tempdir;

fn tabular_config() -> PipelineConfig {
    PipelineConfig {
        cv_folds: 3,
        ..PipelineConfig::default()
    }
}

#[test]
fn tabular_run_persists_every_artifact() {
    let dir = tempdir().unwrap();
    let ctx = RunContext::new(42, dir.path());
    let pipeline = TrainingPipeline::new(PipelineVariant::Tabular, tabular_config(), ctx).unwrap();
    let outcome = pipeline.run(&common::phishing_table()).unwrap();

    assert!(outcome.held_out.accuracy >= 0.95);
    assert!(outcome.tuning.is_some());
    assert_eq!(outcome.candidates.len(), 3);

    let layout = &outcome.artifacts;
    for path in [
        &layout.preprocessor,
        &layout.model,
        &layout.train,
        &layout.test,
        &layout.validation_report,
        &layout.training_report,
    ] {
        assert!(path.exists(), "{} was not written", path.display());
    }

    // The test split is never oversampled.
    let report = ValidationReport::read_csv(&layout.validation_report).unwrap();
    assert_eq!(report.x_test_shape, "(24, 30)");
    assert_eq!(outcome.balance.before.values().sum::<usize>(), 96);
    let after: Vec<usize> = outcome.balance.after.values().copied().collect();
    assert_eq!(after[0], after[1]);

    let store = ArtifactStore::new(dir.path());
    let test: ArrayArtifact = store
        .load(&layout.test, PipelineVariant::Tabular, ArtifactKind::TestArrays)
        .unwrap();
    assert_eq!(test.x.dim(), (24, 30));
    assert_eq!(test.y.len(), 24);
    let train: ArrayArtifact = store
        .load(&layout.train, PipelineVariant::Tabular, ArtifactKind::TrainArrays)
        .unwrap();
    assert_eq!(train.y.len(), after.iter().sum::<usize>());
}

#[test]
fn same_seed_same_outcome() {
    let run = || {
        let dir = tempdir().unwrap();
        let ctx = RunContext::new(7, dir.path());
        TrainingPipeline::new(PipelineVariant::Tabular, tabular_config(), ctx)
            .unwrap()
            .run(&common::phishing_table())
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.winner, second.winner);
    assert_eq!(first.params, second.params);
    assert_eq!(first.held_out, second.held_out);
    assert_eq!(first.balance, second.balance);
}

#[test]
fn rejected_model_leaves_previous_artifact_untouched() {
    let dir = tempdir().unwrap();
    let ctx = RunContext::new(42, dir.path());
    let outcome = TrainingPipeline::new(PipelineVariant::Tabular, tabular_config(), ctx.clone())
        .unwrap()
        .run(&common::phishing_table())
        .unwrap();
    let before = std::fs::read(&outcome.artifacts.model).unwrap();

    let strict = PipelineConfig {
        expected_accuracy: 0.99,
        tune: false,
        ..PipelineConfig::default()
    };
    let result = TrainingPipeline::new(PipelineVariant::Tabular, strict, ctx)
        .unwrap()
        .run(&common::noise_table());
    match result {
        Err(PipelineError::QualityGateFailure {
            accuracy, threshold, ..
        }) => {
            assert!(accuracy < threshold);
            assert_eq!(threshold, 0.99);
        }
        other => panic!("expected a quality gate failure, got {:?}", other.map(|o| o.winner)),
    }

    let after = std::fs::read(&outcome.artifacts.model).unwrap();
    assert_eq!(before, after);
}

#[test]
fn text_run_selects_by_precision() {
    let dir = tempdir().unwrap();
    let ctx = RunContext::new(42, dir.path());
    let outcome = TrainingPipeline::new(PipelineVariant::Text, PipelineConfig::default(), ctx)
        .unwrap()
        .run(&common::sms_corpus())
        .unwrap();

    assert_eq!(outcome.label_mapping.classes(), &["ham".to_string(), "spam".to_string()]);
    assert!(outcome.tuning.is_none());
    assert_eq!(outcome.candidates.len(), 3);
    assert!(outcome.artifacts.model.ends_with("text/model.bin"));
    assert!(outcome.artifacts.model.exists());
}

#[test]
fn missing_target_column_fails_ingestion() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        target_column: "label".to_string(),
        ..PipelineConfig::default()
    };
    let result = TrainingPipeline::new(
        PipelineVariant::Tabular,
        config,
        RunContext::new(1, dir.path()),
    )
    .unwrap()
    .run(&common::phishing_table());
    assert!(matches!(result, Err(PipelineError::IngestionFailure { .. })));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = PipelineConfig {
        test_size: 1.5,
        ..PipelineConfig::default()
    };
    let result = TrainingPipeline::new(
        PipelineVariant::Tabular,
        config,
        RunContext::new(1, "unused"),
    );
    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}

#[test]
fn text_runs_are_reproducible() {
    let run = || {
        let dir = tempdir().unwrap();
        let ctx = RunContext::new(11, dir.path());
        TrainingPipeline::new(PipelineVariant::Text, PipelineConfig::default(), ctx)
            .unwrap()
            .run(&common::sms_corpus())
            .unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.winner, second.winner);
    assert_eq!(first.held_out, second.held_out);
    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.validation, second.validation);
}

#[test]
fn missing_training_file_fails_ingestion() {
    let dir = tempdir().unwrap();
    let result = TrainingPipeline::new(
        PipelineVariant::Text,
        PipelineConfig::default(),
        RunContext::new(1, dir.path()),
    )
    .unwrap()
    .run_from_csv(dir.path().join("spam.csv"));
    assert!(matches!(result, Err(PipelineError::IngestionFailure { .. })));
}
