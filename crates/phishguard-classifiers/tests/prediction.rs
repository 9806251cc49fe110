mod common;

use phishguard_classifiers::config::ModelKind;
use phishguard_classifiers::data_handling::{read_csv, write_csv, LabelMapping, RecordFrame};
use phishguard_classifiers::features::url::URL_FEATURE_NAMES;
use phishguard_classifiers::features::UrlFeatureExtractor;
use phishguard_classifiers::models::{build_model, ClassifierModel};
use phishguard_classifiers::preprocessing::Preprocessor;
use phishguard_classifiers::{
    ModelSpec, PipelineConfig, PipelineError, PipelineVariant, PredictionService, RunContext,
    TrainingPipeline,
};
use tempfile::{tempdir, TempDir};

fn trained(variant: PipelineVariant, frame: &RecordFrame) -> (TempDir, RunContext) {
    let dir = tempdir().unwrap();
    let ctx = RunContext::new(42, dir.path());
    let config = PipelineConfig {
        cv_folds: 3,
        ..PipelineConfig::default()
    };
    TrainingPipeline::new(variant, config, ctx.clone())
        .unwrap()
        .run(frame)
        .unwrap();
    (dir, ctx)
}

#[test]
fn two_message_corpus_flags_unseen_spam() {
    let frame = RecordFrame::new(
        vec!["v2".to_string()],
        vec![
            vec!["WIN FREE CASH NOW!!!".to_string()],
            vec!["see you at 5pm".to_string()],
        ],
    )
    .unwrap();
    let (mapping, labels) = LabelMapping::fit_encoder(&["spam", "ham"]).unwrap();

    let preprocessor = Preprocessor::fit(PipelineVariant::Text, &frame, 3000).unwrap();
    let x = preprocessor.transform(&frame).unwrap();
    let mut model = build_model(&ModelSpec::new(ModelKind::MultinomialNb));
    model.fit(&x, &labels).unwrap();

    let query = RecordFrame::new(
        vec!["v2".to_string()],
        vec![vec!["Claim your free prize now".to_string()]],
    )
    .unwrap();
    let predicted = model.predict(&preprocessor.transform(&query).unwrap()).unwrap();
    assert_eq!(mapping.name(predicted[0]), Some("spam"));
}

#[test]
fn suspicious_indicator_row_is_phishing() {
    let (dir, ctx) = trained(PipelineVariant::Tabular, &common::phishing_table());
    let service = PredictionService::new(&ctx);

    let labels = service
        .predict_frame(PipelineVariant::Tabular, &common::unlabeled_indicators())
        .unwrap();
    assert_eq!(labels, vec!["phishing".to_string(), "safe".to_string()]);

    let input = dir.path().join("incoming.csv");
    let output = dir.path().join("out").join("labeled.csv");
    write_csv(&common::unlabeled_indicators(), &input).unwrap();
    service
        .predict_batch(PipelineVariant::Tabular, &input, &output)
        .unwrap();
    let written = read_csv(&output).unwrap();
    assert_eq!(written.columns().last().map(String::as_str), Some("Result"));
    assert_eq!(
        written.column_values("Result").unwrap(),
        vec!["phishing", "safe"]
    );
}

#[test]
fn url_prediction_survives_failed_fetch() {
    let (_dir, ctx) = trained(PipelineVariant::Tabular, &common::phishing_table());
    let service = PredictionService::new(&ctx).with_fetcher(Box::new(common::Unreachable));

    let prediction = service.predict_url("http://bit.ly/3xYzAb").unwrap();
    assert!(prediction.degraded);
    assert!(prediction.label == "phishing" || prediction.label == "safe");
}

#[test]
fn shortener_flag_does_not_depend_on_fetch() {
    let extraction = UrlFeatureExtractor::new(Box::new(common::Unreachable))
        .extract("https://bit.ly/promo");
    assert!(extraction.degraded);
    assert_eq!(extraction.features.len(), URL_FEATURE_NAMES.len());
    assert_eq!(extraction.features.get("Shortining_Service"), Some(1.0));
    let names: Vec<&str> = extraction.features.names().collect();
    assert_eq!(names, URL_FEATURE_NAMES.to_vec());
}

#[test]
fn message_prediction_uses_text_artifacts() {
    let (dir, ctx) = trained(PipelineVariant::Text, &common::sms_corpus());
    let service = PredictionService::new(&ctx);

    assert_eq!(service.predict_message("Claim your free prize now").unwrap(), "spam");

    let input = dir.path().join("messages.csv");
    let output = dir.path().join("messages_labeled.csv");
    let frame = RecordFrame::new(
        vec!["id".to_string(), "v2".to_string()],
        vec![
            vec!["a".to_string(), "URGENT: claim your free cash prize".to_string()],
            vec!["b".to_string(), "see you at lunch tomorrow".to_string()],
        ],
    )
    .unwrap();
    write_csv(&frame, &input).unwrap();
    let labeled = service
        .predict_batch(PipelineVariant::Text, &input, &output)
        .unwrap();
    assert_eq!(
        labeled.column_values("prediction").unwrap(),
        vec!["spam", "ham"]
    );
}

#[test]
fn empty_message_is_rejected() {
    let (_dir, ctx) = trained(PipelineVariant::Text, &common::sms_corpus());
    let result = PredictionService::new(&ctx).predict_message("   ");
    assert!(matches!(result, Err(PipelineError::SchemaMismatch { .. })));
}

#[test]
fn predicting_before_training_reports_missing_artifact() {
    let dir = tempdir().unwrap();
    let service = PredictionService::new(&RunContext::new(0, dir.path()));
    assert!(matches!(
        service.predict_message("hello there"),
        Err(PipelineError::ArtifactNotFound { .. })
    ));
    assert!(matches!(
        service.predict_frame(PipelineVariant::Tabular, &common::unlabeled_indicators()),
        Err(PipelineError::ArtifactNotFound { .. })
    ));
}

#[test]
fn frame_without_fitted_columns_is_a_schema_mismatch() {
    let (_dir, ctx) = trained(PipelineVariant::Tabular, &common::phishing_table());
    let frame = RecordFrame::new(
        vec!["having_IP_Address".to_string()],
        vec![vec!["1".to_string()]],
    )
    .unwrap();
    let result = PredictionService::new(&ctx).predict_frame(PipelineVariant::Tabular, &frame);
    assert!(matches!(result, Err(PipelineError::SchemaMismatch { .. })));
}

#[test]
fn batch_labels_use_the_trained_target_column() {
    let table = common::phishing_table();
    let columns = table
        .columns()
        .iter()
        .map(|c| if c == "Result" { "label".to_string() } else { c.clone() })
        .collect();
    let renamed = RecordFrame::new(columns, table.rows().to_vec()).unwrap();

    let dir = tempdir().unwrap();
    let ctx = RunContext::new(42, dir.path());
    let config = PipelineConfig {
        target_column: "label".to_string(),
        tune: false,
        ..PipelineConfig::default()
    };
    TrainingPipeline::new(PipelineVariant::Tabular, config, ctx.clone())
        .unwrap()
        .run(&renamed)
        .unwrap();

    let input = dir.path().join("incoming.csv");
    let output = dir.path().join("labeled.csv");
    write_csv(&common::unlabeled_indicators(), &input).unwrap();
    let labeled = PredictionService::new(&ctx)
        .predict_batch(PipelineVariant::Tabular, &input, &output)
        .unwrap();
    assert_eq!(labeled.columns().last().map(String::as_str), Some("label"));
    assert!(labeled.column_index("Result").is_none());
    assert_eq!(
        labeled.column_values("label").unwrap(),
        vec!["phishing", "safe"]
    );
}
