use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    Balancing,
    Selection,
    Tuning,
    Persistence,
    Prediction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::Validation => "validation",
            Stage::Transformation => "transformation",
            Stage::Balancing => "balancing",
            Stage::Selection => "selection",
            Stage::Tuning => "tuning",
            Stage::Persistence => "persistence",
            Stage::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

/// Failures raised by the training and inference pipelines.
///
/// A failing stage aborts the whole run; callers are expected to translate
/// these into user-facing messages rather than retry.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[{stage}] cannot ingest {source_name}: {reason}")]
    IngestionFailure {
        stage: Stage,
        source_name: String,
        reason: String,
    },

    #[error("[{stage}] schema mismatch: {detail}")]
    SchemaMismatch { stage: Stage, detail: String },

    #[error("artifact not found at {}; run training first", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("artifact at {} is unreadable: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    #[error("quality gate rejected {model}: accuracy {accuracy:.4} is below threshold {threshold}")]
    QualityGateFailure {
        model: String,
        accuracy: f64,
        threshold: f64,
    },

    #[error("[{stage}] model {model} failed: {reason}")]
    ModelFailure {
        stage: Stage,
        model: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn schema(stage: Stage, detail: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch {
            stage,
            detail: detail.into(),
        }
    }

    pub fn ingestion(source_name: impl Into<String>, reason: impl fmt::Display) -> Self {
        PipelineError::IngestionFailure {
            stage: Stage::Ingestion,
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn model(stage: Stage, model: impl Into<String>, reason: impl fmt::Display) -> Self {
        PipelineError::ModelFailure {
            stage,
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
