//! phishguard-classifiers: phishing and spam classification pipelines.
//!
//! The crate trains binary classifiers for two kinds of input, tabular
//! phishing-indicator records (and live URLs reduced to the same indicators)
//! and free-text messages, and serves predictions from the persisted
//! artifacts. Training covers feature extraction, class balancing,
//! preprocessing, multi-model evaluation with grid search and a quality
//! gate; inference reloads the exact preprocessor/model pair that training
//! wrote.
//!
//! All run state (seed, artifact root, log target) travels in a
//! [`context::RunContext`]; failures are the closed set in [`error`].
pub mod artifacts;
pub mod balancer;
pub mod config;
pub mod context;
pub mod data_handling;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prediction;
pub mod preprocessing;
pub mod report;
pub mod selection;
pub mod validation;

pub use config::{ModelKind, ModelSpec, PipelineConfig, PipelineVariant};
pub use context::RunContext;
pub use error::{PipelineError, Result, Stage};
pub use pipeline::{TrainingOutcome, TrainingPipeline};
pub use prediction::PredictionService;
