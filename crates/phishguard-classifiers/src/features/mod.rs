//! Feature extraction for the three kinds of raw input: tabular indicator
//! rows, free-text messages and live URLs.
pub mod stemmer;
pub mod tabular;
pub mod text;
pub mod url;

use crate::data_handling::RecordFrame;
use crate::error::{PipelineError, Result, Stage};

pub use tabular::prepare_tabular;
pub use text::{prepare_text, TextNormalizer};
pub use url::{HttpFetcher, PageFetcher, UrlExtraction, UrlFeatureExtractor};

/// Ordered, named numeric features for one input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, value)| *value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-row frame with the vector's names as columns.
    pub fn to_frame(&self) -> Result<RecordFrame> {
        RecordFrame::new(
            self.names().map(str::to_string).collect(),
            vec![self.values().map(format_number).collect()],
        )
        .map_err(|e| PipelineError::schema(Stage::Transformation, e.to_string()))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
