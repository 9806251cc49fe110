//! Fitted preprocessing for both pipeline variants.
//!
//! A [`Preprocessor`] is learned from the training split only and then
//! applied unchanged to the test split and to every inference input. It owns
//! an explicit [`FeatureSchema`], so callers never have to guess which input
//! columns it expects.
//!
//! * Tabular: most-frequent imputation followed by robust scaling
//!   (`(x - median) / IQR`).
//! * Text: message normalization followed by TF-IDF with a capped
//!   vocabulary and L2-normalized rows.
use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::PipelineVariant;
use crate::data_handling::RecordFrame;
use crate::error::{PipelineError, Result, Stage};
use crate::features::tabular::parse_cell;
use crate::features::TextNormalizer;

/// Ordered input column names a preprocessor was fitted on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    pub variant: PipelineVariant,
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(variant: PipelineVariant, columns: Vec<String>) -> Self {
        Self { variant, columns }
    }

    /// Drop extra columns and reorder to the schema; missing columns fail.
    pub fn align(&self, frame: &RecordFrame) -> Result<RecordFrame> {
        frame.select_columns(&self.columns, Stage::Transformation)
    }
}

/// Per-column imputation and robust scaling parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RobustScaler {
    /// Most frequent training value per column, used for missing cells.
    pub fill: Vec<f64>,
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl RobustScaler {
    pub fn fit(frame: &RecordFrame) -> Result<Self> {
        if frame.nrows() == 0 {
            return Err(PipelineError::schema(
                Stage::Transformation,
                "cannot fit a scaler on an empty frame",
            ));
        }

        let mut fill = Vec::with_capacity(frame.ncols());
        let mut center = Vec::with_capacity(frame.ncols());
        let mut scale = Vec::with_capacity(frame.ncols());
        for (col, name) in frame.columns().iter().enumerate() {
            let parsed = frame
                .rows()
                .iter()
                .map(|row| parse_cell(&row[col], name))
                .collect::<Result<Vec<Option<f64>>>>()?;

            let mut present: Vec<f64> = parsed.iter().flatten().copied().collect();
            present.sort_by(f64::total_cmp);
            let mode = most_frequent(&present).unwrap_or(0.0);

            let mut imputed: Vec<f64> = parsed.iter().map(|v| v.unwrap_or(mode)).collect();
            imputed.sort_by(f64::total_cmp);
            let median = quantile(&imputed, 0.5);
            let iqr = quantile(&imputed, 0.75) - quantile(&imputed, 0.25);

            fill.push(mode);
            center.push(median);
            scale.push(if iqr == 0.0 { 1.0 } else { iqr });
        }

        Ok(Self {
            fill,
            center,
            scale,
        })
    }

    /// `frame` must already be aligned to the fitted column order.
    pub fn transform(&self, frame: &RecordFrame) -> Result<Array2<f64>> {
        if frame.ncols() != self.center.len() {
            return Err(PipelineError::schema(
                Stage::Transformation,
                format!(
                    "scaler fitted on {} columns, got {}",
                    self.center.len(),
                    frame.ncols()
                ),
            ));
        }
        let mut out = Array2::<f64>::zeros((frame.nrows(), frame.ncols()));
        for (r, row) in frame.rows().iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let value = parse_cell(cell, &frame.columns()[c])?.unwrap_or(self.fill[c]);
                out[[r, c]] = (value - self.center[c]) / self.scale[c];
            }
        }
        Ok(out)
    }
}

/// Mode of an ascending slice; ties resolve to the smallest value.
fn most_frequent(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let value = sorted[i];
        let mut j = i;
        while j < sorted.len() && sorted[j] == value {
            j += 1;
        }
        let count = j - i;
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
        i = j;
    }
    best.map(|(value, _)| value)
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Term-frequency / inverse-document-frequency vectorizer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TfidfVectorizer {
    /// Term -> output column; columns are in alphabetical term order.
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary (capped at `max_features` most frequent terms,
    /// ties alphabetical) and smoothed idf weights from normalized documents.
    pub fn fit(documents: &[String], max_features: usize) -> Self {
        let mut term_counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in documents {
            let mut seen = std::collections::BTreeSet::new();
            for term in terms(doc) {
                *term_counts.entry(term).or_insert(0) += 1;
                if seen.insert(term) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        // BTreeMap order is alphabetical and the sort is stable.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(max_features);
        let mut kept: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        kept.sort_unstable();

        let n_docs = documents.len() as f64;
        let idf = kept
            .iter()
            .map(|term| {
                let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = kept
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();

        Self { vocabulary, idf }
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Unseen terms are ignored; an all-unseen document becomes a zero row.
    pub fn transform(&self, documents: &[String]) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((documents.len(), self.n_features()));
        for (r, doc) in documents.iter().enumerate() {
            for term in terms(doc) {
                if let Some(&c) = self.vocabulary.get(term) {
                    out[[r, c]] += 1.0;
                }
            }
            let mut row = out.row_mut(r);
            for (c, value) in row.iter_mut().enumerate() {
                *value *= self.idf[c];
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }
        out
    }
}

/// Terms of a normalized document: whitespace-separated, at least two
/// characters long.
fn terms(doc: &str) -> impl Iterator<Item = &str> {
    doc.split_whitespace().filter(|t| t.chars().count() >= 2)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PreprocessorKind {
    Tabular(RobustScaler),
    Text(TfidfVectorizer),
}

/// Fitted preprocessing state plus the schema it was fitted on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Preprocessor {
    pub schema: FeatureSchema,
    pub kind: PreprocessorKind,
}

impl Preprocessor {
    /// Fit on a training feature frame. For the text variant the frame holds
    /// the single message column.
    pub fn fit(variant: PipelineVariant, frame: &RecordFrame, max_features: usize) -> Result<Self> {
        let schema = FeatureSchema::new(variant, frame.columns().to_vec());
        let kind = match variant {
            PipelineVariant::Tabular => PreprocessorKind::Tabular(RobustScaler::fit(frame)?),
            PipelineVariant::Text => {
                let documents = normalized_documents(&schema, frame)?;
                let vectorizer = TfidfVectorizer::fit(&documents, max_features);
                if vectorizer.n_features() == 0 {
                    return Err(PipelineError::schema(
                        Stage::Transformation,
                        "training messages produced an empty vocabulary",
                    ));
                }
                PreprocessorKind::Text(vectorizer)
            }
        };
        Ok(Self { schema, kind })
    }

    pub fn variant(&self) -> PipelineVariant {
        self.schema.variant
    }

    pub fn n_features(&self) -> usize {
        match &self.kind {
            PreprocessorKind::Tabular(scaler) => scaler.center.len(),
            PreprocessorKind::Text(vectorizer) => vectorizer.n_features(),
        }
    }

    /// Align `frame` to the schema and produce the model matrix.
    pub fn transform(&self, frame: &RecordFrame) -> Result<Array2<f64>> {
        let aligned = self.schema.align(frame)?;
        match &self.kind {
            PreprocessorKind::Tabular(scaler) => scaler.transform(&aligned),
            PreprocessorKind::Text(vectorizer) => {
                let documents = normalized_documents(&self.schema, &aligned)?;
                Ok(vectorizer.transform(&documents))
            }
        }
    }

    /// CRC32 of the encoded state; ties a model to the preprocessor it was
    /// trained against.
    pub fn fingerprint(&self) -> Result<u32> {
        let bytes = bincode::serialize(self).map_err(|e| {
            PipelineError::schema(Stage::Persistence, format!("cannot encode preprocessor: {}", e))
        })?;
        Ok(crc32fast::hash(&bytes))
    }
}

fn normalized_documents(schema: &FeatureSchema, frame: &RecordFrame) -> Result<Vec<String>> {
    let column = schema.columns.first().ok_or_else(|| {
        PipelineError::schema(Stage::Transformation, "text schema has no message column")
    })?;
    let values = frame.column_values(column).ok_or_else(|| {
        PipelineError::schema(
            Stage::Transformation,
            format!("message column '{}' is missing", column),
        )
    })?;
    let normalizer = TextNormalizer::new();
    Ok(values.iter().map(|v| normalizer.normalize(v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: &[&str], rows: &[&[&str]]) -> RecordFrame {
        RecordFrame::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.5), 2.5);
        assert_eq!(quantile(&v, 0.25), 1.75);
        assert_eq!(quantile(&v, 0.75), 3.25);
    }

    #[test]
    fn mode_ties_go_to_smallest() {
        assert_eq!(most_frequent(&[-1.0, -1.0, 1.0, 1.0]), Some(-1.0));
        assert_eq!(most_frequent(&[0.0, 1.0, 1.0]), Some(1.0));
        assert_eq!(most_frequent(&[]), None);
    }

    #[test]
    fn robust_scaler_imputes_then_scales() {
        let f = frame(&["a", "b"], &[&["1", "5"], &["2", "5"], &["3", "?"], &["4", "5"]]);
        let scaler = RobustScaler::fit(&f).unwrap();
        assert_eq!(scaler.fill[1], 5.0);
        // Constant column: zero IQR is treated as 1.
        assert_eq!(scaler.scale[1], 1.0);
        let x = scaler.transform(&f).unwrap();
        assert!((x[[0, 0]] - (1.0 - 2.5) / 1.5).abs() < 1e-12);
        assert_eq!(x[[2, 1]], 0.0);
    }

    #[test]
    fn non_numeric_cells_are_schema_mismatches() {
        let f = frame(&["a"], &[&["1"], &["abc"]]);
        assert!(matches!(
            RobustScaler::fit(&f),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn tfidf_caps_vocabulary_by_frequency_then_alphabet() {
        let docs = vec!["bb aa cc".to_string(), "cc dd".to_string(), "x".to_string()];
        let v = TfidfVectorizer::fit(&docs, 2);
        // cc appears twice; aa wins the tie over bb and dd alphabetically.
        let terms: Vec<&str> = v.vocabulary.keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["aa", "cc"]);
        assert_eq!(v.vocabulary["aa"], 0);
        let expected_idf_cc = (4.0f64 / 3.0).ln() + 1.0;
        assert!((v.idf[1] - expected_idf_cc).abs() < 1e-12);
    }

    #[test]
    fn tfidf_rows_are_unit_length_and_unseen_terms_ignored() {
        let docs = vec!["win cash".to_string(), "see later".to_string()];
        let v = TfidfVectorizer::fit(&docs, 3000);
        let x = v.transform(&["win win cash".to_string(), "unknown".to_string()]);
        let norm: f64 = x.row(0).iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(x.row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn transform_aligns_columns_and_rejects_missing_ones() {
        let train = frame(&["a", "b"], &[&["1", "2"], &["3", "4"]]);
        let pre = Preprocessor::fit(PipelineVariant::Tabular, &train, 3000).unwrap();

        let shuffled = frame(&["extra", "b", "a"], &[&["z", "2", "1"]]);
        let x = pre.transform(&shuffled).unwrap();
        let direct = pre.transform(&train).unwrap();
        assert_eq!(x.row(0), direct.row(0));

        let missing = frame(&["a"], &[&["1"]]);
        assert!(matches!(
            pre.transform(&missing),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_fitted_state() {
        let a = frame(&["a"], &[&["1"], &["2"]]);
        let b = frame(&["a"], &[&["1"], &["9"]]);
        let pa = Preprocessor::fit(PipelineVariant::Tabular, &a, 10).unwrap();
        let pb = Preprocessor::fit(PipelineVariant::Tabular, &b, 10).unwrap();
        assert_eq!(pa.fingerprint().unwrap(), pa.clone().fingerprint().unwrap());
        assert_ne!(pa.fingerprint().unwrap(), pb.fingerprint().unwrap());
    }
}
