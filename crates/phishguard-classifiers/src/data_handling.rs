//! Raw tables, labeled datasets and the seeded train/test split.
//!
//! A `RecordFrame` keeps cells as trimmed strings exactly as they were read;
//! interpretation (numeric parsing, missing markers) is left to the
//! preprocessor so that the same frame type carries tabular rows, messages
//! and extracted URL indicators.
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result, Stage};

/// Named, ordered columns of string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFrame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordFrame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::schema(
                    Stage::Ingestion,
                    format!("duplicate column '{}'", name),
                ));
            }
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PipelineError::schema(
                Stage::Ingestion,
                format!(
                    "row {} has {} cells, expected {}",
                    idx + 1,
                    row.len(),
                    columns.len()
                ),
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Reorder to exactly `names`, dropping every other column. Fails when a
    /// required column is absent.
    pub fn select_columns(&self, names: &[String], stage: Stage) -> Result<RecordFrame> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::schema(
                stage,
                format!(
                    "missing required column(s) [{}]; input has [{}]",
                    missing.join(", "),
                    self.columns.join(", ")
                ),
            ));
        }

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(RecordFrame {
            columns: names.to_vec(),
            rows,
        })
    }

    pub fn drop_columns(&self, names: &[String]) -> RecordFrame {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| !names.contains(&self.columns[i]))
            .collect();
        RecordFrame {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> RecordFrame {
        RecordFrame {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Append `name`, or overwrite it when the column already exists.
    pub fn with_column(&self, name: &str, values: Vec<String>) -> Result<RecordFrame> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::schema(
                Stage::Prediction,
                format!(
                    "column '{}' has {} values for {} rows",
                    name,
                    values.len(),
                    self.rows.len()
                ),
            ));
        }
        let mut frame = self.clone();
        match frame.column_index(name) {
            Some(idx) => {
                for (row, value) in frame.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                frame.columns.push(name.to_string());
                for (row, value) in frame.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(frame)
    }
}

/// Read a CSV file into a frame. Cells are trimmed; short rows are padded and
/// undecodable bytes replaced, which is what exported spam corpora need.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RecordFrame> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::ingestion(&source_name, e))?;

    let raw_headers: Vec<String> = reader
        .byte_headers()
        .map_err(|e| PipelineError::ingestion(&source_name, e))?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let headers = unique_headers(raw_headers);
    if headers.is_empty() {
        return Err(PipelineError::ingestion(&source_name, "no header row"));
    }

    let mut rows = Vec::new();
    for (row_idx, result) in reader.byte_records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::ingestion(&source_name, format!("row {}: {}", row_idx + 1, e))
        })?;
        let mut row: Vec<String> = record
            .iter()
            .take(headers.len())
            .map(|cell| String::from_utf8_lossy(cell).trim().to_string())
            .collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    log::debug!("Read {} rows x {} columns from {}", rows.len(), headers.len(), source_name);
    RecordFrame::new(headers, rows).map_err(|e| PipelineError::ingestion(&source_name, e))
}

/// Blank or repeated header cells become `Unnamed: {idx}` (0-based position),
/// so exports with trailing empty columns still load.
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::with_capacity(raw.len());
    for (idx, name) in raw.into_iter().enumerate() {
        let mut candidate = if name.is_empty() || seen.contains(&name) {
            format!("Unnamed: {}", idx)
        } else {
            name
        };
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("Unnamed: {}.{}", idx, suffix);
            suffix += 1;
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
    }
    headers
}

pub fn write_csv<P: AsRef<Path>>(frame: &RecordFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_io_error(path, e))?;
    writer
        .write_record(frame.columns())
        .map_err(|e| csv_io_error(path, e))?;
    for row in frame.rows() {
        writer.write_record(row).map_err(|e| csv_io_error(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

fn csv_io_error(path: &Path, err: csv::Error) -> PipelineError {
    PipelineError::io(path, std::io::Error::new(std::io::ErrorKind::Other, err))
}

/// Index -> human label for a binary classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    classes: Vec<String>,
}

impl LabelMapping {
    /// Tabular indicator rows: `-1` is phishing (0), anything else safe (1).
    pub fn tabular() -> Self {
        Self {
            classes: vec!["phishing".to_string(), "safe".to_string()],
        }
    }

    /// Fit a categorical encoder: distinct labels sorted, index = position.
    pub fn fit_encoder(raw: &[&str]) -> Result<(Self, Vec<usize>)> {
        let classes: Vec<String> = raw
            .iter()
            .map(|s| s.trim().to_string())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() != 2 {
            return Err(PipelineError::ingestion(
                "labels",
                format!(
                    "expected exactly two label values, found {} ({:?})",
                    classes.len(),
                    classes
                ),
            ));
        }
        let mapping = Self { classes };
        let encoded = raw
            .iter()
            .map(|s| mapping.index_of(s.trim()).unwrap_or_default())
            .collect();
        Ok((mapping, encoded))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

/// Encode the tabular target column.
pub fn encode_tabular_labels(raw: &[&str]) -> Result<Vec<usize>> {
    raw.iter()
        .enumerate()
        .map(|(row, value)| {
            let parsed = value.trim().parse::<f64>().map_err(|_| {
                PipelineError::ingestion(
                    "target column",
                    format!("row {}: label '{}' is not numeric", row + 1, value),
                )
            })?;
            Ok(if parsed == -1.0 { 0 } else { 1 })
        })
        .collect()
}

/// Feature records with their encoded labels.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub features: RecordFrame,
    pub labels: Vec<usize>,
    pub label_mapping: LabelMapping,
}

impl LabeledDataset {
    pub fn new(features: RecordFrame, labels: Vec<usize>, label_mapping: LabelMapping) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::schema(
                Stage::Ingestion,
                format!(
                    "{} feature rows but {} labels",
                    features.nrows(),
                    labels.len()
                ),
            ));
        }
        Ok(Self {
            features,
            labels,
            label_mapping,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn subset(&self, indices: &[usize]) -> LabeledDataset {
        LabeledDataset {
            features: self.features.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            label_mapping: self.label_mapping.clone(),
        }
    }

    pub fn class_counts(&self) -> BTreeMap<usize, usize> {
        class_counts(&self.labels)
    }

    pub fn log_summary(&self, target: &str) {
        log::info!(target: target, "----- Input Data Summary -----");
        for (class, count) in self.class_counts() {
            log::info!(
                target: target,
                "{} rows labeled {} ({})",
                count,
                class,
                self.label_mapping.name(class).unwrap_or("?")
            );
        }
        log::info!(target: target, "{} feature columns", self.features.ncols());
    }
}

pub fn class_counts(labels: &[usize]) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Train/test partition of one dataset, produced once per run.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: LabeledDataset,
    pub test: LabeledDataset,
}

/// Shuffle row indices with `rng` and hold out `ceil(test_size * n)` rows.
pub fn train_test_split<R: Rng>(
    dataset: &LabeledDataset,
    test_size: f64,
    rng: &mut R,
) -> Result<Split> {
    let n_samples = dataset.len();
    let n_test = (test_size * n_samples as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(PipelineError::ingestion(
            "dataset",
            format!(
                "{} rows cannot be split with test_size {}",
                n_samples, test_size
            ),
        ));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(rng);
    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(Split {
        train: dataset.subset(train_idx),
        test: dataset.subset(test_idx),
    })
}
