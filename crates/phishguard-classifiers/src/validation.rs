//! Single-row summary of a train/test split, written as CSV next to the
//! artifacts of each run.
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data_handling::RecordFrame;
use crate::error::{PipelineError, Result};
use crate::features::tabular::{count_missing, is_numeric};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    #[serde(rename = "X_train_shape")]
    pub x_train_shape: String,
    #[serde(rename = "X_test_shape")]
    pub x_test_shape: String,
    #[serde(rename = "Missing_X_train")]
    pub missing_x_train: usize,
    #[serde(rename = "Missing_X_test")]
    pub missing_x_test: usize,
    #[serde(rename = "Class_distribution_train")]
    pub class_distribution_train: String,
    #[serde(rename = "Class_distribution_test")]
    pub class_distribution_test: String,
    #[serde(rename = "Is_numeric")]
    pub is_numeric: String,
}

impl ValidationReport {
    /// `x_train`/`x_test` are the raw split features (before imputation);
    /// the shapes are those of the matrices fed to the models.
    pub fn build(
        x_train: &RecordFrame,
        x_test: &RecordFrame,
        train_shape: (usize, usize),
        test_shape: (usize, usize),
        train_distribution: &BTreeMap<usize, usize>,
        test_distribution: &BTreeMap<usize, usize>,
    ) -> Self {
        Self {
            x_train_shape: format_shape(train_shape),
            x_test_shape: format_shape(test_shape),
            missing_x_train: count_missing(x_train),
            missing_x_test: count_missing(x_test),
            class_distribution_train: format_distribution(train_distribution),
            class_distribution_test: format_distribution(test_distribution),
            is_numeric: python_bool(is_numeric(x_train) && is_numeric(x_test)).to_string(),
        }
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let to_io = |e: csv::Error| {
            PipelineError::io(path, std::io::Error::new(std::io::ErrorKind::Other, e))
        };
        let mut writer = csv::Writer::from_path(path).map_err(to_io)?;
        writer.serialize(self).map_err(to_io)?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader =
            csv::Reader::from_path(path).map_err(|e| PipelineError::ingestion(path.display().to_string(), e))?;
        reader
            .deserialize()
            .next()
            .ok_or_else(|| PipelineError::ingestion(path.display().to_string(), "empty report"))?
            .map_err(|e| PipelineError::ingestion(path.display().to_string(), e))
    }
}

fn format_shape((rows, cols): (usize, usize)) -> String {
    format!("({}, {})", rows, cols)
}

fn format_distribution(distribution: &BTreeMap<usize, usize>) -> String {
    let parts: Vec<String> = distribution
        .iter()
        .map(|(class, count)| format!("{}: {}", class, count))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn formats_like_the_report_consumers_expect() {
        let train = RecordFrame::new(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec!["1".into(), "?".into()],
                vec!["".into(), "2".into()],
            ],
        )
        .unwrap();
        let test = RecordFrame::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".into(), "x".into()]],
        )
        .unwrap();
        let mut dist = BTreeMap::new();
        dist.insert(0, 2);
        dist.insert(1, 2);
        let report = ValidationReport::build(&train, &test, (4, 2), (1, 2), &dist, &dist);
        assert_eq!(report.x_train_shape, "(4, 2)");
        assert_eq!(report.missing_x_train, 2);
        assert_eq!(report.missing_x_test, 0);
        assert_eq!(report.class_distribution_train, "{0: 2, 1: 2}");
        assert_eq!(report.is_numeric, "False");

        let dir = tempdir().unwrap();
        let path = dir.path().join("validation_report.csv");
        report.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "X_train_shape,X_test_shape,Missing_X_train,Missing_X_test,\
             Class_distribution_train,Class_distribution_test,Is_numeric"
        ));
        assert_eq!(ValidationReport::read_csv(&path).unwrap(), report);
    }
}
