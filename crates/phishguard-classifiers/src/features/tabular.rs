use crate::data_handling::{encode_tabular_labels, LabelMapping, LabeledDataset, RecordFrame};
use crate::error::{PipelineError, Result, Stage};

/// Markers for an absent tabular cell.
pub const MISSING_MARKERS: [&str; 2] = ["", "?"];

pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// Parse a tabular cell. `Ok(None)` is a missing value; anything else that is
/// not a number violates the numeric schema.
pub fn parse_cell(cell: &str, column: &str) -> Result<Option<f64>> {
    if is_missing(cell) {
        return Ok(None);
    }
    cell.trim().parse::<f64>().map(Some).map_err(|_| {
        PipelineError::schema(
            Stage::Transformation,
            format!("column '{}' holds non-numeric value '{}'", column, cell),
        )
    })
}

/// Split a raw indicator table into feature columns and encoded labels. The
/// target and the configured drop columns never become features.
pub fn prepare_tabular(
    frame: &RecordFrame,
    target_column: &str,
    drop_columns: &[String],
) -> Result<LabeledDataset> {
    let raw_labels = frame.column_values(target_column).ok_or_else(|| {
        PipelineError::ingestion(
            "tabular dataset",
            format!(
                "target column '{}' not found in [{}]",
                target_column,
                frame.columns().join(", ")
            ),
        )
    })?;
    let labels = encode_tabular_labels(&raw_labels)?;

    let mut excluded = drop_columns.to_vec();
    excluded.push(target_column.to_string());
    let features = frame.drop_columns(&excluded);
    if features.ncols() == 0 {
        return Err(PipelineError::ingestion(
            "tabular dataset",
            "no feature columns left after removing target and dropped columns",
        ));
    }

    LabeledDataset::new(features, labels, LabelMapping::tabular())
}

/// Number of missing cells across the frame.
pub fn count_missing(frame: &RecordFrame) -> usize {
    frame
        .rows()
        .iter()
        .flat_map(|row| row.iter())
        .filter(|cell| is_missing(cell))
        .count()
}

/// True when every present cell parses as a number.
pub fn is_numeric(frame: &RecordFrame) -> bool {
    frame
        .rows()
        .iter()
        .flat_map(|row| row.iter())
        .all(|cell| is_missing(cell) || cell.trim().parse::<f64>().is_ok())
}
