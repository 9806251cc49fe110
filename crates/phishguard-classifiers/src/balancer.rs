//! Random oversampling of minority classes.
use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data_handling::{class_counts, LabeledDataset};
use crate::error::{PipelineError, Result, Stage};

/// Class counts before and after balancing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub before: BTreeMap<usize, usize>,
    pub after: BTreeMap<usize, usize>,
}

impl BalanceReport {
    pub fn rows_added(&self) -> usize {
        self.after.values().sum::<usize>() - self.before.values().sum::<usize>()
    }
}

/// Duplicates rows of every non-majority class, drawn uniformly with
/// replacement, until each class matches the majority count. Original rows
/// keep their positions; duplicates are appended class by class.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOverSampler;

impl RandomOverSampler {
    pub fn new() -> Self {
        RandomOverSampler
    }

    pub fn fit_resample<R: Rng>(
        &self,
        dataset: &LabeledDataset,
        rng: &mut R,
    ) -> Result<(LabeledDataset, BalanceReport)> {
        let before = dataset.class_counts();
        let majority = before.values().copied().max().ok_or_else(|| {
            PipelineError::schema(Stage::Balancing, "cannot balance an empty training split")
        })?;

        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in dataset.labels.iter().enumerate() {
            by_class.entry(label).or_default().push(idx);
        }

        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        for members in by_class.values() {
            for _ in members.len()..majority {
                indices.push(members[rng.gen_range(0..members.len())]);
            }
        }

        let balanced = dataset.subset(&indices);
        let report = BalanceReport {
            before,
            after: class_counts(&balanced.labels),
        };
        Ok((balanced, report))
    }
}
