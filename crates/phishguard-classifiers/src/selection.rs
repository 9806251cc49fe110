//! Candidate evaluation, winner selection, grid search and the quality gate.
//!
//! A [`ModelSelector`] walks
//! `Init -> Evaluate -> SelectBest -> [Tune] -> FinalFit -> Gate -> Done | Rejected`
//! once per training run. Every candidate of the variant's registry is fitted
//! with default parameters and scored on the held-out split; the winner is
//! optionally tuned by stratified k-fold grid search, refitted on the whole
//! training split and finally gated on held-out accuracy.
use std::collections::BTreeMap;

use ndarray::{Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ModelKind, ModelSpec, ParamGrid, PipelineConfig, PipelineVariant};
use crate::context::RunContext;
use crate::error::{PipelineError, Result, Stage};
use crate::metrics::{accuracy, Scores};
use crate::models::{build_model, Classifier, ClassifierModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Init,
    Evaluate,
    SelectBest,
    Tune,
    FinalFit,
    Gate,
    Done,
    Rejected,
}

/// Metric used to pick the winner among candidates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMetric {
    Accuracy,
    Precision,
}

impl SelectionMetric {
    /// Text favors precision (fewer false spam flags); tabular favors accuracy.
    pub fn for_variant(variant: PipelineVariant) -> Self {
        match variant {
            PipelineVariant::Tabular => SelectionMetric::Accuracy,
            PipelineVariant::Text => SelectionMetric::Precision,
        }
    }

    pub fn of(&self, scores: &Scores) -> f64 {
        match self {
            SelectionMetric::Accuracy => scores.accuracy,
            SelectionMetric::Precision => scores.precision,
        }
    }
}

/// Held-out scores of one candidate with default parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub kind: ModelKind,
    pub scores: Scores,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TuningResult {
    pub params: BTreeMap<String, f64>,
    pub mean_accuracy: f64,
    pub combinations: usize,
}

/// Outcome of a run that passed the gate.
#[derive(Debug)]
pub struct Selection {
    pub model: Classifier,
    pub spec: ModelSpec,
    pub metric: SelectionMetric,
    pub candidates: Vec<CandidateScore>,
    pub tuning: Option<TuningResult>,
    pub held_out: Scores,
}

pub struct ModelSelector<'a> {
    variant: PipelineVariant,
    config: &'a PipelineConfig,
    ctx: &'a RunContext,
    state: SelectionState,
    candidates: Vec<CandidateScore>,
}

impl<'a> ModelSelector<'a> {
    pub fn new(variant: PipelineVariant, config: &'a PipelineConfig, ctx: &'a RunContext) -> Self {
        Self {
            variant,
            config,
            ctx,
            state: SelectionState::Init,
            candidates: Vec::new(),
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Scores gathered during evaluation; available even after rejection.
    pub fn candidates(&self) -> &[CandidateScore] {
        &self.candidates
    }

    pub fn run(
        &mut self,
        x_train: &Array2<f64>,
        y_train: &[usize],
        x_test: &Array2<f64>,
        y_test: &[usize],
    ) -> Result<Selection> {
        let target = self.ctx.log_target().to_string();
        let metric = SelectionMetric::for_variant(self.variant);

        self.state = SelectionState::Evaluate;
        self.candidates = evaluate_candidates(
            self.variant.registry(),
            x_train,
            y_train,
            x_test,
            y_test,
        )?;
        for candidate in &self.candidates {
            log::info!(
                target: &target,
                "{}: accuracy {:.4}, precision {:.4}",
                candidate.kind,
                candidate.scores.accuracy,
                candidate.scores.precision
            );
        }

        self.state = SelectionState::SelectBest;
        let best = select_best(&self.candidates, metric).ok_or_else(|| {
            PipelineError::model(Stage::Selection, self.variant.as_str(), "empty model registry")
        })?;
        let winner = self.candidates[best].kind;
        log::info!(
            target: &target,
            "Best model by {:?}: {} ({:.4})",
            metric,
            winner,
            metric.of(&self.candidates[best].scores)
        );

        let mut spec = ModelSpec::new(winner);
        let mut tuning = None;
        if self.variant == PipelineVariant::Tabular && self.config.tune {
            match self.config.param_grids.get(&winner) {
                Some(grid) => {
                    self.state = SelectionState::Tune;
                    let result = grid_search(winner, grid, x_train, y_train, self.config.cv_folds)?;
                    log::info!(
                        target: &target,
                        "Tuned {} over {} combinations: {:?} (cv accuracy {:.4})",
                        winner,
                        result.combinations,
                        result.params,
                        result.mean_accuracy
                    );
                    spec = ModelSpec::with_params(winner, &result.params);
                    tuning = Some(result);
                }
                None => {
                    log::info!(target: &target, "No parameter grid for {}; skipping tuning", winner);
                }
            }
        }

        self.state = SelectionState::FinalFit;
        let mut model = build_model(&spec);
        model.fit(x_train, y_train)?;
        let held_out = Scores::evaluate(y_test, &model.predict(x_test)?);

        self.state = SelectionState::Gate;
        if held_out.accuracy < self.config.expected_accuracy {
            self.state = SelectionState::Rejected;
            return Err(PipelineError::QualityGateFailure {
                model: winner.name().to_string(),
                accuracy: held_out.accuracy,
                threshold: self.config.expected_accuracy,
            });
        }
        log::info!(
            target: &target,
            "{} accepted: held-out accuracy {:.4} >= {}",
            winner,
            held_out.accuracy,
            self.config.expected_accuracy
        );

        self.state = SelectionState::Done;
        Ok(Selection {
            model,
            spec,
            metric,
            candidates: self.candidates.clone(),
            tuning,
            held_out,
        })
    }
}

/// Fit each registry entry with default parameters and score it on the test
/// split, in registry order.
pub fn evaluate_candidates(
    registry: &[ModelKind],
    x_train: &Array2<f64>,
    y_train: &[usize],
    x_test: &Array2<f64>,
    y_test: &[usize],
) -> Result<Vec<CandidateScore>> {
    registry
        .iter()
        .map(|&kind| -> Result<CandidateScore> {
            let mut model = build_model(&ModelSpec::new(kind));
            model.fit(x_train, y_train)?;
            let predictions = model.predict(x_test)?;
            Ok(CandidateScore {
                kind,
                scores: Scores::evaluate(y_test, &predictions),
            })
        })
        .collect()
}

/// Index of the best candidate; exact ties keep the earlier one.
pub fn select_best(candidates: &[CandidateScore], metric: SelectionMetric) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        match best {
            Some(b) if metric.of(&candidate.scores) <= metric.of(&candidates[b].scores) => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Cartesian product of a grid. Keys vary in sorted order with the last key
/// changing fastest.
pub fn expand_grid(grid: &ParamGrid) -> Vec<BTreeMap<String, f64>> {
    let mut combos = vec![BTreeMap::new()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for &value in values {
                let mut extended = combo.clone();
                extended.insert(name.clone(), value);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

/// Test-fold membership for stratified k-fold without shuffling. Within each
/// class, rows keep their order and fill folds in contiguous blocks; fold
/// sizes per class follow a round-robin deal of the sorted labels.
pub fn stratified_folds(y: &[usize], k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 || y.len() < k {
        return Err(PipelineError::model(
            Stage::Tuning,
            "cross-validation",
            format!("cannot split {} rows into {} folds", y.len(), k),
        ));
    }

    let mut sorted = y.to_vec();
    sorted.sort_unstable();
    let mut classes = sorted.clone();
    classes.dedup();

    // allocation[fold][class] = rows of that class in that fold
    let mut allocation = vec![vec![0usize; classes.len()]; k];
    for (pos, label) in sorted.iter().enumerate() {
        let class = classes.binary_search(label).unwrap_or_default();
        allocation[pos % k][class] += 1;
    }

    let mut folds = vec![Vec::new(); k];
    for (class_idx, class) in classes.iter().enumerate() {
        let mut fold_of_member = (0..k).flat_map(|fold| {
            std::iter::repeat(fold).take(allocation[fold][class_idx])
        });
        for (row, _) in y.iter().enumerate().filter(|(_, label)| *label == class) {
            if let Some(fold) = fold_of_member.next() {
                folds[fold].push(row);
            }
        }
    }
    for fold in folds.iter_mut() {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Mean k-fold accuracy for every grid combination; combinations run in
/// parallel but the winner is the first best in grid order.
pub fn grid_search(
    kind: ModelKind,
    grid: &ParamGrid,
    x: &Array2<f64>,
    y: &[usize],
    k: usize,
) -> Result<TuningResult> {
    let folds = stratified_folds(y, k)?;
    let splits: Vec<(Vec<usize>, &Vec<usize>)> = folds
        .iter()
        .map(|test| {
            let train = (0..y.len()).filter(|i| test.binary_search(i).is_err()).collect();
            (train, test)
        })
        .collect();

    let combos = expand_grid(grid);
    let means = combos
        .par_iter()
        .map(|params| -> Result<f64> {
            let spec = ModelSpec::with_params(kind, params);
            let mut total = 0.0;
            for (train_idx, test_idx) in &splits {
                let y_train: Vec<usize> = train_idx.iter().map(|&i| y[i]).collect();
                let y_test: Vec<usize> = test_idx.iter().map(|&i| y[i]).collect();
                let mut model = build_model(&spec);
                model.fit(&x.select(Axis(0), train_idx), &y_train)?;
                let predictions = model.predict(&x.select(Axis(0), test_idx))?;
                total += accuracy(&y_test, &predictions);
            }
            Ok(total / splits.len() as f64)
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut best = 0;
    for (idx, &mean) in means.iter().enumerate() {
        if mean > means[best] {
            best = idx;
        }
    }
    let params = combos.get(best).cloned().unwrap_or_default();
    Ok(TuningResult {
        params,
        mean_accuracy: means.get(best).copied().unwrap_or(0.0),
        combinations: combos.len(),
    })
}
