use super::batch::map_in_chunks;
use super::dataset::{CaseEntry, LabeledCase};
use super::CaseFailure;
use crate::engine::{PathId, PredictionStrategy, ReimbursementCalculator, Route, TripRecord};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{info, warn};

/// Absolute error below which a prediction counts as an exact match.
pub const EXACT_TOLERANCE: f64 = 0.01;
/// Absolute error below which a prediction counts as a close match.
pub const CLOSE_TOLERANCE: f64 = 1.00;
pub const DEFAULT_TOP_K: usize = 5;

const ERROR_SCALE: f64 = 1_000_000.0;

/// Absolute error snapped to micro-dollars so cent amounts compare like decimals.
pub fn absolute_error(expected: f64, actual: f64) -> f64 {
    ((actual - expected).abs() * ERROR_SCALE).round() / ERROR_SCALE
}

/// Lower is better.
pub fn composite_score(mean_error: f64, total_cases: usize, exact_matches: usize) -> f64 {
    mean_error * 100.0 + total_cases.saturating_sub(exact_matches) as f64 * 0.1
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseOutcome {
    pub index: usize,
    pub record: TripRecord,
    pub expected: f64,
    pub actual: f64,
    pub error: f64,
    pub path: PathId,
}

impl CaseOutcome {
    pub fn is_exact(&self) -> bool {
        self.error < EXACT_TOLERANCE
    }

    pub fn is_close(&self) -> bool {
        self.error < CLOSE_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaxError {
    pub index: usize,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total_cases: usize,
    pub successful_runs: usize,
    pub failed_cases: usize,
    pub exact_matches: usize,
    pub close_matches: usize,
    pub total_error: f64,
    pub mean_error: f64,
    pub max_error: Option<MaxError>,
    pub score: f64,
}

impl EvaluationSummary {
    /// Folds outcomes in order; the first case reaching the maximum error wins ties.
    pub fn from_outcomes(total_cases: usize, outcomes: &[CaseOutcome]) -> Self {
        let mut exact_matches = 0;
        let mut close_matches = 0;
        let mut total_error = 0.0;
        let mut max_error: Option<MaxError> = None;

        for outcome in outcomes {
            if outcome.is_exact() {
                exact_matches += 1;
            }
            if outcome.is_close() {
                close_matches += 1;
            }
            total_error += outcome.error;
            if max_error.map_or(true, |current| outcome.error > current.error) {
                max_error = Some(MaxError {
                    index: outcome.index,
                    error: outcome.error,
                });
            }
        }

        let successful_runs = outcomes.len();
        let mean_error = if successful_runs == 0 {
            0.0
        } else {
            total_error / successful_runs as f64
        };

        Self {
            total_cases,
            successful_runs,
            failed_cases: total_cases.saturating_sub(successful_runs),
            exact_matches,
            close_matches,
            total_error,
            mean_error,
            max_error,
            score: composite_score(mean_error, total_cases, exact_matches),
        }
    }

    pub fn exact_pct(&self) -> f64 {
        percentage(self.exact_matches, self.successful_runs)
    }

    pub fn close_pct(&self) -> f64 {
        percentage(self.close_matches, self.successful_runs)
    }

    /// True when cases were given but every one failed, so the error figures are empty.
    pub fn has_no_predictions(&self) -> bool {
        self.total_cases > 0 && self.successful_runs == 0
    }
}

fn percentage(count: usize, of: usize) -> f64 {
    if of == 0 {
        0.0
    } else {
        count as f64 * 100.0 / of as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub summary: EvaluationSummary,
    pub outcomes: Vec<CaseOutcome>,
    pub failures: Vec<CaseFailure>,
}

impl EvaluationReport {
    /// The `k` worst cases by error, earliest case first among equal errors.
    pub fn top_errors(&self, k: usize) -> Vec<&CaseOutcome> {
        let mut ranked: Vec<&CaseOutcome> = self.outcomes.iter().collect();
        ranked.sort_by(|a, b| {
            b.error
                .partial_cmp(&a.error)
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        ranked.truncate(k);
        ranked
    }
}

pub fn evaluate<S, R>(
    calculator: &ReimbursementCalculator<S, R>,
    cases: &[CaseEntry<LabeledCase>],
    chunk_size: usize,
) -> EvaluationReport
where
    S: PredictionStrategy,
    R: Route,
{
    let results = map_in_chunks(cases, chunk_size, |index, entry| -> Result<CaseOutcome, CaseFailure> {
        let case = entry
            .as_ref()
            .map_err(|err| CaseFailure::invalid_input(index, err))?;
        let prediction = calculator
            .calculate(&case.record)
            .map_err(|err| CaseFailure::computation(index, &err))?;

        Ok(CaseOutcome {
            index,
            record: case.record,
            expected: case.expected,
            actual: prediction.amount,
            error: absolute_error(case.expected, prediction.amount),
            path: prediction.path,
        })
    });

    let mut outcomes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(failure) => {
                warn!(index = failure.index, kind = failure.kind.label(), message = %failure.message, "case failed");
                failures.push(failure);
            }
        }
    }

    let summary = EvaluationSummary::from_outcomes(cases.len(), &outcomes);
    info!(
        strategy = calculator.strategy().name(),
        total = summary.total_cases,
        successful = summary.successful_runs,
        exact = summary.exact_matches,
        close = summary.close_matches,
        mean_error = summary.mean_error,
        score = summary.score,
        "evaluation complete"
    );

    EvaluationReport {
        summary,
        outcomes,
        failures,
    }
}
