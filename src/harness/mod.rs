//! Dataset loading, batch prediction, and scoring against labeled cases.

pub mod batch;
pub mod dataset;
pub mod evaluation;
pub mod report;

use crate::engine::{ComputationError, InvalidInput};
use serde::Serialize;

pub use batch::{run_batch, BatchOutcome, DEFAULT_CHUNK_SIZE};
pub use dataset::{load_labeled, load_unlabeled, CaseEntry, DatasetError, LabeledCase};
pub use evaluation::{
    evaluate, CaseOutcome, EvaluationReport, EvaluationSummary, MaxError, CLOSE_TOLERANCE,
    DEFAULT_TOP_K, EXACT_TOLERANCE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    Computation,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid input",
            Self::Computation => "computation",
        }
    }
}

/// A record that produced no amount, kept at its position in the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseFailure {
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl CaseFailure {
    pub fn invalid_input(index: usize, err: &InvalidInput) -> Self {
        Self {
            index,
            kind: FailureKind::InvalidInput,
            message: err.to_string(),
        }
    }

    pub fn computation(index: usize, err: &ComputationError) -> Self {
        Self {
            index,
            kind: FailureKind::Computation,
            message: err.to_string(),
        }
    }
}
