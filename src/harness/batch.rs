use super::dataset::CaseEntry;
use super::CaseFailure;
use crate::engine::{PredictionStrategy, ReimbursementCalculator, Route, TripRecord};
use rayon::prelude::*;
use std::io::{self, Write};
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Applies `f` to every item, one rayon task per chunk, keeping input order.
///
/// `f` receives the item's global index so failures can be reported against
/// the original position.
pub(crate) fn map_in_chunks<T, U, F>(items: &[T], chunk_size: usize, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync,
{
    let chunk_size = chunk_size.max(1);
    items
        .par_chunks(chunk_size)
        .enumerate()
        .map(|(chunk_index, chunk)| {
            let offset = chunk_index * chunk_size;
            debug!(chunk = chunk_index, offset, len = chunk.len(), "processing chunk");
            chunk
                .iter()
                .enumerate()
                .map(|(position, item)| f(offset + position, item))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<Result<f64, CaseFailure>>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseFailure> {
        self.results.iter().filter_map(|result| result.as_ref().err())
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    /// Writes one line per record: the amount with two decimals, or `ERROR`.
    pub fn write_lines<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for result in &self.results {
            match result {
                Ok(amount) => writeln!(out, "{amount:.2}")?,
                Err(_) => writeln!(out, "ERROR")?,
            }
        }
        out.flush()
    }
}

pub fn run_batch<S, R>(
    calculator: &ReimbursementCalculator<S, R>,
    records: &[CaseEntry<TripRecord>],
    chunk_size: usize,
) -> BatchOutcome
where
    S: PredictionStrategy,
    R: Route,
{
    let results = map_in_chunks(records, chunk_size, |index, entry| match entry {
        Ok(record) => calculator
            .amount(record)
            .map_err(|err| CaseFailure::computation(index, &err)),
        Err(err) => Err(CaseFailure::invalid_input(index, err)),
    });
    let outcome = BatchOutcome { results };

    for failure in outcome.failures() {
        warn!(index = failure.index, kind = failure.kind.label(), message = %failure.message, "record failed");
    }
    info!(
        records = outcome.len(),
        failed = outcome.failed_count(),
        "batch complete"
    );
    outcome
}
