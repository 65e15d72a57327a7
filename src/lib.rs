//! Travel reimbursement calculator: derives trip features, routes each trip to
//! a prediction path, and computes the reimbursement with either calibrated
//! rule tables or fitted tree ensembles. The harness scores predictions
//! against labeled cases and runs unlabeled batches in parallel.

mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod harness;
pub mod telemetry;

use error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
