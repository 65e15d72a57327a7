//! Integration tests for scoring and batch runs through the public harness.
//!
//! Datasets are written to disk so the loaders, the calculator, and the
//! report aggregation are exercised together.

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use trip_reimbursement::engine::{
    FeatureParams, PathId, ReceiptThresholdRouter, ReimbursementCalculator, RuleBasedStrategy,
};
use trip_reimbursement::harness::report::render_text;
use trip_reimbursement::harness::{
    evaluate, load_labeled, load_unlabeled, run_batch, FailureKind,
};

const LABELED_CASES: &str = r#"[
    {"input": {"trip_duration_days": 3, "miles_traveled": 93, "total_receipts_amount": 1.42}, "expected_output": 364.51},
    {"input": {"trip_duration_days": 5, "miles_traveled": 250, "total_receipts_amount": 150.75}, "expected_output": 620.00},
    {"input": {"trip_duration_days": -2, "miles_traveled": 10, "total_receipts_amount": 5}, "expected_output": 100.00},
    {"input": {"trip_duration_days": 1, "miles_traveled": 1082, "total_receipts_amount": 1809.49}, "expected_output": 446.94},
    {"input": {"trip_duration_days": 8, "miles_traveled": 795, "total_receipts_amount": 1645.99}, "expected_output": 644.69},
    {"input": {"trip_duration_days": 4, "miles_traveled": 84, "total_receipts_amount": 74.96}, "expected_output": 305.13}
]"#;

fn write_dataset(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create dataset");
    file.write_all(contents.as_bytes()).expect("write dataset");
    path
}

fn calculator() -> ReimbursementCalculator<RuleBasedStrategy> {
    ReimbursementCalculator::new(
        FeatureParams::default(),
        ReceiptThresholdRouter::default(),
        RuleBasedStrategy::default(),
    )
}

#[test]
fn evaluation_reports_every_case_in_input_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_dataset(&dir, "cases.json", LABELED_CASES);
    let cases = load_labeled(&path).expect("dataset loads");

    let report = evaluate(&calculator(), &cases, 2);
    let summary = &report.summary;

    assert_eq!(summary.total_cases, 6);
    assert_eq!(summary.successful_runs, 5);
    assert_eq!(summary.failed_cases, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 2);
    assert_eq!(report.failures[0].kind, FailureKind::InvalidInput);

    let indices: Vec<usize> = report.outcomes.iter().map(|case| case.index).collect();
    assert_eq!(indices, vec![0, 1, 3, 4, 5]);

    let reference = &report.outcomes[0];
    assert_eq!(reference.actual, 364.67);
    assert!(reference.is_close());
    assert_eq!(report.outcomes[2].path, PathId::Outlier);

    assert!(summary.exact_matches <= summary.close_matches);
    let expected_score = summary.mean_error * 100.0
        + (summary.total_cases - summary.exact_matches) as f64 * 0.1;
    assert!((summary.score - expected_score).abs() < 1e-9);
}

#[test]
fn evaluation_is_reproducible_across_runs_and_chunk_sizes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_dataset(&dir, "cases.json", LABELED_CASES);
    let cases = load_labeled(&path).expect("dataset loads");
    let calculator = calculator();

    let first = evaluate(&calculator, &cases, 1);
    let second = evaluate(&calculator, &cases, 100);
    assert_eq!(first, second);

    let mut first_text = Vec::new();
    let mut second_text = Vec::new();
    render_text(&mut first_text, "rules", &first, 5).expect("render");
    render_text(&mut second_text, "rules", &second, 5).expect("render");
    assert_eq!(first_text, second_text);
}

#[test]
fn top_errors_are_sorted_and_bounded() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_dataset(&dir, "cases.json", LABELED_CASES);
    let cases = load_labeled(&path).expect("dataset loads");
    let report = evaluate(&calculator(), &cases, 3);

    let top = report.top_errors(3);
    assert_eq!(top.len(), 3);
    assert!(top.windows(2).all(|pair| pair[0].error >= pair[1].error));
    let max = report.summary.max_error.expect("at least one success");
    assert_eq!(top[0].error, max.error);
    assert!(report.top_errors(0).is_empty());
}

#[test]
fn batch_output_matches_input_length_and_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let csv = "trip_duration_days,miles_traveled,total_receipts_amount\n\
               3,93,1.42\n\
               5,250,150.75\n\
               2.5,10,10\n\
               1,1082,1809.49\n";
    let path = write_dataset(&dir, "records.csv", csv);
    let records = load_unlabeled(&path).expect("csv loads");
    let calculator = calculator();

    let outcome = run_batch(&calculator, &records, 1);
    assert_eq!(outcome.len(), records.len());
    assert_eq!(outcome.failed_count(), 1);

    for (entry, result) in records.iter().zip(&outcome.results) {
        match (entry, result) {
            (Ok(record), Ok(amount)) => {
                assert_eq!(calculator.amount(record).expect("valid amount"), *amount);
            }
            (Err(_), Err(failure)) => assert_eq!(failure.kind, FailureKind::InvalidInput),
            _ => panic!("batch result does not line up with its input"),
        }
    }

    let mut lines = Vec::new();
    outcome.write_lines(&mut lines).expect("write lines");
    let text = String::from_utf8(lines).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "364.67");
    assert_eq!(lines[2], "ERROR");
}

#[test]
fn labeled_cases_can_be_batched_without_their_labels() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_dataset(&dir, "cases.json", LABELED_CASES);
    let labeled = load_labeled(&path).expect("labeled loads");
    let unlabeled = load_unlabeled(&path).expect("unlabeled loads");

    assert_eq!(labeled.len(), unlabeled.len());
    for (with_label, without_label) in labeled.iter().zip(&unlabeled) {
        match (with_label, without_label) {
            (Ok(case), Ok(record)) => assert_eq!(&case.record, record),
            (Err(left), Err(right)) => assert_eq!(left, right),
            _ => panic!("loaders disagree on validity"),
        }
    }
}
