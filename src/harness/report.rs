use super::evaluation::{CaseOutcome, EvaluationReport, EvaluationSummary, CLOSE_TOLERANCE, EXACT_TOLERANCE};
use super::CaseFailure;
use serde::Serialize;
use std::io::{self, Write};

/// Serializable shape of an evaluation for `--json` output.
#[derive(Debug, Serialize)]
pub struct EvaluationReportView<'a> {
    pub strategy: &'a str,
    pub summary: &'a EvaluationSummary,
    pub exact_pct: f64,
    pub close_pct: f64,
    pub top_errors: Vec<&'a CaseOutcome>,
    pub failures: &'a [CaseFailure],
}

impl<'a> EvaluationReportView<'a> {
    pub fn new(strategy: &'a str, report: &'a EvaluationReport, top_k: usize) -> Self {
        Self {
            strategy,
            summary: &report.summary,
            exact_pct: report.summary.exact_pct(),
            close_pct: report.summary.close_pct(),
            top_errors: report.top_errors(top_k),
            failures: &report.failures,
        }
    }
}

pub fn render_json<W: Write>(
    out: &mut W,
    strategy: &str,
    report: &EvaluationReport,
    top_k: usize,
) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(&mut *out, &EvaluationReportView::new(strategy, report, top_k))?;
    writeln!(out).map_err(serde_json::Error::io)
}

/// Cases are numbered from 1 in human-readable output.
pub fn render_text<W: Write>(
    out: &mut W,
    strategy: &str,
    report: &EvaluationReport,
    top_k: usize,
) -> io::Result<()> {
    let summary = &report.summary;

    writeln!(out, "Evaluation results ({strategy} strategy)")?;
    writeln!(out, "  Total test cases: {}", summary.total_cases)?;
    writeln!(out, "  Successful runs: {}", summary.successful_runs)?;
    writeln!(
        out,
        "  Exact matches (±${EXACT_TOLERANCE:.2}): {} ({:.1}%)",
        summary.exact_matches,
        summary.exact_pct()
    )?;
    writeln!(
        out,
        "  Close matches (±${CLOSE_TOLERANCE:.2}): {} ({:.1}%)",
        summary.close_matches,
        summary.close_pct()
    )?;
    writeln!(out, "  Average error: ${:.2}", summary.mean_error)?;
    match summary.max_error {
        Some(max) => {
            let detail = report
                .outcomes
                .iter()
                .find(|outcome| outcome.index == max.index)
                .map(|outcome| format!(": {}", outcome.record))
                .unwrap_or_default();
            writeln!(
                out,
                "  Maximum error: ${:.2} (case {}{detail})",
                max.error,
                max.index + 1
            )?;
        }
        None => writeln!(out, "  Maximum error: n/a")?,
    }
    if summary.has_no_predictions() {
        writeln!(out, "  Score: n/a (no case produced a prediction)")?;
    } else {
        writeln!(out, "  Score: {:.2} (lower is better)", summary.score)?;
    }

    let top = report.top_errors(top_k);
    if !top.is_empty() {
        writeln!(out, "\nTop {} highest-error cases", top.len())?;
        for outcome in top {
            writeln!(out, "  Case {}: {}", outcome.index + 1, outcome.record)?;
            writeln!(
                out,
                "    Expected: ${:.2}, Got: ${:.2}, Error: ${:.2} ({} path)",
                outcome.expected, outcome.actual, outcome.error, outcome.path
            )?;
        }
    }

    if report.failures.is_empty() {
        writeln!(out, "\nFailed cases: none")?;
    } else {
        writeln!(out, "\nFailed cases")?;
        for failure in &report.failures {
            writeln!(
                out,
                "  Case {} ({}): {}",
                failure.index + 1,
                failure.kind.label(),
                failure.message
            )?;
        }
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{PathId, TripRecord};
    use crate::harness::evaluation::absolute_error;
    use crate::harness::FailureKind;

    fn sample_report() -> EvaluationReport {
        let outcomes = vec![
            CaseOutcome {
                index: 0,
                record: TripRecord::new(3, 93.0, 1.42).expect("valid record"),
                expected: 364.51,
                actual: 364.67,
                error: absolute_error(364.51, 364.67),
                path: PathId::Main,
            },
            CaseOutcome {
                index: 2,
                record: TripRecord::new(1, 55.0, 3.6).expect("valid record"),
                expected: 126.06,
                actual: 126.06,
                error: 0.0,
                path: PathId::Main,
            },
        ];
        EvaluationReport {
            summary: EvaluationSummary::from_outcomes(3, &outcomes),
            outcomes,
            failures: vec![CaseFailure {
                index: 1,
                kind: FailureKind::InvalidInput,
                message: "trip duration must be at least one day, got 0".to_string(),
            }],
        }
    }

    #[test]
    fn text_report_lists_summary_top_cases_and_failures() {
        let mut buffer = Vec::new();
        render_text(&mut buffer, "rules", &sample_report(), 5).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");

        assert!(text.contains("Total test cases: 3"));
        assert!(text.contains("Successful runs: 2"));
        assert!(text.contains("Exact matches (±$0.01): 1 (50.0%)"));
        assert!(text.contains("Close matches (±$1.00): 2 (100.0%)"));
        assert!(text.contains("Maximum error: $0.16 (case 1: 3 days"));
        assert!(text.contains("Top 2 highest-error cases"));
        assert!(text.contains("Case 2 (invalid input)"));
    }

    #[test]
    fn text_report_withholds_the_score_when_every_case_failed() {
        let report = EvaluationReport {
            summary: EvaluationSummary::from_outcomes(1, &[]),
            outcomes: Vec::new(),
            failures: vec![CaseFailure {
                index: 0,
                kind: FailureKind::InvalidInput,
                message: "trip duration must be at least one day, got 0".to_string(),
            }],
        };
        let mut buffer = Vec::new();
        render_text(&mut buffer, "rules", &report, 5).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");

        assert!(text.contains("Score: n/a (no case produced a prediction)"));
        assert!(!text.contains("lower is better"));
        assert!(text.contains("Maximum error: n/a"));
        assert!(text.contains("Case 1 (invalid input)"));
    }

    #[test]
    fn json_report_carries_percentages_and_failures() {
        let mut buffer = Vec::new();
        render_json(&mut buffer, "rules", &sample_report(), 1).expect("render");
        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");

        assert_eq!(value["strategy"], "rules");
        assert_eq!(value["summary"]["successful_runs"], 2);
        assert_eq!(value["exact_pct"], 50.0);
        assert_eq!(value["top_errors"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["top_errors"][0]["index"], 0);
        assert_eq!(value["failures"][0]["kind"], "invalid_input");
    }
}
