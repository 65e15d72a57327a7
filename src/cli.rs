use crate::config::{AppConfig, EngineConfig, StrategyKind};
use crate::engine::{
    train, DynCalculator, InvalidInput, LearnedStrategy, ModelArtifact, PredictionStrategy,
    ReceiptThresholdRouter, ReimbursementCalculator, RuleBasedStrategy, TripRecord,
};
use crate::error::AppError;
use crate::harness::report::{render_json, render_text};
use crate::harness::{evaluate, load_labeled, load_unlabeled, run_batch};
use crate::telemetry;
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_CASES_PATH: &str = "public_cases.json";

#[derive(Parser, Debug)]
#[command(
    name = "trip-reimbursement",
    about = "Compute travel reimbursements and score them against labeled cases",
    version,
    args_conflicts_with_subcommands = true,
    allow_negative_numbers = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Trip duration in days, miles traveled, and total receipts
    #[arg(value_name = "VALUE")]
    values: Vec<String>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reimbursement for one trip (default command)
    #[command(allow_negative_numbers = true)]
    Predict(PredictArgs),
    /// Score the calculator against a labeled dataset
    Evaluate(EvaluateArgs),
    /// Predict every record of a dataset, one amount per line
    Batch(BatchArgs),
    /// Fit per-path tree ensembles and write a model artifact
    Train(TrainArgs),
}

#[derive(Args, Debug, Default, Clone)]
struct EngineArgs {
    /// Prediction strategy (overrides REIMBURSE_STRATEGY)
    #[arg(long, value_enum)]
    strategy: Option<StrategyKind>,
    /// Model artifact used by the learned strategy (overrides REIMBURSE_MODEL_PATH)
    #[arg(long)]
    model: Option<PathBuf>,
    /// Calibration JSON file (overrides REIMBURSE_CALIBRATION_PATH)
    #[arg(long)]
    calibration: Option<PathBuf>,
    /// Records per parallel work unit (overrides REIMBURSE_CHUNK_SIZE)
    #[arg(long, value_parser = parse_chunk_size)]
    chunk_size: Option<usize>,
}

impl EngineArgs {
    fn apply(self, mut config: EngineConfig) -> EngineConfig {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        if let Some(calibration) = self.calibration {
            config.calibration_path = Some(calibration);
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        config
    }
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Trip duration in days, miles traveled, and total receipts
    #[arg(value_name = "VALUE")]
    values: Vec<String>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Labeled cases (JSON array of {input, expected_output})
    #[arg(long, default_value = DEFAULT_CASES_PATH)]
    cases: PathBuf,
    /// Number of highest-error cases to list (overrides REIMBURSE_TOP_K)
    #[arg(long)]
    top: Option<usize>,
    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Unlabeled records (JSON array or CSV with a header row)
    #[arg(long)]
    cases: PathBuf,
    /// Write predictions to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Labeled cases to fit on
    #[arg(long, default_value = DEFAULT_CASES_PATH)]
    cases: PathBuf,
    /// Where to write the artifact (defaults to the configured model path)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Calibration JSON file supplying feature, router, and training settings
    #[arg(long)]
    calibration: Option<PathBuf>,
}

fn parse_chunk_size(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(format!("chunk size must be a positive integer, got '{raw}'")),
    }
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(
        environment = config.environment.as_str(),
        strategy = ?config.engine.strategy,
        "configuration loaded"
    );

    let command = cli.command.unwrap_or(Command::Predict(PredictArgs {
        values: cli.values,
        engine: cli.engine,
    }));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(command, config.engine, &mut out)
}

fn execute<W: Write>(command: Command, engine: EngineConfig, out: &mut W) -> Result<(), AppError> {
    match command {
        Command::Predict(args) => predict(args, engine, out),
        Command::Evaluate(args) => run_evaluation(args, engine, out),
        Command::Batch(args) => run_batch_command(args, engine, out),
        Command::Train(args) => run_training(args, engine, out),
    }
}

/// Builds the calculator for the configured strategy.
///
/// The learned strategy takes its feature parameters and routing threshold
/// from the artifact so predictions match the conditions it was trained under.
fn build_calculator(engine: &EngineConfig) -> Result<DynCalculator, AppError> {
    match engine.strategy {
        StrategyKind::Rules => {
            let calibration = engine.calibration()?;
            let strategy: Box<dyn PredictionStrategy> =
                Box::new(RuleBasedStrategy::new(calibration.rules));
            Ok(ReimbursementCalculator::new(
                calibration.features,
                ReceiptThresholdRouter::from_params(&calibration.router),
                strategy,
            ))
        }
        StrategyKind::Learned => {
            let artifact = ModelArtifact::load(&engine.model_path)?;
            info!(
                path = %engine.model_path.display(),
                outlier_threshold = artifact.outlier_threshold,
                "loaded model artifact"
            );
            let features = artifact.feature_params.clone();
            let router = artifact.router();
            let strategy: Box<dyn PredictionStrategy> = Box::new(LearnedStrategy::new(artifact));
            Ok(ReimbursementCalculator::new(features, router, strategy))
        }
    }
}

fn predict<W: Write>(args: PredictArgs, engine: EngineConfig, out: &mut W) -> Result<(), AppError> {
    let engine = args.engine.apply(engine);
    let [days, miles, receipts] = args.values.as_slice() else {
        return Err(InvalidInput::Arity {
            expected: 3,
            actual: args.values.len(),
        }
        .into());
    };
    let record = TripRecord::parse(days, miles, receipts)?;

    let calculator = build_calculator(&engine)?;
    let amount = calculator.amount(&record)?;
    writeln!(out, "{amount:.2}")?;
    Ok(())
}

fn run_evaluation<W: Write>(
    args: EvaluateArgs,
    engine: EngineConfig,
    out: &mut W,
) -> Result<(), AppError> {
    let engine = args.engine.apply(engine);
    let cases = load_labeled(&args.cases)?;
    let calculator = build_calculator(&engine)?;
    info!(cases = cases.len(), path = %args.cases.display(), "evaluating dataset");

    let report = evaluate(&calculator, &cases, engine.chunk_size);
    let top_k = args.top.unwrap_or(engine.top_k);
    let strategy = calculator.strategy().name();
    if args.json {
        render_json(out, strategy, &report, top_k).map_err(io::Error::from)?;
    } else {
        render_text(out, strategy, &report, top_k)?;
    }

    if report.summary.has_no_predictions() {
        return Err(AppError::NoPredictions {
            total: report.summary.total_cases,
        });
    }
    Ok(())
}

fn run_batch_command<W: Write>(
    args: BatchArgs,
    engine: EngineConfig,
    out: &mut W,
) -> Result<(), AppError> {
    let engine = args.engine.apply(engine);
    let records = load_unlabeled(&args.cases)?;
    let calculator = build_calculator(&engine)?;

    let outcome = run_batch(&calculator, &records, engine.chunk_size);
    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            outcome.write_lines(&mut writer)?;
        }
        None => outcome.write_lines(out)?,
    }

    let failed = outcome.failed_count();
    if failed > 0 {
        return Err(AppError::BatchFailures {
            failed,
            total: outcome.len(),
        });
    }
    Ok(())
}

fn run_training<W: Write>(
    args: TrainArgs,
    mut engine: EngineConfig,
    out: &mut W,
) -> Result<(), AppError> {
    if let Some(calibration) = args.calibration {
        engine.calibration_path = Some(calibration);
    }
    let calibration = engine.calibration()?;
    let output = args.output.unwrap_or(engine.model_path);

    let mut skipped = 0;
    let examples: Vec<(TripRecord, f64)> = load_labeled(&args.cases)?
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Ok(case) => Some((case.record, case.expected)),
            Err(err) => {
                warn!(index, error = %err, "skipping malformed training case");
                skipped += 1;
                None
            }
        })
        .collect();

    let router = ReceiptThresholdRouter::from_params(&calibration.router);
    let artifact = train(&examples, &calibration.features, &router, &calibration.training)?;
    artifact.save(&output)?;

    info!(
        cases = examples.len(),
        skipped,
        path = %output.display(),
        "model artifact written"
    );
    writeln!(
        out,
        "trained on {} cases ({} skipped), model written to {}",
        examples.len(),
        skipped,
        output.display()
    )?;
    Ok(())
}
