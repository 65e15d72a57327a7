use crate::engine::{InvalidInput, RawTripInput, TripRecord};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// A record that either parsed cleanly or failed validation at its position.
pub type CaseEntry<T> = Result<T, InvalidInput>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledCase {
    pub record: TripRecord,
    pub expected: f64,
}

#[derive(Debug, Deserialize)]
struct RawLabeledCase {
    input: RawTripInput,
    expected_output: f64,
}

/// Unlabeled elements may be bare inputs or labeled cases whose output is ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawUnlabeledCase {
    Wrapped { input: RawTripInput },
    Bare(RawTripInput),
}

impl RawUnlabeledCase {
    fn into_input(self) -> RawTripInput {
        match self {
            Self::Wrapped { input } | Self::Bare(input) => input,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset not found at {}", path.display())]
    Missing { path: PathBuf },
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset is not a JSON array: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV dataset: {0}")]
    Csv(#[from] csv::Error),
}

pub fn load_labeled(path: &Path) -> Result<Vec<CaseEntry<LabeledCase>>, DatasetError> {
    parse_labeled(open(path)?)
}

pub fn parse_labeled<R: Read>(reader: R) -> Result<Vec<CaseEntry<LabeledCase>>, DatasetError> {
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(values.into_iter().map(labeled_case).collect())
}

/// Reads unlabeled records, choosing CSV for `.csv` files and JSON otherwise.
pub fn load_unlabeled(path: &Path) -> Result<Vec<CaseEntry<TripRecord>>, DatasetError> {
    let reader = open(path)?;
    let is_csv = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));

    if is_csv {
        parse_unlabeled_csv(reader)
    } else {
        parse_unlabeled_json(reader)
    }
}

pub fn parse_unlabeled_json<R: Read>(
    reader: R,
) -> Result<Vec<CaseEntry<TripRecord>>, DatasetError> {
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(values
        .into_iter()
        .map(|value| {
            serde_json::from_value::<RawUnlabeledCase>(value)
                .map_err(malformed)
                .and_then(|raw| TripRecord::try_from(raw.into_input()))
        })
        .collect())
}

pub fn parse_unlabeled_csv<R: Read>(
    reader: R,
) -> Result<Vec<CaseEntry<TripRecord>>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;

    Ok(csv_reader
        .deserialize::<RawTripInput>()
        .map(|row| row.map_err(malformed).and_then(TripRecord::try_from))
        .collect())
}

fn labeled_case(value: Value) -> CaseEntry<LabeledCase> {
    let raw: RawLabeledCase = serde_json::from_value(value).map_err(malformed)?;
    if !raw.expected_output.is_finite() {
        return Err(InvalidInput::NonFinite {
            field: "expected_output",
        });
    }

    Ok(LabeledCase {
        record: TripRecord::try_from(raw.input)?,
        expected: raw.expected_output,
    })
}

fn malformed(err: impl std::fmt::Display) -> InvalidInput {
    InvalidInput::Malformed(err.to_string())
}

fn open(path: &Path) -> Result<BufReader<File>, DatasetError> {
    File::open(path).map(BufReader::new).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DatasetError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            DatasetError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
