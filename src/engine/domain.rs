use serde::{Deserialize, Serialize};
use std::fmt;

/// One (duration, miles, receipts) trip as submitted for reimbursement.
///
/// Construction validates the domain, so every `TripRecord` in circulation has
/// a positive whole-day duration and finite, non-negative miles and receipts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripRecord {
    trip_duration_days: u32,
    miles_traveled: f64,
    total_receipts_amount: f64,
}

impl TripRecord {
    pub fn new(
        trip_duration_days: u32,
        miles_traveled: f64,
        total_receipts_amount: f64,
    ) -> Result<Self, InvalidInput> {
        if trip_duration_days == 0 {
            return Err(InvalidInput::DurationOutOfRange(0.0));
        }
        let miles_traveled = non_negative("miles_traveled", miles_traveled)?;
        let total_receipts_amount = non_negative("total_receipts_amount", total_receipts_amount)?;

        Ok(Self {
            trip_duration_days,
            miles_traveled,
            total_receipts_amount,
        })
    }

    /// Accepts an integer-like duration (`3` or `3.0`) as produced by JSON or CSV readers.
    pub fn from_raw(
        trip_duration_days: f64,
        miles_traveled: f64,
        total_receipts_amount: f64,
    ) -> Result<Self, InvalidInput> {
        if !trip_duration_days.is_finite() {
            return Err(InvalidInput::NonFinite {
                field: "trip_duration_days",
            });
        }
        if trip_duration_days.fract() != 0.0 {
            return Err(InvalidInput::FractionalDuration(trip_duration_days));
        }
        if trip_duration_days < 1.0 || trip_duration_days > f64::from(u32::MAX) {
            return Err(InvalidInput::DurationOutOfRange(trip_duration_days));
        }

        Self::new(
            trip_duration_days as u32,
            miles_traveled,
            total_receipts_amount,
        )
    }

    /// Parses the three positional values of a single-prediction invocation.
    pub fn parse(days: &str, miles: &str, receipts: &str) -> Result<Self, InvalidInput> {
        let days = parse_number("trip_duration_days", days)?;
        let miles = parse_number("miles_traveled", miles)?;
        let receipts = parse_number("total_receipts_amount", receipts)?;
        Self::from_raw(days, miles, receipts)
    }

    pub fn trip_duration_days(&self) -> u32 {
        self.trip_duration_days
    }

    pub fn miles_traveled(&self) -> f64 {
        self.miles_traveled
    }

    pub fn total_receipts_amount(&self) -> f64 {
        self.total_receipts_amount
    }
}

impl fmt::Display for TripRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} days, {} miles, ${:.2} receipts",
            self.trip_duration_days, self.miles_traveled, self.total_receipts_amount
        )
    }
}

/// Unvalidated wire shape shared by the labeled and unlabeled dataset formats.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawTripInput {
    pub trip_duration_days: f64,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,
}

impl TryFrom<RawTripInput> for TripRecord {
    type Error = InvalidInput;

    fn try_from(raw: RawTripInput) -> Result<Self, Self::Error> {
        TripRecord::from_raw(
            raw.trip_duration_days,
            raw.miles_traveled,
            raw.total_receipts_amount,
        )
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, InvalidInput> {
    if !value.is_finite() {
        return Err(InvalidInput::NonFinite { field });
    }
    if value < 0.0 {
        return Err(InvalidInput::Negative { field, value });
    }
    // normalizes -0.0 so formatting and equality stay stable
    Ok(value + 0.0)
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, InvalidInput> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| InvalidInput::NotNumeric {
            field,
            raw: raw.to_string(),
        })
}

/// Out-of-domain or unparseable trip input. Reported per case, never fatal for a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("trip_duration_days must be a positive whole number of days, got {0}")]
    DurationOutOfRange(f64),
    #[error("trip_duration_days must be a whole number of days, got {0}")]
    FractionalDuration(f64),
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} is not numeric: '{raw}'")]
    NotNumeric { field: &'static str, raw: String },
    #[error("expected {expected} values (days, miles, receipts), got {actual}")]
    Arity { expected: usize, actual: usize },
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Prediction path selected by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathId {
    Main,
    Outlier,
}

impl PathId {
    pub const fn ordered() -> [Self; 2] {
        [Self::Main, Self::Outlier]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Outlier => "outlier",
        }
    }
}

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Duration/efficiency profile of a trip. Exactly one applies to any record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCategory {
    QuickTripHighMiles,
    LongHaul,
    LowEfficiency,
    SweetSpotEfficiency,
    Balanced,
}

impl TripCategory {
    /// Column order of the one-hot encoding in the feature vector.
    pub const fn one_hot_order() -> [Self; 5] {
        [
            Self::Balanced,
            Self::LongHaul,
            Self::LowEfficiency,
            Self::QuickTripHighMiles,
            Self::SweetSpotEfficiency,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::QuickTripHighMiles => "quick_trip_high_miles",
            Self::LongHaul => "long_haul",
            Self::LowEfficiency => "low_efficiency",
            Self::SweetSpotEfficiency => "sweet_spot_efficiency",
            Self::Balanced => "balanced",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_fractional_durations() {
        assert_eq!(
            TripRecord::new(0, 10.0, 10.0),
            Err(InvalidInput::DurationOutOfRange(0.0))
        );
        assert_eq!(
            TripRecord::from_raw(2.5, 10.0, 10.0),
            Err(InvalidInput::FractionalDuration(2.5))
        );
        assert_eq!(
            TripRecord::from_raw(-3.0, 10.0, 10.0),
            Err(InvalidInput::DurationOutOfRange(-3.0))
        );
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        assert_eq!(
            TripRecord::new(3, -1.0, 10.0),
            Err(InvalidInput::Negative {
                field: "miles_traveled",
                value: -1.0
            })
        );
        assert_eq!(
            TripRecord::new(3, 1.0, f64::NAN),
            Err(InvalidInput::NonFinite {
                field: "total_receipts_amount"
            })
        );
    }

    #[test]
    fn parse_accepts_integer_like_duration_and_fractional_miles() {
        let record = TripRecord::parse("5", " 250.5 ", "150.75").expect("valid input");
        assert_eq!(record.trip_duration_days(), 5);
        assert_eq!(record.miles_traveled(), 250.5);
        assert_eq!(record.total_receipts_amount(), 150.75);

        let record = TripRecord::parse("3.0", "93", "1.42").expect("integer-like duration");
        assert_eq!(record.trip_duration_days(), 3);
    }

    #[test]
    fn parse_reports_the_offending_field() {
        let error = TripRecord::parse("3", "ninety", "1.42").expect_err("miles not numeric");
        assert_eq!(
            error,
            InvalidInput::NotNumeric {
                field: "miles_traveled",
                raw: "ninety".to_string()
            }
        );
        assert!(error.to_string().contains("miles_traveled"));
    }

    #[test]
    fn negative_zero_is_normalized() {
        let record = TripRecord::new(1, -0.0, 0.0).expect("negative zero is zero");
        assert!(record.miles_traveled().is_sign_positive());
    }
}
