//! Feature derivation for trip records.
//!
//! Everything here is a pure function of a [`TripRecord`] and the calibrated
//! [`FeatureParams`]. The rule-based strategy reads the named fields directly and
//! the learned strategy consumes the flattened [`FeatureVector`], whose column
//! order is fixed by [`FEATURE_NAMES`] and recorded in every model artifact.

pub mod rules;

use super::domain::{TripCategory, TripRecord};
use rules::TripShape;
use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 19;

pub type FeatureVector = [f64; FEATURE_COUNT];

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "trip_duration_days",
    "miles_traveled",
    "total_receipts_amount",
    "miles_per_day",
    "receipts_per_day",
    "four_day_bonus",
    "receipt_multiplier",
    "adjusted_receipts",
    "multiplied_receipts",
    "miles_tier1",
    "miles_tier2",
    "miles_tier3",
    "efficiency_bonus_range",
    "days_x_miles",
    "cat_balanced",
    "cat_long_haul",
    "cat_low_efficiency",
    "cat_quick_trip_high_miles",
    "cat_sweet_spot_efficiency",
];

/// Upper bound of the first mileage band.
pub const TIER1_LIMIT: f64 = 100.0;
/// Upper bound of the second mileage band.
pub const TIER2_LIMIT: f64 = 500.0;

/// Calibrated constants used while deriving features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    pub single_day_receipt_multiplier: f64,
    pub five_day_receipt_multiplier: f64,
    pub long_trip_receipt_multiplier: f64,
    pub default_receipt_multiplier: f64,
    /// Receipts strictly above this amount are scaled by `receipt_cap_multiplier`.
    pub receipt_cap_threshold: f64,
    pub receipt_cap_multiplier: f64,
    pub four_day_bonus: f64,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            single_day_receipt_multiplier: -0.5,
            five_day_receipt_multiplier: 1.04,
            long_trip_receipt_multiplier: 0.02,
            default_receipt_multiplier: 1.0,
            receipt_cap_threshold: 2000.0,
            receipt_cap_multiplier: 0.25,
            four_day_bonus: 150.0,
        }
    }
}

impl FeatureParams {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            ("single_day_receipt_multiplier", self.single_day_receipt_multiplier),
            ("five_day_receipt_multiplier", self.five_day_receipt_multiplier),
            ("long_trip_receipt_multiplier", self.long_trip_receipt_multiplier),
            ("default_receipt_multiplier", self.default_receipt_multiplier),
            ("receipt_cap_threshold", self.receipt_cap_threshold),
            ("receipt_cap_multiplier", self.receipt_cap_multiplier),
            ("four_day_bonus", self.four_day_bonus),
        ];
        if let Some((name, _)) = values.iter().find(|(_, value)| !value.is_finite()) {
            return Err(format!("features.{name} must be finite"));
        }
        if self.receipt_cap_threshold < 0.0 {
            return Err("features.receipt_cap_threshold must not be negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.receipt_cap_multiplier) {
            return Err("features.receipt_cap_multiplier must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

/// Non-overlapping mileage bands; the three components always sum to the total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MileageTiers {
    pub tier1: f64,
    pub tier2: f64,
    pub tier3: f64,
}

impl MileageTiers {
    pub fn split(miles: f64) -> Self {
        Self {
            tier1: miles.min(TIER1_LIMIT),
            tier2: (miles - TIER1_LIMIT).clamp(0.0, TIER2_LIMIT - TIER1_LIMIT),
            tier3: (miles - TIER2_LIMIT).max(0.0),
        }
    }

    pub fn total(&self) -> f64 {
        self.tier1 + self.tier2 + self.tier3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFeatures {
    pub trip_duration_days: u32,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,
    pub miles_per_day: f64,
    pub receipts_per_day: f64,
    pub receipt_multiplier: f64,
    pub adjusted_receipts: f64,
    pub multiplied_receipts: f64,
    pub mileage: MileageTiers,
    pub trip_category: TripCategory,
    pub efficiency_bonus_flag: bool,
    pub four_day_bonus: f64,
    pub days_x_miles: f64,
}

impl DerivedFeatures {
    pub fn to_vector(&self) -> FeatureVector {
        let days = f64::from(self.trip_duration_days);
        let [balanced, long_haul, low_efficiency, quick, sweet_spot] =
            TripCategory::one_hot_order().map(|category| indicator(self.trip_category == category));

        [
            days,
            self.miles_traveled,
            self.total_receipts_amount,
            self.miles_per_day,
            self.receipts_per_day,
            self.four_day_bonus,
            self.receipt_multiplier,
            self.adjusted_receipts,
            self.multiplied_receipts,
            self.mileage.tier1,
            self.mileage.tier2,
            self.mileage.tier3,
            indicator(self.efficiency_bonus_flag),
            self.days_x_miles,
            balanced,
            long_haul,
            low_efficiency,
            quick,
            sweet_spot,
        ]
    }
}

pub fn derive(record: &TripRecord, params: &FeatureParams) -> DerivedFeatures {
    let days = record.trip_duration_days();
    let miles = record.miles_traveled();
    let receipts = record.total_receipts_amount();

    let miles_per_day = per_day(miles, days);
    let receipts_per_day = per_day(receipts, days);

    let receipt_multiplier = rules::receipt_multiplier(days, params);
    let adjusted_receipts = if receipts > params.receipt_cap_threshold {
        receipts * params.receipt_cap_multiplier
    } else {
        receipts
    };

    let trip_category = rules::classify(&TripShape {
        days,
        miles_per_day,
    });

    DerivedFeatures {
        trip_duration_days: days,
        miles_traveled: miles,
        total_receipts_amount: receipts,
        miles_per_day,
        receipts_per_day,
        receipt_multiplier,
        adjusted_receipts,
        multiplied_receipts: adjusted_receipts * receipt_multiplier,
        mileage: MileageTiers::split(miles),
        trip_category,
        efficiency_bonus_flag: rules::in_efficiency_band(miles_per_day),
        four_day_bonus: if days == 4 { params.four_day_bonus } else { 0.0 },
        days_x_miles: f64::from(days) * miles,
    }
}

fn per_day(amount: f64, days: u32) -> f64 {
    if days == 0 {
        0.0
    } else {
        amount / f64::from(days)
    }
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
