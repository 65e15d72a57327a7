use super::super::domain::{PathId, TripCategory};
use super::super::features::DerivedFeatures;
use super::{ComputationError, PredictionStrategy};
use serde::{Deserialize, Serialize};

/// Flat adjustment added per trip category. Negative values are penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryAdjustments {
    pub quick_trip_high_miles: f64,
    pub long_haul: f64,
    pub low_efficiency: f64,
    pub sweet_spot_efficiency: f64,
    pub balanced: f64,
}

impl Default for CategoryAdjustments {
    fn default() -> Self {
        Self {
            quick_trip_high_miles: 0.0,
            long_haul: 0.0,
            low_efficiency: -6.5,
            sweet_spot_efficiency: 0.0,
            balanced: 0.0,
        }
    }
}

impl CategoryAdjustments {
    pub fn for_category(&self, category: TripCategory) -> f64 {
        match category {
            TripCategory::QuickTripHighMiles => self.quick_trip_high_miles,
            TripCategory::LongHaul => self.long_haul,
            TripCategory::LowEfficiency => self.low_efficiency,
            TripCategory::SweetSpotEfficiency => self.sweet_spot_efficiency,
            TripCategory::Balanced => self.balanced,
        }
    }

    fn values(&self) -> [f64; 5] {
        [
            self.quick_trip_high_miles,
            self.long_haul,
            self.low_efficiency,
            self.sweet_spot_efficiency,
            self.balanced,
        ]
    }
}

/// Formula coefficients for one prediction path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleParams {
    pub base_per_diem: f64,
    pub tier1_rate: f64,
    pub tier2_rate: f64,
    pub tier3_rate: f64,
    /// Share of the multiplied receipts that is reimbursed.
    pub receipt_weight: f64,
    pub efficiency_bonus: f64,
    pub category_adjustments: CategoryAdjustments,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            base_per_diem: 100.0,
            tier1_rate: 0.75,
            tier2_rate: 0.50,
            tier3_rate: 0.50,
            receipt_weight: 1.0,
            efficiency_bonus: 0.0,
            category_adjustments: CategoryAdjustments::default(),
        }
    }
}

impl RuleParams {
    pub fn outlier_default() -> Self {
        Self {
            receipt_weight: 0.5,
            ..Self::default()
        }
    }

    pub fn validate(&self, path: PathId) -> Result<(), String> {
        let scalars = [
            self.base_per_diem,
            self.tier1_rate,
            self.tier2_rate,
            self.tier3_rate,
            self.receipt_weight,
            self.efficiency_bonus,
        ];
        if scalars
            .iter()
            .chain(self.category_adjustments.values().iter())
            .any(|value| !value.is_finite())
        {
            return Err(format!("rules.{path} coefficients must all be finite"));
        }
        Ok(())
    }
}

/// One parameter set per path so each branch can be calibrated on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub main: RuleParams,
    pub outlier: RuleParams,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            main: RuleParams::default(),
            outlier: RuleParams::outlier_default(),
        }
    }
}

impl RuleSet {
    pub fn for_path(&self, path: PathId) -> &RuleParams {
        match path {
            PathId::Main => &self.main,
            PathId::Outlier => &self.outlier,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        PathId::ordered()
            .into_iter()
            .try_for_each(|path| self.for_path(path).validate(path))
    }
}

/// Additive components of a rule-based reimbursement, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReimbursementBreakdown {
    pub per_diem: f64,
    pub mileage: f64,
    pub receipts: f64,
    pub efficiency_bonus: f64,
    pub four_day_bonus: f64,
    pub category_adjustment: f64,
}

impl ReimbursementBreakdown {
    pub fn total(&self) -> f64 {
        self.per_diem
            + self.mileage
            + self.receipts
            + self.efficiency_bonus
            + self.four_day_bonus
            + self.category_adjustment
    }
}

/// Closed-form reimbursement: per diem, tiered mileage, receipts, bonuses and penalties.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedStrategy {
    rules: RuleSet,
}

impl RuleBasedStrategy {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn breakdown(&self, path: PathId, features: &DerivedFeatures) -> ReimbursementBreakdown {
        let params = self.rules.for_path(path);
        let tiers = &features.mileage;

        ReimbursementBreakdown {
            per_diem: params.base_per_diem * f64::from(features.trip_duration_days),
            mileage: tiers.tier1 * params.tier1_rate
                + tiers.tier2 * params.tier2_rate
                + tiers.tier3 * params.tier3_rate,
            receipts: features.multiplied_receipts * params.receipt_weight,
            efficiency_bonus: if features.efficiency_bonus_flag {
                params.efficiency_bonus
            } else {
                0.0
            },
            four_day_bonus: features.four_day_bonus,
            category_adjustment: params
                .category_adjustments
                .for_category(features.trip_category),
        }
    }
}

impl PredictionStrategy for RuleBasedStrategy {
    fn name(&self) -> &'static str {
        "rules"
    }

    /// Penalties can outweigh the positive components; the payout floors at zero.
    fn predict(&self, path: PathId, features: &DerivedFeatures) -> Result<f64, ComputationError> {
        Ok(self.breakdown(path, features).total().max(0.0))
    }
}
