use super::domain::{PathId, TripRecord};
use serde::{Deserialize, Serialize};

/// Chooses the prediction path for a record.
///
/// Implementations must be pure: the same record always routes to the same path.
pub trait Route: Send + Sync {
    fn route(&self, record: &TripRecord) -> PathId;
}

/// Calibrated routing threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterParams {
    /// Receipts strictly above this amount take the outlier path.
    pub outlier_threshold: f64,
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            outlier_threshold: 1400.0,
        }
    }
}

impl RouterParams {
    pub fn validate(&self) -> Result<(), String> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold < 0.0 {
            return Err("router.outlier_threshold must be a finite, non-negative amount".to_string());
        }
        Ok(())
    }
}

/// Two-way router keyed on total receipts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptThresholdRouter {
    outlier_threshold: f64,
}

impl ReceiptThresholdRouter {
    pub fn new(outlier_threshold: f64) -> Self {
        Self { outlier_threshold }
    }

    pub fn from_params(params: &RouterParams) -> Self {
        Self::new(params.outlier_threshold)
    }

    pub fn outlier_threshold(&self) -> f64 {
        self.outlier_threshold
    }
}

impl Default for ReceiptThresholdRouter {
    fn default() -> Self {
        Self::from_params(&RouterParams::default())
    }
}

impl Route for ReceiptThresholdRouter {
    fn route(&self, record: &TripRecord) -> PathId {
        if record.total_receipts_amount() > self.outlier_threshold {
            PathId::Outlier
        } else {
            PathId::Main
        }
    }
}
