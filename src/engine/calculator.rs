use super::domain::{PathId, TripCategory, TripRecord};
use super::features::{derive, DerivedFeatures, FeatureParams};
use super::router::{ReceiptThresholdRouter, Route};
use super::strategy::{ComputationError, PredictionStrategy};
use serde::Serialize;

/// Rounds half-up to whole cents.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub path: PathId,
    pub category: TripCategory,
    pub amount: f64,
}

/// Derives features, routes, and runs the configured strategy for one record.
///
/// Feature parameters, router, and strategy are all injected so the same
/// calculator instance backs single predictions, batches, and evaluations.
#[derive(Debug, Clone)]
pub struct ReimbursementCalculator<S, R = ReceiptThresholdRouter> {
    features: FeatureParams,
    router: R,
    strategy: S,
}

impl<S: PredictionStrategy> ReimbursementCalculator<S> {
    pub fn new(features: FeatureParams, router: ReceiptThresholdRouter, strategy: S) -> Self {
        Self::with_router(features, router, strategy)
    }
}

impl<S, R> ReimbursementCalculator<S, R>
where
    S: PredictionStrategy,
    R: Route,
{
    pub fn with_router(features: FeatureParams, router: R, strategy: S) -> Self {
        Self {
            features,
            router,
            strategy,
        }
    }

    pub fn derive(&self, record: &TripRecord) -> DerivedFeatures {
        derive(record, &self.features)
    }

    pub fn route(&self, record: &TripRecord) -> PathId {
        self.router.route(record)
    }

    pub fn calculate(&self, record: &TripRecord) -> Result<Prediction, ComputationError> {
        let features = self.derive(record);
        let path = self.route(record);
        let raw = self.strategy.predict(path, &features)?;

        if !raw.is_finite() {
            return Err(ComputationError::NonFinite {
                strategy: self.strategy.name(),
                path,
                value: raw,
            });
        }

        Ok(Prediction {
            path,
            category: features.trip_category,
            amount: round_currency(raw),
        })
    }

    pub fn amount(&self, record: &TripRecord) -> Result<f64, ComputationError> {
        self.calculate(record).map(|prediction| prediction.amount)
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }
}
