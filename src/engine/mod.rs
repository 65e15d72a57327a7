//! Pure reimbursement core: feature derivation, routing, prediction strategies,
//! and the calculator that composes them. Nothing in here performs I/O except
//! the model artifact reader/writer.

pub mod calculator;
pub mod domain;
pub mod features;
pub mod model;
pub mod router;
pub mod strategy;

pub use calculator::{round_currency, Prediction, ReimbursementCalculator};
pub use domain::{InvalidInput, PathId, RawTripInput, TripCategory, TripRecord};
pub use features::{derive, DerivedFeatures, FeatureParams, MileageTiers};
pub use model::{train, ModelArtifact, ModelError, TrainingConfig, TrainingError};
pub use router::{ReceiptThresholdRouter, Route, RouterParams};
pub use strategy::{
    ComputationError, LearnedStrategy, PredictionStrategy, RuleBasedStrategy, RuleParams, RuleSet,
};

/// Calculator with the strategy chosen at runtime.
pub type DynCalculator = ReimbursementCalculator<Box<dyn PredictionStrategy>>;
