use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use branchcast_core::{BranchId, ForecastRecord};

/// One predicted day with its uncertainty interval.
///
/// Invariant: `lower <= predicted <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Prediction {
    pub fn into_record(self, branch_id: BranchId, run_at: DateTime<Utc>) -> ForecastRecord {
        ForecastRecord {
            branch_id,
            prediction_date: self.date,
            predicted_sales: self.predicted,
            lower_bound: self.lower,
            upper_bound: self.upper,
            prediction_run_time: run_at,
        }
    }
}

#[derive(Debug, Error)]
pub enum ForecastError {
    /// The history is too short to fit seasonal components.
    #[error("insufficient history: {days} distinct day(s), at least {required} required")]
    InsufficientData { days: usize, required: usize },

    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),

    /// Fitting or predicting failed for a reason other than history length.
    #[error("model fit failed")]
    ModelFit(#[from] FitError),
}

impl ForecastError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ForecastError::InsufficientData { .. })
    }
}

/// Underlying cause of a `ForecastError::ModelFit`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("normal equations are not positive definite ({columns} columns)")]
    Singular { columns: usize },

    #[error("non-finite {0} produced")]
    NonFinite(&'static str),
}
