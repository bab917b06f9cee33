//! `branchcast-forecast`
//!
//! **Responsibility:** the forecast model boundary.
//!
//! - Consumes a `DailySeries`, never a store handle.
//! - Holds no fitted state between calls: every `forecast` fits from scratch.
//! - Emits `Prediction`s; stamping them with branch and run identity is the caller's job.

pub mod additive;
mod design;
mod linalg;
pub mod model;
pub mod result;
pub mod stats;

pub use additive::{AdditiveModel, ModelConfig, MAX_HORIZON_DAYS};
pub use model::ForecastModel;
pub use result::{FitError, ForecastError, Prediction};
