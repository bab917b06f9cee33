//! `branchcast-core`: domain primitives shared by the forecast pipeline.
//!
//! This crate contains **pure domain** types (no storage, no model fitting).

pub mod error;
pub mod forecast;
pub mod id;
pub mod sales;
pub mod series;

pub use error::{DomainError, DomainResult};
pub use forecast::{run_timestamp, ForecastRecord};
pub use id::{BranchId, EntitySelector};
pub use sales::{Branch, SaleFact};
pub use series::{DailyPoint, DailySeries};
