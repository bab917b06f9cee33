use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::id::BranchId;

/// A persisted forecast row.
///
/// Rows are appended, never updated. All rows from one run share
/// `prediction_run_time`, and `(branch_id, prediction_date)` is unique within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub branch_id: BranchId,
    pub prediction_date: NaiveDate,
    pub predicted_sales: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub prediction_run_time: DateTime<Utc>,
}

impl ForecastRecord {
    pub fn brackets_prediction(&self) -> bool {
        self.lower_bound <= self.predicted_sales && self.predicted_sales <= self.upper_bound
    }
}

/// Normalize a run timestamp to the precision the store keeps (microseconds).
pub fn run_timestamp(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}
