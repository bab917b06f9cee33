use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::id::BranchId;

/// A recorded sale. Immutable once written.
///
/// `sold_at` is a naive timestamp in the store's local convention; grouping by
/// calendar day uses its date part as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleFact {
    pub sold_at: NaiveDateTime,
    pub branch_id: BranchId,
    /// Total sale amount in currency units.
    pub amount: f64,
}

impl SaleFact {
    pub fn new(sold_at: NaiveDateTime, branch_id: BranchId, amount: f64) -> Self {
        Self {
            sold_at,
            branch_id,
            amount,
        }
    }

    pub fn sale_date(&self) -> NaiveDate {
        self.sold_at.date()
    }
}

/// A branch as registered in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub branch_id: BranchId,
    pub name: String,
    pub city: String,
    pub opening_date: NaiveDate,
}
