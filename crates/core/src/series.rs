//! Daily aggregated sales series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{BranchId, EntitySelector};
use crate::sales::SaleFact;

/// One observation: total sales on a calendar day.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub amount: f64,
}

impl DailyPoint {
    pub fn new(date: NaiveDate, amount: f64) -> Self {
        Self { date, amount }
    }
}

/// Per-entity daily sales series.
///
/// Invariant: dates are strictly increasing (no duplicates). Missing days are
/// allowed and are not filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    branch_id: BranchId,
    points: Vec<DailyPoint>,
}

impl DailySeries {
    /// Build a series from already-aggregated points.
    pub fn new(branch_id: BranchId, points: Vec<DailyPoint>) -> DomainResult<Self> {
        for (idx, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(DomainError::invariant(format!(
                    "series dates must be strictly increasing (index {}: {} after {})",
                    idx + 1,
                    pair[1].date,
                    pair[0].date
                )));
            }
        }
        if let Some(p) = points.iter().find(|p| !p.amount.is_finite()) {
            return Err(DomainError::validation(format!(
                "non-finite amount on {}",
                p.date
            )));
        }
        Ok(Self { branch_id, points })
    }

    pub fn empty(branch_id: BranchId) -> Self {
        Self {
            branch_id,
            points: Vec::new(),
        }
    }

    /// Group sale facts by calendar day and sum amounts.
    ///
    /// Facts not selected by `selector` are ignored; `AllBranches` sums every branch.
    pub fn from_facts<'a, I>(selector: EntitySelector, facts: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a SaleFact>,
    {
        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for fact in facts {
            if selector.matches(fact.branch_id) {
                *by_day.entry(fact.sale_date()).or_insert(0.0) += fact.amount;
            }
        }

        let points = by_day
            .into_iter()
            .map(|(date, amount)| DailyPoint::new(date, amount))
            .collect();
        Self::new(selector.branch_id(), points)
    }

    pub fn branch_id(&self) -> BranchId {
        self.branch_id
    }

    pub fn points(&self) -> &[DailyPoint] {
        &self.points
    }

    /// Number of distinct days present.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn amount_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].amount)
    }
}
