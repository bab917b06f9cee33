use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use branchcast_core::{Branch, BranchId, DailySeries, EntitySelector, ForecastRecord, SaleFact};

/// Data store operation error.
///
/// Read and write failures are kept apart: the forecast run treats a failed
/// registry read or final write as fatal, but a failed per-entity read as a skip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),

    #[error("store write failed: {0}")]
    Write(String),

    #[error("forecast batch rejected: {0}")]
    InvalidBatch(String),
}

/// Read access to branches and recorded sales.
#[async_trait]
pub trait SalesSource: Send + Sync {
    /// Every branch identifier known to the store, ascending.
    async fn branch_ids(&self) -> Result<Vec<BranchId>, StoreError>;

    /// Sale facts for one branch, or for every branch when the selector is `AllBranches`.
    async fn sale_facts(&self, selector: EntitySelector) -> Result<Vec<SaleFact>, StoreError>;

    /// Daily totals for the selector.
    ///
    /// The provided implementation aggregates `sale_facts` in process; stores that can
    /// group server-side should override it and must return the same series.
    async fn daily_totals(&self, selector: EntitySelector) -> Result<DailySeries, StoreError> {
        let facts = self.sale_facts(selector).await?;
        DailySeries::from_facts(selector, &facts).map_err(|e| StoreError::Read(e.to_string()))
    }
}

/// Append-only access to the forecast results table.
#[async_trait]
pub trait ForecastSink: Send + Sync {
    /// Append one run's rows. Returns the number of rows written.
    ///
    /// Implementations must write the batch all-or-nothing.
    async fn append_forecasts(&self, rows: &[ForecastRecord]) -> Result<usize, StoreError>;
}

/// Read access to persisted forecasts (the presentation contract).
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Rows of the most recent run, ordered by branch id then prediction date.
    async fn latest_forecasts(&self) -> Result<Vec<ForecastRecord>, StoreError>;

    /// Rows of the most recent run for one entity, ordered by prediction date.
    ///
    /// The run is the latest across all entities, so an entity skipped by that
    /// run yields no rows even if an earlier run forecast it.
    async fn latest_forecasts_for(
        &self,
        branch_id: BranchId,
    ) -> Result<Vec<ForecastRecord>, StoreError>;

    /// Distinct run timestamps, newest first.
    async fn run_times(&self) -> Result<Vec<DateTime<Utc>>, StoreError>;
}

/// Write access used by the synthetic data seeder.
#[async_trait]
pub trait SalesSink: Send + Sync {
    /// Insert branches; already-registered identifiers are left untouched.
    async fn insert_branches(&self, branches: &[Branch]) -> Result<usize, StoreError>;

    async fn insert_sales(&self, facts: &[SaleFact]) -> Result<usize, StoreError>;
}

/// Reject batches that break the per-run invariants before they reach storage.
pub(crate) fn validate_batch(rows: &[ForecastRecord]) -> Result<(), StoreError> {
    let Some(first) = rows.first() else {
        return Ok(());
    };

    let mut seen = std::collections::HashSet::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        if row.prediction_run_time != first.prediction_run_time {
            return Err(StoreError::InvalidBatch(format!(
                "batch contains multiple run timestamps (index {idx})"
            )));
        }
        if !seen.insert((row.branch_id, row.prediction_date)) {
            return Err(StoreError::InvalidBatch(format!(
                "duplicate row for branch {} on {} (index {idx})",
                row.branch_id, row.prediction_date
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl<S> SalesSource for Arc<S>
where
    S: SalesSource + ?Sized,
{
    async fn branch_ids(&self) -> Result<Vec<BranchId>, StoreError> {
        (**self).branch_ids().await
    }

    async fn sale_facts(&self, selector: EntitySelector) -> Result<Vec<SaleFact>, StoreError> {
        (**self).sale_facts(selector).await
    }

    async fn daily_totals(&self, selector: EntitySelector) -> Result<DailySeries, StoreError> {
        (**self).daily_totals(selector).await
    }
}

#[async_trait]
impl<S> ForecastSink for Arc<S>
where
    S: ForecastSink + ?Sized,
{
    async fn append_forecasts(&self, rows: &[ForecastRecord]) -> Result<usize, StoreError> {
        (**self).append_forecasts(rows).await
    }
}

#[async_trait]
impl<S> ForecastSource for Arc<S>
where
    S: ForecastSource + ?Sized,
{
    async fn latest_forecasts(&self) -> Result<Vec<ForecastRecord>, StoreError> {
        (**self).latest_forecasts().await
    }

    async fn latest_forecasts_for(
        &self,
        branch_id: BranchId,
    ) -> Result<Vec<ForecastRecord>, StoreError> {
        (**self).latest_forecasts_for(branch_id).await
    }

    async fn run_times(&self) -> Result<Vec<DateTime<Utc>>, StoreError> {
        (**self).run_times().await
    }
}

#[async_trait]
impl<S> SalesSink for Arc<S>
where
    S: SalesSink + ?Sized,
{
    async fn insert_branches(&self, branches: &[Branch]) -> Result<usize, StoreError> {
        (**self).insert_branches(branches).await
    }

    async fn insert_sales(&self, facts: &[SaleFact]) -> Result<usize, StoreError> {
        (**self).insert_sales(facts).await
    }
}
