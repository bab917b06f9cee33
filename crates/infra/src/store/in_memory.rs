use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use branchcast_core::{Branch, BranchId, EntitySelector, ForecastRecord, SaleFact};

use super::r#trait::{
    validate_batch, ForecastSink, ForecastSource, SalesSink, SalesSource, StoreError,
};

#[derive(Debug, Default)]
struct State {
    branches: BTreeMap<BranchId, Branch>,
    sales: Vec<SaleFact>,
    forecasts: Vec<ForecastRecord>,
}

/// In-memory sales + forecast store.
///
/// Intended for tests/dev. Forecast appends happen under one write lock, so a
/// batch is visible entirely or not at all.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bare branch identifiers (test convenience).
    pub fn with_branch_ids(self, ids: impl IntoIterator<Item = BranchId>) -> Self {
        if let Ok(mut state) = self.state.write() {
            for id in ids {
                state.branches.entry(id).or_insert_with(|| Branch {
                    branch_id: id,
                    name: format!("Branch {id}"),
                    city: String::new(),
                    opening_date: chrono::NaiveDate::MIN,
                });
            }
        }
        self
    }

    pub fn with_sales(self, facts: impl IntoIterator<Item = SaleFact>) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.sales.extend(facts);
        }
        self
    }

    /// Every persisted forecast row, in append order.
    pub fn all_forecasts(&self) -> Result<Vec<ForecastRecord>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Read("lock poisoned".to_string()))?;
        Ok(state.forecasts.clone())
    }
}

#[async_trait]
impl SalesSource for InMemoryStore {
    async fn branch_ids(&self) -> Result<Vec<BranchId>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Read("lock poisoned".to_string()))?;
        Ok(state.branches.keys().copied().collect())
    }

    async fn sale_facts(&self, selector: EntitySelector) -> Result<Vec<SaleFact>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Read("lock poisoned".to_string()))?;
        let mut facts: Vec<SaleFact> = state
            .sales
            .iter()
            .filter(|f| selector.matches(f.branch_id))
            .cloned()
            .collect();
        facts.sort_by_key(|f| f.sold_at);
        Ok(facts)
    }
}

#[async_trait]
impl ForecastSink for InMemoryStore {
    async fn append_forecasts(&self, rows: &[ForecastRecord]) -> Result<usize, StoreError> {
        validate_batch(rows)?;
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Write("lock poisoned".to_string()))?;
        state.forecasts.extend_from_slice(rows);
        Ok(rows.len())
    }
}

#[async_trait]
impl ForecastSource for InMemoryStore {
    async fn latest_forecasts(&self) -> Result<Vec<ForecastRecord>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Read("lock poisoned".to_string()))?;

        let Some(latest) = state.forecasts.iter().map(|r| r.prediction_run_time).max() else {
            return Ok(vec![]);
        };

        let mut rows: Vec<ForecastRecord> = state
            .forecasts
            .iter()
            .filter(|r| r.prediction_run_time == latest)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.branch_id, r.prediction_date));
        Ok(rows)
    }

    async fn latest_forecasts_for(
        &self,
        branch_id: BranchId,
    ) -> Result<Vec<ForecastRecord>, StoreError> {
        let mut rows = self.latest_forecasts().await?;
        rows.retain(|r| r.branch_id == branch_id);
        Ok(rows)
    }

    async fn run_times(&self) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Read("lock poisoned".to_string()))?;
        let mut times: Vec<DateTime<Utc>> =
            state.forecasts.iter().map(|r| r.prediction_run_time).collect();
        times.sort_unstable_by(|a, b| b.cmp(a));
        times.dedup();
        Ok(times)
    }
}

#[async_trait]
impl SalesSink for InMemoryStore {
    async fn insert_branches(&self, branches: &[Branch]) -> Result<usize, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Write("lock poisoned".to_string()))?;
        let mut inserted = 0;
        for branch in branches {
            if !state.branches.contains_key(&branch.branch_id) {
                state.branches.insert(branch.branch_id, branch.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn insert_sales(&self, facts: &[SaleFact]) -> Result<usize, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Write("lock poisoned".to_string()))?;
        state.sales.extend_from_slice(facts);
        Ok(facts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn record(branch: i32, day: u32, run_secs: i64) -> ForecastRecord {
        ForecastRecord {
            branch_id: BranchId::from_raw(branch),
            prediction_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            predicted_sales: 100.0,
            lower_bound: 90.0,
            upper_bound: 110.0,
            prediction_run_time: Utc.timestamp_opt(run_secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn latest_forecasts_selects_newest_run_in_order() {
        let store = InMemoryStore::new();
        store
            .append_forecasts(&[record(1, 1, 1_000), record(0, 1, 1_000)])
            .await
            .unwrap();
        store
            .append_forecasts(&[record(2, 2, 2_000), record(0, 2, 2_000), record(0, 1, 2_000)])
            .await
            .unwrap();

        let latest = store.latest_forecasts().await.unwrap();
        let keys: Vec<(i32, u32)> = latest
            .iter()
            .map(|r| (r.branch_id.get(), chrono::Datelike::day(&r.prediction_date)))
            .collect();
        assert_eq!(keys, vec![(0, 1), (0, 2), (2, 2)]);

        assert_eq!(store.all_forecasts().unwrap().len(), 5);
        assert_eq!(store.run_times().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn latest_for_one_branch_filters_the_newest_run() {
        let store = InMemoryStore::new();
        store
            .append_forecasts(&[record(1, 1, 1_000), record(2, 1, 1_000)])
            .await
            .unwrap();
        store
            .append_forecasts(&[record(1, 3, 2_000), record(1, 2, 2_000), record(0, 2, 2_000)])
            .await
            .unwrap();

        let rows = store.latest_forecasts_for(BranchId::from_raw(1)).await.unwrap();
        let days: Vec<u32> = rows
            .iter()
            .map(|r| chrono::Datelike::day(&r.prediction_date))
            .collect();
        assert_eq!(days, vec![2, 3]);
        assert!(rows.iter().all(|r| r.prediction_run_time.timestamp() == 2_000));

        let aggregate = store.latest_forecasts_for(BranchId::AGGREGATE).await.unwrap();
        assert_eq!(aggregate.len(), 1);

        // Branch 2 was skipped by the newest run.
        assert!(store.latest_forecasts_for(BranchId::from_raw(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_store_has_no_latest_run() {
        let store = InMemoryStore::new();
        assert!(store.latest_forecasts().await.unwrap().is_empty());
        assert!(store.run_times().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_with_duplicate_keys_is_rejected_whole() {
        let store = InMemoryStore::new();
        let err = store
            .append_forecasts(&[record(1, 1, 1_000), record(1, 1, 1_000)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidBatch(_)));
        assert!(store.all_forecasts().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_with_mixed_run_times_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .append_forecasts(&[record(1, 1, 1_000), record(1, 2, 1_001)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidBatch(_)));
    }

    #[tokio::test]
    async fn branch_insert_skips_known_ids() {
        let store = InMemoryStore::new().with_branch_ids([BranchId::from_raw(1)]);
        let branch = |id: i32| Branch {
            branch_id: BranchId::from_raw(id),
            name: format!("b{id}"),
            city: "Izmir".to_string(),
            opening_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        };
        let inserted = store.insert_branches(&[branch(1), branch(2)]).await.unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(
            store.branch_ids().await.unwrap(),
            vec![BranchId::from_raw(1), BranchId::from_raw(2)]
        );
    }
}
