//! Series extraction: sales store -> per-entity daily totals.

use tracing::{debug, instrument};

use branchcast_core::{DailySeries, EntitySelector};

use crate::store::{SalesSource, StoreError};

/// Builds the daily sales series of one forecast entity.
///
/// Read-only. An entity with no sales yields an empty series, not an error;
/// `Err` is reserved for store failures.
#[derive(Debug, Clone)]
pub struct SeriesExtractor<S> {
    source: S,
}

impl<S> SeriesExtractor<S>
where
    S: SalesSource,
{
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// The entities of one run: the aggregate first, then every branch ascending.
    pub async fn entities(&self) -> Result<Vec<EntitySelector>, StoreError> {
        let mut ids = self.source.branch_ids().await?;
        ids.retain(|id| !id.is_aggregate());
        ids.sort_unstable();
        ids.dedup();

        let mut entities = Vec::with_capacity(ids.len() + 1);
        entities.push(EntitySelector::AllBranches);
        entities.extend(ids.into_iter().map(EntitySelector::Branch));
        Ok(entities)
    }

    /// Daily totals for `selector`, ascending by date, one point per day with sales.
    #[instrument(skip(self), fields(branch_id = %selector.branch_id()))]
    pub async fn extract(&self, selector: EntitySelector) -> Result<DailySeries, StoreError> {
        let series = self.source.daily_totals(selector).await?;
        debug!(
            days = series.len(),
            first = ?series.first_date(),
            last = ?series.last_date(),
            "series extracted"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use branchcast_core::{BranchId, SaleFact};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn sale(branch: i32, day: u32, hour: u32, amount: f64) -> SaleFact {
        let at = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap();
        SaleFact::new(at, BranchId::from_raw(branch), amount)
    }

    fn store() -> Arc<InMemoryStore> {
        Arc::new(
            InMemoryStore::new()
                .with_branch_ids([BranchId::from_raw(2), BranchId::from_raw(1)])
                .with_sales([
                    sale(1, 1, 9, 10.0),
                    sale(1, 1, 18, 5.5),
                    sale(2, 1, 12, 20.0),
                    sale(1, 3, 10, 7.0),
                    sale(2, 4, 11, 3.0),
                ]),
        )
    }

    #[tokio::test]
    async fn branch_series_sums_per_day() {
        let extractor = SeriesExtractor::new(store());
        let series = extractor
            .extract(EntitySelector::Branch(BranchId::from_raw(1)))
            .await
            .unwrap();

        let days: Vec<(u32, f64)> = series
            .points()
            .iter()
            .map(|p| (chrono::Datelike::day(&p.date), p.amount))
            .collect();
        assert_eq!(days, vec![(1, 15.5), (3, 7.0)]);
        assert_eq!(series.branch_id(), BranchId::from_raw(1));
    }

    #[tokio::test]
    async fn aggregate_series_sums_every_branch() {
        let extractor = SeriesExtractor::new(store());
        let series = extractor
            .extract(EntitySelector::from(BranchId::AGGREGATE))
            .await
            .unwrap();

        let amounts: Vec<f64> = series.points().iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![35.5, 7.0, 3.0]);
        assert!(series.branch_id().is_aggregate());
    }

    #[tokio::test]
    async fn branch_without_sales_is_empty_not_error() {
        let extractor = SeriesExtractor::new(store());
        let series = extractor
            .extract(EntitySelector::Branch(BranchId::from_raw(9)))
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn entities_lead_with_aggregate() {
        let source = InMemoryStore::new().with_branch_ids([
            BranchId::from_raw(3),
            BranchId::AGGREGATE,
            BranchId::from_raw(1),
        ]);
        let extractor = SeriesExtractor::new(source);

        let entities = extractor.entities().await.unwrap();
        assert_eq!(
            entities,
            vec![
                EntitySelector::AllBranches,
                EntitySelector::Branch(BranchId::from_raw(1)),
                EntitySelector::Branch(BranchId::from_raw(3)),
            ]
        );
    }

    #[tokio::test]
    async fn no_branches_still_yields_aggregate() {
        let extractor = SeriesExtractor::new(InMemoryStore::new());
        assert_eq!(extractor.entities().await.unwrap(), vec![EntitySelector::AllBranches]);
    }
}
