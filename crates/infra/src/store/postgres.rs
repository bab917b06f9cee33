//! Postgres-backed sales + forecast store.
//!
//! Every statement binds its inputs as parameters (`$1`, `$2`, ...); branch
//! identifiers are never formatted into SQL text.
//!
//! ## Error Mapping
//!
//! Failures on SELECT paths map to `StoreError::Read`, failures on INSERT /
//! transaction paths to `StoreError::Write`. The message carries the operation
//! name and, for database errors, the Postgres SQLSTATE.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::{instrument, Span};

use branchcast_core::{
    Branch, BranchId, DailyPoint, DailySeries, EntitySelector, ForecastRecord, SaleFact,
};

use super::r#trait::{
    validate_batch, ForecastSink, ForecastSource, SalesSink, SalesSource, StoreError,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS branches (
        branch_id INTEGER PRIMARY KEY,
        branch_name TEXT NOT NULL,
        city TEXT NOT NULL DEFAULT '',
        opening_date DATE NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        sale_id BIGSERIAL PRIMARY KEY,
        sale_datetime TIMESTAMP NOT NULL,
        branch_id INTEGER NOT NULL,
        total_sale_amount NUMERIC(12, 2) NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sales_branch_datetime_idx ON sales (branch_id, sale_datetime)",
    r#"
    CREATE TABLE IF NOT EXISTS prediction_results (
        branch_id INTEGER NOT NULL,
        prediction_date DATE NOT NULL,
        predicted_sales DOUBLE PRECISION NOT NULL,
        lower_bound DOUBLE PRECISION NOT NULL,
        upper_bound DOUBLE PRECISION NOT NULL,
        prediction_run_time TIMESTAMPTZ NOT NULL,
        UNIQUE (prediction_run_time, branch_id, prediction_date)
    )
    "#,
];

/// Postgres-backed store.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and shared across clones.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Read(format!("connect failed: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Create the tables this pipeline reads and writes, if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error(StoreError::Write, "ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl SalesSource for PostgresStore {
    #[instrument(skip(self), err)]
    async fn branch_ids(&self) -> Result<Vec<BranchId>, StoreError> {
        let rows = sqlx::query("SELECT branch_id FROM branches ORDER BY branch_id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(StoreError::Read, "branch_ids", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<i32, _>("branch_id")
                    .map(BranchId::from_raw)
                    .map_err(|e| map_sqlx_error(StoreError::Read, "branch_ids", e))
            })
            .collect()
    }

    #[instrument(skip(self), fields(branch_id = %selector.branch_id()), err)]
    async fn sale_facts(&self, selector: EntitySelector) -> Result<Vec<SaleFact>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                sale_datetime,
                branch_id,
                total_sale_amount::float8 AS amount
            FROM sales
            WHERE ($1::int4 IS NULL OR branch_id = $1)
            ORDER BY sale_datetime ASC
            "#,
        )
        .bind(selector.branch_filter().map(i32::from))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(StoreError::Read, "sale_facts", e))?;

        let mut facts = Vec::with_capacity(rows.len());
        for row in rows {
            let sale = SaleRow::from_row(&row)
                .map_err(|e| map_sqlx_error(StoreError::Read, "sale_facts", e))?;
            facts.push(sale.into());
        }
        Ok(facts)
    }

    #[instrument(skip(self), fields(branch_id = %selector.branch_id(), days = tracing::field::Empty), err)]
    async fn daily_totals(&self, selector: EntitySelector) -> Result<DailySeries, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                DATE(sale_datetime) AS ds,
                SUM(total_sale_amount)::float8 AS y
            FROM sales
            WHERE ($1::int4 IS NULL OR branch_id = $1)
            GROUP BY DATE(sale_datetime)
            ORDER BY ds ASC
            "#,
        )
        .bind(selector.branch_filter().map(i32::from))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(StoreError::Read, "daily_totals", e))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let date: NaiveDate = row
                .try_get("ds")
                .map_err(|e| map_sqlx_error(StoreError::Read, "daily_totals", e))?;
            let amount: f64 = row
                .try_get("y")
                .map_err(|e| map_sqlx_error(StoreError::Read, "daily_totals", e))?;
            points.push(DailyPoint::new(date, amount));
        }

        Span::current().record("days", points.len());
        DailySeries::new(selector.branch_id(), points).map_err(|e| StoreError::Read(e.to_string()))
    }
}

#[async_trait]
impl ForecastSink for PostgresStore {
    /// Appends the whole batch in one transaction.
    #[instrument(skip(self, rows), fields(rows = rows.len()), err)]
    async fn append_forecasts(&self, rows: &[ForecastRecord]) -> Result<usize, StoreError> {
        validate_batch(rows)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "begin_transaction", e))?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO prediction_results (
                    branch_id,
                    prediction_date,
                    predicted_sales,
                    lower_bound,
                    upper_bound,
                    prediction_run_time
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.branch_id.get())
            .bind(row.prediction_date)
            .bind(row.predicted_sales)
            .bind(row.lower_bound)
            .bind(row.upper_bound)
            .bind(row.prediction_run_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "insert_prediction", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "commit_transaction", e))?;

        Ok(rows.len())
    }
}

#[async_trait]
impl ForecastSource for PostgresStore {
    #[instrument(skip(self), err)]
    async fn latest_forecasts(&self) -> Result<Vec<ForecastRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                branch_id,
                prediction_date,
                predicted_sales,
                lower_bound,
                upper_bound,
                prediction_run_time
            FROM prediction_results
            WHERE prediction_run_time = (SELECT MAX(prediction_run_time) FROM prediction_results)
            ORDER BY branch_id ASC, prediction_date ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(StoreError::Read, "latest_forecasts", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = PredictionRow::from_row(&row)
                .map_err(|e| map_sqlx_error(StoreError::Read, "latest_forecasts", e))?;
            records.push(record.into());
        }
        Ok(records)
    }

    #[instrument(skip(self), fields(branch_id = %branch_id), err)]
    async fn latest_forecasts_for(
        &self,
        branch_id: BranchId,
    ) -> Result<Vec<ForecastRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                branch_id,
                prediction_date,
                predicted_sales,
                lower_bound,
                upper_bound,
                prediction_run_time
            FROM prediction_results
            WHERE prediction_run_time = (SELECT MAX(prediction_run_time) FROM prediction_results)
              AND branch_id = $1
            ORDER BY prediction_date ASC
            "#,
        )
        .bind(branch_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(StoreError::Read, "latest_forecasts_for", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = PredictionRow::from_row(&row)
                .map_err(|e| map_sqlx_error(StoreError::Read, "latest_forecasts_for", e))?;
            records.push(record.into());
        }
        Ok(records)
    }

    #[instrument(skip(self), err)]
    async fn run_times(&self) -> Result<Vec<DateTime<Utc>>, StoreError> {
        let rows = sqlx::query(
            "SELECT DISTINCT prediction_run_time FROM prediction_results ORDER BY prediction_run_time DESC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(StoreError::Read, "run_times", e))?;

        rows.iter()
            .map(|row| {
                row.try_get("prediction_run_time")
                    .map_err(|e| map_sqlx_error(StoreError::Read, "run_times", e))
            })
            .collect()
    }
}

#[async_trait]
impl SalesSink for PostgresStore {
    #[instrument(skip(self, branches), fields(branches = branches.len()), err)]
    async fn insert_branches(&self, branches: &[Branch]) -> Result<usize, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "begin_transaction", e))?;

        let mut inserted = 0;
        for branch in branches {
            let result = sqlx::query(
                r#"
                INSERT INTO branches (branch_id, branch_name, city, opening_date)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (branch_id) DO NOTHING
                "#,
            )
            .bind(branch.branch_id.get())
            .bind(&branch.name)
            .bind(&branch.city)
            .bind(branch.opening_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "insert_branch", e))?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "commit_transaction", e))?;
        Ok(inserted)
    }

    #[instrument(skip(self, facts), fields(facts = facts.len()), err)]
    async fn insert_sales(&self, facts: &[SaleFact]) -> Result<usize, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "begin_transaction", e))?;

        for fact in facts {
            sqlx::query(
                r#"
                INSERT INTO sales (sale_datetime, branch_id, total_sale_amount)
                VALUES ($1, $2, $3::float8::numeric(12, 2))
                "#,
            )
            .bind(fact.sold_at)
            .bind(fact.branch_id.get())
            .bind(fact.amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "insert_sale", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(StoreError::Write, "commit_transaction", e))?;
        Ok(facts.len())
    }
}

/// Map SQLx errors to a read or write `StoreError`.
fn map_sqlx_error(kind: fn(String) -> StoreError, operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            kind(format!(
                "database error in {operation} [{code}]: {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => kind(format!("connection pool closed in {operation}")),
        other => kind(format!("sqlx error in {operation}: {other}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct SaleRow {
    sale_datetime: NaiveDateTime,
    branch_id: i32,
    amount: f64,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for SaleRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleRow {
            sale_datetime: row.try_get("sale_datetime")?,
            branch_id: row.try_get("branch_id")?,
            amount: row.try_get("amount")?,
        })
    }
}

impl From<SaleRow> for SaleFact {
    fn from(row: SaleRow) -> Self {
        SaleFact::new(row.sale_datetime, BranchId::from_raw(row.branch_id), row.amount)
    }
}

#[derive(Debug)]
struct PredictionRow {
    branch_id: i32,
    prediction_date: NaiveDate,
    predicted_sales: f64,
    lower_bound: f64,
    upper_bound: f64,
    prediction_run_time: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PredictionRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PredictionRow {
            branch_id: row.try_get("branch_id")?,
            prediction_date: row.try_get("prediction_date")?,
            predicted_sales: row.try_get("predicted_sales")?,
            lower_bound: row.try_get("lower_bound")?,
            upper_bound: row.try_get("upper_bound")?,
            prediction_run_time: row.try_get("prediction_run_time")?,
        })
    }
}

impl From<PredictionRow> for ForecastRecord {
    fn from(row: PredictionRow) -> Self {
        ForecastRecord {
            branch_id: BranchId::from_raw(row.branch_id),
            prediction_date: row.prediction_date,
            predicted_sales: row.predicted_sales,
            lower_bound: row.lower_bound,
            upper_bound: row.upper_bound,
            prediction_run_time: row.prediction_run_time,
        }
    }
}
