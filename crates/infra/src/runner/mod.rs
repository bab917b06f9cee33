//! Forecast orchestration.
//!
//! One run forecasts the aggregate and every registered branch, stamps every
//! row with a single run timestamp, and appends the batch once:
//!
//! - registry read failure: the run fails, nothing is written
//! - per-entity read/model failure or short history: the entity is skipped
//! - no entity succeeded: the run fails as `EmptyRun`, nothing is written
//! - write failure: the run fails, the store keeps no partial batch

mod summary;

pub use summary::{EntityOutcome, OutcomeKind, RunError, RunSummary};

use std::error::Error as _;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use branchcast_core::{run_timestamp, EntitySelector, ForecastRecord};
use branchcast_forecast::{AdditiveModel, ForecastError, ForecastModel};

use crate::config::ForecastConfig;
use crate::extractor::SeriesExtractor;
use crate::store::{ForecastSink, SalesSource};

/// Runs the forecast pipeline over every entity.
pub struct ForecastRunner<S, W, M> {
    extractor: SeriesExtractor<S>,
    sink: W,
    model: M,
    horizon_days: usize,
}

impl<S, W> ForecastRunner<S, W, AdditiveModel>
where
    S: SalesSource,
    W: ForecastSink,
{
    /// Runner using the additive model described by `config`.
    pub fn from_config(source: S, sink: W, config: &ForecastConfig) -> Self {
        Self::new(source, sink, config.build_model(), config.horizon_days)
    }
}

impl<S, W, M> ForecastRunner<S, W, M>
where
    S: SalesSource,
    W: ForecastSink,
    M: ForecastModel,
{
    pub fn new(source: S, sink: W, model: M, horizon_days: usize) -> Self {
        Self {
            extractor: SeriesExtractor::new(source),
            sink,
            model,
            horizon_days,
        }
    }

    pub fn horizon_days(&self) -> usize {
        self.horizon_days
    }

    /// Run now.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit clock reading (truncated to the store's precision).
    #[instrument(skip(self), fields(model = self.model.name(), horizon = self.horizon_days), err)]
    pub async fn run_at(&self, at: DateTime<Utc>) -> Result<RunSummary, RunError> {
        let run_at = run_timestamp(at);
        let entities = self.extractor.entities().await.map_err(|e| {
            error!(error = %e, "failed to read branch registry");
            RunError::Registry(e)
        })?;
        info!(entities = entities.len(), run_at = %run_at, "forecast run started");

        let mut rows: Vec<ForecastRecord> = Vec::new();
        let mut outcomes = Vec::with_capacity(entities.len());
        for selector in entities {
            let kind = self.forecast_entity(selector, run_at, &mut rows).await;
            log_outcome(selector, &kind);
            outcomes.push(EntityOutcome {
                branch_id: selector.branch_id(),
                kind,
            });
        }

        let mut summary = RunSummary {
            run_at,
            outcomes,
            rows_written: 0,
        };

        if summary.succeeded() == 0 {
            error!(
                attempted = summary.attempted(),
                skipped_insufficient = summary.skipped_insufficient(),
                skipped_failed = summary.skipped_failed(),
                "no entity produced a forecast; nothing written"
            );
            return Err(RunError::EmptyRun {
                attempted: summary.attempted(),
                summary: Box::new(summary),
            });
        }

        let written = self.sink.append_forecasts(&rows).await.map_err(|e| {
            error!(error = %e, rows = rows.len(), "forecast batch write failed");
            RunError::Write(e)
        })?;
        summary.rows_written = written;

        info!(
            succeeded = summary.succeeded(),
            skipped = summary.skipped(),
            rows = written,
            "forecast run finished"
        );
        Ok(summary)
    }

    /// Forecast one entity, pushing its rows onto `rows` on success.
    async fn forecast_entity(
        &self,
        selector: EntitySelector,
        run_at: DateTime<Utc>,
        rows: &mut Vec<ForecastRecord>,
    ) -> OutcomeKind {
        let branch_id = selector.branch_id();

        let series = match self.extractor.extract(selector).await {
            Ok(series) => series,
            Err(e) => {
                return OutcomeKind::ReadError {
                    message: e.to_string(),
                };
            }
        };

        match self.model.forecast(&series, self.horizon_days) {
            Ok(predictions) => {
                let count = predictions.len();
                rows.extend(
                    predictions
                        .into_iter()
                        .map(|p| p.into_record(branch_id, run_at)),
                );
                OutcomeKind::Forecast { rows: count }
            }
            Err(ForecastError::InsufficientData { days, required }) => {
                OutcomeKind::InsufficientData { days, required }
            }
            Err(e) => OutcomeKind::ModelError {
                message: error_chain(&e),
            },
        }
    }
}

fn log_outcome(selector: EntitySelector, kind: &OutcomeKind) {
    let branch_id = selector.branch_id();
    let outcome = kind.label();
    match kind {
        OutcomeKind::Forecast { rows } => {
            info!(branch_id = %branch_id, outcome, rows, "entity forecast");
        }
        OutcomeKind::InsufficientData { days, required } => {
            info!(
                branch_id = %branch_id,
                outcome,
                days,
                required,
                "insufficient history; entity skipped"
            );
        }
        OutcomeKind::ModelError { message } | OutcomeKind::ReadError { message } => {
            warn!(branch_id = %branch_id, outcome, message = %message, "entity skipped");
        }
    }
}

fn error_chain(err: &ForecastError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
