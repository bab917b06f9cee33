use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use branchcast_core::BranchId;

use crate::store::StoreError;

/// What happened to one entity during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Forecast produced; `rows` records are part of the run's batch.
    Forecast { rows: usize },
    /// Skipped: history shorter than the model's threshold.
    InsufficientData { days: usize, required: usize },
    /// Skipped: the model failed for a reason other than history length.
    ModelError { message: String },
    /// Skipped: the entity's sales could not be read.
    ReadError { message: String },
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Forecast { .. } => "forecast",
            OutcomeKind::InsufficientData { .. } => "insufficient_data",
            OutcomeKind::ModelError { .. } => "model_error",
            OutcomeKind::ReadError { .. } => "read_error",
        }
    }

    pub fn is_forecast(&self) -> bool {
        matches!(self, OutcomeKind::Forecast { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOutcome {
    pub branch_id: BranchId,
    #[serde(flatten)]
    pub kind: OutcomeKind,
}

/// Result of one forecast run, in entity order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Shared `prediction_run_time` of every row written by this run.
    pub run_at: DateTime<Utc>,
    pub outcomes: Vec<EntityOutcome>,
    pub rows_written: usize,
}

impl RunSummary {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|k| k.is_forecast())
    }

    pub fn skipped_insufficient(&self) -> usize {
        self.count(|k| matches!(k, OutcomeKind::InsufficientData { .. }))
    }

    /// Entities skipped for a model or read failure.
    pub fn skipped_failed(&self) -> usize {
        self.count(|k| {
            matches!(
                k,
                OutcomeKind::ModelError { .. } | OutcomeKind::ReadError { .. }
            )
        })
    }

    pub fn skipped(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    pub fn outcome_for(&self, branch_id: BranchId) -> Option<&OutcomeKind> {
        self.outcomes
            .iter()
            .find(|o| o.branch_id == branch_id)
            .map(|o| &o.kind)
    }

    fn count(&self, pred: impl Fn(&OutcomeKind) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.kind)).count()
    }
}

/// Run-level failure. Per-entity problems never surface here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to read the branch registry")]
    Registry(#[source] StoreError),

    #[error("failed to persist forecast results")]
    Write(#[source] StoreError),

    /// Every entity was skipped; nothing was written.
    #[error("no entity produced a forecast ({attempted} attempted)")]
    EmptyRun {
        attempted: usize,
        summary: Box<RunSummary>,
    },
}

impl RunError {
    pub fn is_empty_run(&self) -> bool {
        matches!(self, RunError::EmptyRun { .. })
    }
}
