//! Command execution and output formatting.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use branchcast_core::{BranchId, ForecastRecord};
use branchcast_infra::{
    ForecastConfig, ForecastRunner, ForecastSource, JobConfig, OutcomeKind, PostgresStore,
    RunError, RunSummary, StoreError, SyntheticSales,
};

use crate::cli::{Command, LatestArgs, RunArgs, SeedArgs, USAGE};

/// Process exit status for a failed command.
///
/// A run where every entity was skipped is told apart from other failures.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RunError>() {
        Some(run) if run.is_empty_run() => 2,
        _ => 1,
    }
}

pub async fn execute(command: Command) -> anyhow::Result<()> {
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = JobConfig::from_env().context("loading configuration")?;
    let store = Arc::new(
        PostgresStore::connect(&config.database_url)
            .await
            .context("connecting to the database")?,
    );

    match command {
        Command::Run(args) => {
            let forecast = apply_run_args(config.forecast, &args)?;
            let runner = ForecastRunner::from_config(store.clone(), store, &forecast);
            match runner.run().await {
                Ok(summary) => {
                    print!("{}", render_summary(&summary));
                    Ok(())
                }
                Err(err) => {
                    if let RunError::EmptyRun { summary, .. } = &err {
                        print!("{}", render_summary(summary));
                    }
                    Err(err.into())
                }
            }
        }
        Command::Latest(args) => {
            let rows = latest_rows(store.as_ref(), &args)
                .await
                .context("reading latest forecasts")?;
            print!("{}", render_latest(&rows));
            Ok(())
        }
        Command::Seed(args) => {
            let plan = seed_plan(&args);
            let report = plan.seed_into(store.as_ref()).await.context("seeding sales")?;
            println!("seeded {} branch(es), {} sale(s)", report.branches, report.sales);
            Ok(())
        }
        Command::Schema => {
            store.ensure_schema().await.context("creating schema")?;
            info!("schema ready");
            println!("schema ready");
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

async fn latest_rows<S>(source: &S, args: &LatestArgs) -> Result<Vec<ForecastRecord>, StoreError>
where
    S: ForecastSource + ?Sized,
{
    match args.branch {
        Some(branch_id) => source.latest_forecasts_for(branch_id).await,
        None => source.latest_forecasts().await,
    }
}

fn apply_run_args(mut config: ForecastConfig, args: &RunArgs) -> anyhow::Result<ForecastConfig> {
    if let Some(days) = args.horizon_days {
        config.horizon_days = days;
    }
    if let Some(days) = args.min_history_days {
        config.min_history_days = days;
    }
    config.validate().context("invalid run options")?;
    Ok(config)
}

fn seed_plan(args: &SeedArgs) -> SyntheticSales {
    let end_date = args.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let mut plan = SyntheticSales::new(end_date);
    if let Some(v) = args.branches {
        plan = plan.with_branches(v);
    }
    if let Some(v) = args.days {
        plan = plan.with_days(v);
    }
    if let Some(v) = args.sales_per_day {
        plan = plan.with_sales_per_day(v);
    }
    if let Some(v) = args.seed {
        plan = plan.with_seed(v);
    }
    if let Some(v) = args.young_branch_days {
        plan = plan.with_young_branch(v);
    }
    plan
}

/// Display name of a forecast entity.
pub fn entity_label(branch_id: BranchId) -> String {
    if branch_id.is_aggregate() {
        "All branches".to_string()
    } else {
        format!("Branch {branch_id}")
    }
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "run {}: {} succeeded, {} skipped, {} row(s) written",
        summary.run_at.to_rfc3339(),
        summary.succeeded(),
        summary.skipped(),
        summary.rows_written
    );
    for outcome in &summary.outcomes {
        let detail = match &outcome.kind {
            OutcomeKind::Forecast { rows } => format!("{rows} row(s)"),
            OutcomeKind::InsufficientData { days, required } => {
                format!("skipped: {days} day(s) of history, {required} required")
            }
            OutcomeKind::ModelError { message } => format!("skipped: model error: {message}"),
            OutcomeKind::ReadError { message } => format!("skipped: read error: {message}"),
        };
        let _ = writeln!(out, "  {:<14} {detail}", entity_label(outcome.branch_id));
    }
    out
}

pub fn render_latest(rows: &[ForecastRecord]) -> String {
    let Some(first) = rows.first() else {
        return "no forecasts recorded\n".to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "run {}", first.prediction_run_time.to_rfc3339());
    let mut current: Option<BranchId> = None;
    for row in rows {
        if current != Some(row.branch_id) {
            current = Some(row.branch_id);
            let _ = writeln!(out, "{}", entity_label(row.branch_id));
        }
        let _ = writeln!(
            out,
            "  {}  {:>12.2}  [{:.2}, {:.2}]",
            row.prediction_date, row.predicted_sales, row.lower_bound, row.upper_bound
        );
    }
    out
}
