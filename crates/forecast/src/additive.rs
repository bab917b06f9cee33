use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

use branchcast_core::DailySeries;

use crate::design::Design;
use crate::linalg::ridge_solve;
use crate::model::ForecastModel;
use crate::result::{FitError, ForecastError, Prediction};
use crate::stats::{interval_z, stddev_sample};

/// Longest horizon a single forecast may request.
pub const MAX_HORIZON_DAYS: usize = 366;

/// Settings for the additive trend + seasonality model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of the central uncertainty interval (0.8 = 10th..90th percentile).
    pub interval_width: f64,
    pub weekly_fourier_order: usize,
    pub yearly_fourier_order: usize,
    /// Maximum number of potential trend changepoints.
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    /// Ridge penalty per observation on trend slope changes.
    pub changepoint_penalty: f64,
    /// Ridge penalty per observation on seasonal coefficients.
    pub seasonality_penalty: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            interval_width: 0.8,
            weekly_fourier_order: 3,
            yearly_fourier_order: 10,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_penalty: 0.05,
            seasonality_penalty: 0.001,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.interval_width.is_finite() && self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            ));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            ));
        }
        for (name, value) in [
            ("changepoint_penalty", self.changepoint_penalty),
            ("seasonality_penalty", self.seasonality_penalty),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{name} must be a finite non-negative number, got {value}"));
            }
        }
        Ok(())
    }
}

/// Additive decomposition forecaster.
///
/// Model:
/// - piecewise-linear trend with ridge-penalised slope changes;
/// - weekly and yearly Fourier seasonality (no intraday component: input is daily);
/// - Gaussian interval from in-sample residuals, widening with distance from the
///   last observation.
///
/// The struct holds settings only. Each `forecast` call fits from scratch.
#[derive(Debug, Clone)]
pub struct AdditiveModel {
    config: ModelConfig,
    min_history_days: usize,
}

impl Default for AdditiveModel {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

impl AdditiveModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            min_history_days: 30,
        }
    }

    pub fn with_min_history_days(mut self, days: usize) -> Self {
        self.min_history_days = days;
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }
}

impl ForecastModel for AdditiveModel {
    fn name(&self) -> &'static str {
        "additive"
    }

    fn min_history_days(&self) -> usize {
        self.min_history_days
    }

    fn forecast(
        &self,
        series: &DailySeries,
        horizon: usize,
    ) -> Result<Vec<Prediction>, ForecastError> {
        // A slope needs two points regardless of the configured threshold.
        let required = self.min_history_days.max(2);
        if series.len() < required {
            return Err(ForecastError::InsufficientData {
                days: series.len(),
                required,
            });
        }

        if horizon == 0 {
            return Err(ForecastError::InvalidHorizon(
                "horizon must be at least one day".to_string(),
            ));
        }
        if horizon > MAX_HORIZON_DAYS {
            return Err(ForecastError::InvalidHorizon(format!(
                "horizon {horizon} exceeds {MAX_HORIZON_DAYS} days"
            )));
        }

        self.config.validate().map_err(FitError::InvalidConfig)?;

        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        let values: Vec<f64> = series.points().iter().map(|p| p.amount).collect();

        let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();

        let design = Design::for_history(&dates, &self.config);
        let rows: Vec<Vec<f64>> = dates.iter().map(|d| design.row(*d)).collect();
        let penalty = design.penalties(rows.len(), &self.config);

        let beta = ridge_solve(&rows, &scaled, &penalty).ok_or(FitError::Singular {
            columns: design.columns(),
        })?;

        let residuals: Vec<f64> = rows
            .iter()
            .zip(&scaled)
            .map(|(row, y)| y - dot(row, &beta))
            .collect();
        let sigma = stddev_sample(&residuals);
        if !sigma.is_finite() {
            return Err(FitError::NonFinite("residual deviation").into());
        }

        let z = interval_z(self.config.interval_width);
        let n = series.len() as f64;
        // `required >= 2` so the series has a last date.
        let last = dates[dates.len() - 1];

        debug!(
            model = self.name(),
            branch_id = %series.branch_id(),
            observations = series.len(),
            columns = design.columns(),
            sigma = sigma * scale,
            "additive model fitted"
        );

        let mut predictions = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let date = last
                .checked_add_signed(Duration::days(step as i64))
                .ok_or_else(|| {
                    ForecastError::InvalidHorizon(format!(
                        "{step} day(s) after {last} is outside the calendar"
                    ))
                })?;
            let center = dot(&design.row(date), &beta) * scale;
            let half_width = z * sigma * (1.0 + step as f64 / n).sqrt() * scale;

            if !(center.is_finite() && half_width.is_finite()) {
                return Err(FitError::NonFinite("prediction").into());
            }

            let lower = center - half_width;
            let upper = center + half_width;
            predictions.push(Prediction {
                date,
                predicted: center,
                lower: lower.min(center),
                upper: upper.max(center),
            });
        }

        Ok(predictions)
    }
}

fn dot(row: &[f64], beta: &[f64]) -> f64 {
    row.iter().zip(beta).map(|(x, b)| x * b).sum()
}
