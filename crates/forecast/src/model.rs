use std::sync::Arc;

use branchcast_core::DailySeries;

use crate::result::{ForecastError, Prediction};

/// A univariate daily forecaster.
///
/// Implementations take a history and a horizon and return exactly `horizon`
/// predictions for the days following the last observed date, or an error.
/// They must not keep fitted state between calls.
pub trait ForecastModel: Send + Sync {
    /// Short model name for logs.
    fn name(&self) -> &'static str;

    /// Minimum number of distinct days this model accepts.
    fn min_history_days(&self) -> usize;

    /// Fit on `series` and predict `horizon` days ahead.
    fn forecast(
        &self,
        series: &DailySeries,
        horizon: usize,
    ) -> Result<Vec<Prediction>, ForecastError>;
}

impl<M> ForecastModel for Arc<M>
where
    M: ForecastModel + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn min_history_days(&self) -> usize {
        (**self).min_history_days()
    }

    fn forecast(
        &self,
        series: &DailySeries,
        horizon: usize,
    ) -> Result<Vec<Prediction>, ForecastError> {
        (**self).forecast(series, horizon)
    }
}
