//! Feature construction for the additive model.
//!
//! Column layout: `[1, t, hinge_1..hinge_c, weekly sin/cos.., yearly sin/cos..]`
//! where `t` is time scaled to `[0, 1]` over the history.

use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};

use crate::additive::ModelConfig;

const WEEK_DAYS: f64 = 7.0;
const YEAR_DAYS: f64 = 365.25;

#[derive(Debug, Clone)]
pub(crate) struct Design {
    origin: NaiveDate,
    span_days: f64,
    changepoints: Vec<f64>,
    weekly_order: usize,
    yearly_order: usize,
}

impl Design {
    /// Lay out features for a history. `dates` must be strictly increasing with len >= 2.
    pub(crate) fn for_history(dates: &[NaiveDate], config: &ModelConfig) -> Self {
        let origin = dates[0];
        let last = dates[dates.len() - 1];
        let span_days = ((last - origin).num_days() as f64).max(1.0);

        let mut design = Self {
            origin,
            span_days,
            changepoints: Vec::new(),
            weekly_order: config.weekly_fourier_order,
            // Yearly terms are unidentified until a full cycle has been observed.
            yearly_order: if span_days >= YEAR_DAYS {
                config.yearly_fourier_order
            } else {
                0
            },
        };

        // Potential changepoints sit on observed days, evenly spread over the first
        // `changepoint_range` of the history.
        let hist = ((dates.len() as f64) * config.changepoint_range).floor() as usize;
        let count = config.n_changepoints.min(hist.saturating_sub(1));
        if count > 0 {
            let step = (hist - 1) as f64 / count as f64;
            design.changepoints = (1..=count)
                .map(|i| design.scaled_time(dates[(i as f64 * step).round() as usize]))
                .collect();
            design.changepoints.dedup();
        }

        design
    }

    pub(crate) fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64 / self.span_days
    }

    pub(crate) fn columns(&self) -> usize {
        2 + self.changepoints.len() + 2 * (self.weekly_order + self.yearly_order)
    }

    /// Index of the first seasonal column.
    fn seasonal_start(&self) -> usize {
        2 + self.changepoints.len()
    }

    pub(crate) fn row(&self, date: NaiveDate) -> Vec<f64> {
        let t = self.scaled_time(date);
        let mut row = Vec::with_capacity(self.columns());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|s| (t - s).max(0.0)));

        // Phase is anchored to an absolute day count so weekdays line up across runs.
        let day = date.num_days_from_ce() as f64;
        fourier(&mut row, day, WEEK_DAYS, self.weekly_order);
        fourier(&mut row, day, YEAR_DAYS, self.yearly_order);
        row
    }

    /// Per-column ridge penalties, scaled by the number of observations.
    pub(crate) fn penalties(&self, observations: usize, config: &ModelConfig) -> Vec<f64> {
        let n = observations as f64;
        let mut penalty = vec![0.0; self.columns()];
        for p in penalty.iter_mut().take(self.seasonal_start()).skip(2) {
            *p = config.changepoint_penalty * n;
        }
        for p in penalty.iter_mut().skip(self.seasonal_start()) {
            *p = config.seasonality_penalty * n;
        }
        penalty
    }
}

fn fourier(row: &mut Vec<f64>, day: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * day / period;
        row.push(angle.sin());
        row.push(angle.cos());
    }
}
