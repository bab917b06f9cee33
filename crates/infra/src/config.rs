//! Configuration loading and representation.
//!
//! Defaults: `horizon_days = 7`, `min_history_days = 30`, 80% intervals.
//! Environment overrides (after loading `.env` if present):
//!
//! | variable | field |
//! |---|---|
//! | `DATABASE_URL` | `JobConfig::database_url` (required) |
//! | `BRANCHCAST_HORIZON_DAYS` | `ForecastConfig::horizon_days` |
//! | `BRANCHCAST_MIN_HISTORY_DAYS` | `ForecastConfig::min_history_days` |
//! | `BRANCHCAST_INTERVAL_WIDTH` | `ModelConfig::interval_width` |

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use branchcast_forecast::{AdditiveModel, ModelConfig, MAX_HORIZON_DAYS};

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HORIZON_DAYS: &str = "BRANCHCAST_HORIZON_DAYS";
pub const ENV_MIN_HISTORY_DAYS: &str = "BRANCHCAST_MIN_HISTORY_DAYS";
pub const ENV_INTERVAL_WIDTH: &str = "BRANCHCAST_INTERVAL_WIDTH";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Settings for one forecast run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future days forecast per entity.
    pub horizon_days: usize,
    /// Entities with fewer distinct days of sales are skipped.
    pub min_history_days: usize,
    pub model: ModelConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            min_history_days: 30,
            model: ModelConfig::default(),
        }
    }
}

impl ForecastConfig {
    pub fn with_horizon_days(mut self, days: usize) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn with_min_history_days(mut self, days: usize) -> Self {
        self.min_history_days = days;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon_days == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_HORIZON_DAYS,
                message: "horizon must be at least one day".to_string(),
            });
        }
        if self.horizon_days > MAX_HORIZON_DAYS {
            return Err(ConfigError::Invalid {
                key: ENV_HORIZON_DAYS,
                message: format!(
                    "horizon {} exceeds {MAX_HORIZON_DAYS} days",
                    self.horizon_days
                ),
            });
        }
        if self.min_history_days == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_MIN_HISTORY_DAYS,
                message: "minimum history must be at least one day".to_string(),
            });
        }
        self.model.validate().map_err(|message| ConfigError::Invalid {
            key: ENV_INTERVAL_WIDTH,
            message,
        })
    }

    /// The forecaster these settings describe.
    pub fn build_model(&self) -> AdditiveModel {
        AdditiveModel::new(self.model.clone()).with_min_history_days(self.min_history_days)
    }

    /// Apply overrides from a variable lookup on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, ENV_HORIZON_DAYS)? {
            config.horizon_days = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_MIN_HISTORY_DAYS)? {
            config.min_history_days = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_INTERVAL_WIDTH)? {
            config.model.interval_width = v;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Process-level configuration for the forecast job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub database_url: String,
    pub forecast: ForecastConfig,
}

impl JobConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(ENV_DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ENV_DATABASE_URL))?;
        let forecast = ForecastConfig::from_lookup(lookup)?;
        Ok(Self {
            database_url,
            forecast,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key,
                message: format!("{raw:?}: {e}"),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_documented_values() {
        let config = ForecastConfig::default();
        assert_eq!(config.horizon_days, 7);
        assert_eq!(config.min_history_days, 30);
        assert_eq!(config.model.interval_width, 0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_apply() {
        let config = JobConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/sales"),
            ("BRANCHCAST_HORIZON_DAYS", "14"),
            ("BRANCHCAST_MIN_HISTORY_DAYS", " 60 "),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/sales");
        assert_eq!(config.forecast.horizon_days, 14);
        assert_eq!(config.forecast.min_history_days, 60);
    }

    #[test]
    fn database_url_is_required() {
        let err = JobConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));

        let err = JobConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = ForecastConfig::from_lookup(lookup(&[("BRANCHCAST_HORIZON_DAYS", "seven")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BRANCHCAST_HORIZON_DAYS", .. }));
    }

    #[test]
    fn zero_horizon_is_invalid() {
        let err = ForecastConfig::from_lookup(lookup(&[("BRANCHCAST_HORIZON_DAYS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn horizon_above_a_year_is_invalid() {
        let ok = ForecastConfig::from_lookup(lookup(&[("BRANCHCAST_HORIZON_DAYS", "366")]))
            .unwrap();
        assert_eq!(ok.horizon_days, 366);

        for raw in ["367".to_string(), usize::MAX.to_string()] {
            let err = ForecastConfig::from_lookup(lookup(&[("BRANCHCAST_HORIZON_DAYS", raw.as_str())]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { key: "BRANCHCAST_HORIZON_DAYS", .. }),
                "{raw}: {err:?}"
            );
        }
    }

    #[test]
    fn interval_width_out_of_range_is_invalid() {
        let err = ForecastConfig::from_lookup(lookup(&[("BRANCHCAST_INTERVAL_WIDTH", "1.2")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BRANCHCAST_INTERVAL_WIDTH", .. }));
    }

    #[test]
    fn built_model_uses_configured_threshold() {
        use branchcast_forecast::ForecastModel;
        let model = ForecastConfig::default().with_min_history_days(45).build_model();
        assert_eq!(model.min_history_days(), 45);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ForecastConfig = serde_json::from_str(r#"{"horizon_days": 14}"#).unwrap();
        assert_eq!(config.horizon_days, 14);
        assert_eq!(config.min_history_days, 30);
    }
}
