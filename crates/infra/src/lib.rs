//! Infrastructure layer: data store, series extraction, forecast runs, config.

pub mod config;
pub mod extractor;
pub mod runner;
pub mod seed;
pub mod store;


pub use config::{ConfigError, ForecastConfig, JobConfig};
pub use extractor::SeriesExtractor;
pub use runner::{EntityOutcome, ForecastRunner, OutcomeKind, RunError, RunSummary};
pub use seed::{Product, SeedReport, SyntheticData, SyntheticSales};
pub use store::{
    ForecastSink, ForecastSource, InMemoryStore, PostgresStore, SalesSink, SalesSource,
    StoreError,
};
