//! Data store boundary.
//!
//! The pipeline reads branches and sale facts, and appends forecast rows.
//! Both the in-memory and Postgres stores implement every trait here.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{ForecastSink, ForecastSource, SalesSink, SalesSource, StoreError};
