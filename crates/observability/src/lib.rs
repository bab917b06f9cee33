//! Tracing and logging setup shared by the branchcast binaries.

/// Install the global log subscriber.
///
/// Only the first call installs one; later calls keep it and return.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::LogFormat;
