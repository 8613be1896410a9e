//! Log output for test runs.

mod tracing;

pub use self::tracing::TracingConfig;
