//! Observability setup for pagechat: structured logging to stderr with an
//! optional OpenTelemetry bridge.

pub mod tracing_setup;

pub use tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};
