//! Tracing and logging set-up shared by binaries and tests.

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(&ObservabilityConfig::from_env());
}

/// Initialize process-wide logging from an explicit configuration.
pub fn init_with(config: &ObservabilityConfig) {
    tracing::init_with(config);
}

/// Route logs through the test harness's captured output.
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Logging configuration.
pub mod config;

/// Tracing subscriber construction.
pub mod tracing;

pub use config::{LogFormat, ObservabilityConfig};
