//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Reads the filter from `RUST_LOG`. Call once from the binary's `main`.
pub fn init() {
    env_logger::init();
}

/// Initialize logging for tests
///
/// Safe to call from every test: later calls are ignored, and output is
/// captured by the test harness.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
