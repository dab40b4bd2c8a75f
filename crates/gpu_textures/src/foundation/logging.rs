//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Reads the filter from `RUST_LOG`. Panics if a global logger is already set.
pub fn init() {
    env_logger::init();
}

/// Initialize logging for unit tests
///
/// Output is captured by the test harness, and repeated calls are ignored.
pub fn try_init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}
