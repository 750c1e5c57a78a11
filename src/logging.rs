use log::{info, log_enabled, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// The level comes from `RUST_LOG`; `info` when unset.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .try_init();
}

/// Initializes a test-friendly logger that writes through the test harness
/// capture. Safe to call from every test.
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

