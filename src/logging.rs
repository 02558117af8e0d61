use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sets up the tracing subscriber: human-readable output on stderr plus a
/// daily-rotated JSON file under logs/ for later inspection of ETL runs.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "etl.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Console output goes to stderr so the run summary on stdout stays clean.
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("hr_insights=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    // The appender guard must outlive main or buffered logs are lost.
    std::mem::forget(_guard);
}
