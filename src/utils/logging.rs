//! Logging setup for the command-line tool

/// Initialize the logger with default settings for the command-line tool.
/// Uses INFO level by default; the RUST_LOG environment variable overrides it.
/// Diagnostics go to stderr so they never mix with outcome lines on stdout.
pub fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {:5} {}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .init();
}

/// Like [`init_logger`], but safe to call more than once (tests).
pub fn try_init_test_logger() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .is_test(true)
        .try_init();
}
