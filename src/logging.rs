use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Output goes to stderr so stdout only
/// carries command results.
pub fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if std::io::stderr().is_terminal() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .init();
    }

    tracing::debug!(rust_log = ?std::env::var("RUST_LOG").ok(), "Logging initialized");
}
