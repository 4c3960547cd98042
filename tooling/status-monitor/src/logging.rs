use tracing::Level;
use tracing_subscriber::{EnvFilter, filter::Directive};

/// Installs the global subscriber. Logs go to stderr so they never land in
/// the dashboard; `RUST_LOG` overrides the configured level.
pub fn init_tracing(level: Level) -> Result<(), String> {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(level))
        .from_env_lossy();

    let include_target = matches!(level, Level::DEBUG | Level::TRACE);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_target(include_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| error.to_string())
}
