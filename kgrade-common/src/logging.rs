//! Logging setup shared by the binaries and the integration tests

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber. Subsequent calls are no-ops, so tests may
/// call this freely.
pub fn init_logging(level: Level) {
    let formatting_layer = fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::filter::LevelFilter::from_level(level);

    let _ = tracing_subscriber::registry()
        .with(formatting_layer)
        .with(filter_layer)
        .try_init();
}

/// Parses a level name as accepted on the command line (`trace` .. `error`).
pub fn parse_level(name: &str) -> crate::Result<Level> {
    name.parse::<Level>()
        .map_err(|_| crate::Error::InvalidArgument(format!("unknown log level: {name}")))
}
