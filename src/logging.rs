//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Diagnostics go to stderr; report tables and file paths are printed on
//! stdout by the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directives for the configured level. `RUST_LOG`, when set and
/// valid, takes precedence.
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("traffic_dashboard={level}")))
        .unwrap_or_else(|_| EnvFilter::new("traffic_dashboard=info"))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(level: &str) -> bool {
    tracing_subscriber::registry()
        .with(build_env_filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .is_ok()
}
