//! Logging setup for the tarlens binary.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the host. The CLI calls [`init_logging`] once at startup.
//!
//! Level priority: `--log-level` flag, then `RUST_LOG`, then `warn`.

use std::sync::OnceLock;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Logging configuration taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// "off", "error", "warn", "info", "debug" or "trace"
    pub level: Option<String>,
}

fn build_filter(config: &LogConfig) -> Option<EnvFilter> {
    match config.level.as_deref() {
        Some(level) if level.eq_ignore_ascii_case("off") => None,
        Some(level) => Some(EnvFilter::new(format!("tarlens={}", level.to_lowercase()))),
        None => Some(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tarlens=warn")),
        ),
    }
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    LOGGING_INITIALIZED.get_or_init(|| {
        let Some(filter) = build_filter(config) else {
            return;
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_timer(SystemTime),
            )
            .try_init()
            .ok();
    });
}
