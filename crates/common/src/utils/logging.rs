use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset: request traces at `info`, store
/// transactions (lock waits, commits) at `debug`.
pub const DEFAULT_FILTER: &str = "info,tower_http=info,axum=info,service::storage=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON lines; anything else is compact.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber on stdout. A second call is a no-op.
pub fn init_logging(format: LogFormat) {
    let builder = fmt().with_env_filter(env_filter()).with_writer(io::stdout);
    let _ = match format {
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
        LogFormat::Json => builder.with_target(true).json().try_init(),
    };
}

pub fn init_logging_from_env() {
    init_logging(LogFormat::from_setting(std::env::var("LOG_FORMAT").ok().as_deref()));
}
