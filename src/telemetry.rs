//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL holds an EnvFilter directive, e.g. "debug" or
//!   "info,quiz=debug,leaderboard=debug,ratelimit=info,tower_http=info".
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Request spans come from the tower-http TraceLayer installed in `routes`.

use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,quiz=debug,dualium_backend=debug,leaderboard=info,ratelimit=info,tower_http=info,axum=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env_value(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Install the global subscriber. A second call (e.g. from tests) is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    };
    if installed {
        info!(target: "dualium_backend", ?format, "Tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_selection() {
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("pretty")), LogFormat::Pretty);
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Pretty);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
