// telemetry.rs
// Structured JSON logging for the balances service.

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset: crate spans at debug, dependencies at info.
pub const DEFAULT_FILTER: &str = "info,compani=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
        tracing::debug!("telemetry initialized twice");
    }
}
