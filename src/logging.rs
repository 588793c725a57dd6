//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter for the configured level, or `info` if the level does not parse.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over the configured level. Fails if a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> String {
        EnvFilter::new("info").to_string()
    }

    #[test]
    fn test_configured_level_is_used() {
        assert_eq!(level_filter("debug").to_string(), EnvFilter::new("debug").to_string());
        assert_ne!(level_filter("debug").to_string(), info());
        assert_ne!(level_filter("clinicdash=trace").to_string(), info());
    }

    #[test]
    fn test_unparseable_level_falls_back_to_info() {
        assert_eq!(level_filter("clinicdash=loud").to_string(), info());
    }
}
