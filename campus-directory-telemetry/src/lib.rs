use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
pub use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer};

pub const DEFAULT_LOG_LEVEL: &str = "info,campus_directory_backend=debug,\
                                     campus_directory_database=debug,tokio_postgres=info";

/// Picks the filter: `RUST_LOG` first, then `configured`, then [`DEFAULT_LOG_LEVEL`].
#[must_use]
pub fn env_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_LOG_LEVEL)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Installs the global subscriber logging to stdout.
pub fn setup_telemetry(configured: Option<&str>) -> Result<(), TryInitError> {
    let stdout_log = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(stdout_log.with_filter(env_filter(configured)))
        .try_init()?;

    tracing::debug!("telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configured_filter_falls_back() {
        // only meaningful without RUST_LOG, which the test runner does not set
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(
                env_filter(Some("backend=loud")).to_string(),
                EnvFilter::new(DEFAULT_LOG_LEVEL).to_string()
            );
            assert_eq!(env_filter(Some("warn")).to_string(), "warn");
        }
    }

    #[test]
    fn second_setup_is_an_error() {
        let first = setup_telemetry(Some("debug"));
        assert!(first.is_ok());
        assert!(setup_telemetry(None).is_err());
    }
}
