//! Logging setup for hosts embedding the provider.
//!
//! All output goes to **stderr**; the engine may own stdout. Filtering follows
//! `RUST_LOG`, for example `RUST_LOG=axiom_provider=debug` to see every HTTP
//! request the client makes.
//!
//! ```ignore
//! axiom_provider::init_logging();
//! tracing::info!("provider starting");
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The level used when `RUST_LOG` is unset.
pub const DEFAULT_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber at [`DEFAULT_LEVEL`].
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_LEVEL);
}

/// Like [`init_logging`], with a different level for when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Install the global subscriber unless one exists. Returns whether this
/// call installed it.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_LEVEL))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so
    // initialisation itself is not exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LEVEL).is_ok());
        assert!(EnvFilter::try_new("axiom_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,axiom_provider::client=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let first = try_init_logging();
        let second = try_init_logging();
        assert!(!(first && second));
    }
}
