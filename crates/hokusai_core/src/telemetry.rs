//! Tracing subscriber initialization.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber for library consumers.
///
/// Installs an fmt layer filtered by the `RUST_LOG` environment variable.
/// Call once at process start; a second call returns an error from the
/// subscriber registry rather than panicking.
///
/// # Examples
///
/// ```no_run
/// hokusai_core::init_telemetry().expect("telemetry init");
/// ```
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
