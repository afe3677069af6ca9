//! Logging setup for binaries embedding the engine

use crate::error::{EditorError, EditorResult};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber
///
/// The filter comes from `RUST_LOG`, defaulting to `info`.
///
/// # Errors
/// Returns error if a global subscriber is already installed
pub fn init(format: LogFormat) -> EditorResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(false)))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_current_span(true)))
        .try_init()
        .map_err(|e| EditorError::Internal(format!("logging already initialized: {e}")))
}
