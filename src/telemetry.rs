use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so command
/// output stays clean; JSON lines carry the current span and so the
/// session's `session.id`.
pub fn init_telemetry(settings: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    if settings.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    }

    tracing::debug!(json = settings.json_logs, "Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for one capture session
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span for a CLI operation outside a capture session
pub fn create_operation_span(operation: &str, session_id: Option<&str>) -> tracing::Span {
    tracing::info_span!(
        "capture_guide",
        operation = operation,
        session.id = session_id,
    )
}
