use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::protocol::event::ClientApi;
use crate::stream::pump::PumpOutcome;

/// Initialize the tracing subscriber with the configured log level.
///
/// Level aliases: "DISABLED" installs nothing, "WARNING" maps to WARN,
/// "CRITICAL" maps to ERROR; DEBUG/INFO/WARN/ERROR pass through.
pub fn init_tracing(log_level: &str) {
    let level = log_level.to_uppercase();
    if level == "DISABLED" {
        return;
    }

    let directive = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("INFO"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Log one finished translation session with its frame count and duration.
pub fn log_session_end(
    client: ClientApi,
    outcome: PumpOutcome,
    frames_sent: u64,
    started: Instant,
) {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match outcome {
        PumpOutcome::Completed => {
            tracing::info!(?client, frames_sent, elapsed_ms, "translation session completed");
        }
        PumpOutcome::Aborted => {
            tracing::warn!(?client, frames_sent, elapsed_ms, "translation session aborted");
        }
        PumpOutcome::ClientGone => {
            tracing::info!(
                ?client,
                frames_sent,
                elapsed_ms,
                "client disconnected before the session finished"
            );
        }
    }
}
