//! Drives one translation session: reads upstream events, feeds the
//! translator, and writes rendered frames to a bounded client sink.
//!
//! Backpressure comes from the sink channel; a slow client stalls the
//! upstream read instead of buffering unboundedly. Keepalive frames go
//! out on a fixed interval, independent of upstream traffic.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::error::GatewayError;
use crate::stream::{StreamTranslator, UpstreamEvent};

/// How a translation session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// Terminal event was emitted and the upstream closed cleanly.
    Completed,
    /// Upstream closed without a finish chunk.
    Aborted,
    /// The client receiver dropped; translation stopped early.
    ClientGone,
}

/// Runs one session to completion.
///
/// Upstream errors are surfaced to the client as the wire's error frame
/// and then returned to the caller.
pub async fn run_translation<S>(
    upstream: S,
    translator: StreamTranslator,
    sink: mpsc::Sender<Bytes>,
    keepalive: Duration,
) -> Result<PumpOutcome, GatewayError>
where
    S: Stream<Item = Result<UpstreamEvent, GatewayError>>,
{
    let client = translator.client();
    let started = std::time::Instant::now();
    let mut frames_sent = 0u64;
    let result = drive(upstream, translator, sink, keepalive, &mut frames_sent).await;
    if let Ok(outcome) = &result {
        crate::observability::log_session_end(client, *outcome, frames_sent, started);
    }
    result
}

async fn drive<S>(
    upstream: S,
    mut translator: StreamTranslator,
    sink: mpsc::Sender<Bytes>,
    keepalive: Duration,
    frames_sent: &mut u64,
) -> Result<PumpOutcome, GatewayError>
where
    S: Stream<Item = Result<UpstreamEvent, GatewayError>>,
{
    tokio::pin!(upstream);

    let mut ticker = time::interval_at(time::Instant::now() + keepalive, keepalive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut frames = Vec::with_capacity(8);
    loop {
        tokio::select! {
            item = upstream.next() => match item {
                Some(Ok(event)) => {
                    let done = matches!(event, UpstreamEvent::Done);
                    frames.clear();
                    translator.process_into(event, &mut frames);
                    for frame in &frames {
                        if sink.send(Bytes::from(frame.to_sse())).await.is_err() {
                            tracing::debug!("client receiver dropped, stopping translation");
                            return Ok(PumpOutcome::ClientGone);
                        }
                        *frames_sent += 1;
                    }
                    if done {
                        return Ok(finish_outcome(&translator));
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!("upstream failed mid-stream: {err}");
                    if let Some(frame) = translator.error_frame(&err.to_string()) {
                        let _ = sink.send(Bytes::from(frame.to_sse())).await;
                    }
                    return Err(err);
                }
                None => return Ok(finish_outcome(&translator)),
            },
            _ = ticker.tick() => {
                if sink.send(Bytes::from(translator.keepalive_frame())).await.is_err() {
                    return Ok(PumpOutcome::ClientGone);
                }
            }
        }
    }
}

fn finish_outcome(translator: &StreamTranslator) -> PumpOutcome {
    if translator.is_finished() {
        PumpOutcome::Completed
    } else {
        tracing::warn!("upstream ended without a finish chunk");
        PumpOutcome::Aborted
    }
}
