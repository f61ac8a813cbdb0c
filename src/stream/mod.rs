//! Streaming translation pipeline.
//!
//! Upstream SSE frames are parsed into canonical chunk deltas, run
//! through the block lifecycle engine, and rendered onto the client's
//! wire protocol. `StreamTranslator` ties the stages together for one
//! connection; `pump` drives it against live byte streams.

pub mod engine;
pub mod pump;
pub mod sse;
pub mod state;

pub use pump::{run_translation, PumpOutcome};
pub use sse::{SseFrame, SseParser};
pub use state::StreamState;

use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::GatewayError;
use crate::protocol::event::{ClientApi, TranslateEvent, WireEvent};
use crate::protocol::responses::ResponsesRequest;
use crate::protocol::{anthropic, chunk, gemini, responses};

/// One upstream stream item after SSE framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    /// The JSON payload of a `data:` frame.
    Payload(String),
    /// The `[DONE]` sentinel.
    Done,
}

impl UpstreamEvent {
    /// Classifies a dispatched SSE data payload.
    #[must_use]
    pub fn from_data(data: String) -> Self {
        if data.trim() == "[DONE]" {
            UpstreamEvent::Done
        } else {
            UpstreamEvent::Payload(data)
        }
    }
}

/// Per-connection translator: owns the stream state and renders each
/// upstream chunk as zero or more client wire events.
pub struct StreamTranslator {
    client: ClientApi,
    request: Option<ResponsesRequest>,
    state: StreamState,
    scratch: Vec<TranslateEvent>,
}

impl StreamTranslator {
    #[must_use]
    pub fn new(client: ClientApi) -> Self {
        Self {
            client,
            request: None,
            state: StreamState::new(),
            scratch: Vec::with_capacity(8),
        }
    }

    /// Attaches the original client request so its fields echo into the
    /// Response API snapshots. Ignored by the other targets.
    #[must_use]
    pub fn with_request(client: ClientApi, request: ResponsesRequest) -> Self {
        Self {
            request: Some(request),
            ..Self::new(client)
        }
    }

    #[must_use]
    pub fn client(&self) -> ClientApi {
        self.client
    }

    #[must_use]
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// True once the terminal event has been emitted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Process one upstream event into client wire events.
    pub fn process(&mut self, event: UpstreamEvent) -> Vec<WireEvent> {
        let mut out = Vec::new();
        self.process_into(event, &mut out);
        out
    }

    /// Process one upstream event, appending wire events to `out`.
    ///
    /// The `[DONE]` sentinel renders nothing: termination is driven by
    /// the finish chunk that precedes it.
    pub fn process_into(&mut self, event: UpstreamEvent, out: &mut Vec<WireEvent>) {
        let UpstreamEvent::Payload(payload) = event else {
            return;
        };
        let Some(delta) = chunk::parse_chunk(&payload) else {
            return;
        };
        self.scratch.clear();
        engine::apply_delta(&mut self.state, delta, &mut self.scratch);
        for event in &self.scratch {
            match self.client {
                ClientApi::Responses => {
                    responses::encode_responses_event(event, &self.state, self.request.as_ref(), out);
                }
                ClientApi::Anthropic => anthropic::encode_anthropic_event(event, &self.state, out),
                ClientApi::Gemini => gemini::encode_gemini_event(event, &self.state, out),
            }
        }
    }

    /// The error frame the client's wire expects when the upstream fails
    /// mid-stream. The Response API gets none: its clients retry on a
    /// dropped connection, so the stream just ends.
    #[must_use]
    pub fn error_frame(&self, message: &str) -> Option<WireEvent> {
        use crate::util::push_json_string_escaped;
        match self.client {
            ClientApi::Responses => None,
            ClientApi::Anthropic => {
                let mut json = String::with_capacity(80 + message.len());
                json.push_str("{\"type\":\"error\",\"error\":{\"type\":\"api_error\",\"message\":");
                push_json_string_escaped(&mut json, message);
                json.push_str("}}");
                Some(WireEvent::named("error", json))
            }
            ClientApi::Gemini => {
                let mut json = String::with_capacity(88 + message.len());
                json.push_str("{\"error\":{\"code\":502,\"status\":\"UNAVAILABLE\",\"message\":");
                push_json_string_escaped(&mut json, message);
                json.push_str("}}");
                Some(WireEvent::data_only(json))
            }
        }
    }

    /// The frame sent on the client's wire while the upstream is idle.
    #[must_use]
    pub fn keepalive_frame(&self) -> String {
        match self.client {
            ClientApi::Anthropic => anthropic::ping_frame().to_sse(),
            ClientApi::Responses | ClientApi::Gemini => ": keep-alive\n\n".to_owned(),
        }
    }
}

/// Adapts an upstream byte stream into translator events: SSE framing,
/// UTF-8 reassembly across transport chunks, `[DONE]` classification.
/// The first error ends the stream after it is yielded.
pub fn upstream_events<S>(
    upstream: S,
) -> impl Stream<Item = Result<UpstreamEvent, GatewayError>>
where
    S: Stream<Item = Result<Bytes, GatewayError>> + Unpin,
{
    let state = (upstream, SseParser::new(), VecDeque::new(), false);
    futures_util::stream::unfold(
        state,
        |(mut upstream, mut parser, mut queue, mut failed)| async move {
            loop {
                if let Some(event) = queue.pop_front() {
                    return Some((Ok(event), (upstream, parser, queue, failed)));
                }
                if failed {
                    return None;
                }
                match upstream.next().await {
                    Some(Ok(bytes)) => {
                        let mut frames = Vec::new();
                        if let Err(err) = parser.feed_bytes(&bytes, &mut frames) {
                            failed = true;
                            let err = GatewayError::Transport(format!(
                                "upstream sent invalid UTF-8: {err}"
                            ));
                            return Some((Err(err), (upstream, parser, queue, failed)));
                        }
                        queue.extend(
                            frames
                                .into_iter()
                                .map(|frame| UpstreamEvent::from_data(frame.data)),
                        );
                    }
                    Some(Err(err)) => {
                        failed = true;
                        return Some((Err(err), (upstream, parser, queue, failed)));
                    }
                    None => return None,
                }
            }
        },
    )
}
