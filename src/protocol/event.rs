use serde::Serialize;

/// Which client wire protocol outbound events are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientApi {
    Responses,
    Anthropic,
    Gemini,
}

/// The kind of content block currently accepting deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Text,
    Reasoning,
    Tool,
}

/// Reason the upstream stopped generating, parsed from the finish chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

/// Terminal status of the whole stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Completed,
    Incomplete,
}

/// Latest usage snapshot reported by the upstream.
///
/// Upstream sends either nothing or a complete snapshot; a new snapshot
/// overwrites the previous one wholesale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// Identity of a tool call as assigned by the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallIdentity {
    pub call_id: String,
    pub name: String,
}

/// A finalized (closed) output item, immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    Message {
        id: String,
        text: String,
    },
    Reasoning {
        id: String,
        text: String,
        signature: Option<String>,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        arguments: String,
    },
}

/// A single canonical event produced by the block lifecycle engine.
///
/// Serializers map these onto each client protocol's wire vocabulary;
/// events with no representation in a given protocol render to nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslateEvent {
    /// First chunk observed; targets that prime the stream (message_start,
    /// response.created) render it, others ignore it.
    StreamBegin,
    BlockOpen {
        kind: BlockKind,
        output_index: usize,
        content_index: usize,
        item_id: String,
        call: Option<CallIdentity>,
    },
    TextDelta {
        output_index: usize,
        content_index: usize,
        item_id: String,
        text: String,
    },
    ReasoningDelta {
        output_index: usize,
        content_index: usize,
        item_id: String,
        text: String,
    },
    /// Opaque reasoning signature, flushed as one delta immediately before
    /// the reasoning block closes.
    SignatureDelta {
        output_index: usize,
        content_index: usize,
        item_id: String,
        signature: String,
    },
    ArgsDelta {
        output_index: usize,
        item_id: String,
        delta: String,
    },
    BlockClose {
        output_index: usize,
        content_index: usize,
        item: OutputItem,
    },
    /// Finish-time completion of a registered tool call (arguments-done
    /// followed by item-done in the rendered stream).
    ToolDone {
        output_index: usize,
        item: OutputItem,
    },
    /// Terminal event carrying the stream status; the Response-API
    /// serializer attaches the full aggregate snapshot.
    Finish {
        status: StreamStatus,
        reason: FinishReason,
        usage: UsageSnapshot,
    },
}

/// One outbound wire event: optional SSE event name plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    pub event: Option<&'static str>,
    pub data: String,
}

impl WireEvent {
    #[must_use]
    pub fn named(event: &'static str, data: String) -> Self {
        Self {
            event: Some(event),
            data,
        }
    }

    #[must_use]
    pub fn data_only(data: String) -> Self {
        Self { event: None, data }
    }

    /// Render as an SSE frame: `event: {name}\ndata: {body}\n\n` or the
    /// data-only form when no event name is set.
    #[must_use]
    pub fn to_sse(&self) -> String {
        match self.event {
            Some(event) => {
                let mut out = String::with_capacity(16 + event.len() + self.data.len());
                out.push_str("event: ");
                out.push_str(event);
                out.push_str("\ndata: ");
                out.push_str(&self.data);
                out.push_str("\n\n");
                out
            }
            None => {
                let mut out = String::with_capacity(10 + self.data.len());
                out.push_str("data: ");
                out.push_str(&self.data);
                out.push_str("\n\n");
                out
            }
        }
    }
}

impl OutputItem {
    #[must_use]
    pub fn item_id(&self) -> &str {
        match self {
            OutputItem::Message { id, .. }
            | OutputItem::Reasoning { id, .. }
            | OutputItem::FunctionCall { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WireEvent;

    #[test]
    fn named_event_renders_full_frame() {
        let frame = WireEvent::named("message_stop", "{\"type\":\"message_stop\"}".into());
        assert_eq!(
            frame.to_sse(),
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"
        );
    }

    #[test]
    fn data_only_event_renders_bare_frame() {
        let frame = WireEvent::data_only("{\"x\":1}".into());
        assert_eq!(frame.to_sse(), "data: {\"x\":1}\n\n");
    }
}
