//! Anthropic Messages event serializer.
//!
//! Every frame is a named SSE event with a hand-built JSON body. Block
//! indices on this wire are the output indices assigned by the engine;
//! tool blocks get their `content_block_stop` at finish time, after any
//! later blocks already stopped, which Messages clients tolerate.

use crate::protocol::event::{BlockKind, TranslateEvent, WireEvent};
use crate::protocol::mapping::anthropic_stop_reason;
use crate::stream::state::StreamState;
use crate::util::{push_json_string_escaped, push_u64_decimal, push_usize_decimal};

/// Encode one canonical event into Anthropic Messages wire events.
pub fn encode_anthropic_event(
    event: &TranslateEvent,
    state: &StreamState,
    out: &mut Vec<WireEvent>,
) {
    match event {
        TranslateEvent::StreamBegin => {
            let id = &state.response_id;
            let model = &state.model;
            let mut json = String::with_capacity(200 + id.len() + model.len());
            json.push_str("{\"type\":\"message_start\",\"message\":{\"id\":");
            push_json_string_escaped(&mut json, id);
            json.push_str(",\"type\":\"message\",\"role\":\"assistant\",\"model\":");
            push_json_string_escaped(&mut json, model);
            json.push_str(
                ",\"content\":[],\"stop_reason\":null,\"stop_sequence\":null,\
                 \"usage\":{\"input_tokens\":0,\"output_tokens\":0}}}",
            );
            out.push(WireEvent::named("message_start", json));
        }
        TranslateEvent::BlockOpen {
            kind,
            output_index,
            call,
            ..
        } => {
            let mut json = String::with_capacity(128);
            json.push_str("{\"type\":\"content_block_start\",\"index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"content_block\":");
            match kind {
                BlockKind::Text => json.push_str("{\"type\":\"text\",\"text\":\"\"}"),
                BlockKind::Reasoning => {
                    json.push_str("{\"type\":\"thinking\",\"thinking\":\"\"}");
                }
                BlockKind::Tool => {
                    let (call_id, name) = call
                        .as_ref()
                        .map(|call| (call.call_id.as_str(), call.name.as_str()))
                        .unwrap_or(("", ""));
                    json.push_str("{\"type\":\"tool_use\",\"id\":");
                    push_json_string_escaped(&mut json, call_id);
                    json.push_str(",\"name\":");
                    push_json_string_escaped(&mut json, name);
                    json.push_str(",\"input\":{}}");
                }
            }
            json.push('}');
            out.push(WireEvent::named("content_block_start", json));
        }
        TranslateEvent::TextDelta {
            output_index, text, ..
        } => {
            let mut json = String::with_capacity(80 + text.len());
            json.push_str("{\"type\":\"content_block_delta\",\"index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"delta\":{\"type\":\"text_delta\",\"text\":");
            push_json_string_escaped(&mut json, text);
            json.push_str("}}");
            out.push(WireEvent::named("content_block_delta", json));
        }
        TranslateEvent::ReasoningDelta {
            output_index, text, ..
        } => {
            let mut json = String::with_capacity(88 + text.len());
            json.push_str("{\"type\":\"content_block_delta\",\"index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"delta\":{\"type\":\"thinking_delta\",\"thinking\":");
            push_json_string_escaped(&mut json, text);
            json.push_str("}}");
            out.push(WireEvent::named("content_block_delta", json));
        }
        TranslateEvent::SignatureDelta {
            output_index,
            signature,
            ..
        } => {
            let mut json = String::with_capacity(92 + signature.len());
            json.push_str("{\"type\":\"content_block_delta\",\"index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"delta\":{\"type\":\"signature_delta\",\"signature\":");
            push_json_string_escaped(&mut json, signature);
            json.push_str("}}");
            out.push(WireEvent::named("content_block_delta", json));
        }
        TranslateEvent::ArgsDelta {
            output_index,
            delta,
            ..
        } => {
            let mut json = String::with_capacity(96 + delta.len());
            json.push_str("{\"type\":\"content_block_delta\",\"index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":");
            push_json_string_escaped(&mut json, delta);
            json.push_str("}}");
            out.push(WireEvent::named("content_block_delta", json));
        }
        TranslateEvent::BlockClose { output_index, .. }
        | TranslateEvent::ToolDone { output_index, .. } => {
            let mut json = String::with_capacity(48);
            json.push_str("{\"type\":\"content_block_stop\",\"index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push('}');
            out.push(WireEvent::named("content_block_stop", json));
        }
        TranslateEvent::Finish { reason, usage, .. } => {
            let mut json = String::with_capacity(144);
            json.push_str("{\"type\":\"message_delta\",\"delta\":{\"stop_reason\":");
            push_json_string_escaped(&mut json, anthropic_stop_reason(*reason));
            json.push_str(",\"stop_sequence\":null},\"usage\":{\"input_tokens\":");
            push_u64_decimal(&mut json, usage.input_tokens);
            json.push_str(",\"output_tokens\":");
            push_u64_decimal(&mut json, usage.output_tokens);
            json.push_str("}}");
            out.push(WireEvent::named("message_delta", json));
            out.push(WireEvent::named(
                "message_stop",
                "{\"type\":\"message_stop\"}".to_owned(),
            ));
        }
    }
}

/// The keepalive frame this wire expects between content events.
#[must_use]
pub fn ping_frame() -> WireEvent {
    WireEvent::named("ping", "{\"type\":\"ping\"}".to_owned())
}
