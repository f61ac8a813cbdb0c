//! Gemini `generateContent` event serializer.
//!
//! Gemini streams data-only SSE frames and has no block lifecycle of its
//! own, so open/close events are suppressed and tool calls surface as one
//! complete `functionCall` part when the stream finishes.

use crate::protocol::event::{OutputItem, TranslateEvent, WireEvent};
use crate::protocol::mapping::gemini_finish_reason;
use crate::stream::state::StreamState;
use crate::util::{push_json_string_escaped, push_u64_decimal};

/// Encode one canonical event into Gemini wire events. Most canonical
/// events have no representation here and produce nothing.
pub fn encode_gemini_event(
    event: &TranslateEvent,
    state: &StreamState,
    out: &mut Vec<WireEvent>,
) {
    match event {
        TranslateEvent::TextDelta { text, .. } => {
            out.push(WireEvent::data_only(text_chunk(text, false)));
        }
        TranslateEvent::ReasoningDelta { text, .. } => {
            out.push(WireEvent::data_only(text_chunk(text, true)));
        }
        TranslateEvent::ToolDone { item, .. } => {
            if let OutputItem::FunctionCall {
                name, arguments, ..
            } = item
            {
                out.push(WireEvent::data_only(function_call_chunk(name, arguments)));
            }
        }
        TranslateEvent::Finish { reason, usage, .. } => {
            let finish = gemini_finish_reason(*reason);
            let mut json = String::with_capacity(224 + state.model.len() + state.response_id.len());
            json.push_str(
                "{\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[]},\"finishReason\":",
            );
            push_json_string_escaped(&mut json, finish);
            json.push_str(",\"index\":0}],\"usageMetadata\":{\"promptTokenCount\":");
            push_u64_decimal(&mut json, usage.input_tokens);
            json.push_str(",\"candidatesTokenCount\":");
            push_u64_decimal(&mut json, usage.output_tokens);
            json.push_str(",\"totalTokenCount\":");
            push_u64_decimal(&mut json, usage.total_tokens);
            json.push_str("},\"modelVersion\":");
            push_json_string_escaped(&mut json, &state.model);
            json.push_str(",\"responseId\":");
            push_json_string_escaped(&mut json, &state.response_id);
            json.push('}');
            out.push(WireEvent::data_only(json));
        }
        TranslateEvent::StreamBegin
        | TranslateEvent::BlockOpen { .. }
        | TranslateEvent::SignatureDelta { .. }
        | TranslateEvent::ArgsDelta { .. }
        | TranslateEvent::BlockClose { .. } => {}
    }
}

fn text_chunk(text: &str, thought: bool) -> String {
    let mut json = String::with_capacity(80 + text.len());
    json.push_str("{\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":");
    push_json_string_escaped(&mut json, text);
    if thought {
        json.push_str(",\"thought\":true");
    }
    json.push_str("}]},\"index\":0}]}");
    json
}

fn function_call_chunk(name: &str, arguments: &str) -> String {
    // Accumulated arguments are a JSON object on the wire already; splice
    // them through when they parse, fall back to {} when they don't.
    let args: &str = if arguments.is_empty()
        || serde_json::from_str::<&serde_json::value::RawValue>(arguments).is_err()
    {
        "{}"
    } else {
        arguments
    };
    let mut json = String::with_capacity(96 + name.len() + args.len());
    json.push_str(
        "{\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"functionCall\":{\"name\":",
    );
    push_json_string_escaped(&mut json, name);
    json.push_str(",\"args\":");
    json.push_str(args);
    json.push_str("}}]},\"index\":0}]}");
    json
}
