//! Response API event serializer.
//!
//! Hot-path delta events are built by hand into preallocated strings;
//! the aggregate response snapshot that rides `response.created` and the
//! terminal events is rendered through serde.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::protocol::event::{
    BlockKind, CallIdentity, FinishReason, OutputItem, StreamStatus, TranslateEvent, UsageSnapshot,
    WireEvent,
};
use crate::error::GatewayError;
use crate::protocol::mapping::incomplete_reason;
use crate::stream::state::StreamState;
use crate::util::{push_json_string_escaped, push_usize_decimal};

/// Request fields echoed back verbatim inside every response snapshot.
/// Unknown fields are dropped rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesRequest {
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_output_tokens: Option<u64>,
    #[serde(default)]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default)]
    pub tools: Option<Box<RawValue>>,
    #[serde(default)]
    pub tool_choice: Option<Box<RawValue>>,
    #[serde(default)]
    pub metadata: Option<Box<RawValue>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponsesItem<'a> {
    Message {
        id: &'a str,
        status: &'static str,
        role: &'static str,
        content: Vec<MessageContent<'a>>,
    },
    Reasoning {
        id: &'a str,
        summary: Vec<SummaryPart<'a>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        encrypted_content: Option<&'a str>,
        status: &'static str,
    },
    FunctionCall {
        id: &'a str,
        call_id: &'a str,
        name: &'a str,
        arguments: &'a str,
        status: &'static str,
    },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageContent<'a> {
    OutputText {
        text: &'a str,
        annotations: [&'a str; 0],
    },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SummaryPart<'a> {
    SummaryText { text: &'a str },
}

#[derive(Serialize)]
struct IncompleteDetails {
    reason: &'static str,
}

#[derive(Serialize)]
struct ResponseBody<'a> {
    id: &'a str,
    object: &'static str,
    created_at: u64,
    status: &'static str,
    model: &'a str,
    output: Vec<ResponsesItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    incomplete_details: Option<IncompleteDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<&'a UsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a RawValue>,
}

#[derive(Serialize)]
struct ResponseEnvelope<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    response: ResponseBody<'a>,
}

fn item_view<'a>(item: &'a OutputItem, status: &'static str) -> ResponsesItem<'a> {
    match item {
        OutputItem::Message { id, text } => ResponsesItem::Message {
            id,
            status,
            role: "assistant",
            content: vec![MessageContent::OutputText {
                text,
                annotations: [],
            }],
        },
        OutputItem::Reasoning {
            id,
            text,
            signature,
        } => ResponsesItem::Reasoning {
            id,
            summary: vec![SummaryPart::SummaryText { text }],
            encrypted_content: signature.as_deref(),
            status,
        },
        OutputItem::FunctionCall {
            id,
            call_id,
            name,
            arguments,
        } => ResponsesItem::FunctionCall {
            id,
            call_id,
            name,
            arguments,
            status,
        },
    }
}

/// Aggregate response object for a terminal or priming status, as a
/// plain JSON value. Outer layers use this for the non-stream shape of
/// the same response.
pub fn response_snapshot(
    state: &StreamState,
    status: StreamStatus,
    reason: FinishReason,
    request: Option<&ResponsesRequest>,
) -> Result<serde_json::Value, GatewayError> {
    let (body_status, incomplete) = match status {
        StreamStatus::Completed => ("completed", None),
        StreamStatus::Incomplete => (
            "incomplete",
            incomplete_reason(reason).map(|reason| IncompleteDetails { reason }),
        ),
    };
    let items = state.snapshot_items();
    let body = body_view(body_status, state, &items, request, incomplete, true);
    serde_json::to_value(&body)
        .map_err(|err| GatewayError::Translation(format!("response snapshot: {err}")))
}

fn body_view<'a>(
    status: &'static str,
    state: &'a StreamState,
    items: &'a [OutputItem],
    request: Option<&'a ResponsesRequest>,
    incomplete: Option<IncompleteDetails>,
    with_usage: bool,
) -> ResponseBody<'a> {
    ResponseBody {
        id: &state.response_id,
        object: "response",
        created_at: state.created_at,
        status,
        model: &state.model,
        output: items.iter().map(|item| item_view(item, "completed")).collect(),
        incomplete_details: incomplete,
        usage: with_usage.then_some(&state.usage),
        instructions: request.and_then(|req| req.instructions.as_deref()),
        temperature: request.and_then(|req| req.temperature),
        top_p: request.and_then(|req| req.top_p),
        max_output_tokens: request.and_then(|req| req.max_output_tokens),
        parallel_tool_calls: request.and_then(|req| req.parallel_tool_calls),
        tools: request.and_then(|req| req.tools.as_deref()),
        tool_choice: request.and_then(|req| req.tool_choice.as_deref()),
        metadata: request.and_then(|req| req.metadata.as_deref()),
    }
}

/// Renders the aggregate response snapshot as the given stream event.
/// `items` is passed in so `response.created` can always show an empty
/// output list, whatever the state already holds.
fn snapshot_event(
    event_type: &'static str,
    status: &'static str,
    state: &StreamState,
    items: &[OutputItem],
    request: Option<&ResponsesRequest>,
    incomplete: Option<IncompleteDetails>,
    with_usage: bool,
) -> WireEvent {
    let envelope = ResponseEnvelope {
        event_type,
        response: body_view(status, state, items, request, incomplete, with_usage),
    };
    let data = serde_json::to_string(&envelope).unwrap_or_else(|err| {
        tracing::error!("failed to render response snapshot: {err}");
        format!("{{\"type\":\"{event_type}\"}}")
    });
    WireEvent::named(event_type, data)
}

fn item_json(item: &OutputItem, status: &'static str) -> String {
    serde_json::to_string(&item_view(item, status)).unwrap_or_else(|err| {
        tracing::error!("failed to render output item: {err}");
        "{}".to_owned()
    })
}

fn opening_item_json(kind: BlockKind, item_id: &str, call: Option<&CallIdentity>) -> String {
    match kind {
        BlockKind::Text => {
            let mut json = String::with_capacity(96 + item_id.len());
            json.push_str("{\"type\":\"message\",\"id\":");
            push_json_string_escaped(&mut json, item_id);
            json.push_str(",\"status\":\"in_progress\",\"role\":\"assistant\",\"content\":[]}");
            json
        }
        BlockKind::Reasoning => {
            let mut json = String::with_capacity(72 + item_id.len());
            json.push_str("{\"type\":\"reasoning\",\"id\":");
            push_json_string_escaped(&mut json, item_id);
            json.push_str(",\"summary\":[],\"status\":\"in_progress\"}");
            json
        }
        BlockKind::Tool => {
            let (call_id, name) = call
                .map(|call| (call.call_id.as_str(), call.name.as_str()))
                .unwrap_or(("", ""));
            let mut json = String::with_capacity(128 + item_id.len() + call_id.len() + name.len());
            json.push_str("{\"type\":\"function_call\",\"id\":");
            push_json_string_escaped(&mut json, item_id);
            json.push_str(",\"call_id\":");
            push_json_string_escaped(&mut json, call_id);
            json.push_str(",\"name\":");
            push_json_string_escaped(&mut json, name);
            json.push_str(",\"arguments\":\"\",\"status\":\"in_progress\"}");
            json
        }
    }
}

/// Encode one canonical event into Response API wire events.
pub fn encode_responses_event(
    event: &TranslateEvent,
    state: &StreamState,
    request: Option<&ResponsesRequest>,
    out: &mut Vec<WireEvent>,
) {
    match event {
        TranslateEvent::StreamBegin => {
            out.push(snapshot_event(
                "response.created",
                "in_progress",
                state,
                &[],
                request,
                None,
                false,
            ));
            out.push(snapshot_event(
                "response.in_progress",
                "in_progress",
                state,
                &[],
                request,
                None,
                false,
            ));
        }
        TranslateEvent::BlockOpen {
            kind,
            output_index,
            content_index,
            item_id,
            call,
        } => {
            let item = opening_item_json(*kind, item_id, call.as_ref());
            let mut json = String::with_capacity(64 + item.len());
            json.push_str("{\"type\":\"response.output_item.added\",\"output_index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"item\":");
            json.push_str(&item);
            json.push('}');
            out.push(WireEvent::named("response.output_item.added", json));

            match kind {
                BlockKind::Text => {
                    let mut json = String::with_capacity(160 + item_id.len());
                    json.push_str("{\"type\":\"response.content_part.added\",\"item_id\":");
                    push_json_string_escaped(&mut json, item_id);
                    json.push_str(",\"output_index\":");
                    push_usize_decimal(&mut json, *output_index);
                    json.push_str(",\"content_index\":");
                    push_usize_decimal(&mut json, *content_index);
                    json.push_str(
                        ",\"part\":{\"type\":\"output_text\",\"text\":\"\",\"annotations\":[]}}",
                    );
                    out.push(WireEvent::named("response.content_part.added", json));
                }
                BlockKind::Reasoning => {
                    let mut json = String::with_capacity(160 + item_id.len());
                    json.push_str("{\"type\":\"response.reasoning_summary_part.added\",\"item_id\":");
                    push_json_string_escaped(&mut json, item_id);
                    json.push_str(",\"output_index\":");
                    push_usize_decimal(&mut json, *output_index);
                    json.push_str(",\"summary_index\":0,\"part\":{\"type\":\"summary_text\",\"text\":\"\"}}");
                    out.push(WireEvent::named("response.reasoning_summary_part.added", json));
                }
                BlockKind::Tool => {}
            }
        }
        TranslateEvent::TextDelta {
            output_index,
            content_index,
            item_id,
            text,
        } => {
            let mut json = String::with_capacity(112 + item_id.len() + text.len());
            json.push_str("{\"type\":\"response.output_text.delta\",\"item_id\":");
            push_json_string_escaped(&mut json, item_id);
            json.push_str(",\"output_index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"content_index\":");
            push_usize_decimal(&mut json, *content_index);
            json.push_str(",\"delta\":");
            push_json_string_escaped(&mut json, text);
            json.push('}');
            out.push(WireEvent::named("response.output_text.delta", json));
        }
        TranslateEvent::ReasoningDelta {
            output_index,
            item_id,
            text,
            ..
        } => {
            let mut json = String::with_capacity(128 + item_id.len() + text.len());
            json.push_str("{\"type\":\"response.reasoning_summary_text.delta\",\"item_id\":");
            push_json_string_escaped(&mut json, item_id);
            json.push_str(",\"output_index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"summary_index\":0,\"delta\":");
            push_json_string_escaped(&mut json, text);
            json.push('}');
            out.push(WireEvent::named("response.reasoning_summary_text.delta", json));
        }
        // The signature travels inside the reasoning item's
        // encrypted_content; it has no dedicated delta on this wire.
        TranslateEvent::SignatureDelta { .. } => {}
        TranslateEvent::ArgsDelta {
            output_index,
            item_id,
            delta,
        } => {
            let mut json = String::with_capacity(128 + item_id.len() + delta.len());
            json.push_str("{\"type\":\"response.function_call_arguments.delta\",\"item_id\":");
            push_json_string_escaped(&mut json, item_id);
            json.push_str(",\"output_index\":");
            push_usize_decimal(&mut json, *output_index);
            json.push_str(",\"delta\":");
            push_json_string_escaped(&mut json, delta);
            json.push('}');
            out.push(WireEvent::named("response.function_call_arguments.delta", json));
        }
        TranslateEvent::BlockClose {
            output_index,
            content_index,
            item,
        } => {
            match item {
                OutputItem::Message { id, text } => {
                    let mut json = String::with_capacity(112 + id.len() + text.len());
                    json.push_str("{\"type\":\"response.output_text.done\",\"item_id\":");
                    push_json_string_escaped(&mut json, id);
                    json.push_str(",\"output_index\":");
                    push_usize_decimal(&mut json, *output_index);
                    json.push_str(",\"content_index\":");
                    push_usize_decimal(&mut json, *content_index);
                    json.push_str(",\"text\":");
                    push_json_string_escaped(&mut json, text);
                    json.push('}');
                    out.push(WireEvent::named("response.output_text.done", json));

                    let mut json = String::with_capacity(160 + id.len() + text.len());
                    json.push_str("{\"type\":\"response.content_part.done\",\"item_id\":");
                    push_json_string_escaped(&mut json, id);
                    json.push_str(",\"output_index\":");
                    push_usize_decimal(&mut json, *output_index);
                    json.push_str(",\"content_index\":");
                    push_usize_decimal(&mut json, *content_index);
                    json.push_str(",\"part\":{\"type\":\"output_text\",\"text\":");
                    push_json_string_escaped(&mut json, text);
                    json.push_str(",\"annotations\":[]}}");
                    out.push(WireEvent::named("response.content_part.done", json));
                }
                OutputItem::Reasoning { id, text, .. } => {
                    let mut json = String::with_capacity(136 + id.len() + text.len());
                    json.push_str("{\"type\":\"response.reasoning_summary_text.done\",\"item_id\":");
                    push_json_string_escaped(&mut json, id);
                    json.push_str(",\"output_index\":");
                    push_usize_decimal(&mut json, *output_index);
                    json.push_str(",\"summary_index\":0,\"text\":");
                    push_json_string_escaped(&mut json, text);
                    json.push('}');
                    out.push(WireEvent::named("response.reasoning_summary_text.done", json));

                    let mut json = String::with_capacity(160 + id.len() + text.len());
                    json.push_str("{\"type\":\"response.reasoning_summary_part.done\",\"item_id\":");
                    push_json_string_escaped(&mut json, id);
                    json.push_str(",\"output_index\":");
                    push_usize_decimal(&mut json, *output_index);
                    json.push_str(",\"summary_index\":0,\"part\":{\"type\":\"summary_text\",\"text\":");
                    push_json_string_escaped(&mut json, text);
                    json.push_str("}}");
                    out.push(WireEvent::named("response.reasoning_summary_part.done", json));
                }
                OutputItem::FunctionCall { .. } => {}
            }

            push_item_done(*output_index, item, out);
        }
        TranslateEvent::ToolDone { output_index, item } => {
            if let OutputItem::FunctionCall { id, arguments, .. } = item {
                let mut json = String::with_capacity(128 + id.len() + arguments.len());
                json.push_str("{\"type\":\"response.function_call_arguments.done\",\"item_id\":");
                push_json_string_escaped(&mut json, id);
                json.push_str(",\"output_index\":");
                push_usize_decimal(&mut json, *output_index);
                json.push_str(",\"arguments\":");
                push_json_string_escaped(&mut json, arguments);
                json.push('}');
                out.push(WireEvent::named("response.function_call_arguments.done", json));
            }
            push_item_done(*output_index, item, out);
        }
        TranslateEvent::Finish { status, reason, .. } => {
            let (event_type, body_status) = match status {
                StreamStatus::Completed => ("response.completed", "completed"),
                StreamStatus::Incomplete => ("response.incomplete", "incomplete"),
            };
            let incomplete = incomplete_reason(*reason).map(|reason| IncompleteDetails { reason });
            let items = state.snapshot_items();
            out.push(snapshot_event(
                event_type,
                body_status,
                state,
                &items,
                request,
                incomplete,
                true,
            ));
        }
    }
}

fn push_item_done(output_index: usize, item: &OutputItem, out: &mut Vec<WireEvent>) {
    let rendered = item_json(item, "completed");
    let mut json = String::with_capacity(64 + rendered.len());
    json.push_str("{\"type\":\"response.output_item.done\",\"output_index\":");
    push_usize_decimal(&mut json, output_index);
    json.push_str(",\"item\":");
    json.push_str(&rendered);
    json.push('}');
    out.push(WireEvent::named("response.output_item.done", json));
}
