use protogate::protocol::{ClientApi, WireEvent};
use protogate::stream::{StreamTranslator, UpstreamEvent};
use serde_json::Value;

fn run(client: ClientApi, payloads: &[&str]) -> Vec<WireEvent> {
    let mut translator = StreamTranslator::new(client);
    let mut out = Vec::new();
    for payload in payloads {
        translator.process_into(UpstreamEvent::from_data((*payload).to_owned()), &mut out);
    }
    out
}

fn event_names(frames: &[WireEvent]) -> Vec<&str> {
    frames.iter().filter_map(|frame| frame.event).collect()
}

fn body(frame: &WireEvent) -> Value {
    serde_json::from_str(&frame.data).expect("frame body is valid JSON")
}

const TEXT_TOOL_STREAM: &[&str] = &[
    r#"{"id":"chatcmpl-1","model":"gpt-test","created":1700000000,"choices":[{"delta":{"content":"Hello"}}]}"#,
    r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_weather","arguments":""}}]}}]}"#,
    r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":\"Paris\"}"}}]}}]}"#,
    r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}],"usage":{"prompt_tokens":20,"completion_tokens":9,"total_tokens":29}}"#,
    "[DONE]",
];

#[test]
fn test_anthropic_text_then_tool_sequence() {
    let frames = run(ClientApi::Anthropic, TEXT_TOOL_STREAM);
    assert_eq!(
        event_names(&frames),
        [
            "message_start",
            "content_block_start",  // text block 0
            "content_block_delta",  // "Hello"
            "content_block_stop",   // text closed by tool start
            "content_block_start",  // tool_use block 1
            "content_block_delta",  // input_json_delta
            "content_block_stop",   // tool closed at finish
            "message_delta",
            "message_stop",
        ]
    );
    let start = body(&frames[4]);
    assert_eq!(start["index"], 1);
    assert_eq!(start["content_block"]["name"], "get_weather");
    let delta = body(&frames[7]);
    assert_eq!(delta["delta"]["stop_reason"], "tool_use");
    assert_eq!(delta["usage"]["output_tokens"], 9);
}

#[test]
fn test_responses_text_then_tool_sequence() {
    let frames = run(ClientApi::Responses, TEXT_TOOL_STREAM);
    assert_eq!(
        event_names(&frames),
        [
            "response.created",
            "response.in_progress",
            "response.output_item.added",
            "response.content_part.added",
            "response.output_text.delta",
            "response.output_text.done",
            "response.content_part.done",
            "response.output_item.done",
            "response.output_item.added",
            "response.function_call_arguments.delta",
            "response.function_call_arguments.done",
            "response.output_item.done",
            "response.completed",
        ]
    );
    let completed = body(frames.last().unwrap());
    let output = completed["response"]["output"].as_array().unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0]["type"], "message");
    assert_eq!(output[0]["content"][0]["text"], "Hello");
    assert_eq!(output[1]["type"], "function_call");
    assert_eq!(output[1]["arguments"], "{\"city\":\"Paris\"}");
    assert_eq!(completed["response"]["usage"]["total_tokens"], 29);
    assert_eq!(completed["response"]["id"], "chatcmpl-1");
}

#[test]
fn test_gemini_text_then_tool_sequence() {
    let frames = run(ClientApi::Gemini, TEXT_TOOL_STREAM);
    // Lifecycle events are suppressed: text delta, function call, finish.
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|frame| frame.event.is_none()));
    let text = body(&frames[0]);
    assert_eq!(text["candidates"][0]["content"]["parts"][0]["text"], "Hello");
    let call = body(&frames[1]);
    assert_eq!(
        call["candidates"][0]["content"]["parts"][0]["functionCall"]["args"]["city"],
        "Paris"
    );
    let finish = body(&frames[2]);
    assert_eq!(finish["candidates"][0]["finishReason"], "STOP");
    assert_eq!(finish["usageMetadata"]["promptTokenCount"], 20);
}

#[test]
fn test_text_deltas_concatenate_into_final_message() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-2","model":"m","choices":[{"delta":{"content":"A"}}]}"#,
            r#"{"choices":[{"delta":{"content":"B"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );
    let done = frames
        .iter()
        .find(|frame| frame.event == Some("response.output_text.done"))
        .unwrap();
    assert_eq!(body(done)["text"], "AB");
    let completed = body(frames.last().unwrap());
    assert_eq!(completed["type"], "response.completed");
    assert_eq!(
        completed["response"]["output"][0]["content"][0]["text"],
        "AB"
    );
}

#[test]
fn test_length_finish_alone_is_incomplete_with_empty_output() {
    let frames = run(
        ClientApi::Responses,
        &[r#"{"id":"chatcmpl-3","model":"m","choices":[{"delta":{},"finish_reason":"length"}]}"#],
    );
    assert_eq!(
        event_names(&frames),
        ["response.created", "response.in_progress", "response.incomplete"]
    );
    let incomplete = body(frames.last().unwrap());
    assert_eq!(incomplete["response"]["status"], "incomplete");
    assert_eq!(
        incomplete["response"]["incomplete_details"]["reason"],
        "max_output_tokens"
    );
    assert_eq!(incomplete["response"]["output"], Value::Array(vec![]));
}

#[test]
fn test_text_after_tool_opens_fresh_message() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-4","model":"m","choices":[{"delta":{"content":"first"}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"f"}}]}}]}"#,
            r#"{"choices":[{"delta":{"content":"second"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );
    let texts: Vec<Value> = frames
        .iter()
        .filter(|frame| frame.event == Some("response.output_text.done"))
        .map(body)
        .collect();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0]["text"], "first");
    assert_eq!(texts[0]["output_index"], 0);
    // The second message holds only its own text; nothing leaked across
    // the tool block in between.
    assert_eq!(texts[1]["text"], "second");
    assert_eq!(texts[1]["output_index"], 2);

    let completed = body(frames.last().unwrap());
    let output = completed["response"]["output"].as_array().unwrap();
    assert_eq!(output.len(), 3);
    assert_eq!(output[1]["type"], "function_call");
}

#[test]
fn test_tool_without_arguments_completes_empty() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-5","model":"m","choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_9","function":{"name":"ping"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        ],
    );
    let args_done = frames
        .iter()
        .find(|frame| frame.event == Some("response.function_call_arguments.done"))
        .unwrap();
    assert_eq!(body(args_done)["arguments"], "");
    let completed = body(frames.last().unwrap());
    assert_eq!(completed["response"]["output"][0]["status"], "completed");
    assert_eq!(completed["response"]["output"][0]["arguments"], "");
}

#[test]
fn test_signature_lands_before_block_stop_on_anthropic() {
    let frames = run(
        ClientApi::Anthropic,
        &[
            r#"{"id":"chatcmpl-6","model":"m","choices":[{"delta":{"reasoning_content":"let me think"}}]}"#,
            r#"{"choices":[{"delta":{"reasoning_signature":"sig_abc"}}]}"#,
            r#"{"choices":[{"delta":{"content":"answer"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );
    let names = event_names(&frames);
    let stop_at = names
        .iter()
        .position(|name| *name == "content_block_stop")
        .unwrap();
    let signature_at = frames
        .iter()
        .position(|frame| {
            frame.event == Some("content_block_delta")
                && frame.data.contains("signature_delta")
        })
        .unwrap();
    assert!(signature_at < stop_at);
    let signature = body(&frames[signature_at]);
    assert_eq!(signature["delta"]["signature"], "sig_abc");
    assert_eq!(signature["index"], 0);
}

#[test]
fn test_reasoning_surfaces_on_responses_wire() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-7","model":"m","choices":[{"delta":{"reasoning_content":"hmm"}}]}"#,
            r#"{"choices":[{"delta":{"reasoning_signature":"sig_xyz"}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );
    let names = event_names(&frames);
    assert!(names.contains(&"response.reasoning_summary_part.added"));
    assert!(names.contains(&"response.reasoning_summary_text.delta"));
    assert!(names.contains(&"response.reasoning_summary_text.done"));
    let completed = body(frames.last().unwrap());
    let item = &completed["response"]["output"][0];
    assert_eq!(item["type"], "reasoning");
    assert_eq!(item["summary"][0]["text"], "hmm");
    assert_eq!(item["encrypted_content"], "sig_xyz");
}

#[test]
fn test_usage_snapshots_overwrite_not_accumulate() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-8","model":"m","choices":[{"delta":{"content":"x"}}],"usage":{"prompt_tokens":5,"completion_tokens":1,"total_tokens":6}}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":4,"total_tokens":9}}"#,
        ],
    );
    let completed = body(frames.last().unwrap());
    assert_eq!(completed["response"]["usage"]["output_tokens"], 4);
    assert_eq!(completed["response"]["usage"]["total_tokens"], 9);
}

#[test]
fn test_parallel_tool_calls_complete_in_slot_order() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-9","model":"m","choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"alpha","arguments":"{}"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"beta"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"function":{"arguments":"{\"n\":2}"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}]}"#,
        ],
    );
    let completed = body(frames.last().unwrap());
    let output = completed["response"]["output"].as_array().unwrap();
    assert_eq!(output.len(), 2);
    assert_eq!(output[0]["name"], "alpha");
    assert_eq!(output[0]["call_id"], "call_a");
    assert_eq!(output[1]["name"], "beta");
    assert_eq!(output[1]["arguments"], "{\"n\":2}");
}

#[test]
fn test_arguments_for_unregistered_slot_are_dropped() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-11","model":"m","choices":[{"delta":{"tool_calls":[{"index":5,"function":{"arguments":"{\"x\":1}"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );
    let names = event_names(&frames);
    assert!(!names.contains(&"response.function_call_arguments.delta"));
    assert!(!names.contains(&"response.output_item.added"));
    let completed = body(frames.last().unwrap());
    assert_eq!(completed["response"]["output"], Value::Array(vec![]));
}

#[test]
fn test_zero_choices_chunk_only_carries_usage() {
    let frames = run(
        ClientApi::Responses,
        &[
            r#"{"id":"chatcmpl-12","model":"m","choices":[{"delta":{"content":"hi"}}]}"#,
            r#"{"choices":[],"usage":{"prompt_tokens":2,"completion_tokens":2,"total_tokens":4}}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );
    // The open text block survives the usage-only chunk untouched.
    let names = event_names(&frames);
    assert_eq!(
        names
            .iter()
            .filter(|name| **name == "response.output_item.added")
            .count(),
        1
    );
    let completed = body(frames.last().unwrap());
    let output = completed["response"]["output"].as_array().unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(output[0]["content"][0]["text"], "hi");
    assert_eq!(completed["response"]["usage"]["total_tokens"], 4);
}

#[test]
fn test_chunks_after_finish_render_nothing() {
    let mut translator = StreamTranslator::new(ClientApi::Anthropic);
    for payload in [
        r#"{"id":"chatcmpl-10","model":"m","choices":[{"delta":{},"finish_reason":"stop"}]}"#,
    ] {
        translator.process(UpstreamEvent::from_data(payload.to_owned()));
    }
    assert!(translator.is_finished());
    let late = translator.process(UpstreamEvent::from_data(
        r#"{"choices":[{"delta":{"content":"late"}}]}"#.to_owned(),
    ));
    assert!(late.is_empty());
}
