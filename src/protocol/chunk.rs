//! Upstream Chat Completions chunk wire format and its reduction to a
//! canonical per-chunk delta.

use serde::Deserialize;
use smallvec::SmallVec;

use super::event::{CallIdentity, FinishReason, UsageSnapshot};
use super::mapping::finish_reason_from_upstream;

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
    #[serde(default)]
    pub choices: Vec<UpstreamChoice>,
    #[serde(default)]
    pub usage: Option<UpstreamUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamChoice {
    #[serde(default)]
    pub delta: Option<UpstreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning_signature: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<UpstreamToolCallDelta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamToolCallDelta {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<UpstreamFunctionDelta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UpstreamUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One fragment of a streamed tool call, keyed by upstream slot index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub slot: usize,
    /// Present only on the fragment that carries both call id and name.
    pub start: Option<CallIdentity>,
    pub arguments: Option<String>,
}

/// Canonical reduction of a single upstream chunk. Field order mirrors
/// the order the lifecycle engine consumes them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkDelta {
    pub response_id: Option<String>,
    pub model: Option<String>,
    pub created: Option<u64>,
    pub usage: Option<UsageSnapshot>,
    pub reasoning: Option<String>,
    pub signature: Option<String>,
    pub text: Option<String>,
    pub tool_calls: SmallVec<[ToolCallFragment; 2]>,
    pub finish: Option<FinishReason>,
}

impl ChunkDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.reasoning.is_none()
            && self.signature.is_none()
            && self.tool_calls.is_empty()
            && self.finish.is_none()
            && self.usage.is_none()
    }
}

/// Parses one SSE data payload into a canonical delta.
///
/// Returns `None` for payloads that contribute nothing: blank lines,
/// malformed JSON (logged and skipped, the stream continues), and chunks
/// whose choices carry no delta and no finish reason.
#[must_use]
pub fn parse_chunk(payload: &str) -> Option<ChunkDelta> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return None;
    }

    let chunk: UpstreamChunk = match serde_json::from_str(trimmed) {
        Ok(chunk) => chunk,
        Err(err) => {
            tracing::warn!("skipping malformed upstream chunk: {err}");
            return None;
        }
    };

    Some(reduce_chunk(chunk))
}

/// Reduces a parsed chunk to its canonical delta. Only the first choice
/// is consulted; n>1 upstream requests are not translated.
#[must_use]
pub fn reduce_chunk(chunk: UpstreamChunk) -> ChunkDelta {
    let mut out = ChunkDelta {
        response_id: chunk.id,
        model: chunk.model,
        created: chunk.created,
        ..ChunkDelta::default()
    };

    if let Some(usage) = chunk.usage {
        out.usage = Some(UsageSnapshot {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        });
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return out;
    };

    if let Some(delta) = choice.delta {
        out.text = delta.content.filter(|text| !text.is_empty());
        out.reasoning = delta.reasoning_content.filter(|text| !text.is_empty());
        out.signature = delta.reasoning_signature.filter(|sig| !sig.is_empty());

        for call in delta.tool_calls {
            let function = call.function.unwrap_or_default();
            // A fragment starts a call only when both id and name arrive.
            let start = match (call.id, function.name) {
                (Some(call_id), Some(name)) if !call_id.is_empty() && !name.is_empty() => {
                    Some(CallIdentity { call_id, name })
                }
                _ => None,
            };
            let arguments = function.arguments.filter(|args| !args.is_empty());
            if start.is_some() || arguments.is_some() {
                out.tool_calls.push(ToolCallFragment {
                    slot: call.index,
                    start,
                    arguments,
                });
            }
        }
    }

    out.finish = choice
        .finish_reason
        .as_deref()
        .map(finish_reason_from_upstream);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_choices_chunk_reduces_to_usage_only() {
        let delta = parse_chunk(
            r#"{"id":"chatcmpl-u","choices":[],
                "usage":{"prompt_tokens":2,"completion_tokens":2,"total_tokens":4}}"#,
        )
        .unwrap();
        assert_eq!(delta.usage.unwrap().total_tokens, 4);
        assert!(delta.text.is_none());
        assert!(delta.tool_calls.is_empty());
        assert!(delta.finish.is_none());
    }

    #[test]
    fn text_delta_chunk_reduces_to_text() {
        let delta = parse_chunk(
            r#"{"id":"chatcmpl-1","model":"gpt-test","created":1700000000,
                "choices":[{"delta":{"content":"Hello"}}]}"#,
        )
        .unwrap();
        assert_eq!(delta.response_id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(delta.text.as_deref(), Some("Hello"));
        assert!(delta.finish.is_none());
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert!(parse_chunk("{not json").is_none());
        assert!(parse_chunk("   ").is_none());
    }

    #[test]
    fn tool_call_start_requires_id_and_name() {
        let delta = parse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"id":"call_1","function":{"name":"get_weather","arguments":""}}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(delta.tool_calls.len(), 1);
        let frag = &delta.tool_calls[0];
        assert_eq!(frag.slot, 0);
        let start = frag.start.as_ref().unwrap();
        assert_eq!(start.call_id, "call_1");
        assert_eq!(start.name, "get_weather");
        assert!(frag.arguments.is_none());
    }

    #[test]
    fn argument_only_fragment_carries_no_start() {
        let delta = parse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"function":{"arguments":"{\"city\":"}}
            ]}}]}"#,
        )
        .unwrap();
        let frag = &delta.tool_calls[0];
        assert!(frag.start.is_none());
        assert_eq!(frag.arguments.as_deref(), Some("{\"city\":"));
    }

    #[test]
    fn finish_and_usage_chunk() {
        let delta = parse_chunk(
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}],
                "usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();
        assert_eq!(delta.finish, Some(FinishReason::ToolCalls));
        let usage = delta.usage.unwrap();
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn empty_strings_are_dropped() {
        let delta = parse_chunk(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert!(delta.is_empty());
    }
}
