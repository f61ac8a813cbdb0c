//! Finish-reason vocabulary mapping between the upstream protocol and
//! each client protocol.

use super::event::{FinishReason, StreamStatus};

/// Maps the upstream `finish_reason` string to the canonical reason.
/// Unknown strings map to `Other` rather than failing the stream.
#[must_use]
pub fn finish_reason_from_upstream(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Other,
    }
}

/// Terminal stream status implied by the finish reason. Truncation is the
/// only incomplete outcome.
#[must_use]
pub fn stream_status(reason: FinishReason) -> StreamStatus {
    match reason {
        FinishReason::Length => StreamStatus::Incomplete,
        _ => StreamStatus::Completed,
    }
}

/// Anthropic `stop_reason` value for a canonical finish reason.
#[must_use]
pub fn anthropic_stop_reason(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop | FinishReason::Other => "end_turn",
        FinishReason::Length => "max_tokens",
        FinishReason::ToolCalls => "tool_use",
        FinishReason::ContentFilter => "refusal",
    }
}

/// Gemini candidate `finishReason` value for a canonical finish reason.
#[must_use]
pub fn gemini_finish_reason(reason: FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop | FinishReason::ToolCalls | FinishReason::Other => "STOP",
        FinishReason::Length => "MAX_TOKENS",
        FinishReason::ContentFilter => "SAFETY",
    }
}

/// Response API `incomplete_details.reason` for an incomplete stream.
#[must_use]
pub fn incomplete_reason(reason: FinishReason) -> Option<&'static str> {
    match reason {
        FinishReason::Length => Some("max_output_tokens"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_reasons_map_to_canonical() {
        assert_eq!(finish_reason_from_upstream("stop"), FinishReason::Stop);
        assert_eq!(finish_reason_from_upstream("length"), FinishReason::Length);
        assert_eq!(
            finish_reason_from_upstream("tool_calls"),
            FinishReason::ToolCalls
        );
        assert_eq!(
            finish_reason_from_upstream("weird_new_reason"),
            FinishReason::Other
        );
    }

    #[test]
    fn only_length_is_incomplete() {
        assert_eq!(stream_status(FinishReason::Length), StreamStatus::Incomplete);
        assert_eq!(stream_status(FinishReason::Stop), StreamStatus::Completed);
        assert_eq!(
            stream_status(FinishReason::ToolCalls),
            StreamStatus::Completed
        );
    }

    #[test]
    fn anthropic_stop_reasons() {
        assert_eq!(anthropic_stop_reason(FinishReason::Stop), "end_turn");
        assert_eq!(anthropic_stop_reason(FinishReason::ToolCalls), "tool_use");
        assert_eq!(anthropic_stop_reason(FinishReason::Length), "max_tokens");
    }
}
