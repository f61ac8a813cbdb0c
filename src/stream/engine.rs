//! Block lifecycle engine.
//!
//! Applies one canonical chunk delta to the stream state and emits the
//! canonical events the serializers render. All open/close invariants
//! live here; serializers stay stateless.

use crate::protocol::chunk::ChunkDelta;
use crate::protocol::event::{BlockKind, FinishReason, OutputItem, TranslateEvent};
use crate::protocol::mapping::stream_status;
use crate::stream::state::{OpenBlock, StreamState};
use crate::util::{fallback_response_id, unix_now_secs};

/// Applies a chunk delta, pushing the resulting canonical events.
///
/// Chunks arriving after the finish chunk are ignored. Field processing
/// order is fixed: identity, usage, reasoning, signature, text, tool
/// fragments, finish. The signature is stashed before text is handled so
/// a chunk carrying both cannot close the reasoning block first.
pub fn apply_delta(state: &mut StreamState, delta: ChunkDelta, out: &mut Vec<TranslateEvent>) {
    if state.finished {
        tracing::warn!("ignoring upstream chunk after finish");
        return;
    }

    absorb_identity(state, &delta);

    if !state.message_started {
        if state.response_id.is_empty() {
            state.response_id = fallback_response_id();
        }
        if state.created_at == 0 {
            state.created_at = unix_now_secs();
        }
        state.message_started = true;
        out.push(TranslateEvent::StreamBegin);
    }

    if let Some(usage) = delta.usage {
        state.usage = usage;
    }

    if let Some(reasoning) = delta.reasoning {
        let item_id = ensure_block(state, BlockKind::Reasoning, out);
        state.accumulated_reasoning.push_str(&reasoning);
        out.push(TranslateEvent::ReasoningDelta {
            output_index: state.output_index,
            content_index: state.content_index,
            item_id,
            text: reasoning,
        });
    }

    if let Some(signature) = delta.signature {
        // Held back and flushed as one delta when the reasoning block
        // closes, so it always lands inside the block.
        state
            .pending_signature
            .get_or_insert_with(String::new)
            .push_str(&signature);
    }

    if let Some(text) = delta.text {
        let item_id = ensure_block(state, BlockKind::Text, out);
        state.accumulated_text.push_str(&text);
        state.total_text.push_str(&text);
        out.push(TranslateEvent::TextDelta {
            output_index: state.output_index,
            content_index: state.content_index,
            item_id,
            text,
        });
    }

    for fragment in delta.tool_calls {
        if let Some(start) = fragment.start {
            close_current(state, out);
            let output_index = state.output_index;
            let item_id = state.register_tool(fragment.slot, start.call_id.clone(), start.name.clone());
            state.content_index = 0;
            state.block = Some(OpenBlock {
                kind: BlockKind::Tool,
                item_id: item_id.clone(),
                slot: Some(fragment.slot),
            });
            out.push(TranslateEvent::BlockOpen {
                kind: BlockKind::Tool,
                output_index,
                content_index: 0,
                item_id,
                call: Some(start),
            });
        }
        if let Some(arguments) = fragment.arguments {
            // Arguments route through the slot arena, not the cursor, so
            // fragments arriving after the cursor moved on still land.
            match state.tool_slot_mut(fragment.slot) {
                Some(slot) => {
                    slot.arguments.push_str(&arguments);
                    out.push(TranslateEvent::ArgsDelta {
                        output_index: slot.output_index,
                        item_id: slot.item_id.clone(),
                        delta: arguments,
                    });
                }
                None => {
                    tracing::warn!(
                        slot = fragment.slot,
                        "dropping arguments for unregistered tool slot"
                    );
                }
            }
        }
    }

    if let Some(reason) = delta.finish {
        finish(state, reason, out);
    }
}

fn absorb_identity(state: &mut StreamState, delta: &ChunkDelta) {
    if state.response_id.is_empty() {
        if let Some(id) = delta.response_id.as_deref() {
            if !id.is_empty() {
                state.response_id = id.to_owned();
            }
        }
    }
    if state.model.is_empty() {
        if let Some(model) = delta.model.as_deref() {
            if !model.is_empty() {
                state.model = model.to_owned();
            }
        }
    }
    if state.created_at == 0 {
        if let Some(created) = delta.created {
            state.created_at = created;
        }
    }
}

/// Opens a block of `kind` if one is not already open, closing any block
/// of a different kind first. Returns the open block's item id.
fn ensure_block(state: &mut StreamState, kind: BlockKind, out: &mut Vec<TranslateEvent>) -> String {
    if let Some(block) = &state.block {
        if block.kind == kind {
            return block.item_id.clone();
        }
        close_current(state, out);
    }
    let output_index = state.output_index;
    let item_id = state.open_block(kind, None);
    out.push(TranslateEvent::BlockOpen {
        kind,
        output_index,
        content_index: 0,
        item_id: item_id.clone(),
        call: None,
    });
    item_id
}

/// Closes the open block, if any. Text and reasoning blocks produce a
/// finished item and a close event; tool blocks only release the cursor,
/// their done events belong to the finish sweep.
fn close_current(state: &mut StreamState, out: &mut Vec<TranslateEvent>) {
    let Some(block) = state.block.clone() else {
        return;
    };
    let output_index = state.output_index;
    let content_index = state.content_index;
    match block.kind {
        BlockKind::Text => {
            let item = OutputItem::Message {
                id: block.item_id,
                text: state.accumulated_text.clone(),
            };
            state.output_items.push((output_index, item.clone()));
            out.push(TranslateEvent::BlockClose {
                output_index,
                content_index,
                item,
            });
        }
        BlockKind::Reasoning => {
            let signature = state.pending_signature.take();
            if let Some(sig) = &signature {
                out.push(TranslateEvent::SignatureDelta {
                    output_index,
                    content_index,
                    item_id: block.item_id.clone(),
                    signature: sig.clone(),
                });
            }
            let item = OutputItem::Reasoning {
                id: block.item_id,
                text: state.accumulated_reasoning.clone(),
                signature,
            };
            state.output_items.push((output_index, item.clone()));
            out.push(TranslateEvent::BlockClose {
                output_index,
                content_index,
                item,
            });
        }
        BlockKind::Tool => {}
    }
    state.release_block();
}

/// Closes the open block, completes every registered tool slot in slot
/// order, and emits the terminal event.
fn finish(
    state: &mut StreamState,
    reason: FinishReason,
    out: &mut Vec<TranslateEvent>,
) {
    close_current(state, out);

    // Only a closing reasoning block flushes the stash.
    if state.pending_signature.take().is_some() {
        tracing::warn!("dropping signature with no reasoning block to carry it");
    }

    let mut done = Vec::new();
    for slot in state.tool_slots.iter_mut().flatten() {
        if slot.completed {
            continue;
        }
        slot.completed = true;
        done.push((
            slot.output_index,
            OutputItem::FunctionCall {
                id: slot.item_id.clone(),
                call_id: slot.call_id.clone(),
                name: slot.name.clone(),
                arguments: slot.arguments.clone(),
            },
        ));
    }
    for (output_index, item) in done {
        state.output_items.push((output_index, item.clone()));
        out.push(TranslateEvent::ToolDone { output_index, item });
    }

    state.finished = true;
    out.push(TranslateEvent::Finish {
        status: stream_status(reason),
        reason,
        usage: state.usage,
    });
}
