//! Per-connection translation state.
//!
//! `StreamState` is the single mutable record the lifecycle engine drives.
//! It tracks the open block cursor, the running index counters, the tool
//! slot arena and the accumulated content that feeds the final snapshot.

use crate::protocol::event::{BlockKind, OutputItem, UsageSnapshot};
use crate::util::next_item_id;

/// The block currently accepting deltas, if any. At most one block is
/// open at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlock {
    pub kind: BlockKind,
    pub item_id: String,
    /// Upstream tool slot index, set only for tool blocks.
    pub slot: Option<usize>,
}

/// A registered tool call, keyed by the upstream slot index. The slot
/// survives cursor release so late argument fragments still land here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSlot {
    pub item_id: String,
    pub call_id: String,
    pub name: String,
    pub arguments: String,
    pub output_index: usize,
    /// True once the finish sweep has emitted this slot's done events.
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StreamState {
    /// Upstream response id, absorbed from the first chunk that carries one.
    pub response_id: String,
    pub model: String,
    pub created_at: u64,

    /// Cursor over the currently open block.
    pub block: Option<OpenBlock>,
    /// Next output index to assign when a block opens.
    pub output_index: usize,
    /// Content part index within the current output item.
    pub content_index: usize,

    /// Text accumulated in the current open text block. Cleared on every
    /// block close regardless of kind so no text leaks across blocks.
    pub accumulated_text: String,
    /// All assistant text seen across every text block; never reset.
    pub total_text: String,
    /// Reasoning text accumulated in the current open reasoning block.
    pub accumulated_reasoning: String,
    /// Signature fragments held until the reasoning block closes.
    pub pending_signature: Option<String>,

    /// Tool slot arena indexed by the upstream `tool_calls[].index`.
    pub tool_slots: Vec<Option<ToolSlot>>,

    /// Closed items paired with the output index assigned at open time.
    pub output_items: Vec<(usize, OutputItem)>,

    /// Latest usage snapshot; each upstream report overwrites the last.
    pub usage: UsageSnapshot,

    pub message_started: bool,
    pub finished: bool,
}

impl StreamState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a block of the given kind at the current output index and
    /// points the cursor at it. The caller must have closed any open
    /// block first. Returns the fresh item id.
    pub fn open_block(&mut self, kind: BlockKind, slot: Option<usize>) -> String {
        debug_assert!(self.block.is_none());
        let prefix = match kind {
            BlockKind::Text => "msg",
            BlockKind::Reasoning => "rs",
            BlockKind::Tool => "fc",
        };
        let item_id = next_item_id(prefix);
        self.content_index = 0;
        self.block = Some(OpenBlock {
            kind,
            item_id: item_id.clone(),
            slot,
        });
        item_id
    }

    /// Releases the cursor and advances the output index. Accumulated
    /// text and reasoning always reset here, whatever the block kind.
    pub fn release_block(&mut self) -> Option<OpenBlock> {
        let block = self.block.take();
        if block.is_some() {
            self.output_index += 1;
        }
        self.accumulated_text.clear();
        self.accumulated_reasoning.clear();
        block
    }

    /// Returns the slot entry for an upstream tool index, if registered.
    #[must_use]
    pub fn tool_slot(&self, slot: usize) -> Option<&ToolSlot> {
        self.tool_slots.get(slot).and_then(Option::as_ref)
    }

    pub fn tool_slot_mut(&mut self, slot: usize) -> Option<&mut ToolSlot> {
        self.tool_slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Registers a tool call in the arena, growing it as needed. An
    /// upstream that reuses a slot index overwrites the earlier entry.
    /// Returns the fresh item id.
    pub fn register_tool(&mut self, slot: usize, call_id: String, name: String) -> String {
        if self.tool_slots.len() <= slot {
            self.tool_slots.resize(slot + 1, None);
        }
        let item_id = next_item_id("fc");
        self.tool_slots[slot] = Some(ToolSlot {
            item_id: item_id.clone(),
            call_id,
            name,
            arguments: String::new(),
            output_index: self.output_index,
            completed: false,
        });
        item_id
    }

    /// Closed items sorted by output index, for the aggregate snapshot.
    #[must_use]
    pub fn snapshot_items(&self) -> Vec<OutputItem> {
        let mut items: Vec<(usize, OutputItem)> = self.output_items.clone();
        items.sort_by_key(|(index, _)| *index);
        items.into_iter().map(|(_, item)| item).collect()
    }
}
