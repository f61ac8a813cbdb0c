//! Wire protocol types and codecs.
//!
//! `chunk` parses the upstream Chat Completions stream into canonical
//! deltas; `event` defines the canonical event vocabulary; the three
//! sibling modules each render canonical events onto one client wire.

pub mod anthropic;
pub mod chunk;
pub mod event;
pub mod gemini;
pub mod mapping;
pub mod responses;

pub use chunk::{parse_chunk, ChunkDelta};
pub use event::{
    BlockKind, CallIdentity, ClientApi, FinishReason, OutputItem, StreamStatus, TranslateEvent,
    UsageSnapshot, WireEvent,
};
