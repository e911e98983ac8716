//! Member, stamp event and checkpoint types for StampLink.
//!
//! This crate provides:
//! - The member record as the ledger serves it (`Member`)
//! - Append-only stamp history entries (`StampEvent`)
//! - Reward checkpoint configuration and its validation (`CheckpointConfig`)
//! - Synthetic event ids for optimistic, client-side placeholders
//!
//! Core invariants:
//! - `0 <= stamps <= max_stamps` and `max_stamps > 0` for any snapshot built here
//! - History is ordered oldest first and only ever appended to
//! - Checkpoint stamp counts are unique and never exceed `max_stamps`
//! - Client-side snapshots are read-only copies; the ledger owns the record
//!
#![deny(missing_docs)]

/// Reward checkpoint configuration.
pub mod checkpoint;
/// Error types for model validation.
pub mod errors;
/// Synthetic event id helpers.
pub mod event_id;
/// Stamp history events.
pub mod events;
/// Member record.
pub mod member;

pub use checkpoint::{Checkpoint, CheckpointConfig, DEFAULT_MAX_STAMPS};
pub use errors::ModelError;
pub use event_id::{is_synthetic, synthetic_event_id};
pub use events::{StampEvent, StampEventType};
pub use member::Member;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
