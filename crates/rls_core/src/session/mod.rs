//! Manual editing session.
//!
//! Mediates the two manual input methods: tap-to-sync recording (mark-in on
//! press, mark-out on release, with hold and debounce guards) and waveform
//! region drag/resize. Keeps a bounded undo history of Timing Store
//! snapshots.

mod region;
mod types;
mod undo;

pub use region::RegionSession;
pub use types::{DragOutcome, MarkOutcome, SessionError, SessionState, UndoOutcome};
pub use undo::{UndoFrame, UndoStack};
