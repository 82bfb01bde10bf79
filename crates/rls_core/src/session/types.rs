//! Session state and outcome types.

use crate::models::UnitLevel;
use crate::store::InvariantWarning;

/// Region session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Tap-to-sync recording pass over a page.
    Recording,
    /// A region boundary drag is in progress.
    Dragging,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Recording => write!(f, "recording"),
            SessionState::Dragging => write!(f, "dragging"),
        }
    }
}

/// Result of releasing a press-and-hold mark.
#[derive(Debug, Clone)]
pub enum MarkOutcome {
    /// Mark accepted and written to the cursor unit.
    Accepted {
        unit_id: String,
        start_s: f64,
        end_s: f64,
        /// True when this mark was the last unit on the page and the
        /// session returned to Idle.
        page_complete: bool,
        warnings: Vec<InvariantWarning>,
    },
    /// Hold was shorter than the minimum; treated as accidental.
    RejectedHold { held_s: f64 },
    /// Too soon after the previous accepted mark; treated as key bounce.
    RejectedDebounce { elapsed_s: f64 },
}

impl MarkOutcome {
    /// Whether the mark was written.
    pub fn is_accepted(&self) -> bool {
        matches!(self, MarkOutcome::Accepted { .. })
    }
}

/// Result of completing a region drag.
#[derive(Debug, Clone)]
pub struct DragOutcome {
    /// Unit whose region was edited.
    pub unit_id: String,
    /// Final interval start after snapping/clamping.
    pub start_s: f64,
    /// Final interval end after snapping/clamping.
    pub end_s: f64,
    /// Invariant warnings from the write.
    pub warnings: Vec<InvariantWarning>,
}

/// Result of an undo request. An empty history is reported, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    /// State restored; cursor moved back to the snapshotted value.
    Restored { cursor: usize },
    /// Nothing to undo.
    NothingToUndo,
}

/// User-input errors, rejected synchronously with no state change.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Marking or dragging requires decoded audio.
    #[error("No audio is loaded")]
    NoAudioLoaded,

    /// Mark gestures only apply while recording.
    #[error("No recording in progress")]
    NotRecording,

    /// Release without a preceding press.
    #[error("No press is pending release")]
    NoPendingMark,

    /// Drag-end without a drag in progress.
    #[error("No drag in progress")]
    NotDragging,

    /// A second drag cannot start mid-drag.
    #[error("A drag is already in progress")]
    AlreadyDragging,

    /// The referenced unit is not in the hierarchy.
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    /// The page has nothing to record at the session granularity.
    #[error("Page {page} has no {level} units")]
    EmptyPage { page: u32, level: UnitLevel },
}
