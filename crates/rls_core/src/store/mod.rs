//! Timing Store: the single source of truth for unit timing state.
//!
//! All components other than the extractor operate exclusively through the
//! store's read/update/delete operations, which is what lets the containment
//! and ordering invariants be checked at every write.

mod timing;
mod types;

pub use timing::{SharedTimingStore, TimingStore};
pub use types::{InvariantKind, InvariantWarning, StoreSnapshot, TimingEntry};
