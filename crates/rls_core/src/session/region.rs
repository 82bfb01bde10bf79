//! Region session state machine.
//!
//! Tap-to-sync is driven by human reaction time; without the minimum-hold
//! and debounce guards a single accidental key bounce desynchronizes every
//! subsequent unit on the page. Both guards reject the mark and leave the
//! store untouched.

use crate::audio::{AudioBuffer, SharedTransport};
use crate::config::SessionSettings;
use crate::models::{SyncStatus, UnitLevel};
use crate::propagation::{propagate_children, propagate_descendants};
use crate::snapping::{snap_to_silence, SnapConfig};
use crate::store::SharedTimingStore;

use super::types::{DragOutcome, MarkOutcome, SessionError, SessionState, UndoOutcome};
use super::undo::UndoStack;

/// Per-document editing session over the shared Timing Store.
pub struct RegionSession {
    store: SharedTimingStore,
    transport: SharedTransport,
    audio: Option<AudioBuffer>,
    settings: SessionSettings,
    snap: SnapConfig,
    /// Level being recorded and highlighted.
    granularity: UnitLevel,
    state: SessionState,
    /// State to return to when a drag completes.
    resume_state: SessionState,
    page: u32,
    cursor: usize,
    page_unit_ids: Vec<String>,
    undo: UndoStack,
    pending_mark_in: Option<f64>,
    /// Mark-out time of the previous accepted mark (debounce reference).
    last_mark_out: Option<f64>,
    drag_unit: Option<String>,
}

impl RegionSession {
    /// Create a session over a store and transport.
    pub fn new(
        store: SharedTimingStore,
        transport: SharedTransport,
        granularity: UnitLevel,
        settings: SessionSettings,
        snap: SnapConfig,
    ) -> Self {
        let undo_depth = settings.undo_depth;
        Self {
            store,
            transport,
            audio: None,
            settings,
            snap,
            granularity,
            state: SessionState::Idle,
            resume_state: SessionState::Idle,
            page: 0,
            cursor: 0,
            page_unit_ids: Vec::new(),
            undo: UndoStack::new(undo_depth),
            pending_mark_in: None,
            last_mark_out: None,
            drag_unit: None,
        }
    }

    /// Attach the decoded amplitude buffer used for silence snapping.
    pub fn load_audio(&mut self, buffer: AudioBuffer) {
        self.audio = Some(buffer);
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current cursor position within the page's unit list.
    pub fn cursor_index(&self) -> usize {
        self.cursor
    }

    /// Unit the next accepted mark will be written to.
    pub fn current_unit_id(&self) -> Option<&str> {
        self.page_unit_ids.get(self.cursor).map(String::as_str)
    }

    /// Editing granularity.
    pub fn granularity(&self) -> UnitLevel {
        self.granularity
    }

    /// The synced unit under the playback cursor, for highlighting.
    ///
    /// Pure read against the transport clock and the store.
    pub fn active_unit(&self) -> Option<String> {
        let time_s = self.transport.lock().current_time();
        self.store.read().unit_at_time(self.granularity, time_s)
    }

    /// Begin a tap-to-sync pass over a page.
    ///
    /// Resets the cursor, clears intervals for all units on the page, and
    /// clears the undo history. Returns the number of units to record.
    pub fn start_recording(&mut self, page: u32) -> Result<usize, SessionError> {
        if self.audio.is_none() {
            return Err(SessionError::NoAudioLoaded);
        }

        let unit_ids: Vec<String> = {
            let store = self.store.read();
            store
                .hierarchy()
                .page_units(page, self.granularity)
                .iter()
                .map(|u| u.id.clone())
                .collect()
        };
        if unit_ids.is_empty() {
            return Err(SessionError::EmptyPage {
                page,
                level: self.granularity,
            });
        }

        self.store.write().clear_page(page);
        self.undo.clear();
        self.page = page;
        self.page_unit_ids = unit_ids;
        self.cursor = 0;
        self.pending_mark_in = None;
        self.last_mark_out = None;
        self.state = SessionState::Recording;

        tracing::info!(
            "Recording page {} ({} {} units)",
            page,
            self.page_unit_ids.len(),
            self.granularity
        );
        Ok(self.page_unit_ids.len())
    }

    /// Press of the mark gesture: samples the transport clock as mark-in.
    pub fn press(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Recording {
            return Err(SessionError::NotRecording);
        }
        self.pending_mark_in = Some(self.transport.lock().current_time());
        Ok(())
    }

    /// Release of the mark gesture: samples mark-out and applies the guards.
    pub fn release(&mut self) -> Result<MarkOutcome, SessionError> {
        if self.state != SessionState::Recording {
            return Err(SessionError::NotRecording);
        }
        let mark_in = self.pending_mark_in.take().ok_or(SessionError::NoPendingMark)?;
        let mark_out = self.transport.lock().current_time();

        let held_s = mark_out - mark_in;
        if held_s < self.settings.min_hold_ms as f64 / 1000.0 {
            tracing::debug!("Mark discarded: held {:.0}ms", held_s * 1000.0);
            return Ok(MarkOutcome::RejectedHold { held_s });
        }

        if let Some(last_out) = self.last_mark_out {
            let elapsed_s = mark_in - last_out;
            if elapsed_s < self.settings.min_sync_interval_ms as f64 / 1000.0 {
                tracing::debug!(
                    "Mark discarded: {:.0}ms since previous mark",
                    elapsed_s * 1000.0
                );
                return Ok(MarkOutcome::RejectedDebounce { elapsed_s });
            }
        }

        // The unit list is never empty while recording, and the cursor only
        // advances past the end together with the transition to Idle.
        let unit_id = self.page_unit_ids[self.cursor].clone();

        self.push_undo();
        let start_s = self.snap(mark_in);
        let end_s = self.snap(mark_out);

        let warnings = {
            let mut store = self.store.write();
            let warnings = store.upsert(&unit_id, start_s, end_s, SyncStatus::Synced);
            if self.settings.propagate_words {
                propagate_descendants(&mut store, &unit_id);
            }
            warnings
        };
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        self.last_mark_out = Some(mark_out);
        self.cursor += 1;
        let page_complete = self.cursor >= self.page_unit_ids.len();
        if page_complete {
            tracing::info!("Page {} fully marked", self.page);
            self.state = SessionState::Idle;
        }

        Ok(MarkOutcome::Accepted {
            unit_id,
            start_s,
            end_s,
            page_complete,
            warnings,
        })
    }

    /// Begin a region boundary drag on a unit.
    pub fn begin_drag(&mut self, unit_id: &str) -> Result<(), SessionError> {
        if self.state == SessionState::Dragging {
            return Err(SessionError::AlreadyDragging);
        }
        if self.audio.is_none() {
            return Err(SessionError::NoAudioLoaded);
        }
        if self.store.read().hierarchy().get(unit_id).is_none() {
            return Err(SessionError::UnknownUnit(unit_id.to_string()));
        }
        self.resume_state = self.state;
        self.state = SessionState::Dragging;
        self.drag_unit = Some(unit_id.to_string());
        Ok(())
    }

    /// Complete a drag with the region's final raw boundaries.
    ///
    /// Snapping and propagation happen here, never during drag-move.
    pub fn end_drag(&mut self, start_s: f64, end_s: f64) -> Result<DragOutcome, SessionError> {
        if self.state != SessionState::Dragging {
            return Err(SessionError::NotDragging);
        }
        // begin_drag always sets the unit together with the state.
        let unit_id = self.drag_unit.take().ok_or(SessionError::NotDragging)?;
        self.state = self.resume_state;

        self.push_undo();
        let mut start_s = self.snap(start_s);
        let mut end_s = self.snap(end_s);

        let level = {
            let store = self.store.read();
            store.hierarchy().get(&unit_id).map(|u| u.level)
        }
        .ok_or_else(|| SessionError::UnknownUnit(unit_id.clone()))?;

        // A word must stay inside its sentence's current interval.
        if level == UnitLevel::Word {
            let parent = {
                let store = self.store.read();
                store
                    .hierarchy()
                    .parent_of(&unit_id)
                    .and_then(|p| store.get(&p.id))
            };
            // An inverted parent interval (possible, it only warns) cannot
            // clamp anything.
            if let Some(parent) = parent.filter(|p| p.is_synced() && p.start_s < p.end_s) {
                start_s = start_s.clamp(parent.start_s, parent.end_s);
                end_s = end_s.clamp(parent.start_s, parent.end_s);
            }
        }

        let warnings = {
            let mut store = self.store.write();
            let warnings = store.upsert(&unit_id, start_s, end_s, SyncStatus::Synced);
            match level {
                UnitLevel::Sentence => {
                    propagate_children(&mut store, &unit_id);
                }
                UnitLevel::Paragraph => {
                    propagate_descendants(&mut store, &unit_id);
                }
                UnitLevel::Word => {}
            }
            warnings
        };
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(DragOutcome {
            unit_id,
            start_s,
            end_s,
            warnings,
        })
    }

    /// Abandon a drag without writing.
    pub fn cancel_drag(&mut self) {
        if self.state == SessionState::Dragging {
            self.drag_unit = None;
            self.state = self.resume_state;
        }
    }

    /// Undo the most recent accepted mark or drag.
    pub fn undo(&mut self) -> UndoOutcome {
        match self.undo.pop() {
            Some(frame) => {
                self.store.write().restore(frame.snapshot);
                self.cursor = frame.cursor;
                tracing::debug!("Undo: cursor back to {}", frame.cursor);
                UndoOutcome::Restored {
                    cursor: frame.cursor,
                }
            }
            None => {
                tracing::debug!("Undo requested with empty history");
                UndoOutcome::NothingToUndo
            }
        }
    }

    /// End the session's current activity and return to Idle.
    pub fn stop(&mut self) {
        self.pending_mark_in = None;
        self.drag_unit = None;
        self.state = SessionState::Idle;
        self.resume_state = SessionState::Idle;
    }

    fn push_undo(&mut self) {
        let snapshot = self.store.read().snapshot();
        self.undo.push(snapshot, self.cursor);
    }

    fn snap(&self, time_s: f64) -> f64 {
        match &self.audio {
            Some(buffer) => snap_to_silence(buffer, time_s, &self.snap).time_s,
            None => time_s,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::audio::ManualTransport;
    use crate::models::{SyncUnit, UnitHierarchy};
    use crate::store::TimingStore;

    fn make_store() -> SharedTimingStore {
        let units = vec![
            SyncUnit::new("p1", UnitLevel::Paragraph, None, "One. Two. Three.", 1),
            SyncUnit::new("s1", UnitLevel::Sentence, Some("p1".into()), "One.", 1),
            SyncUnit::new("w1", UnitLevel::Word, Some("s1".into()), "One.", 1),
            SyncUnit::new("s2", UnitLevel::Sentence, Some("p1".into()), "Two.", 1),
            SyncUnit::new("s3", UnitLevel::Sentence, Some("p1".into()), "Three.", 1),
        ];
        TimingStore::for_hierarchy(Arc::new(UnitHierarchy::from_units(units).unwrap()))
            .into_shared()
    }

    /// Loud buffer: snapping never moves a time, keeping mark arithmetic
    /// exact in these tests.
    fn loud_audio() -> AudioBuffer {
        AudioBuffer::new(1000, vec![0.5f32; 20_000])
    }

    fn make_session(store: SharedTimingStore) -> (RegionSession, SharedTransport) {
        let transport: SharedTransport = Arc::new(Mutex::new(ManualTransport::new()));
        let mut session = RegionSession::new(
            store,
            transport.clone(),
            UnitLevel::Sentence,
            SessionSettings::default(),
            SnapConfig::default(),
        );
        session.load_audio(loud_audio());
        (session, transport)
    }

    fn mark(
        session: &mut RegionSession,
        transport: &SharedTransport,
        press_at: f64,
        release_at: f64,
    ) -> MarkOutcome {
        transport.lock().seek(press_at);
        session.press().unwrap();
        transport.lock().seek(release_at);
        session.release().unwrap()
    }

    #[test]
    fn recording_requires_audio() {
        let (mut session, _transport) = make_session(make_store());
        session.audio = None;
        assert!(matches!(
            session.start_recording(1),
            Err(SessionError::NoAudioLoaded)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_recording_clears_page_and_undo() {
        let store = make_store();
        store.write().upsert("s1", 1.0, 2.0, SyncStatus::Synced);

        let (mut session, _transport) = make_session(store.clone());
        let count = session.start_recording(1).unwrap();
        assert_eq!(count, 3);
        assert_eq!(session.state(), SessionState::Recording);
        assert_eq!(session.current_unit_id(), Some("s1"));
        assert_eq!(store.read().get("s1").unwrap().status, SyncStatus::Unsynced);
    }

    #[test]
    fn tap_to_sync_scenario_with_debounce() {
        let store = make_store();
        let (mut session, transport) = make_session(store.clone());
        session.start_recording(1).unwrap();

        // Mark 1: held a full second, accepted.
        let outcome = mark(&mut session, &transport, 1.0, 2.0);
        assert!(outcome.is_accepted());
        assert_eq!(session.cursor_index(), 1);

        // Mark 2: 50ms after the previous mark ended, rejected by debounce.
        let outcome = mark(&mut session, &transport, 2.05, 2.2);
        assert!(matches!(outcome, MarkOutcome::RejectedDebounce { .. }));
        assert_eq!(session.cursor_index(), 1);
        assert_eq!(store.read().get("s2").unwrap().status, SyncStatus::Unsynced);

        // Mark 3: 500ms after the previous accepted mark, accepted.
        let outcome = mark(&mut session, &transport, 2.5, 3.0);
        assert!(outcome.is_accepted());
        assert_eq!(session.cursor_index(), 2);

        let s1 = store.read().get("s1").unwrap();
        assert!((s1.start_s - 1.0).abs() < 1e-9);
        assert!((s1.end_s - 2.0).abs() < 1e-9);
        let s2 = store.read().get("s2").unwrap();
        assert!((s2.start_s - 2.5).abs() < 1e-9);
    }

    #[test]
    fn short_hold_is_discarded() {
        let store = make_store();
        let (mut session, transport) = make_session(store.clone());
        session.start_recording(1).unwrap();

        let outcome = mark(&mut session, &transport, 1.0, 1.1);
        assert!(matches!(outcome, MarkOutcome::RejectedHold { .. }));
        assert_eq!(session.cursor_index(), 0);
        assert_eq!(store.read().get("s1").unwrap().status, SyncStatus::Unsynced);
    }

    #[test]
    fn completing_the_page_returns_to_idle() {
        let store = make_store();
        let (mut session, transport) = make_session(store);
        session.start_recording(1).unwrap();

        assert!(mark(&mut session, &transport, 0.5, 1.5).is_accepted());
        assert!(mark(&mut session, &transport, 2.0, 3.0).is_accepted());
        let last = mark(&mut session, &transport, 3.5, 4.5);
        match last {
            MarkOutcome::Accepted { page_complete, .. } => assert!(page_complete),
            other => panic!("expected accepted mark, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn accepted_sentence_mark_propagates_words() {
        let store = make_store();
        let (mut session, transport) = make_session(store.clone());
        session.start_recording(1).unwrap();

        mark(&mut session, &transport, 1.0, 2.0);
        let w1 = store.read().get("w1").unwrap();
        assert!(w1.is_synced());
        assert!((w1.start_s - 1.0).abs() < 1e-9);
        assert!((w1.end_s - 2.0).abs() < 1e-9);
    }

    #[test]
    fn undo_restores_store_and_cursor() {
        let store = make_store();
        let (mut session, transport) = make_session(store.clone());
        session.start_recording(1).unwrap();

        mark(&mut session, &transport, 1.0, 2.0);
        assert_eq!(session.cursor_index(), 1);

        let outcome = session.undo();
        assert_eq!(outcome, UndoOutcome::Restored { cursor: 0 });
        assert_eq!(session.cursor_index(), 0);
        assert_eq!(store.read().get("s1").unwrap().status, SyncStatus::Unsynced);

        assert_eq!(session.undo(), UndoOutcome::NothingToUndo);
    }

    #[test]
    fn drag_clamps_word_to_parent_sentence() {
        let store = make_store();
        store.write().upsert("s1", 1.0, 3.0, SyncStatus::Synced);

        let (mut session, _transport) = make_session(store.clone());
        session.begin_drag("w1").unwrap();
        let outcome = session.end_drag(0.2, 4.0).unwrap();

        assert!((outcome.start_s - 1.0).abs() < 1e-9);
        assert!((outcome.end_s - 3.0).abs() < 1e-9);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn sentence_drag_repropagates_words() {
        let store = make_store();
        store.write().upsert("s1", 1.0, 2.0, SyncStatus::Synced);

        let (mut session, _transport) = make_session(store.clone());
        session.begin_drag("s1").unwrap();
        session.end_drag(4.0, 6.0).unwrap();

        let w1 = store.read().get("w1").unwrap();
        assert!((w1.start_s - 4.0).abs() < 1e-9);
        assert!((w1.end_s - 6.0).abs() < 1e-9);
    }

    #[test]
    fn drag_guards_reject_bad_input() {
        let store = make_store();
        let (mut session, _transport) = make_session(store);

        assert!(matches!(
            session.begin_drag("ghost"),
            Err(SessionError::UnknownUnit(_))
        ));
        assert!(matches!(
            session.end_drag(0.0, 1.0),
            Err(SessionError::NotDragging)
        ));

        session.begin_drag("s1").unwrap();
        assert!(matches!(
            session.begin_drag("s2"),
            Err(SessionError::AlreadyDragging)
        ));
        session.cancel_drag();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn press_outside_recording_is_rejected() {
        let store = make_store();
        let (mut session, _transport) = make_session(store);
        assert!(matches!(session.press(), Err(SessionError::NotRecording)));
        assert!(matches!(
            session.release(),
            Err(SessionError::NotRecording)
        ));
    }
}
