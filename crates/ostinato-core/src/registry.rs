use ostinato_ports::control::LastNote;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Oscillator state for one held note. `phase` is written only by the mixer's
/// per-block advance; `last_touched` never decreases while the note is held.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NoteState {
    pub(crate) phase: f64,
    pub(crate) last_touched: Instant,
}

impl NoteState {
    fn new(now: Instant) -> Self {
        Self {
            phase: 0.0,
            last_touched: now,
        }
    }
}

/// Held-note map plus the last-note cache. A note is present iff it is
/// currently sounding; capacity covers the full MIDI range up front so the
/// audio thread never triggers a rehash.
#[derive(Debug)]
pub(crate) struct Registry {
    notes: HashMap<u8, NoteState>,
    last_note: Option<LastNote>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            notes: HashMap::with_capacity(128),
            last_note: None,
        }
    }

    /// Insert or refresh. A re-trigger keeps the running phase and only
    /// resets the release clock.
    pub(crate) fn note_on(&mut self, note: u8, freq_hz: f64, now: Instant) {
        let state = self.notes.entry(note).or_insert_with(|| NoteState::new(now));
        state.last_touched = state.last_touched.max(now);
        self.last_note = Some(LastNote { note, freq_hz });
    }

    pub(crate) fn note_off(&mut self, note: u8) -> bool {
        self.notes.remove(&note).is_some()
    }

    /// Drops every note whose last touch is older than `timeout`, returning
    /// how many were evicted.
    pub(crate) fn sweep_expired(&mut self, now: Instant, timeout: Duration) -> usize {
        let before = self.notes.len();
        self.notes
            .retain(|_, state| now.saturating_duration_since(state.last_touched) <= timeout);
        before - self.notes.len()
    }

    pub(crate) fn last_note(&self) -> Option<LastNote> {
        self.last_note
    }

    pub(crate) fn held_notes(&self) -> Vec<u8> {
        let mut notes: Vec<u8> = self.notes.keys().copied().collect();
        notes.sort_unstable();
        notes
    }

    pub(crate) fn phase_of(&self, note: u8) -> Option<f64> {
        self.notes.get(&note).map(|state| state.phase)
    }

    pub(crate) fn states_mut(&mut self) -> impl Iterator<Item = (u8, &mut NoteState)> {
        self.notes.iter_mut().map(|(note, state)| (*note, state))
    }
}
