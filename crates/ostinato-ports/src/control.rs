use serde::{Deserialize, Serialize};

/// Highest valid MIDI note number.
pub const MAX_NOTE: u8 = 127;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NoteError {
    #[error("note out of range: {0}")]
    InvalidNote(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteEvent {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

impl NoteEvent {
    pub fn apply(self, sink: &dyn NoteSink) -> Result<(), NoteError> {
        match self {
            NoteEvent::NoteOn { note, velocity } => sink.note_on(note, velocity),
            NoteEvent::NoteOff { note } => {
                sink.note_off(note);
                Ok(())
            }
        }
    }
}

/// Most recently triggered note, kept for display; last write wins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastNote {
    pub note: u8,
    pub freq_hz: f64,
}

/// The one capability input adapters hold: something that can start and stop
/// notes. Implementations must be safe to call from any producer thread.
pub trait NoteSink: Send + Sync {
    /// Rejects notes above [`MAX_NOTE`] with [`NoteError::InvalidNote`];
    /// velocity is accepted but does not shape amplitude.
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), NoteError>;

    /// No-op when the note is not currently held.
    fn note_off(&self, note: u8);
}
