use crate::control::NoteSink;
use crate::types::*;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// MIDI input stream handle: drop closes it.
pub trait MidiInputStream: Send {
    fn close(self: Box<Self>);
}

pub trait MidiInputPort: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError>;

    /// Open input stream: the implementation feeds the sink from its own
    /// callback thread. Note-on with velocity zero arrives as `note_off`.
    fn open_input(
        &self,
        device_id: &DeviceId,
        sink: Arc<dyn NoteSink>,
    ) -> Result<Box<dyn MidiInputStream>, MidiError>;
}
