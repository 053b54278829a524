use midir::{Ignore, MidiInput};
use ostinato_ports::control::{NoteEvent, NoteSink};
use ostinato_ports::midi::{MidiError, MidiInputPort, MidiInputStream};
use ostinato_ports::types::{DeviceId, MidiInputDevice};
use std::sync::Arc;

/// Maps a raw MIDI message to a note event, channel-agnostic. Note-on with
/// velocity zero is a release by convention. Anything that is not a note
/// message is dropped here and never reaches the engine.
pub fn parse_midi_message(message: &[u8]) -> Option<NoteEvent> {
    if message.len() < 3 {
        return None;
    }
    let status = message[0] & 0xF0;
    match status {
        0x80 => Some(NoteEvent::NoteOff { note: message[1] }),
        0x90 => {
            let note = message[1];
            let velocity = message[2];
            if velocity == 0 {
                Some(NoteEvent::NoteOff { note })
            } else {
                Some(NoteEvent::NoteOn { note, velocity })
            }
        }
        _ => None,
    }
}

pub struct MidirMidiInputPort {
    client_name: String,
}

impl MidirMidiInputPort {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn create_midi_in(&self) -> Result<MidiInput, MidiError> {
        let midi_in = MidiInput::new(&self.client_name)
            .map_err(|e| MidiError::Backend(e.to_string()))?;
        Ok(midi_in)
    }

    fn device_id(index: usize, name: &str) -> DeviceId {
        DeviceId(format!("midir:{}:{}", index, name))
    }
}

impl Default for MidirMidiInputPort {
    fn default() -> Self {
        Self::new("Ostinato")
    }
}

pub struct MidirMidiInputStream {
    connection: Option<midir::MidiInputConnection<Arc<dyn NoteSink>>>,
}

impl MidiInputStream for MidirMidiInputStream {
    fn close(mut self: Box<Self>) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
    }
}

impl MidiInputPort for MidirMidiInputPort {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError> {
        let midi_in = self.create_midi_in()?;
        let ports = midi_in.ports();
        let mut devices = Vec::new();

        for (index, port) in ports.iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown Input".to_string());
            devices.push(MidiInputDevice {
                id: Self::device_id(index, &name),
                name,
                is_available: true,
            });
        }

        Ok(devices)
    }

    fn open_input(
        &self,
        device_id: &DeviceId,
        sink: Arc<dyn NoteSink>,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        let mut midi_in = self.create_midi_in()?;
        midi_in.ignore(Ignore::None);

        let ports = midi_in.ports();
        let mut selected = None;
        for (index, port) in ports.iter().enumerate() {
            let name = midi_in
                .port_name(port)
                .unwrap_or_else(|_| "Unknown Input".to_string());
            let id = Self::device_id(index, &name);
            if &id == device_id {
                selected = Some(port.clone());
                break;
            }
        }

        let port = selected.ok_or_else(|| MidiError::DeviceNotFound(device_id.to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "ostinato-midi-input",
                move |_stamp, message, sink| {
                    if let Some(event) = parse_midi_message(message) {
                        if let Err(err) = event.apply(sink.as_ref()) {
                            log::warn!("midi event rejected: {err}");
                        }
                    }
                },
                sink,
            )
            .map_err(|e| MidiError::Backend(e.to_string()))?;

        Ok(Box::new(MidirMidiInputStream {
            connection: Some(connection),
        }))
    }
}
