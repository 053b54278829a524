use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MidiInputDevice {
    pub id: DeviceId,
    pub name: String,
    pub is_available: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AudioOutputDevice {
    pub id: DeviceId,
    pub name: String,
    pub default_config: AudioConfig,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub buffer_size_frames: Option<u32>,
}

/// Case-insensitive substring match over listed outputs, first hit wins.
pub fn find_output_matching<'a>(
    devices: &'a [AudioOutputDevice],
    needle: &str,
) -> Option<&'a AudioOutputDevice> {
    let needle = needle.to_lowercase();
    devices
        .iter()
        .find(|d| d.name.to_lowercase().contains(&needle))
}

pub fn find_input_matching<'a>(
    devices: &'a [MidiInputDevice],
    needle: &str,
) -> Option<&'a MidiInputDevice> {
    let needle = needle.to_lowercase();
    devices
        .iter()
        .find(|d| d.name.to_lowercase().contains(&needle))
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
