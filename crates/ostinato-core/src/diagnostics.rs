use crate::engine::EngineConfig;
use crate::metrics::MetricsSnapshot;
use ostinato_ports::types::{AudioOutputDevice, MidiInputDevice};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum DiagnosticsError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serde error: {0}")]
    Serde(String),
}

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct DeviceSnapshot {
    audio_outputs: Vec<AudioOutputDevice>,
    midi_inputs: Vec<MidiInputDevice>,
}

/// Dumps engine state as pretty JSON files for bug reports: platform, engine
/// config, visible devices, render counters.
pub fn export_diagnostics(
    dir: &Path,
    config: &EngineConfig,
    audio_outputs: Vec<AudioOutputDevice>,
    midi_inputs: Vec<MidiInputDevice>,
    metrics: &MetricsSnapshot,
) -> Result<(), DiagnosticsError> {
    fs::create_dir_all(dir).map_err(|e| DiagnosticsError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "ostinato".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let platform = PlatformInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    };

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("platform.json"), &platform)?;
    write_json(&dir.join("engine_config.json"), config)?;
    write_json(
        &dir.join("device_snapshot.json"),
        &DeviceSnapshot {
            audio_outputs,
            midi_inputs,
        },
    )?;
    write_json(&dir.join("metrics.json"), metrics)?;

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DiagnosticsError> {
    let data =
        serde_json::to_vec_pretty(value).map_err(|e| DiagnosticsError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| DiagnosticsError::Io(e.to_string()))
}
