use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::mixer;
use crate::registry::Registry;
use ostinato_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use ostinato_ports::control::{LastNote, NoteError, NoteSink, MAX_NOTE};
use ostinato_ports::types::{AudioConfig, DeviceId};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct EngineConfig {
    pub sample_rate_hz: u32,
    /// A held note with no refresh for this long is dropped by the sweeper.
    pub release_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            release_timeout: Duration::from_millis(300),
        }
    }
}

/// The synthesizer core: held-note registry, additive sine mixer and
/// auto-release sweeper behind one lock, plus the stream lifecycle.
///
/// Producer threads mutate notes through [`NoteSink`]; the audio thread calls
/// [`SynthEngine::render_block_at`] once per block. Every instance is
/// self-contained, so tests run as many engines as they like side by side.
pub struct SynthEngine {
    config: EngineConfig,
    inner: Mutex<Registry>,
    metrics: EngineMetrics,
    running: AtomicBool,
    stream: Mutex<Option<Box<dyn AudioStreamHandle>>>,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Registry::new()),
            metrics: EngineMetrics::default(),
            running: AtomicBool::new(false),
            stream: Mutex::new(None),
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// `note_on` with an explicit clock, for drivers and tests that control
    /// time. The [`NoteSink`] impl delegates here with `Instant::now()`.
    pub fn note_on_at(&self, note: u8, velocity: u8, now: Instant) -> Result<(), NoteError> {
        if note > MAX_NOTE {
            log::warn!("rejected note {note}: out of range");
            return Err(NoteError::InvalidNote(note));
        }
        let freq_hz = mixer::note_to_freq(note);
        {
            let mut registry = self.inner.lock();
            registry.note_on(note, freq_hz, now);
        }
        log::debug!("note on {note} vel {velocity} ({freq_hz:.2} Hz)");
        Ok(())
    }

    pub fn query_last_note(&self) -> Option<LastNote> {
        self.inner.lock().last_note()
    }

    /// Currently sounding notes, ascending.
    pub fn held_notes(&self) -> Vec<u8> {
        self.inner.lock().held_notes()
    }

    pub fn phase_of(&self, note: u8) -> Option<f64> {
        self.inner.lock().phase_of(note)
    }

    /// One mixing pass: sweep expired notes, add every held note's sine block,
    /// clip. Lock acquisition is bounded by the block period; on timeout the
    /// block stays silent and a counter records the miss, so the audio thread
    /// never waits past its deadline.
    pub fn render_block_at(&self, out: &mut [f32], now: Instant) {
        out.fill(0.0);
        if out.is_empty() {
            return;
        }
        let started = Instant::now();
        let period =
            Duration::from_secs_f64(out.len() as f64 / self.config.sample_rate_hz as f64);

        let evicted = match self.inner.try_lock_for(period) {
            Some(mut registry) => {
                let evicted = registry.sweep_expired(now, self.config.release_timeout);
                let sample_rate_hz = self.config.sample_rate_hz as f64;
                for (note, state) in registry.states_mut() {
                    mixer::mix_note(note, state, out, sample_rate_hz);
                }
                evicted
            }
            None => {
                self.metrics.record_lock_timeout();
                return;
            }
        };

        mixer::clip(out);
        self.metrics.record_block(evicted, started.elapsed() > period);
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Opens the output stream with this engine as the render callback.
    /// Starting while already running is a no-op, observable via
    /// [`SynthEngine::is_running`]. Takes the engine by `Arc` because the
    /// stream callback keeps a handle for the life of the stream.
    pub fn start(
        self: Arc<Self>,
        port: &dyn AudioOutputPort,
        device_id: &DeviceId,
        config: AudioConfig,
    ) -> Result<(), AudioError> {
        if config.sample_rate_hz != self.config.sample_rate_hz {
            return Err(AudioError::UnsupportedConfig(format!(
                "engine mixes at {} Hz, stream asked for {} Hz",
                self.config.sample_rate_hz, config.sample_rate_hz
            )));
        }

        let mut stream = self.stream.lock();
        if stream.is_some() {
            log::debug!("engine already running");
            return Ok(());
        }
        let cb = Box::new(EngineCallback {
            engine: Arc::clone(&self),
        });
        let handle = port.open_output(device_id, config, cb)?;
        *stream = Some(handle);
        self.running.store(true, Ordering::SeqCst);
        log::info!("engine started on {device_id}");
        Ok(())
    }

    /// Signals the stream thread and joins it; it exits within one callback
    /// period. Safe to call repeatedly or without a prior start.
    pub fn shutdown(&self) {
        let handle = self.stream.lock().take();
        if let Some(handle) = handle {
            handle.close();
        }
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl NoteSink for SynthEngine {
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), NoteError> {
        self.note_on_at(note, velocity, Instant::now())
    }

    fn note_off(&self, note: u8) {
        let released = self.inner.lock().note_off(note);
        if released {
            log::debug!("note off {note}");
        }
    }
}

struct EngineCallback {
    engine: Arc<SynthEngine>,
}

impl AudioRenderCallback for EngineCallback {
    fn render(&mut self, out: &mut [f32]) {
        self.engine.render_block_at(out, Instant::now());
    }
}
