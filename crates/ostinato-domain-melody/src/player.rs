use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ostinato_ports::NoteSink;

use crate::model::{Melody, Step};

/// Velocity stamped on every played note. The sink may ignore it.
pub const MELODY_VELOCITY: u8 = 100;

/// Plays a melody into a note sink from a background thread.
///
/// Each step presses its note, holds it for the step duration, then
/// releases it before the next step starts. Rests hold silence for the
/// same duration. [`MelodyPlayer::stop`] interrupts mid-step and releases
/// whatever is sounding.
pub struct MelodyPlayer {
    stop_tx: Sender<()>,
    player_thread: Option<JoinHandle<()>>,
}

impl MelodyPlayer {
    pub fn spawn(melody: Melody, sink: Arc<dyn NoteSink>, repeat: bool) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let player_thread = thread::spawn(move || play_loop(melody, sink, stop_rx, repeat));
        Self {
            stop_tx,
            player_thread: Some(player_thread),
        }
    }

    /// True once the player thread has exited, either by finishing the
    /// melody or by being stopped.
    pub fn is_finished(&self) -> bool {
        self.player_thread
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Stops playback and waits for the player thread to exit.
    pub fn stop(self) {}
}

impl Drop for MelodyPlayer {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.player_thread.take() {
            let _ = handle.join();
        }
    }
}

fn play_loop(melody: Melody, sink: Arc<dyn NoteSink>, stop_rx: Receiver<()>, repeat: bool) {
    log::info!(
        "playing {:?} ({} steps{})",
        melody.name,
        melody.steps.len(),
        if repeat { ", repeating" } else { "" }
    );
    loop {
        for step in &melody.steps {
            if !play_step(step, sink.as_ref(), &stop_rx) {
                log::debug!("melody {:?} stopped", melody.name);
                return;
            }
        }
        if !repeat {
            break;
        }
    }
    log::debug!("melody {:?} finished", melody.name);
}

/// Returns false when a stop request arrived during the step.
fn play_step(step: &Step, sink: &dyn NoteSink, stop_rx: &Receiver<()>) -> bool {
    let held = match step.note {
        Some(note) => match sink.note_on(note, MELODY_VELOCITY) {
            Ok(()) => Some(note),
            Err(err) => {
                log::warn!("skipping melody note: {err}");
                None
            }
        },
        None => None,
    };
    let keep_playing = match stop_rx.recv_timeout(step.duration) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        Err(RecvTimeoutError::Timeout) => true,
    };
    if let Some(note) = held {
        sink.note_off(note);
    }
    keep_playing
}
