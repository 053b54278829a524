use crate::registry::NoteState;
use std::f64::consts::TAU;

/// Equal temperament, A4 = MIDI 69 = 440 Hz.
pub fn note_to_freq(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Adds one block of this note's sine wave into `out` and advances the phase
/// by exactly one block, so consecutive blocks join without discontinuity.
pub(crate) fn mix_note(note: u8, state: &mut NoteState, out: &mut [f32], sample_rate_hz: f64) {
    let freq = note_to_freq(note);
    let step = TAU * freq / sample_rate_hz;
    for (t, sample) in out.iter_mut().enumerate() {
        *sample += (state.phase + step * t as f64).sin() as f32;
    }
    state.phase = (state.phase + step * out.len() as f64) % TAU;
}

/// Sample-wise saturation of the summed buffer to [-1, 1]. Heavy polyphony
/// distorts rather than overflows.
pub fn clip(out: &mut [f32]) {
    for sample in out.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
}
