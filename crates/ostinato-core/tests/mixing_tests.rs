use ostinato_core::{clip, note_to_freq, EngineConfig, SynthEngine};
use pretty_assertions::assert_eq;
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

const SAMPLE_RATE: u32 = 44_100;
const BLOCK: usize = 512;

fn engine() -> SynthEngine {
    SynthEngine::new(EngineConfig {
        sample_rate_hz: SAMPLE_RATE,
        release_timeout: Duration::from_millis(300),
    })
}

fn render(engine: &SynthEngine, now: Instant) -> Vec<f32> {
    let mut out = vec![0.0f32; BLOCK];
    engine.render_block_at(&mut out, now);
    out
}

fn phase_step(note: u8) -> f64 {
    TAU * note_to_freq(note) / SAMPLE_RATE as f64
}

#[test]
fn silence_when_no_notes_are_held() {
    let engine = engine();
    let out = render(&engine, Instant::now());
    assert!(out.iter().all(|s| *s == 0.0));
}

#[test]
fn phase_advances_exactly_one_block_per_render() {
    let engine = engine();
    let t0 = Instant::now();
    engine.note_on_at(69, 100, t0).expect("valid note should be accepted");
    assert_eq!(engine.phase_of(69), Some(0.0));

    render(&engine, t0);
    let phase_1 = engine.phase_of(69).expect("note should still be held");
    let step = phase_step(69);
    assert!((phase_1 - (step * BLOCK as f64) % TAU).abs() < 1e-9);

    render(&engine, t0);
    let phase_2 = engine.phase_of(69).expect("note should still be held");
    assert!((phase_2 - (phase_1 + step * BLOCK as f64) % TAU).abs() < 1e-9);
}

#[test]
fn retrigger_preserves_the_running_phase() {
    let engine = engine();
    let t0 = Instant::now();
    engine.note_on_at(69, 100, t0).expect("valid note should be accepted");

    render(&engine, t0);
    let running = engine.phase_of(69).expect("note should still be held");
    assert_ne!(running, 0.0);

    // A re-trigger refreshes the release clock and nothing else.
    engine
        .note_on_at(69, 100, t0 + Duration::from_millis(100))
        .expect("valid note should be accepted");
    assert_eq!(engine.phase_of(69), Some(running));
}

#[test]
fn held_note_waveform_is_continuous_across_blocks() {
    let engine = engine();
    let t0 = Instant::now();
    engine.note_on_at(69, 100, t0).expect("valid note should be accepted");

    let mut stream = render(&engine, t0);
    stream.extend(render(&engine, t0));

    let step = phase_step(69);
    for (k, sample) in stream.iter().enumerate() {
        let expected = (step * k as f64).sin() as f32;
        assert!(
            (sample - expected).abs() < 1e-5,
            "discontinuity at sample {k}: {sample} vs {expected}"
        );
    }
}

#[test]
fn single_note_reaches_unit_amplitude() {
    let engine = engine();
    let t0 = Instant::now();
    engine.note_on_at(69, 100, t0).expect("valid note should be accepted");

    let out = render(&engine, t0);
    let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!(peak > 0.99 && peak <= 1.0, "peak was {peak}");
}

#[test]
fn velocity_does_not_shape_amplitude() {
    let quiet = engine();
    let loud = engine();
    let t0 = Instant::now();
    quiet.note_on_at(60, 1, t0).expect("valid note should be accepted");
    loud.note_on_at(60, 127, t0).expect("valid note should be accepted");

    assert_eq!(render(&quiet, t0), render(&loud, t0));
}

#[test]
fn two_notes_sum_sample_wise_then_clip() {
    let engine = engine();
    let t0 = Instant::now();
    engine.note_on_at(60, 100, t0).expect("valid note should be accepted");
    engine.note_on_at(64, 100, t0).expect("valid note should be accepted");

    let out = render(&engine, t0);
    let step_60 = phase_step(60);
    let step_64 = phase_step(64);
    for (t, sample) in out.iter().enumerate() {
        let expected = ((step_60 * t as f64).sin() as f32 + (step_64 * t as f64).sin() as f32)
            .clamp(-1.0, 1.0);
        assert!(
            (sample - expected).abs() < 1e-6,
            "mismatch at sample {t}: {sample} vs {expected}"
        );
    }
}

#[test]
fn dense_chord_is_clipped_within_bounds() {
    let engine = engine();
    let t0 = Instant::now();
    for note in 60..76u8 {
        engine.note_on_at(note, 100, t0).expect("valid note should be accepted");
    }

    let out = render(&engine, t0);
    assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    // Sixteen unit sines must saturate somewhere in the block.
    assert!(out.iter().any(|s| s.abs() == 1.0));
}

#[test]
fn clip_saturates_out_of_range_samples() {
    let mut samples = [2.5f32, -3.0, 0.5, 1.0, -1.0];
    clip(&mut samples);
    assert_eq!(samples, [1.0, -1.0, 0.5, 1.0, -1.0]);
}

#[test]
fn empty_output_buffer_is_ignored() {
    let engine = engine();
    let t0 = Instant::now();
    engine.note_on_at(60, 100, t0).expect("valid note should be accepted");
    let mut out: Vec<f32> = Vec::new();
    engine.render_block_at(&mut out, t0);
    assert_eq!(engine.metrics().blocks_rendered, 0);
}

#[test]
fn blocks_and_evictions_are_counted() {
    let engine = engine();
    let timeout = engine.config().release_timeout;
    let t0 = Instant::now();
    engine.note_on_at(60, 100, t0).expect("valid note should be accepted");
    engine.note_on_at(64, 100, t0).expect("valid note should be accepted");

    render(&engine, t0);
    render(&engine, t0 + timeout + Duration::from_millis(1));

    let metrics = engine.metrics();
    assert_eq!(metrics.blocks_rendered, 2);
    assert_eq!(metrics.auto_released, 2);
    assert_eq!(metrics.lock_timeouts, 0);
}
