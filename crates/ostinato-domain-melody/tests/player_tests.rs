use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ostinato_domain_melody::{Melody, MelodyPlayer, MELODY_VELOCITY};
use ostinato_ports::{NoteError, NoteEvent, NoteSink, MAX_NOTE};
use pretty_assertions::assert_eq;

/// Records the event stream, enforcing the same range check a real
/// engine would.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<NoteEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<NoteEvent> {
        self.events.lock().expect("sink lock").clone()
    }
}

impl NoteSink for RecordingSink {
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), NoteError> {
        if note > MAX_NOTE {
            return Err(NoteError::InvalidNote(note));
        }
        self.events
            .lock()
            .expect("sink lock")
            .push(NoteEvent::NoteOn { note, velocity });
        Ok(())
    }

    fn note_off(&self, note: u8) {
        self.events
            .lock()
            .expect("sink lock")
            .push(NoteEvent::NoteOff { note });
    }
}

fn on(note: u8) -> NoteEvent {
    NoteEvent::NoteOn {
        note,
        velocity: MELODY_VELOCITY,
    }
}

fn off(note: u8) -> NoteEvent {
    NoteEvent::NoteOff { note }
}

fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    check()
}

#[test]
fn plays_steps_in_order_and_releases_each_note() {
    let sink = Arc::new(RecordingSink::default());
    let melody = Melody::from_notes(
        "tune",
        &[Some(60), Some(64), None, Some(67)],
        Duration::from_millis(5),
    );

    let player = MelodyPlayer::spawn(melody, sink.clone(), false);
    assert!(wait_until(Duration::from_secs(5), || player.is_finished()));
    player.stop();

    assert_eq!(
        sink.events(),
        vec![on(60), off(60), on(64), off(64), on(67), off(67)]
    );
}

#[test]
fn out_of_range_notes_are_skipped_not_fatal() {
    let sink = Arc::new(RecordingSink::default());
    let melody = Melody::from_notes("tune", &[Some(200), Some(60)], Duration::from_millis(5));

    let player = MelodyPlayer::spawn(melody, sink.clone(), false);
    assert!(wait_until(Duration::from_secs(5), || player.is_finished()));
    player.stop();

    assert_eq!(sink.events(), vec![on(60), off(60)]);
}

#[test]
fn stop_interrupts_a_long_step_and_releases_the_note() {
    let sink = Arc::new(RecordingSink::default());
    let melody = Melody::from_notes("tune", &[Some(60)], Duration::from_secs(60));

    let player = MelodyPlayer::spawn(melody, sink.clone(), false);
    assert!(wait_until(Duration::from_secs(5), || !sink.events().is_empty()));

    let stop_requested = Instant::now();
    player.stop();
    assert!(stop_requested.elapsed() < Duration::from_secs(5));
    assert_eq!(sink.events(), vec![on(60), off(60)]);
}

#[test]
fn repeat_loops_until_stopped() {
    let sink = Arc::new(RecordingSink::default());
    let melody = Melody::from_notes("tune", &[Some(60)], Duration::from_millis(2));

    let player = MelodyPlayer::spawn(melody, sink.clone(), true);
    assert!(wait_until(Duration::from_secs(5), || sink.events().len() >= 6));
    player.stop();

    let events = sink.events();
    assert!(events.len() >= 6);
    assert_eq!(events.len() % 2, 0);
    for pair in events.chunks(2) {
        assert_eq!(pair, [on(60), off(60)]);
    }
}

#[test]
fn uniform_melody_reports_total_duration() {
    let melody = Melody::from_notes("tune", &[Some(60), None, Some(62)], Duration::from_millis(10));
    assert_eq!(melody.total_duration(), Duration::from_millis(30));
}

#[test]
fn demo_scale_covers_one_octave() {
    let melody = Melody::c_major_scale(Duration::from_millis(150));
    assert_eq!(melody.steps.len(), 9);
    assert_eq!(melody.steps[0].note, Some(60));
    assert_eq!(melody.steps[7].note, Some(72));
    assert_eq!(melody.steps[8].note, None);
}
