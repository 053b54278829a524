use ostinato_ports::control::{NoteError, NoteEvent, NoteSink, MAX_NOTE};
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Bounded SPSC lane between producers and the engine: the producer side is a
/// [`NoteSink`] that never blocks (a full queue drops the event and counts
/// it), and a pump thread drains events into the real sink at its own pace.
pub struct NoteQueue {
    sink: Arc<QueueSink>,
    stop_tx: Sender<()>,
    pump: Option<JoinHandle<()>>,
}

struct QueueSink {
    producer: Mutex<Producer<NoteEvent>>,
    dropped: AtomicU64,
}

impl QueueSink {
    fn push(&self, event: NoteEvent) {
        let pushed = self.producer.lock().push(event).is_ok();
        if !pushed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            log::warn!("note queue full, dropped {event:?}");
        }
    }
}

impl NoteSink for QueueSink {
    fn note_on(&self, note: u8, velocity: u8) -> Result<(), NoteError> {
        if note > MAX_NOTE {
            return Err(NoteError::InvalidNote(note));
        }
        self.push(NoteEvent::NoteOn { note, velocity });
        Ok(())
    }

    fn note_off(&self, note: u8) {
        self.push(NoteEvent::NoteOff { note });
    }
}

impl NoteQueue {
    pub fn spawn(capacity: usize, target: Arc<dyn NoteSink>) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        let (stop_tx, stop_rx) = mpsc::channel();
        let pump = thread::spawn(move || pump_loop(consumer, target, stop_rx));
        Self {
            sink: Arc::new(QueueSink {
                producer: Mutex::new(producer),
                dropped: AtomicU64::new(0),
            }),
            stop_tx,
            pump: Some(pump),
        }
    }

    /// Clone of the producer-side sink to hand to adapters.
    pub fn sink(&self) -> Arc<dyn NoteSink> {
        self.sink.clone()
    }

    pub fn dropped(&self) -> u64 {
        self.sink.dropped.load(Ordering::Relaxed)
    }

    /// Stops the pump after it drained everything already queued.
    pub fn close(self) {}
}

impl Drop for NoteQueue {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

fn pump_loop(mut consumer: Consumer<NoteEvent>, target: Arc<dyn NoteSink>, stop_rx: Receiver<()>) {
    loop {
        drain(&mut consumer, target.as_ref());
        match stop_rx.recv_timeout(Duration::from_millis(1)) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    drain(&mut consumer, target.as_ref());
}

fn drain(consumer: &mut Consumer<NoteEvent>, target: &dyn NoteSink) {
    while let Ok(event) = consumer.pop() {
        if let Err(err) = event.apply(target) {
            log::warn!("queued event rejected: {err}");
        }
    }
}
