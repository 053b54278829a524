//! Line-protocol bridge for serial note sources.
//!
//! Controllers that cannot speak MIDI send one ASCII command per line,
//! `ON:<note>` or `OFF:<note>`, over a serial link. [`parse_line`] maps a
//! single line to a [`NoteEvent`]; [`LineBridge`] pumps lines from any
//! [`io::Read`] into a [`NoteSink`], discarding malformed input with a
//! warning so one garbled line never takes the feed down.

use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ostinato_ports::{NoteEvent, NoteSink, MAX_NOTE};

/// Velocity stamped on `ON` commands. The wire format carries none.
pub const LINE_VELOCITY: u8 = 100;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("missing ':' separator")]
    MissingSeparator,
    #[error("unknown action: {0:?}")]
    UnknownAction(String),
    #[error("bad value: {0:?}")]
    BadValue(String),
    #[error("note out of range: {0}")]
    NoteOutOfRange(u32),
}

/// Parses one protocol line into a note event.
///
/// Leading and trailing whitespace is ignored, including the `\r` left by
/// CRLF line endings, and whitespace around the `:` is tolerated. Actions
/// are case-sensitive: only `ON` and `OFF` are recognized.
pub fn parse_line(line: &str) -> Result<NoteEvent, LineError> {
    let line = line.trim();
    let (action, value) = line.split_once(':').ok_or(LineError::MissingSeparator)?;
    let action = action.trim();
    let value = value.trim();
    let number: u32 = value
        .parse()
        .map_err(|_| LineError::BadValue(value.to_string()))?;
    if number > MAX_NOTE as u32 {
        return Err(LineError::NoteOutOfRange(number));
    }
    let note = number as u8;
    match action {
        "ON" => Ok(NoteEvent::NoteOn {
            note,
            velocity: LINE_VELOCITY,
        }),
        "OFF" => Ok(NoteEvent::NoteOff { note }),
        other => Err(LineError::UnknownAction(other.to_string())),
    }
}

/// Background reader that feeds protocol lines into a note sink.
///
/// The reader should be opened with a read timeout: timeouts surface as
/// `TimedOut`/`WouldBlock` and become poll ticks, which is what lets
/// [`LineBridge::close`] interrupt an otherwise idle line.
pub struct LineBridge {
    stop: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
}

impl LineBridge {
    /// Spawns the reader thread over `reader`.
    pub fn spawn<R>(reader: R, sink: Arc<dyn NoteSink>) -> Self
    where
        R: io::Read + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let reader_thread = thread::spawn(move || {
            read_loop(BufReader::new(reader), sink, stop_flag);
        });
        Self {
            stop,
            reader_thread: Some(reader_thread),
        }
    }

    /// True once the reader thread has exited, for instance at EOF.
    pub fn is_finished(&self) -> bool {
        self.reader_thread
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Signals the reader thread to stop and waits for it to exit.
    pub fn close(self) {}
}

impl Drop for LineBridge {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
    }
}

fn read_loop<R: BufRead>(mut reader: R, sink: Arc<dyn NoteSink>, stop: Arc<AtomicBool>) {
    let mut line = String::new();
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                handle_line(&line, sink.as_ref());
                line.clear();
            }
            // A timeout can split a line; keep the partial and resume.
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(err) => {
                log::warn!("serial read failed: {err}");
                break;
            }
        }
    }
    log::debug!("serial bridge stopped");
}

fn handle_line(raw: &str, sink: &dyn NoteSink) {
    if raw.trim().is_empty() {
        return;
    }
    match parse_line(raw) {
        Ok(event) => {
            if let Err(err) = event.apply(sink) {
                log::warn!("serial note rejected: {err}");
            }
        }
        Err(err) => log::warn!("discarding serial line {:?}: {err}", raw.trim_end()),
    }
}
