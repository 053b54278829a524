use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use env_logger::{Builder, Env};
use ostinato_core::diagnostics::export_diagnostics;
use ostinato_core::{EngineConfig, NoteQueue, SynthEngine};
use ostinato_domain_melody::{Melody, MelodyPlayer};
use ostinato_infra_audio_cpal::CpalAudioOutputPort;
use ostinato_infra_midi_midir::MidirMidiInputPort;
use ostinato_infra_serial::LineBridge;
use ostinato_ports::{
    find_input_matching, find_output_matching, AudioConfig, AudioOutputPort, MidiInputPort,
    MidiInputStream, NoteSink,
};

const QUEUE_CAPACITY: usize = 256;

struct Options {
    device_filter: String,
    midi_filter: Option<String>,
    play_scale: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Options {
    let mut options = Options {
        device_filter: String::new(),
        midi_filter: None,
        play_scale: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scale" => options.play_scale = true,
            "--midi" => match args.next() {
                Some(name) => options.midi_filter = Some(name),
                None => {
                    eprintln!("--midi needs a device name substring");
                    print_usage();
                    process::exit(2);
                }
            },
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("unknown flag: {other}");
                print_usage();
                process::exit(2);
            }
            other => options.device_filter = other.to_string(),
        }
    }
    options
}

fn print_usage() {
    eprintln!("usage: ostinato [device-substring] [--midi <name>] [--scale]");
    eprintln!();
    eprintln!("Plays notes from a MIDI input and from stdin lines in the form");
    eprintln!("ON:<note> / OFF:<note>. The positional argument picks the audio");
    eprintln!("output by name substring; --midi picks the MIDI input the same");
    eprintln!("way, defaulting to the first one available; --scale plays a");
    eprintln!("C major scale on startup.");
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let options = parse_args(env::args().skip(1));

    let engine_config = EngineConfig::default();
    let engine = Arc::new(SynthEngine::new(engine_config));

    let audio_port = CpalAudioOutputPort::new();
    let outputs = match audio_port.list_outputs() {
        Ok(outputs) => outputs,
        Err(err) => {
            log::error!("failed to enumerate audio outputs: {err}");
            process::exit(1);
        }
    };
    for device in &outputs {
        log::info!("audio output: {} ({})", device.name, device.id);
    }
    let Some(device) = find_output_matching(&outputs, &options.device_filter) else {
        log::error!("no audio output matching {:?}", options.device_filter);
        process::exit(1);
    };
    let device_id = device.id.clone();
    log::info!("using audio output: {}", device.name);

    let stream_config = AudioConfig {
        sample_rate_hz: engine_config.sample_rate_hz,
        channels: 2,
        buffer_size_frames: None,
    };
    if let Err(err) = engine.clone().start(&audio_port, &device_id, stream_config) {
        log::error!("failed to start audio stream: {err}");
        process::exit(1);
    }

    // Every input funnels through one queue so producers never touch the
    // registry lock directly.
    let queue = NoteQueue::spawn(QUEUE_CAPACITY, engine.clone());

    let midi_port = MidirMidiInputPort::new("Ostinato");
    let midi_stream = attach_midi(&midi_port, queue.sink(), options.midi_filter.as_deref());

    let player = options.play_scale.then(|| {
        MelodyPlayer::spawn(
            Melody::c_major_scale(Duration::from_millis(250)),
            queue.sink(),
            false,
        )
    });

    println!("ostinato is listening: type ON:<note> or OFF:<note>, Ctrl-D quits");
    let bridge = LineBridge::spawn(io::stdin(), queue.sink());
    while !bridge.is_finished() {
        thread::sleep(Duration::from_millis(100));
    }
    bridge.close();

    if let Some(player) = player {
        player.stop();
    }
    if let Some(stream) = midi_stream {
        stream.close();
    }
    let dropped = queue.dropped();
    if dropped > 0 {
        log::warn!("{dropped} control events dropped under load");
    }
    queue.close();
    engine.shutdown();

    let metrics = engine.metrics();
    log::info!(
        "rendered {} blocks ({} deadline misses, {} lock timeouts, {} auto releases)",
        metrics.blocks_rendered,
        metrics.deadline_misses,
        metrics.lock_timeouts,
        metrics.auto_released
    );

    if let Some(dir) = env::var_os("OSTINATO_DIAGNOSTICS_DIR") {
        let dir = PathBuf::from(dir);
        let midi_inputs = midi_port.list_inputs().unwrap_or_default();
        match export_diagnostics(&dir, &engine_config, outputs, midi_inputs, &metrics) {
            Ok(()) => log::info!("diagnostics written to {}", dir.display()),
            Err(err) => log::warn!("diagnostics export failed: {err}"),
        }
    }
}

/// Best-effort MIDI hookup. A machine without MIDI still gets the stdin
/// and melody paths. With no filter the first listed input is used.
fn attach_midi(
    port: &dyn MidiInputPort,
    sink: Arc<dyn NoteSink>,
    filter: Option<&str>,
) -> Option<Box<dyn MidiInputStream>> {
    let inputs = match port.list_inputs() {
        Ok(inputs) => inputs,
        Err(err) => {
            log::warn!("midi unavailable: {err}");
            return None;
        }
    };
    let device = match filter {
        Some(needle) => match find_input_matching(&inputs, needle) {
            Some(device) => device,
            None => {
                log::warn!("no midi input matching {needle:?}");
                return None;
            }
        },
        None => match inputs.first() {
            Some(device) => device,
            None => {
                log::info!("no midi inputs detected");
                return None;
            }
        },
    };
    match port.open_input(&device.id, sink) {
        Ok(stream) => {
            log::info!("midi input attached: {}", device.name);
            Some(stream)
        }
        Err(err) => {
            log::warn!("failed to open midi input {}: {err}", device.name);
            None
        }
    }
}
