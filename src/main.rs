//! gran-cassa — render drum compositions to MIDI files or play them live.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gran_cassa::audio::{AudioEngine, AudioSink};
use gran_cassa::config::PlayerConfig;
use gran_cassa::event::{compile, Millis, Timeline};
use gran_cassa::instrument::{default_kit, SampleBank};
use gran_cassa::midi::{MidiOutSink, MidiWriter};
use gran_cassa::model::Composition;
use gran_cassa::playback::{MonotonicClock, PlaybackReport, PlaybackScheduler, Repeat, StopHandle};
use gran_cassa::versioning::versioned_path;
use gran_cassa::Result;

/// How long sample voices may ring after the last pass.
const RELEASE_TAIL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "gran-cassa")]
#[command(about = "Compile drum patterns to MIDI files or play them live")]
#[command(version)]
struct Cli {
    /// Force debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a composition as a Standard MIDI File
    Render {
        /// Composition JSON
        input: PathBuf,

        /// Output .mid path
        output: PathBuf,

        /// Pulses per quarter note (overrides config)
        #[arg(long)]
        ppqn: Option<u16>,

        /// Overwrite the output instead of picking a _vN name
        #[arg(long)]
        no_version: bool,
    },

    /// Play a composition in real time
    Play {
        /// Composition JSON
        input: PathBuf,

        /// Sound bank JSON mapping note numbers to WAV files
        #[arg(long)]
        samples: Option<PathBuf>,

        /// Send to a MIDI output port instead of the audio device
        #[arg(long)]
        midi: bool,

        /// Repeat until Ctrl-C
        #[arg(long = "loop", conflicts_with = "times")]
        looping: bool,

        /// Number of passes
        #[arg(long)]
        times: Option<u32>,
    },

    /// Validate a composition and print its millisecond timeline
    Inspect {
        /// Composition JSON
        input: PathBuf,
    },

    /// Convert a generator-style document with signed pan values
    Import {
        /// Legacy JSON
        input: PathBuf,

        /// Canonical JSON output
        output: PathBuf,

        /// Overwrite the output instead of picking a _vN name
        #[arg(long)]
        no_version: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let (config, malformed) = PlayerConfig::load();
    init_logging(cli.debug, &config.log_level);
    if let Some(err) = malformed {
        warn!(%err, "ignoring config file, using defaults");
    }

    if let Err(err) = run(cli.command, &config) {
        error!(%err, "command failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(debug: bool, default_level: &str) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands, config: &PlayerConfig) -> Result<()> {
    match command {
        Commands::Render {
            input,
            output,
            ppqn,
            no_version,
        } => {
            let composition = read_composition(&input)?;
            let path = output_path(output, no_version);
            MidiWriter::new(ppqn.unwrap_or(config.ppqn)).write(&composition, &path)?;
            println!("wrote {}", path.display());
        }

        Commands::Play {
            input,
            samples,
            midi,
            looping,
            times,
        } => {
            let composition = read_composition(&input)?;
            let repeat = match (looping, times) {
                (true, _) => Repeat::Forever,
                (false, Some(n)) => Repeat::Times(n),
                (false, None) => Repeat::Once,
            };
            play(&composition, samples, midi, repeat, config)?;
        }

        Commands::Inspect { input } => {
            let composition = read_composition(&input)?;
            let timeline = compile(&composition, &Millis::from(composition.config()))?;
            print_timeline(&composition, &timeline);
        }

        Commands::Import {
            input,
            output,
            no_version,
        } => {
            let composition = Composition::from_legacy_json(&fs::read_to_string(&input)?)?;
            composition.validate()?;
            let path = output_path(output, no_version);
            fs::write(&path, composition.to_json()?)?;
            info!(path = %path.display(), patterns = composition.patterns().len(), "imported composition");
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn read_composition(path: &Path) -> Result<Composition> {
    Composition::from_json(&fs::read_to_string(path)?)
}

fn output_path(path: PathBuf, no_version: bool) -> PathBuf {
    if no_version {
        path
    } else {
        versioned_path(path)
    }
}

fn play(
    composition: &Composition,
    samples: Option<PathBuf>,
    midi: bool,
    repeat: Repeat,
    config: &PlayerConfig,
) -> Result<()> {
    let timeline = compile(composition, &Millis::from(composition.config()))?;

    let stop = StopHandle::new();
    let on_interrupt = stop.clone();
    if let Err(err) = ctrlc::set_handler(move || on_interrupt.stop()) {
        warn!(%err, "could not install Ctrl-C handler");
    }
    let mut scheduler = PlaybackScheduler::new(MonotonicClock::new(), config.poll_slice(), stop);

    let report = if midi {
        let mut sink = MidiOutSink::connect(config.midi_device.as_deref())?;
        println!("playing to MIDI port '{}' (Ctrl-C to stop)", sink.port_name());
        scheduler.run(&timeline, &mut sink, repeat)
    } else {
        let engine = AudioEngine::new()?;
        let sample_rate = engine.sample_rate();
        let bank = match samples.or_else(|| config.sound_bank.clone()) {
            Some(path) => SampleBank::load(path, sample_rate)?,
            None => default_kit(sample_rate, config.seed),
        };
        warn_unbound_notes(composition, &bank);

        println!(
            "playing at {} BPM, {sample_rate} Hz (Ctrl-C to stop)",
            composition.config().bpm
        );
        let mut sink = AudioSink::new(engine, Arc::new(bank));
        let report = scheduler.run(&timeline, &mut sink, repeat);
        if report.stopped {
            sink.cut();
        } else {
            thread::sleep(RELEASE_TAIL);
        }
        report
    };

    print_report(&report);
    Ok(())
}

fn warn_unbound_notes(composition: &Composition, bank: &SampleBank) {
    for pattern in composition.patterns() {
        if !bank.contains(pattern.note) {
            warn!(
                note = pattern.note,
                pattern = %pattern.name,
                "no sound bound to note; its hits will be silent"
            );
        }
    }
}

fn print_timeline(composition: &Composition, timeline: &Timeline<f64>) {
    let config = composition.config();
    println!(
        "{} BPM, {}/{}, {} patterns, {} events, {:.2} ms",
        config.bpm,
        config.time_signature.0,
        config.time_signature.1,
        composition.patterns().len(),
        timeline.len(),
        timeline.span()
    );
    for event in timeline {
        let name = composition
            .patterns()
            .get(event.pattern)
            .map(|p| p.name.as_str())
            .unwrap_or_default();
        println!(
            "{:>10.2} ms  ch {:>2}  note {:>3}  vel {:>3}  pan {:>3}  {name}",
            event.offset, event.channel, event.note, event.velocity, event.pan
        );
    }
}

fn print_report(report: &PlaybackReport) {
    println!(
        "{} passes, {} hits played, {} without a sound, {} dropped, worst lateness {:.2} ms{}",
        report.passes,
        report.fired,
        report.missing,
        report.dropped,
        report.max_lateness.as_secs_f64() * 1000.0,
        if report.stopped { " (stopped)" } else { "" }
    );
}
