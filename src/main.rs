mod controller;
mod error;
mod fretboard;
mod grid;
mod instrument;
mod note;
mod repl;
mod scale;
mod scheduler;
mod synth;

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use controller::Controller;
use fretboard::{FRET_COUNT, STRINGS};
use instrument::{Instrument, LoadState};
use scale::{Key, ScaleType};
use scheduler::ScaleRun;

/// How long `scale` waits for the audio device
const LOAD_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "bassboard", about = "5-string bass fretboard with scale playback")]
#[command(version)]
struct Cli {
    /// Write debug output to the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the fretboard with the note name of every fret
    Show,

    /// Play a scale along one string
    Scale {
        /// String to play on (G, D, A, E or B)
        #[arg(long, value_parser = fretboard::parse_string)]
        string: usize,

        /// Key of the scale (C, C#, D, ... G#/Ab, A, A#, B)
        #[arg(long, value_parser = scale::parse_key, default_value = "C")]
        key: Key,

        #[arg(long, value_enum, default_value_t = ScaleType::Major)]
        scale: ScaleType,

        /// Hold between notes in milliseconds
        #[arg(long, default_value_t = scheduler::DEFAULT_HOLD.as_millis() as u64)]
        hold_ms: u64,

        /// Path to a .instr patch file
        #[arg(long)]
        instrument: Option<PathBuf>,

        /// Only print the sequence
        #[arg(long)]
        silent: bool,
    },

    /// Interactive fretboard in the terminal
    Live {
        #[arg(long, value_parser = scale::parse_key, default_value = "C")]
        key: Key,

        #[arg(long, value_enum, default_value_t = ScaleType::Major)]
        scale: ScaleType,

        /// Hold between notes in milliseconds
        #[arg(long, default_value_t = scheduler::DEFAULT_HOLD.as_millis() as u64)]
        hold_ms: u64,

        /// Path to a .instr patch file
        #[arg(long)]
        instrument: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Show => {
            for line in grid::plain_lines(&grid::layout(&grid::Highlights::default())) {
                println!("{}", line);
            }
        }
        Command::Scale {
            string,
            key,
            scale,
            hold_ms,
            instrument,
            silent,
        } => {
            let hold = Duration::from_millis(hold_ms);
            if let Err(e) = play_scale(string, key, scale, hold, instrument.as_deref(), silent) {
                eprintln!("Playback error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Live {
            key,
            scale,
            hold_ms,
            instrument,
        } => {
            let patch = load_patch(instrument.as_deref());
            let engine = synth::AudioEngine::load(patch);
            let mut controller = Controller::new(engine, Duration::from_millis(hold_ms));
            controller.set_key(key);
            controller.set_scale_type(scale);
            if let Err(e) = repl::run(&mut controller) {
                eprintln!("Live mode error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bassboard")
        .join("bassboard.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("warning: no log file at {}: {}", log_path.display(), e);
            return;
        }
    };

    if WriteLogger::init(log_level, Config::default(), log_file).is_err() {
        eprintln!("warning: logger already initialized");
        return;
    }

    log::info!("bassboard starting (log level: {:?})", log_level);
}

fn load_patch(path: Option<&Path>) -> instrument::Patch {
    instrument::resolve(path).unwrap_or_else(|e| {
        eprintln!("Error loading instrument: {}", e);
        std::process::exit(1);
    })
}

fn play_scale(
    string: usize,
    key: Key,
    scale: ScaleType,
    hold: Duration,
    patch_path: Option<&Path>,
    silent: bool,
) -> error::Result<()> {
    let bass_string = STRINGS[string];
    let Some(steps) = scale::scale_steps(string, bass_string, key, scale, FRET_COUNT) else {
        return Err(error::Error::Audio(format!(
            "no {} on the {} string",
            key.label(),
            bass_string.name
        )));
    };

    println!(
        "{} {} on the {} string (root fret {})",
        key.label(),
        scale.name(),
        bass_string.name,
        steps[0].fret
    );
    println!();

    let marks: BTreeSet<(usize, u8)> = steps
        .iter()
        .filter(|s| s.fret <= FRET_COUNT)
        .map(|s| (s.string, s.fret))
        .collect();
    let highlights = grid::Highlights {
        selected: Some(string),
        marks: Some(&marks),
        ..grid::Highlights::default()
    };
    for line in grid::plain_lines(&grid::layout(&highlights)) {
        println!("{}", line);
    }
    println!();

    let run = ScaleRun::new(steps, hold, Instant::now());
    for (offset, step) in run.timeline() {
        println!(
            "  {:>5} ms  fret {:>2}  {:<4} (MIDI {})",
            offset.as_millis(),
            step.fret,
            note::note_name(step.midi as i32),
            step.midi
        );
    }

    if silent {
        return Ok(());
    }
    println!();

    let patch = load_patch(patch_path);
    let ring_out = Duration::from_secs_f64(patch.to_adsr().duration());
    let engine = synth::AudioEngine::load(patch);
    match engine.wait_loaded(LOAD_TIMEOUT) {
        LoadState::Ready => {}
        LoadState::Loading => return Err(error::Error::Audio("timed out opening audio device".into())),
        LoadState::Failed => return Err(error::Error::Audio("could not open audio device (see log)".into())),
    }

    let mut controller = Controller::new(engine, hold);
    controller.set_key(key);
    controller.set_scale_type(scale);
    controller.click_string(string);

    if !controller.play_scale(Instant::now()) {
        return Err(error::Error::Audio("instrument refused playback".into()));
    }
    if let Some((_, fret)) = controller.playing_cell() {
        println!("  Playing fret {}", fret);
    }

    while let Some(deadline) = controller.next_deadline() {
        thread::sleep(deadline.saturating_duration_since(Instant::now()));
        if let Some(step) = controller.tick(Instant::now()) {
            println!("  Playing fret {}", step.fret);
        }
    }

    // Let the last note ring out
    thread::sleep(ring_out);
    if !controller.instrument().is_ready() {
        log::warn!("audio engine stopped during playback");
    }

    Ok(())
}
