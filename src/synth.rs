use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::instrument::{Instrument, LoadState, Patch};
use crate::note::midi_to_freq;

/// Most voices that ring at once; the oldest is dropped first.
const MAX_VOICES: usize = 16;

const LOADING: u8 = 0;
const READY: u8 = 1;
const FAILED: u8 = 2;

/// A command sent to the audio engine thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveCommand {
    /// Pluck a note; it rings for the patch length and then releases
    NoteOn { midi: u8, velocity: u8 },
    /// Silence every ringing voice
    AllNotesOff,
    /// Start the (initially paused) output stream
    Resume,
    /// Stop the engine thread
    Shutdown,
}

/// A command sent from the engine thread into the audio callback
enum VoiceCommand {
    NoteOn { freq: f64, amp: f64 },
    AllOff,
}

/// Envelope of a plucked note, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    /// Time from note-on to the start of the release
    pub length: f64,
}

impl Adsr {
    /// Level while the note is held.
    fn held_level(&self, t: f64) -> f64 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            1.0 - (1.0 - self.sustain) * (t - self.attack) / self.decay
        } else {
            self.sustain
        }
    }

    /// Envelope level `t` seconds after note-on.
    pub fn level(&self, t: f64) -> f64 {
        if t < self.length {
            return self.held_level(t);
        }
        let since_release = t - self.length;
        if since_release >= self.release {
            return 0.0;
        }
        self.held_level(self.length) * (1.0 - since_release / self.release)
    }

    /// Total time a voice rings.
    pub fn duration(&self) -> f64 {
        self.length + self.release
    }
}

struct Voice {
    freq: f64,
    amp: f64,
    phase: f64,
    elapsed: f64,
}

/// Polyphonic voice state owned by the audio callback.
struct VoiceBank {
    adsr: Adsr,
    gain: f64,
    sample_rate: f64,
    voices: Vec<Voice>,
}

impl VoiceBank {
    fn new(patch: &Patch, sample_rate: f64) -> Self {
        Self {
            adsr: patch.to_adsr(),
            gain: patch.gain,
            sample_rate,
            voices: Vec::with_capacity(MAX_VOICES),
        }
    }

    fn apply(&mut self, cmd: VoiceCommand) {
        match cmd {
            VoiceCommand::NoteOn { freq, amp } => {
                if self.voices.len() >= MAX_VOICES {
                    self.voices.remove(0);
                }
                self.voices.push(Voice {
                    freq,
                    amp,
                    phase: 0.0,
                    elapsed: 0.0,
                });
            }
            VoiceCommand::AllOff => self.voices.clear(),
        }
    }

    fn next_sample(&mut self) -> f32 {
        let dt = 1.0 / self.sample_rate;
        let mut value = 0.0_f64;
        for voice in &mut self.voices {
            let env = self.adsr.level(voice.elapsed);
            let angle = voice.phase * 2.0 * std::f64::consts::PI;
            // Fundamental plus a touch of the octave for a rounder bass tone
            let wave = angle.sin() + 0.25 * (2.0 * angle).sin();
            value += wave * env * voice.amp * self.gain;
            voice.phase = (voice.phase + voice.freq * dt).fract();
            voice.elapsed += dt;
        }
        let duration = self.adsr.duration();
        self.voices.retain(|v| v.elapsed < duration);
        value.clamp(-1.0, 1.0) as f32
    }
}

/// Handle to the audio engine thread.
///
/// The thread owns the cpal stream. Loading happens in the background;
/// [`Instrument::load_state`] reports progress.
pub struct AudioEngine {
    tx: mpsc::Sender<LiveCommand>,
    state: Arc<AtomicU8>,
    thread: Option<JoinHandle<()>>,
}

impl AudioEngine {
    /// Start loading the default output device. Returns immediately.
    pub fn load(patch: Patch) -> Self {
        let (tx, rx) = mpsc::channel::<LiveCommand>();
        let state = Arc::new(AtomicU8::new(LOADING));
        let thread_state = Arc::clone(&state);

        let spawned = thread::Builder::new()
            .name("bassboard-audio".into())
            .spawn(move || {
                if let Err(e) = run_output(&patch, rx, &thread_state) {
                    log::error!("audio engine stopped: {}", e);
                    thread_state.store(FAILED, Ordering::Release);
                }
            });

        let thread = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("failed to spawn audio thread: {}", e);
                state.store(FAILED, Ordering::Release);
                None
            }
        };

        Self { tx, state, thread }
    }

    pub fn send(&self, cmd: LiveCommand) -> Result<()> {
        self.tx.send(cmd).map_err(|_| Error::Disconnected)
    }

    /// Block until loading settles or `timeout` passes.
    pub fn wait_loaded(&self, timeout: Duration) -> LoadState {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.load_state();
            if state != LoadState::Loading || Instant::now() >= deadline {
                return state;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Instrument for AudioEngine {
    fn load_state(&self) -> LoadState {
        match self.state.load(Ordering::Acquire) {
            READY => LoadState::Ready,
            FAILED => LoadState::Failed,
            _ => LoadState::Loading,
        }
    }

    fn resume(&self) {
        if let Err(e) = self.send(LiveCommand::Resume) {
            log::warn!("resume: {}", e);
        }
    }

    fn start(&self, midi: u8, velocity: u8) -> Result<()> {
        self.send(LiveCommand::NoteOn { midi, velocity })
    }

    fn silence(&self) {
        if let Err(e) = self.send(LiveCommand::AllNotesOff) {
            log::warn!("silence: {}", e);
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        let _ = self.tx.send(LiveCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Body of the engine thread: build the stream, then relay commands until
/// shutdown.
fn run_output(patch: &Patch, rx: mpsc::Receiver<LiveCommand>, state: &AtomicU8) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output audio device available".into()))?;

    let config = device
        .default_output_config()
        .map_err(|e| Error::Audio(format!("failed to get default output config: {}", e)))?;

    let sample_rate = config.sample_rate() as f64;
    let channels = (config.channels() as usize).max(1);

    let (voice_tx, voice_rx) = mpsc::channel::<VoiceCommand>();
    let mut bank = VoiceBank::new(patch, sample_rate);

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                // Check for new commands (non-blocking)
                while let Ok(cmd) = voice_rx.try_recv() {
                    bank.apply(cmd);
                }
                for frame in data.chunks_mut(channels) {
                    let value = bank.next_sample();
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            move |err| {
                log::error!("audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| Error::Audio(format!("failed to build output stream: {}", e)))?;

    // Some backends start streams eagerly; stay silent until resumed.
    if let Err(e) = stream.pause() {
        log::debug!("stream pause unsupported: {}", e);
    }

    state.store(READY, Ordering::Release);
    log::info!("audio ready: {} Hz, {} channel(s)", sample_rate, channels);

    let mut resumed = false;
    for cmd in rx {
        match cmd {
            LiveCommand::Resume => {
                if !resumed {
                    stream
                        .play()
                        .map_err(|e| Error::Audio(format!("failed to play stream: {}", e)))?;
                    resumed = true;
                    log::debug!("audio output resumed");
                }
            }
            LiveCommand::NoteOn { midi, velocity } => {
                voice_tx
                    .send(VoiceCommand::NoteOn {
                        freq: midi_to_freq(midi),
                        amp: velocity.min(127) as f64 / 127.0,
                    })
                    .map_err(|_| Error::Disconnected)?;
            }
            LiveCommand::AllNotesOff => {
                voice_tx
                    .send(VoiceCommand::AllOff)
                    .map_err(|_| Error::Disconnected)?;
            }
            LiveCommand::Shutdown => break,
        }
    }

    Ok(())
}
