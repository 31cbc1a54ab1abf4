//! The instrument seam and patch definitions loaded from `.instr` files.
//!
//! A patch defines the envelope of a plucked note. The controller only sees
//! the [`Instrument`] trait, so it can be driven by the audio engine or by a
//! recording fake in tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Velocity used for every note the fretboard sounds.
pub const VELOCITY: u8 = 100;

/// Loading progress of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed,
}

/// Something that can sound MIDI notes.
pub trait Instrument {
    fn load_state(&self) -> LoadState;

    /// Unpause the output after a user interaction. Idempotent.
    fn resume(&self);

    /// Fire-and-forget note trigger.
    fn start(&self, midi: u8, velocity: u8) -> Result<()>;

    /// Cut every ringing note.
    fn silence(&self) {}

    fn is_ready(&self) -> bool {
        self.load_state() == LoadState::Ready
    }
}

/// Patch definition (envelope parameters).
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Attack time in seconds (0 → peak)
    pub attack: f64,
    /// Decay time in seconds (peak → sustain level)
    pub decay: f64,
    /// Sustain level (0.0..=1.0)
    pub sustain: f64,
    /// Release time in seconds (current level → 0)
    pub release: f64,
    /// Seconds a plucked note is held before its release starts
    pub length: f64,
    /// Output gain per voice (0.0..=1.0)
    pub gain: f64,
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.3,
            sustain: 0.5,
            release: 0.3,
            length: 0.6,
            gain: 0.3,
        }
    }
}

impl Patch {
    /// Convert to the synth's envelope type (used when creating the audio engine).
    pub fn to_adsr(&self) -> crate::synth::Adsr {
        crate::synth::Adsr {
            attack: self.attack,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
            length: self.length,
        }
    }
}

/// Parse a single "key: value" line. Returns (key, value) or None.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let colon = trimmed.find(':')?;
    let key = trimmed[..colon].trim();
    let value = trimmed[colon + 1..].trim();
    Some((key, value))
}

/// Parse the contents of a `.instr` file.
///
/// Format (one per line, optional comments with #):
/// ```text
/// # envelope (times in seconds, sustain and gain 0..1)
/// attack: 0.005
/// decay: 0.3
/// sustain: 0.5
/// release: 0.3
/// length: 0.6
/// gain: 0.3
/// ```
pub fn parse(content: &str) -> Result<Patch> {
    let mut patch = Patch::default();

    for (line_num, line) in content.lines().enumerate() {
        let (key, raw) = match parse_line(line) {
            Some(p) => p,
            None => continue,
        };
        let value = raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).ok_or_else(|| {
            Error::Patch {
                line: line_num + 1,
                message: format!("invalid value '{}' for '{}'", raw, key),
            }
        })?;
        match key {
            "attack" => patch.attack = value,
            "decay" => patch.decay = value,
            "sustain" => patch.sustain = value.clamp(0.0, 1.0),
            "release" => patch.release = value,
            "length" => patch.length = value,
            "gain" => patch.gain = value.clamp(0.0, 1.0),
            _ => {
                return Err(Error::Patch {
                    line: line_num + 1,
                    message: format!("unknown key '{}'", key),
                });
            }
        }
    }

    Ok(patch)
}

/// Load a patch from a `.instr` file.
pub fn load(path: &Path) -> Result<Patch> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let patch = parse(&content)?;
    log::debug!("loaded patch {}: {:?}", path.display(), patch);
    Ok(patch)
}

/// `<config dir>/bassboard/bass.instr`
pub fn default_patch_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bassboard").join("bass.instr"))
}

/// Patch from an explicit path, else the user default if it exists, else the
/// built-in patch.
pub fn resolve(explicit: Option<&Path>) -> Result<Patch> {
    if let Some(path) = explicit {
        return load(path);
    }
    match default_patch_path() {
        Some(path) if path.exists() => load(&path),
        _ => Ok(Patch::default()),
    }
}
