//! Keys, scale types and scale construction on a single string.

use crate::fretboard::{BassString, root_fret};

/// Key selector entries. `FFlat` duplicates `E` enharmonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Key {
    #[default]
    C,
    CSharp,
    D,
    DSharp,
    E,
    FFlat,
    F,
    FSharp,
    G,
    GSharpAFlat,
    A,
    ASharp,
    B,
}

impl Key {
    pub const ALL: [Key; 13] = [
        Key::C,
        Key::CSharp,
        Key::D,
        Key::DSharp,
        Key::E,
        Key::FFlat,
        Key::F,
        Key::FSharp,
        Key::G,
        Key::GSharpAFlat,
        Key::A,
        Key::ASharp,
        Key::B,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Key::C => "C",
            Key::CSharp => "C#",
            Key::D => "D",
            Key::DSharp => "D#",
            Key::E => "E",
            Key::FFlat => "Fb",
            Key::F => "F",
            Key::FSharp => "F#",
            Key::G => "G",
            Key::GSharpAFlat => "G#/Ab",
            Key::A => "A",
            Key::ASharp => "A#",
            Key::B => "B",
        }
    }

    pub fn pitch_class(self) -> u8 {
        match self {
            Key::C => 0,
            Key::CSharp => 1,
            Key::D => 2,
            Key::DSharp => 3,
            Key::E | Key::FFlat => 4,
            Key::F => 5,
            Key::FSharp => 6,
            Key::G => 7,
            Key::GSharpAFlat => 8,
            Key::A => 9,
            Key::ASharp => 10,
            Key::B => 11,
        }
    }

    /// Accepts the selector labels plus "G#" and "Ab" on their own.
    pub fn from_label(label: &str) -> Option<Key> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("G#") || label.eq_ignore_ascii_case("Ab") {
            return Some(Key::GSharpAFlat);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.label().eq_ignore_ascii_case(label))
    }

    pub fn next(self) -> Self {
        let i = self.position();
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = self.position();
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|&k| k == self).unwrap_or(0)
    }
}

pub fn parse_key(label: &str) -> Result<Key, String> {
    Key::from_label(label).ok_or_else(|| {
        let labels: Vec<&str> = Key::ALL.iter().map(|k| k.label()).collect();
        format!("unknown key '{}' (expected one of {})", label, labels.join(", "))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScaleType {
    #[default]
    Major,
    Minor,
}

impl ScaleType {
    pub fn name(self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
        }
    }

    /// Semitone offsets from the root, ending on the octave.
    pub fn intervals(self) -> [u8; 8] {
        match self {
            ScaleType::Major => [0, 2, 4, 5, 7, 9, 11, 12],
            ScaleType::Minor => [0, 2, 3, 5, 7, 8, 10, 12],
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            ScaleType::Major => ScaleType::Minor,
            ScaleType::Minor => ScaleType::Major,
        }
    }
}

/// Frets of the scale starting at `root`, in interval order.
pub fn scale_frets(root: u8, scale: ScaleType) -> [u8; 8] {
    scale.intervals().map(|i| root + i)
}

/// One note of a scale run on a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub string: usize,
    pub fret: u8,
    pub midi: u8,
}

/// The full scale run for `key`/`scale` on one string, or `None` when the
/// root cannot be found within `max_fret`.
pub fn scale_steps(
    string: usize,
    bass_string: BassString,
    key: Key,
    scale: ScaleType,
    max_fret: u8,
) -> Option<Vec<Step>> {
    let root = root_fret(bass_string.open, key.pitch_class(), max_fret)?;
    Some(
        scale_frets(root, scale)
            .iter()
            .map(|&fret| Step {
                string,
                fret,
                midi: bass_string.pitch(fret),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fretboard::{FRET_COUNT, STRINGS};

    #[test]
    fn test_major_from_fifth_fret() {
        assert_eq!(scale_frets(5, ScaleType::Major), [5, 7, 9, 10, 12, 14, 16, 17]);
    }

    #[test]
    fn test_minor_from_open() {
        assert_eq!(scale_frets(0, ScaleType::Minor), [0, 2, 3, 5, 7, 8, 10, 12]);
    }

    #[test]
    fn test_thirteen_keys() {
        assert_eq!(Key::ALL.len(), 13);
        assert_eq!(Key::FFlat.pitch_class(), Key::E.pitch_class());
        for k in Key::ALL {
            assert!(k.pitch_class() < 12);
        }
    }

    #[test]
    fn test_key_labels_parse() {
        for k in Key::ALL {
            assert_eq!(Key::from_label(k.label()), Some(k));
        }
        assert_eq!(Key::from_label("Ab"), Some(Key::GSharpAFlat));
        assert_eq!(Key::from_label("c#"), Some(Key::CSharp));
        assert_eq!(Key::from_label("H"), None);
        assert!(parse_key("H").is_err());
    }

    #[test]
    fn test_key_cycle() {
        assert_eq!(Key::B.next(), Key::C);
        assert_eq!(Key::C.prev(), Key::B);
        assert_eq!(Key::E.next(), Key::FFlat);
    }

    #[test]
    fn test_d_major_on_a_string() {
        let steps = scale_steps(2, STRINGS[2], Key::D, ScaleType::Major, FRET_COUNT).unwrap();
        let frets: Vec<u8> = steps.iter().map(|s| s.fret).collect();
        let pitches: Vec<u8> = steps.iter().map(|s| s.midi).collect();
        assert_eq!(frets, vec![5, 7, 9, 10, 12, 14, 16, 17]);
        assert_eq!(pitches, vec![62, 64, 66, 67, 69, 71, 73, 74]);
        assert!(steps.iter().all(|s| s.string == 2));
    }

    #[test]
    fn test_no_root_in_range() {
        assert!(scale_steps(2, STRINGS[2], Key::D, ScaleType::Minor, 2).is_none());
    }

    #[test]
    fn test_scale_toggle() {
        assert_eq!(ScaleType::Major.toggle(), ScaleType::Minor);
        assert_eq!(ScaleType::Minor.toggle().toggle(), ScaleType::Minor);
    }
}
