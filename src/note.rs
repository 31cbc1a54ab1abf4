/// Musical note names (chromatic scale)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }

    /// Note name of a MIDI pitch, for any integer pitch.
    pub fn from_midi(midi: i32) -> Self {
        Self::ALL[midi.rem_euclid(12) as usize]
    }
}

/// Octave of a MIDI pitch. Middle C (MIDI 60) is octave 4.
pub fn octave(midi: i32) -> i32 {
    midi.div_euclid(12) - 1
}

/// Pitch class name plus octave, e.g. 61 -> "C#4".
pub fn note_name(midi: i32) -> String {
    format!("{}{}", NoteName::from_midi(midi).label(), octave(midi))
}

/// Frequency in Hz (A4 = 440 Hz)
pub fn midi_to_freq(midi: u8) -> f64 {
    440.0 * 2.0_f64.powf((midi as f64 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c_name() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(72), "C5");
    }

    #[test]
    fn test_names_repeat_every_octave() {
        for midi in 0..116 {
            let a = note_name(midi);
            let b = note_name(midi + 12);
            assert_eq!(NoteName::from_midi(midi), NoteName::from_midi(midi + 12));
            assert_eq!(octave(midi) + 1, octave(midi + 12), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_negative_pitch() {
        assert_eq!(note_name(-1), "B-2");
        assert_eq!(note_name(0), "C-1");
    }

    #[test]
    fn test_a4_frequency() {
        let freq = midi_to_freq(69);
        assert!((freq - 440.0).abs() < 0.01);
        assert!((midi_to_freq(57) - 220.0).abs() < 0.01);
    }

    #[test]
    fn test_pitch_classes() {
        assert_eq!(NoteName::from_midi(60), NoteName::C);
        assert_eq!(NoteName::from_midi(71), NoteName::B);
        assert_eq!(NoteName::from_midi(66).label(), "F#");
    }
}
