//! The 5-string bass layout: open-string pitches and fret arithmetic.

/// Highest fret shown on the board. The grid has `FRET_COUNT + 1` columns.
pub const FRET_COUNT: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BassString {
    pub name: &'static str,
    /// MIDI pitch at fret 0
    pub open: u8,
}

/// Strings in display order, highest first.
pub const STRINGS: [BassString; 5] = [
    BassString { name: "G", open: 67 },
    BassString { name: "D", open: 62 },
    BassString { name: "A", open: 57 },
    BassString { name: "E", open: 52 },
    BassString { name: "B", open: 47 },
];

impl BassString {
    pub fn pitch(self, fret: u8) -> u8 {
        self.open.saturating_add(fret)
    }
}

/// Index into [`STRINGS`] for a string name (case-insensitive).
pub fn string_index(name: &str) -> Option<usize> {
    STRINGS
        .iter()
        .position(|s| s.name.eq_ignore_ascii_case(name.trim()))
}

pub fn parse_string(name: &str) -> Result<usize, String> {
    string_index(name).ok_or_else(|| format!("unknown string '{}' (expected G, D, A, E or B)", name))
}

/// Lowest fret in `0..=max_fret` whose pitch has the given pitch class.
///
/// Returns `None` when the range is too short to contain the pitch class,
/// which cannot happen once `max_fret >= 11`.
pub fn root_fret(open: u8, pitch_class: u8, max_fret: u8) -> Option<u8> {
    (0..=max_fret).find(|&fret| (open as u16 + fret as u16) % 12 == (pitch_class % 12) as u16)
}
