//! Text layout of the fretboard grid: a header row of fret numbers, then one
//! row per string with its label followed by the note name of every fret.

use std::collections::BTreeSet;

use crate::fretboard::{FRET_COUNT, STRINGS};
use crate::note::note_name;

/// Width of one grid column in characters.
pub const COLUMN_WIDTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Plain,
    Header,
    /// A string label that is selected
    Selected,
    Marked,
    Cursor,
    Playing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub style: CellStyle,
}

impl Cell {
    fn new(text: impl Into<String>, style: CellStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// What to emphasize when laying out the grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Highlights<'a> {
    pub selected: Option<usize>,
    pub playing: Option<(usize, u8)>,
    pub cursor: Option<(usize, u8)>,
    pub marks: Option<&'a BTreeSet<(usize, u8)>>,
}

impl Highlights<'_> {
    fn style_of(&self, string: usize, fret: u8) -> CellStyle {
        let cell = Some((string, fret));
        if self.playing == cell {
            CellStyle::Playing
        } else if self.cursor == cell {
            CellStyle::Cursor
        } else if self.marks.is_some_and(|m| m.contains(&(string, fret))) {
            CellStyle::Marked
        } else {
            CellStyle::Plain
        }
    }
}

/// Rows of cells: the header first, then one row per string.
pub fn layout(highlights: &Highlights<'_>) -> Vec<Vec<Cell>> {
    let mut rows = Vec::with_capacity(STRINGS.len() + 1);

    let mut header = vec![Cell::new("String", CellStyle::Header)];
    header.extend((0..=FRET_COUNT).map(|fret| Cell::new(fret.to_string(), CellStyle::Header)));
    rows.push(header);

    for (idx, string) in STRINGS.iter().enumerate() {
        let label_style = if highlights.selected == Some(idx) {
            CellStyle::Selected
        } else {
            CellStyle::Plain
        };
        let mut row = vec![Cell::new(string.name, label_style)];
        row.extend((0..=FRET_COUNT).map(|fret| {
            Cell::new(
                note_name(string.pitch(fret) as i32),
                highlights.style_of(idx, fret),
            )
        }));
        rows.push(row);
    }

    rows
}

/// Render cells without colors. Emphasized cells are bracketed and a
/// selected string label gets a `>` prefix.
pub fn plain_lines(rows: &[Vec<Cell>]) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let line: String = row
                .iter()
                .map(|cell| {
                    let text = match cell.style {
                        CellStyle::Plain | CellStyle::Header => cell.text.clone(),
                        CellStyle::Selected => format!(">{}", cell.text),
                        CellStyle::Marked | CellStyle::Cursor | CellStyle::Playing => {
                            format!("[{}]", cell.text)
                        }
                    };
                    format!("{:<width$}", text, width = COLUMN_WIDTH)
                })
                .collect();
            line.trim_end().to_string()
        })
        .collect()
}
