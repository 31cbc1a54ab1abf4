use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::{Print, PrintStyledContent, Stylize};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};

use crate::controller::{Controller, Selection};
use crate::error::Result;
use crate::fretboard::{FRET_COUNT, STRINGS};
use crate::grid::{self, COLUMN_WIDTH, Cell, CellStyle, Highlights};
use crate::instrument::{Instrument, LoadState};

/// Longest wait for input before playback is polled again
const POLL: Duration = Duration::from_millis(50);

enum Flow {
    Continue,
    Quit,
}

/// Run the interactive fretboard until Esc or `q`.
pub fn run<I: Instrument>(controller: &mut Controller<I>) -> Result<()> {
    let mut stdout = io::stdout();

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = event_loop(controller, &mut stdout);

    // Restore terminal
    controller.stop();
    let _ = execute!(stdout, Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}

fn event_loop<I: Instrument>(controller: &mut Controller<I>, stdout: &mut io::Stdout) -> Result<()> {
    let mut cursor: (usize, u8) = (0, 0);
    let mut last_load = controller.instrument().load_state();
    let mut dirty = true;

    loop {
        let now = Instant::now();
        let was_playing = controller.is_playing();
        if controller.tick(now).is_some() || was_playing != controller.is_playing() {
            dirty = true;
        }

        let load = controller.instrument().load_state();
        if load != last_load {
            log::debug!("instrument {:?}", load);
            last_load = load;
            dirty = true;
        }

        if dirty {
            draw(stdout, controller, cursor)?;
            dirty = false;
        }

        let timeout = controller
            .next_deadline()
            .map(|d| d.saturating_duration_since(now).min(POLL))
            .unwrap_or(POLL);

        if !event::poll(timeout)? {
            continue;
        }

        match event::read()? {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => {
                if let Flow::Quit = handle_key(controller, &mut cursor, code) {
                    return Ok(());
                }
                dirty = true;
            }
            Event::Resize(..) => dirty = true,
            _ => {}
        }
    }
}

fn handle_key<I: Instrument>(
    controller: &mut Controller<I>,
    cursor: &mut (usize, u8),
    code: KeyCode,
) -> Flow {
    let (string, fret) = *cursor;
    match code {
        KeyCode::Esc | KeyCode::Char('q') => return Flow::Quit,

        KeyCode::Up => cursor.0 = string.saturating_sub(1),
        KeyCode::Down => cursor.0 = (string + 1).min(STRINGS.len() - 1),
        KeyCode::Left => cursor.1 = fret.saturating_sub(1),
        KeyCode::Right => cursor.1 = (fret + 1).min(FRET_COUNT),

        KeyCode::Enter | KeyCode::Char(' ') => {
            controller.click_fret(string, fret);
        }
        KeyCode::Char('s') => controller.click_string(string),
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            cursor.0 = idx;
            controller.click_string(idx);
        }

        KeyCode::Char('[') => controller.prev_key(),
        KeyCode::Char(']') => controller.next_key(),
        KeyCode::Char('t') => controller.toggle_scale_type(),
        KeyCode::Char('m') => controller.toggle_mark(string, fret),
        KeyCode::Char('p') => {
            controller.play_scale(Instant::now());
        }
        KeyCode::Char('x') => controller.stop(),

        _ => {}
    }
    Flow::Continue
}

fn draw<I: Instrument>(
    stdout: &mut io::Stdout,
    controller: &Controller<I>,
    cursor: (usize, u8),
) -> Result<()> {
    queue!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    queue!(
        stdout,
        PrintStyledContent("5-String Bass Guitar Fretboard".bold())
    )?;

    let highlights = Highlights {
        selected: controller.selected_string(),
        playing: controller.playing_cell(),
        cursor: Some(cursor),
        marks: Some(controller.marks()),
    };
    let rows = grid::layout(&highlights);
    for (y, row) in rows.iter().enumerate() {
        queue!(stdout, MoveTo(0, 2 + y as u16))?;
        for cell in row {
            print_cell(stdout, cell)?;
        }
    }

    let mut line = 3 + rows.len() as u16;
    let status = match controller.instrument().load_state() {
        LoadState::Loading => "Loading bass samples...".yellow(),
        LoadState::Ready => "Audio ready".green(),
        LoadState::Failed => "Audio unavailable (see log)".red(),
    };
    queue!(stdout, MoveTo(0, line), PrintStyledContent(status))?;

    line += 1;
    let selected = controller
        .selected_string()
        .map(|s| STRINGS[s].name)
        .unwrap_or("-");
    queue!(
        stdout,
        MoveTo(0, line),
        Print(format!(
            "Key: {:<6} Scale: {:<6} String: {}   ",
            controller.key().label(),
            controller.scale_type().name(),
            selected
        ))
    )?;
    let button = if let Selection::Playing { .. } = controller.state() {
        "[Playing...]".magenta()
    } else if controller.can_play() {
        "[Play Scale]".bold()
    } else {
        "[Play Scale]".dark_grey()
    };
    queue!(stdout, PrintStyledContent(button))?;

    line += 2;
    for help in [
        "arrows move   enter/space sound   s or 1-5 select string   m mark",
        "[ ] key   t major/minor   p play scale   x stop   esc/q quit",
    ] {
        queue!(stdout, MoveTo(0, line), PrintStyledContent(help.dark_grey()))?;
        line += 1;
    }

    stdout.flush()?;
    Ok(())
}

fn print_cell(stdout: &mut io::Stdout, cell: &Cell) -> io::Result<()> {
    let text = format!("{:<width$}", cell.text, width = COLUMN_WIDTH);
    let styled = match cell.style {
        CellStyle::Plain => text.stylize(),
        CellStyle::Header => text.dark_grey(),
        CellStyle::Selected => text.black().on_cyan(),
        CellStyle::Marked => text.black().on_yellow(),
        CellStyle::Cursor => text.reverse(),
        CellStyle::Playing => text.black().on_green(),
    };
    queue!(stdout, PrintStyledContent(styled))
}
