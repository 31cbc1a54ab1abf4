//! Selection state machine and scale playback driven by user input.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::fretboard::{FRET_COUNT, STRINGS};
use crate::instrument::{Instrument, VELOCITY};
use crate::note::note_name;
use crate::scale::{Key, ScaleType, Step, scale_steps};
use crate::scheduler::{Advance, ScaleRun};

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Idle,
    StringSelected(usize),
    Playing { string: usize, run: ScaleRun },
}

pub struct Controller<I: Instrument> {
    instrument: I,
    state: Selection,
    key: Key,
    scale: ScaleType,
    hold: Duration,
    max_fret: u8,
    marks: BTreeSet<(usize, u8)>,
}

impl<I: Instrument> Controller<I> {
    pub fn new(instrument: I, hold: Duration) -> Self {
        Self {
            instrument,
            state: Selection::Idle,
            key: Key::default(),
            scale: ScaleType::default(),
            hold,
            max_fret: FRET_COUNT,
            marks: BTreeSet::new(),
        }
    }

    /// Limit the root search to `0..=max_fret`.
    #[cfg(test)]
    pub fn with_max_fret(mut self, max_fret: u8) -> Self {
        self.max_fret = max_fret;
        self
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    pub fn next_key(&mut self) {
        self.key = self.key.next();
    }

    pub fn prev_key(&mut self) {
        self.key = self.key.prev();
    }

    pub fn scale_type(&self) -> ScaleType {
        self.scale
    }

    pub fn set_scale_type(&mut self, scale: ScaleType) {
        self.scale = scale;
    }

    pub fn toggle_scale_type(&mut self) {
        self.scale = self.scale.toggle();
    }

    pub fn selected_string(&self) -> Option<usize> {
        match self.state {
            Selection::Idle => None,
            Selection::StringSelected(string) | Selection::Playing { string, .. } => Some(string),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, Selection::Playing { .. })
    }

    /// Cell sounding in the current run, if any.
    pub fn playing_cell(&self) -> Option<(usize, u8)> {
        match &self.state {
            Selection::Playing { run, .. } => run.current().map(|s| (s.string, s.fret)),
            _ => None,
        }
    }

    /// When the next [`tick`](Self::tick) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.state {
            Selection::Playing { run, .. } => Some(run.deadline()),
            _ => None,
        }
    }

    /// Whether "Play Scale" is enabled.
    pub fn can_play(&self) -> bool {
        self.selected_string().is_some() && self.instrument.is_ready()
    }

    /// Toggle the selection of a string label. Cancels a running scale.
    pub fn click_string(&mut self, string: usize) {
        if string >= STRINGS.len() {
            return;
        }
        let current = self.selected_string();
        if self.is_playing() {
            log::debug!("playback cancelled by string click");
        }
        self.state = if current == Some(string) {
            Selection::Idle
        } else {
            Selection::StringSelected(string)
        };
        log::debug!("selection: {:?}", self.selected_string());
    }

    /// Sound a single cell. Returns false when nothing was played.
    pub fn click_fret(&mut self, string: usize, fret: u8) -> bool {
        let Some(bass_string) = STRINGS.get(string) else {
            return false;
        };
        if fret > FRET_COUNT {
            return false;
        }
        if !self.instrument.is_ready() {
            log::debug!("fret click ignored: instrument not ready");
            return false;
        }
        self.sound(bass_string.pitch(fret));
        true
    }

    /// Start the scale for the current key and scale type on the selected
    /// string. Restarts from the first step if a run is already playing.
    pub fn play_scale(&mut self, now: Instant) -> bool {
        let Some(string) = self.selected_string() else {
            log::debug!("play ignored: no string selected");
            return false;
        };
        if !self.instrument.is_ready() {
            log::debug!("play ignored: instrument not ready");
            return false;
        }
        let Some(steps) = scale_steps(string, STRINGS[string], self.key, self.scale, self.max_fret)
        else {
            log::warn!(
                "no {} on the {} string within {} frets",
                self.key.label(),
                STRINGS[string].name,
                self.max_fret
            );
            return false;
        };

        if self.is_playing() {
            log::debug!("restarting scale playback");
        }
        log::info!(
            "playing {} {} on {} string from fret {}",
            self.key.label(),
            self.scale.name(),
            STRINGS[string].name,
            steps[0].fret
        );
        self.state = Selection::Playing {
            string,
            run: ScaleRun::new(steps, self.hold, now),
        };
        self.tick(now);
        true
    }

    /// Cancel a running scale, keeping the string selected.
    pub fn stop(&mut self) {
        if let Selection::Playing { string, .. } = self.state {
            log::debug!("playback stopped");
            self.state = Selection::StringSelected(string);
            self.instrument.silence();
        }
    }

    /// Advance playback. Returns the step sounded by this call, if any.
    pub fn tick(&mut self, now: Instant) -> Option<Step> {
        let (string, advance) = match &mut self.state {
            Selection::Playing { string, run } => (*string, run.advance(now)),
            _ => return None,
        };
        match advance {
            Advance::Wait => None,
            Advance::Sound(step) => {
                self.sound(step.midi);
                Some(step)
            }
            Advance::Done => {
                log::debug!("scale finished");
                self.state = Selection::StringSelected(string);
                None
            }
        }
    }

    pub fn toggle_mark(&mut self, string: usize, fret: u8) {
        if string >= STRINGS.len() || fret > FRET_COUNT {
            return;
        }
        if !self.marks.remove(&(string, fret)) {
            self.marks.insert((string, fret));
        }
    }

    pub fn marks(&self) -> &BTreeSet<(usize, u8)> {
        &self.marks
    }

    fn sound(&self, midi: u8) {
        self.instrument.resume();
        log::debug!("start {} ({})", note_name(midi as i32), midi);
        if let Err(e) = self.instrument.start(midi, VELOCITY) {
            log::warn!("note {}: {}", midi, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::instrument::LoadState;
    use crate::scheduler::DEFAULT_HOLD;
    use std::cell::{Cell, RefCell};

    struct Recorder {
        state: Cell<LoadState>,
        resumes: Cell<usize>,
        silenced: Cell<usize>,
        notes: RefCell<Vec<(u8, u8)>>,
    }

    impl Recorder {
        fn ready() -> Self {
            Self {
                state: Cell::new(LoadState::Ready),
                resumes: Cell::new(0),
                silenced: Cell::new(0),
                notes: RefCell::new(Vec::new()),
            }
        }

        fn pitches(&self) -> Vec<u8> {
            self.notes.borrow().iter().map(|&(m, _)| m).collect()
        }
    }

    impl Instrument for Recorder {
        fn load_state(&self) -> LoadState {
            self.state.get()
        }

        fn resume(&self) {
            self.resumes.set(self.resumes.get() + 1);
        }

        fn start(&self, midi: u8, velocity: u8) -> Result<()> {
            self.notes.borrow_mut().push((midi, velocity));
            Ok(())
        }

        fn silence(&self) {
            self.silenced.set(self.silenced.get() + 1);
        }
    }

    fn controller() -> Controller<Recorder> {
        Controller::new(Recorder::ready(), DEFAULT_HOLD)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_string_toggle() {
        let mut c = controller();
        assert_eq!(c.state(), &Selection::Idle);
        c.click_string(2);
        assert_eq!(c.state(), &Selection::StringSelected(2));
        c.click_string(2);
        assert_eq!(c.state(), &Selection::Idle);
    }

    #[test]
    fn test_string_switch() {
        let mut c = controller();
        c.click_string(0);
        c.click_string(4);
        assert_eq!(c.selected_string(), Some(4));
        c.click_string(9);
        assert_eq!(c.selected_string(), Some(4));
    }

    #[test]
    fn test_fret_click_sounds_without_selecting() {
        let mut c = controller();
        assert!(c.click_fret(0, 5));
        assert_eq!(c.instrument().notes.borrow().as_slice(), &[(72, VELOCITY)]);
        assert_eq!(c.instrument().resumes.get(), 1);
        assert_eq!(c.state(), &Selection::Idle);

        c.click_string(3);
        c.click_fret(1, 0);
        assert_eq!(c.state(), &Selection::StringSelected(3));
    }

    #[test]
    fn test_fret_click_out_of_grid() {
        let mut c = controller();
        assert!(!c.click_fret(5, 0));
        assert!(!c.click_fret(0, FRET_COUNT + 1));
        assert!(c.instrument().notes.borrow().is_empty());
    }

    #[test]
    fn test_not_ready_is_noop() {
        let mut c = controller();
        c.instrument().state.set(LoadState::Loading);
        c.click_string(2);
        assert!(!c.can_play());
        assert!(!c.click_fret(2, 3));
        assert!(!c.play_scale(Instant::now()));
        assert_eq!(c.state(), &Selection::StringSelected(2));
        assert!(c.instrument().notes.borrow().is_empty());
        assert_eq!(c.instrument().resumes.get(), 0);

        c.instrument().state.set(LoadState::Ready);
        assert!(c.can_play());
    }

    #[test]
    fn test_play_without_selection_is_noop() {
        let mut c = controller();
        assert!(!c.play_scale(Instant::now()));
        assert_eq!(c.state(), &Selection::Idle);
        assert!(c.instrument().notes.borrow().is_empty());
        assert_eq!(c.instrument().resumes.get(), 0);
    }

    #[test]
    fn test_d_major_on_a_string() {
        let mut c = controller();
        c.click_string(2);
        c.set_key(Key::D);
        c.set_scale_type(ScaleType::Major);

        let t0 = Instant::now();
        assert!(c.play_scale(t0));
        assert_eq!(c.playing_cell(), Some((2, 5)));

        let mut cells = vec![(2, 5)];
        for i in 1..=7u64 {
            assert_eq!(c.tick(t0 + ms(400 * i - 1)), None);
            let step = c.tick(t0 + ms(400 * i)).unwrap();
            assert_eq!(c.playing_cell(), Some((step.string, step.fret)));
            cells.push((step.string, step.fret));
        }

        assert_eq!(c.tick(t0 + ms(400 * 8)), None);
        assert_eq!(c.playing_cell(), None);
        assert_eq!(c.state(), &Selection::StringSelected(2));

        let frets: Vec<u8> = cells.iter().map(|&(_, f)| f).collect();
        assert_eq!(frets, vec![5, 7, 9, 10, 12, 14, 16, 17]);
        assert_eq!(c.instrument().pitches(), vec![62, 64, 66, 67, 69, 71, 73, 74]);
        assert!(c.instrument().notes.borrow().iter().all(|&(_, v)| v == VELOCITY));
    }

    #[test]
    fn test_replay_restarts_without_overlap() {
        let mut c = controller();
        c.click_string(0);
        c.set_key(Key::C);
        let t0 = Instant::now();
        c.play_scale(t0);
        c.tick(t0 + ms(400));
        c.tick(t0 + ms(800));
        assert_eq!(c.instrument().pitches(), vec![72, 74, 76]);

        let t1 = t0 + ms(900);
        assert!(c.play_scale(t1));
        assert_eq!(c.playing_cell(), Some((0, 5)));
        // the cancelled run's next deadline no longer fires
        assert_eq!(c.tick(t0 + ms(1200)), None);
        assert_eq!(c.tick(t1 + ms(400)).map(|s| s.fret), Some(7));
        assert_eq!(c.instrument().pitches(), vec![72, 74, 76, 72, 74]);
    }

    #[test]
    fn test_string_click_cancels_playback() {
        let mut c = controller();
        c.click_string(1);
        let t0 = Instant::now();
        c.play_scale(t0);
        c.click_string(1);
        assert_eq!(c.state(), &Selection::Idle);
        assert_eq!(c.tick(t0 + ms(400)), None);
        assert_eq!(c.instrument().notes.borrow().len(), 1);

        c.click_string(1);
        c.play_scale(t0);
        c.click_string(3);
        assert_eq!(c.state(), &Selection::StringSelected(3));
    }

    #[test]
    fn test_stop_keeps_selection() {
        let mut c = controller();
        c.click_string(4);
        let t0 = Instant::now();
        c.play_scale(t0);
        assert!(c.next_deadline().is_some());
        c.stop();
        assert_eq!(c.state(), &Selection::StringSelected(4));
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.instrument().silenced.get(), 1);
        c.stop();
        assert_eq!(c.state(), &Selection::StringSelected(4));
        assert_eq!(c.instrument().silenced.get(), 1);
    }

    #[test]
    fn test_no_root_refuses_play() {
        let mut c = Controller::new(Recorder::ready(), DEFAULT_HOLD).with_max_fret(3);
        c.click_string(2);
        c.set_key(Key::D);
        assert!(!c.play_scale(Instant::now()));
        assert_eq!(c.state(), &Selection::StringSelected(2));
        assert!(c.instrument().notes.borrow().is_empty());
    }

    #[test]
    fn test_minor_uses_minor_intervals() {
        let mut c = controller();
        c.click_string(2);
        c.set_key(Key::A);
        c.toggle_scale_type();
        let t0 = Instant::now();
        c.play_scale(t0);
        for i in 1..8u64 {
            c.tick(t0 + ms(400 * i));
        }
        assert_eq!(c.instrument().pitches(), vec![57, 59, 60, 62, 64, 65, 67, 69]);
    }

    #[test]
    fn test_key_changes() {
        let mut c = controller();
        c.prev_key();
        assert_eq!(c.key(), Key::B);
        c.next_key();
        c.next_key();
        assert_eq!(c.key(), Key::CSharp);
    }

    #[test]
    fn test_marks_toggle() {
        let mut c = controller();
        c.toggle_mark(1, 3);
        c.toggle_mark(2, 0);
        c.toggle_mark(9, 0);
        assert_eq!(c.marks().len(), 2);
        c.toggle_mark(1, 3);
        assert!(c.marks().contains(&(2, 0)));
        assert!(!c.marks().contains(&(1, 3)));
    }
}
