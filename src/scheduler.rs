//! Fixed-delay sequencing of a scale run.
//!
//! A run holds no timer of its own: the owner calls [`ScaleRun::advance`] with
//! the current time and the run answers whether the next step is due. Dropping
//! the run cancels it.

use std::time::{Duration, Instant};

use crate::scale::Step;

/// Default hold between two scale notes.
pub const DEFAULT_HOLD: Duration = Duration::from_millis(400);

/// What a run wants after being polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The current step is still being held
    Wait,
    /// This step is due now and should be sounded
    Sound(Step),
    /// The last hold has elapsed
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleRun {
    steps: Vec<Step>,
    next: usize,
    current: Option<Step>,
    deadline: Instant,
    hold: Duration,
}

impl ScaleRun {
    /// A run whose first step is due at `start`.
    pub fn new(steps: Vec<Step>, hold: Duration, start: Instant) -> Self {
        Self {
            steps,
            next: 0,
            current: None,
            deadline: start,
            hold,
        }
    }

    pub fn advance(&mut self, now: Instant) -> Advance {
        if now < self.deadline {
            return Advance::Wait;
        }
        self.current = None;
        match self.steps.get(self.next).copied() {
            Some(step) => {
                self.next += 1;
                self.current = Some(step);
                self.deadline = now + self.hold;
                Advance::Sound(step)
            }
            None => Advance::Done,
        }
    }

    /// The step held right now, for highlighting.
    pub fn current(&self) -> Option<Step> {
        self.current
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Offset of every step from the start of an undisturbed run.
    pub fn timeline(&self) -> Vec<(Duration, Step)> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, &step)| (self.hold * i as u32, step))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> Vec<Step> {
        [0u8, 2, 3]
            .iter()
            .map(|&fret| Step {
                string: 1,
                fret,
                midi: 62 + fret,
            })
            .collect()
    }

    #[test]
    fn test_first_step_due_at_start() {
        let t0 = Instant::now();
        let mut run = ScaleRun::new(steps(), DEFAULT_HOLD, t0);
        assert_eq!(run.current(), None);
        assert!(matches!(run.advance(t0), Advance::Sound(Step { fret: 0, .. })));
        assert_eq!(run.current().map(|s| s.fret), Some(0));
        assert_eq!(run.deadline(), t0 + DEFAULT_HOLD);
    }

    #[test]
    fn test_holds_until_deadline() {
        let t0 = Instant::now();
        let mut run = ScaleRun::new(steps(), DEFAULT_HOLD, t0);
        run.advance(t0);
        assert_eq!(run.advance(t0 + Duration::from_millis(399)), Advance::Wait);
        assert_eq!(run.current().map(|s| s.fret), Some(0));
        assert!(matches!(
            run.advance(t0 + DEFAULT_HOLD),
            Advance::Sound(Step { fret: 2, .. })
        ));
    }

    #[test]
    fn test_done_clears_highlight() {
        let t0 = Instant::now();
        let mut run = ScaleRun::new(steps(), DEFAULT_HOLD, t0);
        let mut sounded = Vec::new();
        let mut t = t0;
        loop {
            match run.advance(t) {
                Advance::Sound(step) => sounded.push(step.fret),
                Advance::Done => break,
                Advance::Wait => {}
            }
            t += DEFAULT_HOLD;
        }
        assert_eq!(sounded, vec![0, 2, 3]);
        assert_eq!(run.current(), None);
        assert_eq!(run.advance(t), Advance::Done);
    }

    #[test]
    fn test_timeline_offsets() {
        let run = ScaleRun::new(steps(), Duration::from_millis(250), Instant::now());
        let offsets: Vec<u128> = run.timeline().iter().map(|(d, _)| d.as_millis()).collect();
        assert_eq!(offsets, vec![0, 250, 500]);
    }
}
