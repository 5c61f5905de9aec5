//! Session lifecycle phases and the pre-game countdown.

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    #[default]
    Welcome,
    Tutorial,
    Countdown,
    Playing,
    Paused,
    /// Transient: passed through on reset on the way back to `Welcome`.
    Ended,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::Tutorial => "tutorial",
            Phase::Countdown => "countdown",
            Phase::Playing => "playing",
            Phase::Paused => "paused",
            Phase::Ended => "ended",
        }
    }

    /// Phases a reset may leave from.
    pub fn is_in_game(&self) -> bool {
        matches!(self, Phase::Countdown | Phase::Playing | Phase::Paused)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CountdownStep {
    Three,
    Two,
    One,
    Go,
}

impl CountdownStep {
    pub const SEQUENCE: [CountdownStep; 4] = [
        CountdownStep::Three,
        CountdownStep::Two,
        CountdownStep::One,
        CountdownStep::Go,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CountdownStep::Three => "3",
            CountdownStep::Two => "2",
            CountdownStep::One => "1",
            CountdownStep::Go => "Go",
        }
    }
}

/// `3, 2, 1, Go`: each step is shown for `step_ms`, followed by `gap_ms` of
/// blank before the next. Play begins once `Go` has been shown for `step_ms`.
#[derive(Debug, Clone)]
pub struct Countdown {
    start_ms: f64,
    step_ms: f64,
    gap_ms: f64,
    emitted: usize,
}

impl Countdown {
    pub fn new(start_ms: f64, step_ms: f64, gap_ms: f64) -> Self {
        Self {
            start_ms,
            step_ms,
            gap_ms,
            emitted: 0,
        }
    }

    fn step_start(&self, idx: usize) -> f64 {
        self.start_ms + idx as f64 * (self.step_ms + self.gap_ms)
    }

    /// Time at which play begins.
    pub fn end_ms(&self) -> f64 {
        self.step_start(CountdownStep::SEQUENCE.len() - 1) + self.step_ms
    }

    /// Steps that became visible since the last poll, in order.
    pub fn poll(&mut self, now: f64) -> Vec<CountdownStep> {
        let mut out = Vec::new();
        while self.emitted < CountdownStep::SEQUENCE.len() && now >= self.step_start(self.emitted) {
            out.push(CountdownStep::SEQUENCE[self.emitted]);
            self.emitted += 1;
        }
        out
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.emitted == CountdownStep::SEQUENCE.len() && now >= self.end_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_fire_in_order_at_their_times() {
        let mut c = Countdown::new(1_000.0, 700.0, 100.0);
        assert_eq!(c.poll(1_000.0), vec![CountdownStep::Three]);
        assert!(c.poll(1_799.0).is_empty());
        assert_eq!(c.poll(1_800.0), vec![CountdownStep::Two]);
        assert_eq!(c.poll(3_500.0), vec![CountdownStep::One, CountdownStep::Go]);
        assert!(!c.is_finished(4_099.0));
        assert!(c.is_finished(4_100.0));
    }

    #[test]
    fn late_poll_catches_up_every_step() {
        let mut c = Countdown::new(0.0, 700.0, 100.0);
        assert_eq!(c.poll(10_000.0).len(), 4);
        assert!(c.is_finished(10_000.0));
        assert!(c.poll(20_000.0).is_empty());
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::default(), Phase::Welcome);
        assert_eq!(Phase::Paused.to_string(), "paused");
        assert!(Phase::Countdown.is_in_game());
        assert!(!Phase::Tutorial.is_in_game());
    }
}
