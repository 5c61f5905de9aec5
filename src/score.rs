//! Score, combo streak and the combo-expiry timer.

use crate::config::GameConfig;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Presentation tier for the combo counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ComboTier {
    None,
    Active,
    Super,
    Mega,
}

impl ComboTier {
    pub fn for_combo(combo: u32) -> Self {
        match combo {
            0 => ComboTier::None,
            1..=19 => ComboTier::Active,
            20..=49 => ComboTier::Super,
            _ => ComboTier::Mega,
        }
    }
}

/// One-shot deadline, re-armed on every hit. Pausing freezes the remainder.
#[derive(Debug, Clone)]
pub struct ComboTimer {
    timeout_ms: f64,
    deadline_ms: Option<f64>,
    paused_remaining_ms: Option<f64>,
}

impl ComboTimer {
    pub fn new(timeout_ms: f64) -> Self {
        Self {
            timeout_ms,
            deadline_ms: None,
            paused_remaining_ms: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline_ms.is_some() || self.paused_remaining_ms.is_some()
    }

    /// Cancel and re-arm in one step so a stale deadline can never survive.
    pub fn arm(&mut self, now: f64) {
        self.paused_remaining_ms = None;
        self.deadline_ms = Some(now + self.timeout_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
        self.paused_remaining_ms = None;
    }

    pub fn pause(&mut self, now: f64) {
        if let Some(deadline) = self.deadline_ms.take() {
            self.paused_remaining_ms = Some((deadline - now).max(0.0));
        }
    }

    pub fn resume(&mut self, now: f64) {
        if let Some(remaining) = self.paused_remaining_ms.take() {
            self.deadline_ms = Some(now + remaining);
        }
    }

    /// True exactly once when the deadline has passed; disarms itself.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// Result of scoring one hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitAward {
    pub points: u64,
    pub combo: u32,
    /// Combo just reached a multiple of the milestone.
    pub milestone: bool,
}

#[derive(Debug, Clone)]
pub struct ScoreBoard {
    score: u64,
    hits: u32,
    misses: u32,
    combo: u32,
    max_combo: u32,
    base_points: f64,
    combo_step: f64,
    milestone: u32,
    timer: ComboTimer,
}

impl ScoreBoard {
    pub fn new(cfg: &GameConfig) -> Self {
        Self {
            score: 0,
            hits: 0,
            misses: 0,
            combo: 0,
            max_combo: 0,
            base_points: cfg.base_points,
            combo_step: cfg.combo_step,
            milestone: cfg.combo_milestone.max(1),
            timer: ComboTimer::new(cfg.combo_timeout_ms),
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }
    pub fn hits(&self) -> u32 {
        self.hits
    }
    pub fn misses(&self) -> u32 {
        self.misses
    }
    pub fn combo(&self) -> u32 {
        self.combo
    }
    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    /// `floor(hits / (hits + misses) * 100)`, or 0 before any judgement.
    pub fn accuracy_pct(&self) -> u32 {
        let total = self.hits as u64 + self.misses as u64;
        if total == 0 {
            0
        } else {
            (self.hits as u64 * 100 / total) as u32
        }
    }

    /// `floor(base * accuracy² * 1.5 * (1 + combo * step))` for the combo after this hit.
    pub fn points_for(&self, accuracy: f64, combo: u32) -> u64 {
        let accuracy = accuracy.clamp(0.0, 1.0);
        let accuracy_mult = accuracy * accuracy * 1.5;
        let combo_mult = 1.0 + combo as f64 * self.combo_step;
        (self.base_points * accuracy_mult * combo_mult).floor().max(0.0) as u64
    }

    /// Score a hit. A combo whose deadline already passed is dropped first,
    /// whether or not anyone polled the timer in between.
    pub fn on_hit(&mut self, accuracy: f64, now: f64) -> HitAward {
        self.poll_combo_timeout(now);
        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.hits += 1;
        let points = self.points_for(accuracy, self.combo);
        self.score += points;
        self.timer.arm(now);
        HitAward {
            points,
            combo: self.combo,
            milestone: self.combo % self.milestone == 0,
        }
    }

    pub fn on_miss(&mut self) {
        self.misses += 1;
        self.combo = 0;
        self.timer.cancel();
    }

    /// Zero the combo if the expiry deadline passed. Returns true when it did.
    pub fn poll_combo_timeout(&mut self, now: f64) -> bool {
        if !self.timer.poll(now) {
            return false;
        }
        let had_combo = self.combo > 0;
        self.combo = 0;
        had_combo
    }

    pub fn pause_timer(&mut self, now: f64) {
        self.timer.pause(now);
    }

    pub fn resume_timer(&mut self, now: f64) {
        self.timer.resume(now);
    }

    pub fn combo_timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.hits = 0;
        self.misses = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.timer.cancel();
    }
}
