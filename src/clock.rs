// --- Spawn cadence & frame timing -------------------------------------------
//
// All timestamps are host milliseconds (performance.now() in the browser).

/// Spawns that fall further behind than this many intervals are dropped and the
/// cadence resynchronises (e.g. after the tab was backgrounded).
const MAX_LAG_INTERVALS: f64 = 4.0;

/// Eighth-note spacing for a tempo: half a beat.
pub fn spawn_interval_ms(bpm: u32) -> f64 {
    60_000.0 / bpm.max(1) as f64 / 2.0
}

/// Periodic spawn trigger with cancel / pause / resume semantics.
///
/// A tempo change only affects the spacing *after* the currently pending spawn;
/// the pending deadline itself is never moved.
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    interval_ms: f64,
    next_due_ms: Option<f64>,
    paused_remaining_ms: Option<f64>,
}

impl SpawnScheduler {
    pub fn new(bpm: u32) -> Self {
        Self {
            interval_ms: spawn_interval_ms(bpm),
            next_due_ms: None,
            paused_remaining_ms: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn next_due_ms(&self) -> Option<f64> {
        self.next_due_ms
    }

    pub fn is_running(&self) -> bool {
        self.next_due_ms.is_some()
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.interval_ms = spawn_interval_ms(bpm);
    }

    /// Arm the cadence; the first spawn is one interval from `now`. No-op if running.
    pub fn start(&mut self, now: f64) {
        if self.is_running() {
            return;
        }
        self.paused_remaining_ms = None;
        self.next_due_ms = Some(now + self.interval_ms);
    }

    /// Cancel everything, including a frozen pause remainder. Idempotent.
    pub fn stop(&mut self) {
        self.next_due_ms = None;
        self.paused_remaining_ms = None;
    }

    /// Freeze the pending spawn's remaining time.
    pub fn pause(&mut self, now: f64) {
        if let Some(due) = self.next_due_ms.take() {
            self.paused_remaining_ms = Some((due - now).max(0.0));
        }
    }

    /// Re-arm from a pause, restoring the frozen remainder; starts fresh otherwise.
    pub fn resume(&mut self, now: f64) {
        if self.is_running() {
            return;
        }
        match self.paused_remaining_ms.take() {
            Some(remaining) => self.next_due_ms = Some(now + remaining),
            None => self.start(now),
        }
    }

    /// Pop the next spawn deadline that is at or before `now`, advancing the
    /// cadence by one interval. Call in a loop until it returns `None`.
    pub fn pop_due(&mut self, now: f64) -> Option<f64> {
        let due = self.next_due_ms?;
        if due > now {
            return None;
        }
        if now - due > self.interval_ms * MAX_LAG_INTERVALS {
            log::debug!("spawn cadence lagged {:.0}ms; resyncing", now - due);
            self.next_due_ms = Some(now + self.interval_ms);
            return Some(now);
        }
        self.next_due_ms = Some(due + self.interval_ms);
        Some(due)
    }
}

/// Per-frame delta source. The first frame after `reset` yields zero so a
/// fresh start or resume never produces a catch-up jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
    max_delta_s: f64,
}

impl FrameClock {
    pub fn new(max_delta_s: f64) -> Self {
        Self {
            last_ms: None,
            max_delta_s,
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    /// Seconds since the previous frame, clamped to `[0, max_delta]`.
    pub fn delta(&mut self, now: f64) -> f64 {
        let dt = match self.last_ms {
            Some(prev) => ((now - prev) / 1000.0).clamp(0.0, self.max_delta_s),
            None => 0.0,
        };
        self.last_ms = Some(now);
        dt
    }
}
