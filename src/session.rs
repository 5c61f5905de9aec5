//! `GameSession`: the single owner of all mutable game state for one play-through.
//!
//! The host drives it with `tick(now)` once per animation frame and forwards
//! lane presses and menu actions as they arrive. Everything the presentation
//! layer needs to react to (sounds, animations, counters) is queued as
//! [`GameEvent`]s and collected with [`GameSession::drain_events`].
//!
//! Within a tick, object motion and timeout misses are resolved before new
//! notes spawn, and a press is always judged against positions from the most
//! recent tick.

use crate::clock::{FrameClock, SpawnScheduler};
use crate::config::{ConfigError, GameConfig, clamp_bpm};
use crate::field::{FallingObject, ObjectId, ObjectStatus, Playfield};
use crate::judge::{Judge, Rating, Verdict};
use crate::phase::{Countdown, CountdownStep, Phase};
use crate::score::{ComboTier, ScoreBoard};
use crate::spawner::{LaneRng, Spawner};

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MissCause {
    /// A press found nothing to claim.
    Press,
    /// An object left the field unhandled.
    Timeout,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum GameEvent {
    ObjectSpawned {
        id: ObjectId,
        lane: u8,
    },
    ObjectAdvanced {
        id: ObjectId,
        position: f64,
    },
    ObjectRetired {
        id: ObjectId,
        status: ObjectStatus,
    },
    Hit {
        id: ObjectId,
        lane: u8,
        accuracy: f64,
        rating: Rating,
        points: u64,
    },
    Miss {
        lane: u8,
        cause: MissCause,
    },
    ComboChanged {
        combo: u32,
        tier: ComboTier,
    },
    ComboMilestone {
        combo: u32,
    },
    ScoreChanged {
        score: u64,
    },
    PhaseChanged {
        phase: Phase,
    },
    CountdownTick {
        step: CountdownStep,
    },
}

impl GameEvent {
    /// Short event name, used as the DOM event suffix by the web glue.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::ObjectSpawned { .. } => "object_spawned",
            GameEvent::ObjectAdvanced { .. } => "object_advanced",
            GameEvent::ObjectRetired { .. } => "object_retired",
            GameEvent::Hit { .. } => "hit",
            GameEvent::Miss { .. } => "miss",
            GameEvent::ComboChanged { .. } => "combo_changed",
            GameEvent::ComboMilestone { .. } => "combo_milestone",
            GameEvent::ScoreChanged { .. } => "score_changed",
            GameEvent::PhaseChanged { .. } => "phase_changed",
            GameEvent::CountdownTick { .. } => "countdown_tick",
        }
    }
}

/// Point-in-time copy of the counters, for HUDs and end screens.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SessionStats {
    pub score: u64,
    pub hits: u32,
    pub misses: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub accuracy_pct: u32,
    pub bpm: u32,
    pub phase: Phase,
    pub active_objects: usize,
}

pub struct GameSession {
    config: GameConfig,
    phase: Phase,
    bpm: u32,
    field: Playfield,
    spawner: Spawner,
    judge: Judge,
    score: ScoreBoard,
    scheduler: SpawnScheduler,
    frame: FrameClock,
    countdown: Option<Countdown>,
    events: Vec<GameEvent>,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let bpm = clamp_bpm(config.bpm);
        let rng = lane_rng(&config);
        Ok(Self {
            phase: Phase::Welcome,
            bpm,
            field: Playfield::new(config.field_height, config.fall_speed, config.spawn_offset),
            spawner: Spawner::new(config.spawn_mode.clone(), config.lane_count, rng),
            judge: Judge::new(&config),
            score: ScoreBoard::new(&config),
            scheduler: SpawnScheduler::new(bpm),
            frame: FrameClock::new(config.max_frame_delta),
            countdown: None,
            events: Vec::new(),
            config,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Active objects in spawn order.
    pub fn objects(&self) -> impl Iterator<Item = &FallingObject> {
        self.field.iter()
    }

    pub fn pattern_index(&self) -> usize {
        self.spawner.pattern_index()
    }

    pub fn is_spawning(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            score: self.score.score(),
            hits: self.score.hits(),
            misses: self.score.misses(),
            combo: self.score.combo(),
            max_combo: self.score.max_combo(),
            accuracy_pct: self.score.accuracy_pct(),
            bpm: self.bpm,
            phase: self.phase,
            active_objects: self.field.len(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Phase transitions ---------------------------------------------------

    fn set_phase(&mut self, phase: Phase) {
        log::info!("phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.events.push(GameEvent::PhaseChanged { phase });
    }

    fn ignored(&self, action: &str) -> bool {
        log::debug!("{action} ignored in phase {}", self.phase);
        false
    }

    pub fn show_help(&mut self) -> bool {
        if self.phase != Phase::Welcome {
            return self.ignored("show_help");
        }
        self.set_phase(Phase::Tutorial);
        true
    }

    pub fn close_help(&mut self) -> bool {
        if self.phase != Phase::Tutorial {
            return self.ignored("close_help");
        }
        self.set_phase(Phase::Welcome);
        true
    }

    /// Begin a fresh play-through: counters are cleared and the countdown starts.
    pub fn start(&mut self, now: f64) -> bool {
        if self.phase != Phase::Welcome {
            return self.ignored("start");
        }
        self.clear_state();
        self.set_phase(Phase::Countdown);
        let mut countdown = Countdown::new(
            now,
            self.config.countdown_step_ms,
            self.config.countdown_gap_ms,
        );
        for step in countdown.poll(now) {
            self.events.push(GameEvent::CountdownTick { step });
        }
        self.countdown = Some(countdown);
        true
    }

    fn enter_playing(&mut self, now: f64) {
        self.countdown = None;
        self.frame.reset();
        self.frame.delta(now);
        self.scheduler.start(now);
        self.set_phase(Phase::Playing);
    }

    /// Stop spawning and motion; pending spawn and combo deadlines are frozen.
    pub fn pause(&mut self, now: f64) -> bool {
        if self.phase != Phase::Playing {
            return self.ignored("pause");
        }
        self.scheduler.pause(now);
        self.score.pause_timer(now);
        self.frame.reset();
        self.set_phase(Phase::Paused);
        true
    }

    /// Continue from a pause with a fresh frame baseline (no catch-up motion).
    pub fn resume(&mut self, now: f64) -> bool {
        if self.phase != Phase::Paused {
            return self.ignored("resume");
        }
        self.frame.reset();
        self.frame.delta(now);
        self.scheduler.resume(now);
        self.score.resume_timer(now);
        self.set_phase(Phase::Playing);
        true
    }

    /// One control for start / pause / resume.
    pub fn toggle(&mut self, now: f64) -> bool {
        match self.phase {
            Phase::Welcome => self.start(now),
            Phase::Playing => self.pause(now),
            Phase::Paused => self.resume(now),
            _ => self.ignored("toggle"),
        }
    }

    /// Pause when playing, resume when paused.
    pub fn escape(&mut self, now: f64) -> bool {
        match self.phase {
            Phase::Playing => self.pause(now),
            Phase::Paused => self.resume(now),
            _ => self.ignored("escape"),
        }
    }

    /// End the play-through: clear objects and counters, then return to `Welcome`.
    pub fn reset(&mut self) -> bool {
        if !self.phase.is_in_game() {
            return self.ignored("reset");
        }
        let stats = self.stats();
        log::info!(
            "session ended: score {} hits {} misses {} max combo {}",
            stats.score,
            stats.hits,
            stats.misses,
            stats.max_combo
        );
        self.clear_state();
        self.set_phase(Phase::Ended);
        self.set_phase(Phase::Welcome);
        true
    }

    fn clear_state(&mut self) {
        self.scheduler.stop();
        self.frame.reset();
        self.countdown = None;
        self.field.clear();
        self.spawner.reset();
        self.score.reset();
        self.events.push(GameEvent::ScoreChanged { score: 0 });
        self.push_combo();
    }

    // --- Tempo ---------------------------------------------------------------

    /// Clamp and apply a new tempo. The pending spawn keeps its deadline; the
    /// new spacing starts after it. Returns the tempo actually applied.
    pub fn set_bpm(&mut self, bpm: u32) -> u32 {
        let bpm = clamp_bpm(bpm);
        if bpm != self.bpm {
            log::debug!("bpm {} -> {}", self.bpm, bpm);
        }
        self.bpm = bpm;
        self.scheduler.set_bpm(bpm);
        bpm
    }

    // --- Simulation ----------------------------------------------------------

    /// Per-frame entry point.
    pub fn tick(&mut self, now: f64) {
        match self.phase {
            Phase::Countdown => self.tick_countdown(now),
            Phase::Playing => {
                let dt = self.frame.delta(now);
                self.advance(dt);
                while let Some(at) = self.scheduler.pop_due(now) {
                    // A spawn due earlier in this frame starts as far down as
                    // the field moved since its deadline.
                    let lead = ((now - at) / 1000.0).clamp(0.0, dt);
                    self.spawn_with_lead(at, lead);
                }
                self.expire_combo(now);
            }
            _ => {}
        }
    }

    fn tick_countdown(&mut self, now: f64) {
        let Some(countdown) = self.countdown.as_mut() else {
            return;
        };
        let steps = countdown.poll(now);
        let finished = countdown.is_finished(now);
        self.events
            .extend(steps.into_iter().map(|step| GameEvent::CountdownTick { step }));
        if finished {
            self.enter_playing(now);
        }
    }

    /// Move every object by `dt` seconds and score timeout misses. Returns the
    /// number of objects that left the field. No-op outside `Playing`.
    pub fn advance(&mut self, dt: f64) -> usize {
        if self.phase != Phase::Playing {
            return 0;
        }
        let missed = self.field.advance(dt);
        if dt > 0.0 {
            let moved = self.field.iter().map(|o| GameEvent::ObjectAdvanced {
                id: o.id,
                position: o.position,
            });
            self.events.extend(moved);
        }
        let count = missed.len();
        for obj in missed {
            self.events.push(GameEvent::ObjectRetired {
                id: obj.id,
                status: obj.status,
            });
            self.record_miss(obj.lane, MissCause::Timeout);
        }
        count
    }

    /// Create one note in the next lane chosen by the spawner. No-op outside `Playing`.
    pub fn spawn(&mut self, now: f64) -> Option<ObjectId> {
        self.spawn_with_lead(now, 0.0)
    }

    fn spawn_with_lead(&mut self, now: f64, lead_s: f64) -> Option<ObjectId> {
        if self.phase != Phase::Playing {
            return None;
        }
        let lane = self.spawner.next_lane();
        let position = self.config.spawn_offset + self.config.fall_speed * lead_s;
        let id = self.field.spawn_at(lane, position, now);
        log::debug!("spawned {id:?} in lane {lane}");
        self.events.push(GameEvent::ObjectSpawned { id, lane });
        Some(id)
    }

    // --- Input ---------------------------------------------------------------

    /// Judge a press on `lane`. Returns `None` when presses are not accepted
    /// (outside `Playing`, or lane out of range).
    pub fn on_lane_press(&mut self, lane: u8, now: f64) -> Option<Verdict> {
        if self.phase != Phase::Playing {
            self.ignored("lane press");
            return None;
        }
        if lane >= self.config.lane_count {
            log::warn!("press on unknown lane {lane}");
            return None;
        }
        self.expire_combo(now);
        let verdict = self.judge.attempt_hit(&mut self.field, lane);
        match verdict {
            Verdict::Hit {
                id,
                lane,
                accuracy,
                rating,
            } => {
                let award = self.score.on_hit(accuracy, now);
                self.events.push(GameEvent::ObjectRetired {
                    id,
                    status: ObjectStatus::Hit,
                });
                self.events.push(GameEvent::Hit {
                    id,
                    lane,
                    accuracy,
                    rating,
                    points: award.points,
                });
                self.push_combo();
                if award.milestone {
                    self.events
                        .push(GameEvent::ComboMilestone { combo: award.combo });
                }
                self.events.push(GameEvent::ScoreChanged {
                    score: self.score.score(),
                });
            }
            Verdict::Miss { lane } => self.record_miss(lane, MissCause::Press),
        }
        Some(verdict)
    }

    fn record_miss(&mut self, lane: u8, cause: MissCause) {
        self.score.on_miss();
        self.events.push(GameEvent::Miss { lane, cause });
        self.push_combo();
    }

    fn expire_combo(&mut self, now: f64) {
        if self.score.poll_combo_timeout(now) {
            log::debug!("combo expired");
            self.push_combo();
        }
    }

    fn push_combo(&mut self) {
        let combo = self.score.combo();
        self.events.push(GameEvent::ComboChanged {
            combo,
            tier: ComboTier::for_combo(combo),
        });
    }
}

#[cfg(feature = "rng")]
fn lane_rng(config: &GameConfig) -> LaneRng {
    LaneRng::from_entropy(config.seed)
}

#[cfg(not(feature = "rng"))]
fn lane_rng(config: &GameConfig) -> LaneRng {
    LaneRng::new(config.seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnMode;

    /// Session already in `Playing` at t = 0 (countdown run to completion).
    fn playing(config: GameConfig) -> GameSession {
        let mut s = GameSession::new(config).unwrap();
        assert!(s.start(-10_000.0));
        s.tick(0.0);
        assert_eq!(s.phase(), Phase::Playing);
        s.drain_events();
        s
    }

    #[test]
    fn start_runs_countdown_then_plays() {
        let mut s = GameSession::new(GameConfig::default()).unwrap();
        assert!(s.start(0.0));
        assert_eq!(s.phase(), Phase::Countdown);
        s.tick(1_000.0);
        s.tick(3_000.0);
        assert_eq!(s.phase(), Phase::Countdown);
        s.tick(3_100.0);
        assert_eq!(s.phase(), Phase::Playing);
        let steps: Vec<CountdownStep> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::CountdownTick { step } => Some(step),
                _ => None,
            })
            .collect();
        assert_eq!(steps, CountdownStep::SEQUENCE.to_vec());
        assert!(s.is_spawning());
    }

    #[test]
    fn operations_outside_playing_are_noops() {
        let mut s = GameSession::new(GameConfig::default()).unwrap();
        assert_eq!(s.spawn(0.0), None);
        assert_eq!(s.advance(1.0), 0);
        assert_eq!(s.on_lane_press(0, 0.0), None);
        assert!(!s.pause(0.0));
        assert!(!s.resume(0.0));
        assert!(!s.reset());
        assert_eq!(s.stats().misses, 0);
    }

    #[test]
    fn help_round_trip() {
        let mut s = GameSession::new(GameConfig::default()).unwrap();
        assert!(s.show_help());
        assert_eq!(s.phase(), Phase::Tutorial);
        assert!(!s.start(0.0));
        assert!(s.close_help());
        assert_eq!(s.phase(), Phase::Welcome);
    }

    #[test]
    fn spawns_follow_cadence() {
        let mut s = playing(GameConfig::default());
        // 120 bpm -> one spawn every 250ms, first at 250.
        for t in (16..=1_000).step_by(16) {
            s.tick(t as f64);
        }
        s.tick(1_000.0);
        let spawned = s
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::ObjectSpawned { .. }))
            .count();
        assert_eq!(spawned, 4);
    }

    #[test]
    fn pause_freezes_motion_and_spawns() {
        let mut s = playing(GameConfig::default());
        s.tick(300.0);
        let id = s.objects().next().unwrap().id;
        let pos = s.objects().next().unwrap().position;
        assert!(s.pause(300.0));
        s.tick(5_000.0);
        assert_eq!(s.objects().count(), 1);
        assert!(s.resume(10_000.0));
        // First tick after resume carries no delta.
        s.tick(10_000.0);
        let obj = s.objects().find(|o| o.id == id).unwrap();
        assert_eq!(obj.position, pos);
        // Pending spawn was 200ms away at pause time.
        s.tick(10_199.0);
        assert_eq!(s.objects().count(), 1);
        s.tick(10_200.0);
        assert_eq!(s.objects().count(), 2);
    }

    #[test]
    fn reset_clears_everything_and_returns_to_welcome() {
        let mut s = playing(GameConfig::default());
        s.tick(600.0);
        s.on_lane_press(0, 600.0);
        assert!(s.reset());
        let stats = s.stats();
        assert_eq!(stats.phase, Phase::Welcome);
        assert_eq!((stats.score, stats.hits, stats.misses, stats.combo), (0, 0, 0, 0));
        assert_eq!(stats.active_objects, 0);
        assert_eq!(s.pattern_index(), 0);
        assert!(!s.is_spawning());
        let phases: Vec<Phase> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::PhaseChanged { phase } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![Phase::Ended, Phase::Welcome]);
    }

    #[test]
    fn reset_tells_the_display_counters_are_zero() {
        let cfg = GameConfig {
            spawn_offset: 445.0,
            ..GameConfig::default()
        };
        let mut s = playing(cfg);
        s.spawn(0.0);
        assert!(s.on_lane_press(0, 0.0).is_some_and(|v| v.is_hit()));
        s.drain_events();
        assert!(s.reset());
        assert_eq!(
            s.drain_events(),
            vec![
                GameEvent::ScoreChanged { score: 0 },
                GameEvent::ComboChanged {
                    combo: 0,
                    tier: ComboTier::None
                },
                GameEvent::PhaseChanged {
                    phase: Phase::Ended
                },
                GameEvent::PhaseChanged {
                    phase: Phase::Welcome
                },
            ]
        );
    }

    #[test]
    fn press_after_deadline_expires_combo_before_scoring() {
        let cfg = GameConfig {
            spawn_offset: 445.0,
            spawn_mode: SpawnMode::Pattern(vec![1]),
            ..GameConfig::default()
        };
        let mut s = playing(cfg);
        s.spawn(0.0);
        assert!(s.on_lane_press(1, 0.0).is_some_and(|v| v.is_hit()));
        s.spawn(5_000.0);
        s.drain_events();
        // No tick between the two hits.
        assert!(s.on_lane_press(1, 5_000.0).is_some_and(|v| v.is_hit()));
        let stats = s.stats();
        assert_eq!(stats.combo, 1);
        assert_eq!(stats.score, 330);
        let combos: Vec<u32> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::ComboChanged { combo, .. } => Some(combo),
                _ => None,
            })
            .collect();
        assert_eq!(combos, vec![0, 1]);
    }

    #[test]
    fn late_frame_replays_spawns_in_order_spaced_by_their_deadlines() {
        let cfg = GameConfig {
            max_frame_delta: 1.0,
            ..GameConfig::default()
        };
        let mut s = playing(cfg);
        // 120 bpm: deadlines at 250, 500 and 750 all fall inside this frame.
        s.tick(900.0);
        let spawned: Vec<(ObjectId, u8)> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::ObjectSpawned { id, lane } => Some((id, lane)),
                _ => None,
            })
            .collect();
        let lanes: Vec<u8> = spawned.iter().map(|&(_, lane)| lane).collect();
        assert_eq!(lanes, vec![0, 1, 2]);
        let objects: Vec<&FallingObject> = s.objects().collect();
        assert_eq!(objects.len(), 3);
        for (obj, (id, _)) in objects.iter().zip(&spawned) {
            assert_eq!(obj.id, *id);
        }
        let expected = [70.0, 20.0, -30.0];
        for (obj, want) in objects.iter().zip(expected) {
            assert!((obj.position - want).abs() < 1e-6, "{} vs {want}", obj.position);
        }
        assert_eq!(
            objects.iter().map(|o| o.spawn_time_ms).collect::<Vec<_>>(),
            vec![250.0, 500.0, 750.0]
        );
    }

    #[test]
    fn stalled_frame_keeps_backlog_inside_the_motion_cap() {
        let mut s = playing(GameConfig::default());
        // Motion is capped at 0.25s, so no backlog spawn leads by more than that.
        s.tick(900.0);
        let positions: Vec<f64> = s.objects().map(|o| o.position).collect();
        assert_eq!(positions.len(), 3);
        assert!(positions.windows(2).all(|w| w[0] >= w[1]));
        assert!(positions.iter().all(|&p| (-60.0..=-10.0 + 1e-6).contains(&p)));
    }

    #[test]
    fn press_hit_emits_score_events() {
        let cfg = GameConfig {
            spawn_offset: 445.0,
            spawn_mode: SpawnMode::Pattern(vec![2]),
            ..GameConfig::default()
        };
        let mut s = playing(cfg);
        let id = s.spawn(0.0).unwrap();
        s.drain_events();
        let verdict = s.on_lane_press(2, 0.0).unwrap();
        assert!(verdict.is_hit());
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::ObjectRetired {
            id,
            status: ObjectStatus::Hit
        }));
        assert!(events.contains(&GameEvent::ScoreChanged { score: 165 }));
        assert!(events.contains(&GameEvent::ComboChanged {
            combo: 1,
            tier: ComboTier::Active
        }));
    }

    #[test]
    fn toggle_walks_start_pause_resume() {
        let mut s = GameSession::new(GameConfig::default()).unwrap();
        assert!(s.toggle(0.0));
        assert_eq!(s.phase(), Phase::Countdown);
        assert!(!s.toggle(100.0));
        s.tick(10_000.0);
        assert!(s.toggle(10_000.0));
        assert_eq!(s.phase(), Phase::Paused);
        assert!(s.escape(11_000.0));
        assert_eq!(s.phase(), Phase::Playing);
    }

    #[test]
    fn set_bpm_clamps() {
        let mut s = GameSession::new(GameConfig::default()).unwrap();
        assert_eq!(s.set_bpm(20), 40);
        assert_eq!(s.set_bpm(400), 300);
        assert_eq!(s.bpm(), 300);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = GameConfig {
            lane_count: 0,
            ..GameConfig::default()
        };
        assert!(matches!(GameSession::new(cfg), Err(ConfigError::NoLanes)));
    }
}
