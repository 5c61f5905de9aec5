//! Game tunables. Every constant the engine uses lives on [`GameConfig`] so a
//! host can override any of them (from JSON when the `serde_json` feature is on).

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const LANE_COUNT: u8 = 4;
pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 120;

/// Drum groove: kick, hat, snare, hat, kick, hat, tom, hat.
pub const DEFAULT_PATTERN: [u8; 8] = [0, 1, 2, 1, 0, 1, 3, 1];

/// Physical key codes bound to lanes 0..=3.
pub const LANE_KEYS: [&str; 4] = ["KeyD", "KeyF", "KeyJ", "KeyK"];

/// Map a `KeyboardEvent.code` to its lane, if it is one of the lane keys.
pub fn lane_for_key(code: &str) -> Option<u8> {
    LANE_KEYS.iter().position(|k| *k == code).map(|i| i as u8)
}

/// Clamp a requested tempo into the supported range.
pub fn clamp_bpm(bpm: u32) -> u32 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// How the spawner picks the lane of the next note.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpawnMode {
    /// Cycle through a fixed lane sequence.
    Pattern(Vec<u8>),
    /// Uniform choice over all lanes.
    Random,
}

impl Default for SpawnMode {
    fn default() -> Self {
        SpawnMode::Pattern(DEFAULT_PATTERN.to_vec())
    }
}

/// Which overlapping object a press claims when several qualify.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchPolicy {
    /// Smallest center-to-center distance to the target zone.
    #[default]
    Closest,
    /// Oldest overlapping object (spawn order).
    FirstInOrder,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    pub lane_count: u8,
    /// Play-field height in px; objects past this are timeout misses.
    pub field_height: f64,
    /// Square object edge in px.
    pub object_size: f64,
    pub target_zone_height: f64,
    /// Extra px of tolerance on both edges of the target zone.
    pub zone_slack: f64,
    /// Fall speed in px per second.
    pub fall_speed: f64,
    /// Initial position of new objects (negative = above the field).
    pub spawn_offset: f64,
    pub bpm: u32,
    pub spawn_mode: SpawnMode,
    pub match_policy: MatchPolicy,
    /// When false, every hit scores as accuracy 1.0 and rates Perfect.
    pub graded: bool,
    pub base_points: f64,
    pub combo_step: f64,
    pub combo_timeout_ms: f64,
    /// A combo notification fires when combo is a multiple of this.
    pub combo_milestone: u32,
    pub perfect_threshold: f64,
    pub countdown_step_ms: f64,
    pub countdown_gap_ms: f64,
    /// Upper bound on a single frame's delta, in seconds.
    pub max_frame_delta: f64,
    /// Seed for random mode when no platform entropy is used.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            lane_count: LANE_COUNT,
            field_height: 500.0,
            object_size: 60.0,
            target_zone_height: 50.0,
            zone_slack: 0.0,
            fall_speed: 200.0,
            spawn_offset: -60.0,
            bpm: DEFAULT_BPM,
            spawn_mode: SpawnMode::default(),
            match_policy: MatchPolicy::Closest,
            graded: true,
            base_points: 100.0,
            combo_step: 0.1,
            combo_timeout_ms: 2000.0,
            combo_milestone: 10,
            perfect_threshold: 0.8,
            countdown_step_ms: 700.0,
            countdown_gap_ms: 100.0,
            max_frame_delta: 0.25,
            seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

impl GameConfig {
    /// Top edge of the target zone; the zone sits flush with the field bottom.
    pub fn target_top(&self) -> f64 {
        self.field_height - self.target_zone_height
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 {
            return Err(ConfigError::NoLanes);
        }
        let positive = [
            ("field_height", self.field_height),
            ("object_size", self.object_size),
            ("target_zone_height", self.target_zone_height),
            ("fall_speed", self.fall_speed),
            ("base_points", self.base_points),
            ("max_frame_delta", self.max_frame_delta),
            ("combo_timeout_ms", self.combo_timeout_ms),
            ("countdown_step_ms", self.countdown_step_ms),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive(name));
            }
        }
        let non_negative = [
            ("zone_slack", self.zone_slack),
            ("countdown_gap_ms", self.countdown_gap_ms),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative(name));
            }
        }
        if self.target_zone_height > self.field_height {
            return Err(ConfigError::ZoneTooTall);
        }
        if !(0.0..=1.0).contains(&self.perfect_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.perfect_threshold));
        }
        if self.combo_milestone == 0 {
            return Err(ConfigError::NotPositive("combo_milestone"));
        }
        if let SpawnMode::Pattern(pattern) = &self.spawn_mode {
            if pattern.is_empty() {
                return Err(ConfigError::EmptyPattern);
            }
            if let Some(&lane) = pattern.iter().find(|&&l| l >= self.lane_count) {
                return Err(ConfigError::LaneOutOfRange(lane));
            }
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON config; absent fields keep their defaults.
    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut cfg: GameConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.bpm = clamp_bpm(cfg.bpm);
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoLanes,
    NotPositive(&'static str),
    Negative(&'static str),
    ThresholdOutOfRange(f64),
    ZoneTooTall,
    EmptyPattern,
    LaneOutOfRange(u8),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoLanes => write!(f, "lane_count must be at least 1"),
            ConfigError::NotPositive(name) => write!(f, "{name} must be positive"),
            ConfigError::Negative(name) => write!(f, "{name} must not be negative"),
            ConfigError::ThresholdOutOfRange(t) => {
                write!(f, "perfect_threshold {t} is outside [0, 1]")
            }
            ConfigError::ZoneTooTall => write!(f, "target zone is taller than the field"),
            ConfigError::EmptyPattern => write!(f, "spawn pattern is empty"),
            ConfigError::LaneOutOfRange(l) => write!(f, "pattern lane {l} is out of range"),
            ConfigError::Parse(msg) => write!(f, "invalid config json: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
