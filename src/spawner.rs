//! Lane selection for new notes: either a cyclic rhythm pattern or a uniform
//! random pick.

use crate::config::SpawnMode;

/// 64-bit LCG (Knuth MMIX constants). Not crypto secure; only used to scatter
/// notes across lanes.
#[derive(Debug, Clone)]
pub struct LaneRng {
    state: u64,
}

impl LaneRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from platform entropy, falling back to `fallback` if unavailable.
    #[cfg(feature = "rng")]
    pub fn from_entropy(fallback: u64) -> Self {
        let mut buf = [0u8; 8];
        match getrandom::getrandom(&mut buf) {
            Ok(()) => Self::new(u64::from_le_bytes(buf)),
            Err(e) => {
                log::warn!("no entropy source ({e}); using configured seed");
                Self::new(fallback)
            }
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 32) as u32
    }

    /// Uniform-ish integer in `[0, n)`.
    pub fn below(&mut self, n: u8) -> u8 {
        if n <= 1 {
            return 0;
        }
        ((self.next_u32() as u64 * n as u64) >> 32) as u8
    }
}

#[derive(Debug, Clone)]
pub struct Spawner {
    mode: SpawnMode,
    lane_count: u8,
    pattern_index: usize,
    rng: LaneRng,
}

impl Spawner {
    pub fn new(mode: SpawnMode, lane_count: u8, rng: LaneRng) -> Self {
        Self {
            mode,
            lane_count,
            pattern_index: 0,
            rng,
        }
    }

    pub fn pattern_index(&self) -> usize {
        self.pattern_index
    }

    /// Lane for the next note. In pattern mode the index advances exactly once
    /// per call, wrapping at the pattern length.
    pub fn next_lane(&mut self) -> u8 {
        match &self.mode {
            SpawnMode::Pattern(pattern) if !pattern.is_empty() => {
                let lane = pattern[self.pattern_index % pattern.len()];
                self.pattern_index = (self.pattern_index + 1) % pattern.len();
                lane
            }
            _ => self.rng.below(self.lane_count),
        }
    }

    /// Rewind the pattern to its first step.
    pub fn reset(&mut self) {
        self.pattern_index = 0;
    }
}
