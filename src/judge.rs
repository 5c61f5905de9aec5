//! Hit detection and timing grade for a lane press.

use crate::config::{GameConfig, MatchPolicy};
use crate::field::{ObjectId, ObjectStatus, Playfield};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Fixed vertical band where presses can land.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetZone {
    pub top: f64,
    pub height: f64,
    /// Tolerance added above and below the band for overlap tests only.
    pub slack: f64,
}

impl TargetZone {
    pub fn center(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// Inclusive span overlap between `[position, position + size]` and the zone.
    pub fn overlaps(&self, position: f64, size: f64) -> bool {
        let zone_top = self.top - self.slack;
        let zone_bottom = self.top + self.height + self.slack;
        position + size >= zone_top && position <= zone_bottom
    }

    /// `1 - |Δcenter| / (height / 2)`, clamped to `[0, 1]`.
    pub fn accuracy(&self, object_center: f64) -> f64 {
        let half = self.height / 2.0;
        (1.0 - (self.center() - object_center).abs() / half).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Rating {
    Perfect,
    Early,
    Late,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "outcome", rename_all = "snake_case"))]
pub enum Verdict {
    Hit {
        id: ObjectId,
        lane: u8,
        accuracy: f64,
        rating: Rating,
    },
    /// Press with nothing to claim in the zone.
    Miss { lane: u8 },
}

impl Verdict {
    pub fn is_hit(&self) -> bool {
        matches!(self, Verdict::Hit { .. })
    }

    pub fn lane(&self) -> u8 {
        match self {
            Verdict::Hit { lane, .. } | Verdict::Miss { lane } => *lane,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Judge {
    zone: TargetZone,
    object_size: f64,
    policy: MatchPolicy,
    perfect_threshold: f64,
    graded: bool,
}

impl Judge {
    pub fn new(cfg: &GameConfig) -> Self {
        Self {
            zone: TargetZone {
                top: cfg.target_top(),
                height: cfg.target_zone_height,
                slack: cfg.zone_slack,
            },
            object_size: cfg.object_size,
            policy: cfg.match_policy,
            perfect_threshold: cfg.perfect_threshold,
            graded: cfg.graded,
        }
    }

    pub fn zone(&self) -> &TargetZone {
        &self.zone
    }

    /// Claim the best object in `lane` overlapping the target zone. A claimed
    /// object is retired from `field` as `Hit`; otherwise the press is a miss.
    pub fn attempt_hit(&self, field: &mut Playfield, lane: u8) -> Verdict {
        let target = self.zone.center();
        // Scoped so the shared borrow of `field` ends before `retire`.
        let chosen = {
            let mut candidates = field
                .iter()
                .filter(|o| o.lane == lane && self.zone.overlaps(o.position, self.object_size));
            match self.policy {
                MatchPolicy::FirstInOrder => candidates.next(),
                MatchPolicy::Closest => candidates.min_by(|a, b| {
                    let da = (a.center(self.object_size) - target).abs();
                    let db = (b.center(self.object_size) - target).abs();
                    da.total_cmp(&db)
                }),
            }
            .map(|o| (o.id, o.center(self.object_size)))
        };

        let Some((id, center)) = chosen else {
            return Verdict::Miss { lane };
        };
        field.retire(id, ObjectStatus::Hit);

        if !self.graded {
            return Verdict::Hit {
                id,
                lane,
                accuracy: 1.0,
                rating: Rating::Perfect,
            };
        }
        let accuracy = self.zone.accuracy(center);
        let rating = if accuracy > self.perfect_threshold {
            Rating::Perfect
        } else if center < target {
            Rating::Early
        } else {
            Rating::Late
        };
        Verdict::Hit {
            id,
            lane,
            accuracy,
            rating,
        }
    }
}
