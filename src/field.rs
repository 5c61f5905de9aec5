//! Falling-object simulation: the set of notes in flight and their motion.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Generated per-note identity; monotonically increasing, so map order is spawn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ObjectId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ObjectStatus {
    Active,
    Hit,
    Missed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FallingObject {
    pub id: ObjectId,
    pub lane: u8,
    /// Offset of the object's top edge from the field top, in px.
    pub position: f64,
    pub spawn_time_ms: f64,
    pub status: ObjectStatus,
}

impl FallingObject {
    pub fn center(&self, size: f64) -> f64 {
        self.position + size / 2.0
    }
}

/// Owns every active object. Objects leave the map the moment they stop being
/// `Active`; the returned copy carries the terminal status.
#[derive(Debug, Clone)]
pub struct Playfield {
    objects: BTreeMap<ObjectId, FallingObject>,
    next_id: u64,
    field_height: f64,
    fall_speed: f64,
    spawn_offset: f64,
}

impl Playfield {
    pub fn new(field_height: f64, fall_speed: f64, spawn_offset: f64) -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id: 1,
            field_height,
            fall_speed,
            spawn_offset,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&FallingObject> {
        self.objects.get(&id)
    }

    /// Active objects in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.values()
    }

    /// Insert a new object at the configured spawn offset.
    pub fn spawn(&mut self, lane: u8, now_ms: f64) -> ObjectId {
        self.spawn_at(lane, self.spawn_offset, now_ms)
    }

    pub fn spawn_at(&mut self, lane: u8, position: f64, now_ms: f64) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(
            id,
            FallingObject {
                id,
                lane,
                position,
                spawn_time_ms: now_ms,
                status: ObjectStatus::Active,
            },
        );
        id
    }

    /// Move every object down by `fall_speed * dt` and retire the ones that
    /// left the field. Each retired object is returned exactly once, as `Missed`.
    pub fn advance(&mut self, dt: f64) -> Vec<FallingObject> {
        if dt.is_nan() || dt <= 0.0 {
            return Vec::new();
        }
        let step = self.fall_speed * dt;
        for obj in self.objects.values_mut() {
            obj.position += step;
        }
        let gone: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|o| o.position > self.field_height)
            .map(|o| o.id)
            .collect();
        gone.into_iter()
            .filter_map(|id| self.retire(id, ObjectStatus::Missed))
            .collect()
    }

    /// Remove an object, stamping it with its terminal status.
    pub fn retire(&mut self, id: ObjectId, status: ObjectStatus) -> Option<FallingObject> {
        let mut obj = self.objects.remove(&id)?;
        obj.status = status;
        Some(obj)
    }

    /// Drop every object. Ids keep counting up so stale handles never alias.
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
