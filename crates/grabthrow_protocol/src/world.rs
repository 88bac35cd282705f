use std::collections::BTreeMap;

use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::interaction::{TraceRay, WorldQuery};
use crate::protocol::{CharacterId, ObjectId};

pub const OBJECT_GRAVITY: f32 = 980.0;
pub const OBJECT_TERMINAL_VELOCITY: f32 = 4000.0;
/// Fraction of horizontal speed lost per second while sliding on the ground.
pub const GROUND_FRICTION: f32 = 4.0;
/// Offset of the carried object from the holder's capsule centre, in view space.
pub const HAND_OFFSET: Vec3 = Vec3::new(30.0, 20.0, -50.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Can be picked up and thrown.
    Throwable,
    /// Blocks the view ray but cannot be picked up.
    Prop,
}

impl ObjectKind {
    pub fn is_interactable(self) -> bool {
        matches!(self, ObjectKind::Throwable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub kind: ObjectKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    pub holder: Option<CharacterId>,
    pub grounded: bool,
}

impl WorldObject {
    pub fn new(kind: ObjectKind, position: Vec3, radius: f32) -> Self {
        Self {
            kind,
            position,
            velocity: Vec3::ZERO,
            radius,
            holder: None,
            grounded: position.y <= radius,
        }
    }

    /// Whether the object is moving under its own simulation.
    pub fn is_moving(&self) -> bool {
        self.holder.is_none() && (!self.grounded || self.velocity != Vec3::ZERO)
    }
}

/// All pickable and blocking objects, keyed by id.
///
/// A `BTreeMap` keeps iteration in id order so trace ties resolve the same way
/// on every peer.
#[derive(Debug, Default, Clone)]
pub struct ObjectWorld {
    pub objects: BTreeMap<ObjectId, WorldObject>,
}

impl ObjectWorld {
    pub fn insert(&mut self, id: ObjectId, object: WorldObject) {
        self.objects.insert(id, object);
    }

    pub fn get(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.get_mut(&id)
    }

    /// Hand an object to a holder. It stops simulating and stops blocking traces.
    pub fn attach(&mut self, id: ObjectId, holder: CharacterId) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.holder = Some(holder);
            object.velocity = Vec3::ZERO;
            object.grounded = false;
        }
    }

    /// Release an object at a position with a velocity.
    pub fn release(&mut self, id: ObjectId, position: Vec3, velocity: Vec3) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.holder = None;
            object.position = position;
            object.velocity = velocity;
            object.grounded = false;
        }
    }

    /// Advance free objects by `dt` and return the ids that moved.
    pub fn step(&mut self, dt: f32) -> Vec<ObjectId> {
        let mut moved = Vec::new();
        for (&id, object) in self.objects.iter_mut() {
            if !object.is_moving() {
                continue;
            }

            if object.grounded {
                let damping = (1.0 - GROUND_FRICTION * dt).max(0.0);
                object.velocity.x *= damping;
                object.velocity.z *= damping;
                if object.velocity.x.abs() < 1.0 && object.velocity.z.abs() < 1.0 {
                    object.velocity = Vec3::ZERO;
                    continue;
                }
            } else {
                object.velocity.y -= OBJECT_GRAVITY * dt;
                object.velocity.y = object.velocity.y.max(-OBJECT_TERMINAL_VELOCITY);
            }

            object.position += object.velocity * dt;

            if object.position.y <= object.radius {
                object.position.y = object.radius;
                object.velocity.y = 0.0;
                object.grounded = true;
            }
            moved.push(id);
        }
        moved
    }
}

/// Point where a segment enters a sphere, as a fraction of the segment.
/// A start inside the sphere counts as a hit at 0.
pub fn segment_sphere_entry(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let d = end - start;
    let m = start - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let a = d.length_squared();
    if a == 0.0 {
        return None;
    }
    let b = m.dot(d);
    if b > 0.0 {
        // Starting outside and pointing away.
        return None;
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / a;
    (t <= 1.0).then_some(t.max(0.0))
}

impl WorldQuery for ObjectWorld {
    fn trace_nearest(&self, ray: &TraceRay) -> Option<ObjectId> {
        // Spheres only: complex and simple collision coincide, so `trace_complex` is moot.
        let mut best: Option<(f32, ObjectId)> = None;
        for (&id, object) in &self.objects {
            if object.holder.is_some() {
                continue;
            }
            let Some(t) = segment_sphere_entry(ray.start, ray.end, object.position, object.radius)
            else {
                continue;
            };
            if best.is_none_or(|(best_t, _)| t < best_t) {
                best = Some((t, id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn is_interactable(&self, object: ObjectId) -> bool {
        self.objects
            .get(&object)
            .is_some_and(|o| o.kind.is_interactable() && o.holder.is_none())
    }

    fn position_of(&self, object: ObjectId) -> Option<Vec3> {
        self.objects.get(&object).map(|o| o.position)
    }
}
