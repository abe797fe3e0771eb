//! Collision and hit resolution.
//!
//! Geometry is somebody else's problem: a [`PhysicsQuery`] fills a
//! fixed-capacity [`HitBuffer`] with raw overlaps, and the
//! [`CollisionPipeline`] turns those into throttled, capped, eligible
//! [`HitRecord`]s dispatched as signals.

mod buffer;
mod collider;
mod pipeline;

pub use buffer::{HitBuffer, PhysicsQuery};
pub use collider::HitCollider;
pub use pipeline::{CollisionPipeline, HitCheck};

use crate::components::ObjectHandle;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_core::ecs::Entity;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    Capsule { radius: f32, half_height: f32 },
}

impl ColliderShape {
    /// Radius of a sphere enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            ColliderShape::Sphere { radius } => radius,
            ColliderShape::Box { half_extents } => half_extents.length(),
            ColliderShape::Capsule {
                radius,
                half_height,
            } => radius + half_height,
        }
    }
}

fn active_by_default() -> bool {
    true
}

/// How a collider hits: throttling, caps and side rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColliderSpec {
    pub shape: ColliderShape,
    /// Minimum seconds between two checks that found something.
    #[serde(default)]
    pub hit_interval: f64,
    #[serde(default)]
    pub max_hits: Option<u32>,
    #[serde(default)]
    pub max_hits_per_target: Option<u32>,
    /// Reaching `max_hits` kills the owner.
    #[serde(default)]
    pub destroy_on_hit: bool,
    #[serde(default = "active_by_default")]
    pub ignore_obstacles: bool,
    /// Hitting another collider also resolves the hit the other way round.
    #[serde(default)]
    pub bidirectional: bool,
    /// Whether this collider queries for hits itself.
    #[serde(default = "active_by_default")]
    pub active_as_source: bool,
}

impl ColliderSpec {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            hit_interval: 0.0,
            max_hits: None,
            max_hits_per_target: None,
            destroy_on_hit: false,
            ignore_obstacles: true,
            bidirectional: false,
            active_as_source: true,
        }
    }
}

/// When a bidirectional hit is resolved from the struck side as well.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymmetricHitPolicy {
    /// Only when the struck collider is itself an enabled, active source.
    #[default]
    ActiveSourcesOnly,
    /// Whenever the struck entity carries a collider, passive ones included.
    Always,
    Never,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HitKind {
    /// The main body of an entity.
    Entity,
    /// Static scenery.
    Obstacle,
    /// A secondary hit zone of an entity.
    SubPart,
}

/// One overlap as reported by the physics query.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RawHit {
    pub object: ObjectHandle,
    pub point: Vec3,
    pub normal: Vec3,
    pub kind: HitKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Entity(Entity),
    Obstacle(ObjectHandle),
}

/// A validated hit, alive for the tick it was produced in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HitRecord {
    /// The collider owner.
    pub source: Entity,
    pub target: HitTarget,
    pub point: Vec3,
    pub normal: Vec3,
    pub kind: HitKind,
}
