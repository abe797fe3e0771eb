//! Instance components shared by the battle systems.

use crate::config::ContentId;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use skirmish_core::define_component;
use skirmish_core::ecs::Entity;
use std::fmt;

/// Stable network identity; primary-indexed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(pub u64);
define_component!(Identity, "Identity");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Neutral,
    Blue,
    Red,
}

impl Team {
    pub const ALL: [Team; 3] = [Team::Neutral, Team::Blue, Team::Red];
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Team::Neutral => "neutral",
            Team::Blue => "blue",
            Team::Red => "red",
        };
        f.write_str(name)
    }
}

/// Team membership; bucket-indexed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Faction {
    pub team: Team,
}
define_component!(Faction, "Faction");

impl Faction {
    /// Neutral entities are hostile to everyone, including other neutrals.
    pub fn is_hostile_to(&self, other: &Faction) -> bool {
        self.team != other.team || self.team == Team::Neutral
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}
define_component!(Transform, "Transform");

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Units per second.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Velocity(pub Vec3);
define_component!(Velocity, "Velocity");

/// Handle of the presentation object mirroring this entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct View {
    pub handle: u64,
}
define_component!(View, "View");

/// Handle of an object owned by the external physics scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

/// Physics objects belonging to an entity (body, hit zones...); multi-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectLinks {
    pub handles: Vec<ObjectHandle>,
}
define_component!(ObjectLinks, "ObjectLinks");

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Health {
    pub current: f64,
}
define_component!(Health, "Health");

/// Death state marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Dead {
    pub killer: Option<Entity>,
}
define_component!(Dead, "Dead");

/// Corpse countdown started once death has been processed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeathProcess {
    pub remaining: f64,
}
define_component!(DeathProcess, "DeathProcess");

/// Placed on a caster to request an ability cast on the next tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CastRequest {
    pub ability: ContentId,
    pub target: Option<Entity>,
}
define_component!(CastRequest, "CastRequest");

/// Runtime entity of one ability cast.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cast {
    pub ability: ContentId,
    pub caster: Entity,
    pub target: Option<Entity>,
}
define_component!(Cast, "Cast");

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CastLifetime {
    pub remaining: f64,
}
define_component!(CastLifetime, "CastLifetime");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_hostile_to_itself() {
        let neutral = Faction { team: Team::Neutral };
        let blue = Faction { team: Team::Blue };
        assert!(neutral.is_hostile_to(&neutral));
        assert!(blue.is_hostile_to(&neutral));
        assert!(!blue.is_hostile_to(&blue));
    }

    #[test]
    fn default_transform_faces_forward_z() {
        assert_eq!(Transform::default().forward(), Vec3::Z);
    }
}
