//! Global state carried by the singleton context's root entity.

use crate::components::Team;
use serde::{Deserialize, Serialize};
use skirmish_core::define_component;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    /// Teams fight until one is left standing.
    #[default]
    Elimination,
    /// Runs until stopped; eliminations are reported but never end the match.
    Sandbox,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameMode {
    pub kind: ModeKind,
    pub eliminated: Vec<Team>,
    pub winner: Option<Team>,
}
define_component!(GameMode, "GameMode");

impl GameMode {
    pub fn new(kind: ModeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }
}

/// Numbers the damage resolver reads on every hit.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamagePolicy {
    /// Multiplier applied on a critical hit.
    pub crit_multiplier: f64,
    /// Seconds a corpse stays before it is destroyed.
    pub corpse_seconds: f64,
    pub friendly_fire: bool,
}
define_component!(DamagePolicy, "DamagePolicy");

impl Default for DamagePolicy {
    fn default() -> Self {
        Self {
            crit_multiplier: 1.5,
            corpse_seconds: 3.0,
            friendly_fire: false,
        }
    }
}

/// Spectator camera state: who to follow and how fast to blend.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CameraBlend {
    pub focus: Option<u64>,
    pub blend_seconds: f32,
}
define_component!(CameraBlend, "CameraBlend");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub identity: u64,
    pub name: String,
    pub team: Team,
}

/// Players in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roster {
    pub players: Vec<RosterEntry>,
}
define_component!(Roster, "Roster");

impl Roster {
    pub fn find(&self, identity: u64) -> Option<&RosterEntry> {
        self.players.iter().find(|entry| entry.identity == identity)
    }
}
