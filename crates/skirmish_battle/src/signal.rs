//! Lifecycle signals exchanged between battle systems.

use crate::collision::HitRecord;
use skirmish_core::ecs::{EcsError, Entity, Signal, SignalBus, World};

#[derive(Debug, Clone, PartialEq)]
pub enum BattleSignal {
    /// Effects of a cast should be (re)assigned to their targets.
    StartAssign,
    /// A collider owned by the addressed cast struck something.
    Hit {
        record: HitRecord,
        /// Targets struck by the same collider in the same check, this one
        /// included.
        targets_this_check: u32,
    },
    Damaged {
        attacker: Option<Entity>,
        amount: f64,
        critical: bool,
        remaining: f64,
    },
    Healed {
        amount: f64,
        remaining: f64,
    },
    Died {
        killer: Option<Entity>,
    },
    HitReaction {
        attacker: Option<Entity>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BattleSignalKind {
    StartAssign,
    Hit,
    Damaged,
    Healed,
    Died,
    HitReaction,
}

impl Signal for BattleSignal {
    type Kind = BattleSignalKind;

    fn kind(&self) -> BattleSignalKind {
        match self {
            BattleSignal::StartAssign => BattleSignalKind::StartAssign,
            BattleSignal::Hit { .. } => BattleSignalKind::Hit,
            BattleSignal::Damaged { .. } => BattleSignalKind::Damaged,
            BattleSignal::Healed { .. } => BattleSignalKind::Healed,
            BattleSignal::Died { .. } => BattleSignalKind::Died,
            BattleSignal::HitReaction { .. } => BattleSignalKind::HitReaction,
        }
    }
}

/// The battle signal bus, stored as a world resource.
pub type BattleSignals = SignalBus<BattleSignal>;

/// Publish on the world's battle bus; the bus is required.
pub fn publish(world: &mut World, entity: Entity, signal: BattleSignal) -> Result<usize, EcsError> {
    Ok(world.resources.get_mut::<BattleSignals>()?.publish(entity, signal))
}
