// death.rs - everything that follows entering the death state
//
// Combatants (entities with health) get their colliders disarmed, a
// corpse countdown, team elimination checks and the spectator camera
// moved to their killer. Anything else that dies (a projectile that used
// up its hits) is a cast and simply ends.

use super::{end_cast, isolate};
use crate::collision::HitCollider;
use crate::components::{Cast, Dead, DeathProcess, Faction, Health, Identity, Team};
use crate::error::BattleError;
use crate::net::{OutboundMessage, Outbox};
use crate::singletons::{CameraBlend, DamagePolicy, GameMode, ModeKind};
use skirmish_core::ecs::{
    Context, EcsError, Entity, IndexHandle, ReactiveSystem, SystemDescriptor, SystemError, Trigger,
    World,
};
use skirmish_core::time::TickTime;

/// Seconds the spectator camera takes to move to a killer.
const KILL_CAM_BLEND: f32 = 0.75;

pub struct DeathReactionSystem {
    factions: IndexHandle<Faction, Team>,
}

impl DeathReactionSystem {
    pub fn new(factions: IndexHandle<Faction, Team>) -> Self {
        Self { factions }
    }

    fn react_one(&self, world: &mut World, entity: Entity) -> Result<(), BattleError> {
        if !world.instances.has::<Health>(entity) {
            if world.instances.has::<Cast>(entity) {
                end_cast(world, entity)?;
            }
            return Ok(());
        }

        if world.instances.has::<HitCollider>(entity) {
            world
                .instances
                .update::<HitCollider, _>(entity, |collider| collider.enabled = false)?;
        }
        let corpse_seconds = world.singleton::<DamagePolicy>()?.corpse_seconds;
        world.instances.replace(
            entity,
            DeathProcess {
                remaining: corpse_seconds,
            },
        )?;

        let killer = world.instances.get::<Dead>(entity)?.killer;
        if let Some(focus) = killer.and_then(|killer| world.instances.try_get::<Identity>(killer)) {
            let focus = focus.0;
            world.update_singleton::<CameraBlend, _>(|camera| {
                camera.focus = Some(focus);
                camera.blend_seconds = KILL_CAM_BLEND;
            })?;
        }

        if let Some(team) = world.instances.try_get::<Faction>(entity).map(|f| f.team) {
            self.check_elimination(world, team)?;
        }
        Ok(())
    }

    fn has_survivors(&self, world: &World, team: Team) -> Result<bool, EcsError> {
        let index = world.instances.index(&self.factions)?;
        Ok(index.get_entities(&team).iter().any(|member| {
            world.instances.has::<Health>(*member) && !world.instances.has::<Dead>(*member)
        }))
    }

    fn check_elimination(&self, world: &mut World, team: Team) -> Result<(), BattleError> {
        if self.has_survivors(world, team)? {
            return Ok(());
        }
        let mode = world.singleton::<GameMode>()?;
        if mode.eliminated.contains(&team) {
            return Ok(());
        }
        let kind = mode.kind;
        let already_over = mode.is_over();

        let mut standing = Vec::new();
        for candidate in Team::ALL {
            if candidate != team && self.has_survivors(world, candidate)? {
                standing.push(candidate);
            }
        }
        let winner = match (kind, already_over, standing.as_slice()) {
            (ModeKind::Elimination, false, [last]) => Some(*last),
            _ => None,
        };

        world.update_singleton::<GameMode, _>(|mode| {
            mode.eliminated.push(team);
            if winner.is_some() {
                mode.winner = winner;
            }
        })?;

        let outbox = world.resources.get_mut::<Outbox>()?;
        outbox.push(OutboundMessage::TeamEliminated { team });
        tracing::info!(%team, "team eliminated");
        if let Some(winner) = winner {
            outbox.push(OutboundMessage::MatchOver { winner });
            tracing::info!(%winner, "match over");
        }
        Ok(())
    }
}

impl ReactiveSystem for DeathReactionSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("death_reaction").in_group("death")
    }

    fn triggers(&self, context: &Context) -> Result<Vec<Trigger>, EcsError> {
        Ok(vec![Trigger::added(context.component_id::<Dead>()?)])
    }

    fn react(
        &mut self,
        world: &mut World,
        entities: &[Entity],
        _time: &TickTime,
    ) -> Result<(), SystemError> {
        for &entity in entities {
            isolate("death_reaction", entity, || self.react_one(world, entity));
        }
        Ok(())
    }
}
