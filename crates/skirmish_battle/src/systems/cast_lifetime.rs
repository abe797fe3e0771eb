// cast_lifetime.rs - expiry of casts and the single place a cast ends

use super::isolate;
use crate::collision::HitCollider;
use crate::components::{Cast, CastLifetime, Dead};
use crate::effect::ActiveEffects;
use crate::error::BattleError;
use skirmish_core::ecs::{
    ComponentMask, EcsError, Entity, PendingDestroy, System, SystemDescriptor, SystemError, World,
};
use skirmish_core::time::TickTime;

/// Revert everything the cast's effects contributed, disarm its collider
/// and queue it for destruction. Ending an ended cast does nothing.
pub fn end_cast(world: &mut World, cast: Entity) -> Result<bool, EcsError> {
    if !world.instances.is_alive(cast) || world.instances.has::<PendingDestroy>(cast) {
        return Ok(false);
    }
    if let Some(active) = world.instances.try_get::<ActiveEffects>(cast) {
        let mut active = active.clone();
        let cleared = active.revert_all(world)?;
        world.instances.replace(cast, active)?;
        tracing::trace!(%cast, cleared, "cast effects reverted");
    }
    if world.instances.has::<HitCollider>(cast) {
        world
            .instances
            .update::<HitCollider, _>(cast, |collider| collider.enabled = false)?;
    }
    world.instances.add(cast, PendingDestroy)?;
    Ok(true)
}

#[derive(Debug, Default)]
pub struct CastLifetimeSystem {
    mask: Option<ComponentMask>,
}

impl CastLifetimeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(world: &mut World, cast: Entity, dt: f64) -> Result<(), BattleError> {
        if world.instances.has::<PendingDestroy>(cast) {
            return Ok(());
        }
        let caster = world.instances.get::<Cast>(cast)?.caster;
        let caster_gone = !world.instances.is_alive(caster) || world.instances.has::<Dead>(caster);
        let remaining = world.instances.get::<CastLifetime>(cast)?.remaining - dt;

        if caster_gone || remaining <= 0.0 {
            end_cast(world, cast)?;
            tracing::debug!(%cast, caster_gone, "cast ended");
        } else {
            world.instances.replace(cast, CastLifetime { remaining })?;
        }
        Ok(())
    }
}

impl System for CastLifetimeSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("cast_lifetime").in_group("battle")
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        let instances = &world.instances;
        self.mask = Some(ComponentMask::from_ids([
            instances.component_id::<Cast>()?,
            instances.component_id::<CastLifetime>()?,
        ]));
        Ok(())
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        let mask = self
            .mask
            .ok_or_else(|| SystemError::failed("cast_lifetime ran before initialization"))?;
        for cast in world.instances.collect_with(mask) {
            isolate("cast_lifetime", cast, || Self::advance(world, cast, time.dt));
        }
        Ok(())
    }
}
