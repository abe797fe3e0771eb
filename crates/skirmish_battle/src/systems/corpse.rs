// corpse.rs - removes corpses once their death process has run out

use crate::components::DeathProcess;
use skirmish_core::ecs::{PendingDestroy, System, SystemDescriptor, SystemError, World};
use skirmish_core::time::TickTime;

#[derive(Debug, Default)]
pub struct CorpseSystem;

impl CorpseSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for CorpseSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("corpse").in_group("death")
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        for entity in world.instances.entities_having::<DeathProcess>()? {
            let remaining = world.instances.get::<DeathProcess>(entity)?.remaining - time.dt;
            if remaining > 0.0 {
                world
                    .instances
                    .replace(entity, DeathProcess { remaining })?;
                continue;
            }
            world.instances.remove::<DeathProcess>(entity)?;
            world.instances.replace(entity, PendingDestroy)?;
            tracing::debug!(%entity, "corpse removed");
        }
        Ok(())
    }
}
