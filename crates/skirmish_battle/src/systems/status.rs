// status.rs - counts statuses and control locks down

use super::isolate;
use crate::status::{tick_timers, ControlLocks, StatusSet};
use skirmish_core::ecs::{System, SystemDescriptor, SystemError, World};
use skirmish_core::time::TickTime;

#[derive(Debug, Default)]
pub struct StatusSystem;

impl StatusSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for StatusSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("status").in_group("battle")
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        let mut entities = world.instances.entities_having::<StatusSet>()?;
        for entity in world.instances.entities_having::<ControlLocks>()? {
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
        for entity in entities {
            isolate("status", entity, || {
                tick_timers(world, entity, time.dt)?;
                Ok(())
            });
        }
        Ok(())
    }
}
