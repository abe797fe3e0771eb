// health_clamp.rs - keeps health within max hp when properties change

use crate::components::Health;
use crate::property::{Properties, PropertyKey};
use skirmish_core::ecs::{
    Context, EcsError, Entity, ReactiveSystem, SystemDescriptor, SystemError, Trigger, World,
};
use skirmish_core::time::TickTime;

#[derive(Debug, Default)]
pub struct HealthClampSystem;

impl HealthClampSystem {
    pub fn new() -> Self {
        Self
    }
}

impl ReactiveSystem for HealthClampSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("health_clamp").in_group("battle")
    }

    fn triggers(&self, context: &Context) -> Result<Vec<Trigger>, EcsError> {
        Ok(vec![Trigger::replaced(context.component_id::<Properties>()?)])
    }

    fn filter(&self, world: &World, entity: Entity) -> bool {
        world.instances.has::<Health>(entity)
    }

    fn react(
        &mut self,
        world: &mut World,
        entities: &[Entity],
        _time: &TickTime,
    ) -> Result<(), SystemError> {
        for &entity in entities {
            let max_hp = world
                .instances
                .get::<Properties>(entity)?
                .get(PropertyKey::MaxHp);
            let current = world.instances.get::<Health>(entity)?.current;
            if current > max_hp {
                world
                    .instances
                    .replace(entity, Health { current: max_hp })?;
                tracing::trace!(%entity, current, max_hp, "health clamped");
            }
        }
        Ok(())
    }
}
