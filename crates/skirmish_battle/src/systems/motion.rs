// motion.rs - integrates velocity into transform

use crate::components::{Transform, Velocity};
use crate::property::{FlagKey, Properties};
use skirmish_core::ecs::{ComponentMask, System, SystemDescriptor, SystemError, World};
use skirmish_core::time::TickTime;

#[derive(Debug, Default)]
pub struct MotionSystem {
    mask: Option<ComponentMask>,
}

impl MotionSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl System for MotionSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("motion").in_group("battle")
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        self.mask = Some(ComponentMask::from_ids([
            world.instances.component_id::<Transform>()?,
            world.instances.component_id::<Velocity>()?,
        ]));
        Ok(())
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        let mask = self
            .mask
            .ok_or_else(|| SystemError::failed("motion ran before initialization"))?;
        let dt = time.dt as f32;

        for entity in world.instances.collect_with(mask) {
            let rooted = world
                .instances
                .try_get::<Properties>(entity)
                .is_some_and(|props| !props.flag(FlagKey::CanMove));
            let velocity = world.instances.get::<Velocity>(entity)?.0;
            if rooted || velocity == glam::Vec3::ZERO {
                continue;
            }
            world
                .instances
                .update::<Transform, _>(entity, |transform| transform.position += velocity * dt)?;
        }
        Ok(())
    }
}
