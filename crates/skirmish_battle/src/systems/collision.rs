// collision.rs - runs the hit pipeline for every active collider

use super::isolate;
use crate::collision::{CollisionPipeline, HitCollider};
use crate::components::Transform;
use skirmish_core::ecs::{ComponentMask, System, SystemDescriptor, SystemError, World};
use skirmish_core::time::TickTime;

pub struct CollisionSystem {
    pipeline: CollisionPipeline,
    mask: Option<ComponentMask>,
}

impl CollisionSystem {
    pub fn new(pipeline: CollisionPipeline) -> Self {
        Self {
            pipeline,
            mask: None,
        }
    }
}

impl System for CollisionSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("collision").in_group("battle")
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        self.mask = Some(ComponentMask::from_ids([
            world.instances.component_id::<HitCollider>()?,
            world.instances.component_id::<Transform>()?,
        ]));
        tracing::debug!(policy = ?self.pipeline.policy(), "collision pipeline ready");
        Ok(())
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        let mask = self
            .mask
            .ok_or_else(|| SystemError::failed("collision ran before initialization"))?;

        for owner in world.instances.collect_with(mask) {
            let active = world
                .instances
                .try_get::<HitCollider>(owner)
                .is_some_and(|collider| collider.enabled && collider.spec.active_as_source);
            if !active {
                continue;
            }
            isolate("collision", owner, || {
                self.pipeline.process(world, owner, time.dt).map(|_| ())
            });
        }
        Ok(())
    }
}
