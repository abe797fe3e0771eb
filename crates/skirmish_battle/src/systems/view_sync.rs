// view_sync.rs - mirrors views to the presentation layer
//
// New or swapped views are picked up reactively in the execute phase;
// transforms are pushed in the late phase, after everything that moves
// entities has run.

use crate::components::{Transform, View};
use crate::view::ViewSink;
use skirmish_core::ecs::{
    CollectorId, Entity, System, SystemDescriptor, SystemError, Trigger, World,
};
use skirmish_core::time::TickTime;

pub struct ViewSyncSystem {
    sink: Box<dyn ViewSink>,
    collector: Option<CollectorId>,
    mirrored: Vec<(Entity, View)>,
}

impl ViewSyncSystem {
    pub fn new(sink: Box<dyn ViewSink>) -> Self {
        Self {
            sink,
            collector: None,
            mirrored: Vec::new(),
        }
    }

    pub fn mirrored(&self) -> usize {
        self.mirrored.len()
    }
}

impl System for ViewSyncSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("view_sync").in_group("render")
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        let instances = &mut world.instances;
        let triggers = vec![
            Trigger::replaced(instances.component_id::<View>()?),
            Trigger::added(instances.component_id::<Transform>()?),
        ];
        self.collector = Some(instances.add_collector(triggers));
        Ok(())
    }

    fn execute(&mut self, world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        let collector = self
            .collector
            .ok_or_else(|| SystemError::failed("view_sync ran before initialization"))?;
        for entity in world.instances.drain_collector(collector)? {
            let (Some(view), Some(transform)) = (
                world.instances.try_get::<View>(entity),
                world.instances.try_get::<Transform>(entity),
            ) else {
                continue;
            };
            match self.mirrored.iter_mut().find(|(known, _)| *known == entity) {
                Some((_, known)) if known == view => {}
                Some((_, known)) => {
                    self.sink.view_removed(entity, known);
                    self.sink.view_added(entity, view, transform);
                    *known = *view;
                }
                None => {
                    self.sink.view_added(entity, view, transform);
                    self.mirrored.push((entity, *view));
                }
            }
        }
        Ok(())
    }

    fn late_execute(&mut self, world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        let sink = &mut self.sink;
        self.mirrored.retain(|(entity, view)| {
            match (
                world.instances.try_get::<View>(*entity),
                world.instances.try_get::<Transform>(*entity),
            ) {
                (Some(current), Some(transform)) if current == view => {
                    sink.sync_transform(*entity, current, transform);
                    true
                }
                _ => {
                    sink.view_removed(*entity, view);
                    false
                }
            }
        });
        Ok(())
    }

    fn teardown(&mut self, _world: &mut World) {
        for (entity, view) in self.mirrored.drain(..) {
            self.sink.view_removed(entity, &view);
        }
    }
}
