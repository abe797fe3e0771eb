// cleanup.rs - deferred entity destruction
//
// Systems that decide an entity must go mark it with `PendingDestroy`;
// the destroy system removes it when it runs, after everything registered
// before it has seen the entity for this tick.

use crate::ecs::{
    Context, ContextKind, EcsError, Entity, ReactiveSystem, SystemDescriptor, SystemError,
    Trigger, World,
};
use crate::time::TickTime;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingDestroy;
crate::define_component!(PendingDestroy, "PendingDestroy");

/// Destroys every entity that received [`PendingDestroy`].
#[derive(Debug)]
pub struct DestroySystem {
    kind: ContextKind,
}

impl DestroySystem {
    pub fn new() -> Self {
        Self::for_context(ContextKind::Instance)
    }

    pub fn for_context(kind: ContextKind) -> Self {
        Self { kind }
    }
}

impl Default for DestroySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveSystem for DestroySystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("destroy").in_group("cleanup")
    }

    fn context(&self) -> ContextKind {
        self.kind
    }

    fn triggers(&self, context: &Context) -> Result<Vec<Trigger>, EcsError> {
        Ok(vec![Trigger::added(context.component_id::<PendingDestroy>()?)])
    }

    fn react(
        &mut self,
        world: &mut World,
        entities: &[Entity],
        _time: &TickTime,
    ) -> Result<(), SystemError> {
        let context = world.context_mut(self.context());
        for &entity in entities {
            context.destroy_entity(entity)?;
        }
        tracing::trace!(count = entities.len(), "destroyed pending entities");
        Ok(())
    }
}
