// world.rs - instance context, singleton context and shared resources
//
// Global state (game mode, damage policy, roster) lives on the single root
// entity of the singleton context rather than on pseudo-entities mixed into
// the instance context. Fields are public so systems can borrow the two
// contexts and the resources independently.

use crate::ecs::{Component, ComponentLayout, Context, ContextKind, EcsError, Entity, Resources};

pub struct World {
    pub instances: Context,
    pub singletons: Context,
    pub resources: Resources,
    root: Entity,
}

impl World {
    pub fn new(instance_layout: ComponentLayout, singleton_layout: ComponentLayout) -> Self {
        let instances = Context::new(ContextKind::Instance, instance_layout);
        let mut singletons = Context::new(ContextKind::Singleton, singleton_layout);
        let root = singletons.create_entity();
        Self {
            instances,
            singletons,
            resources: Resources::new(),
            root,
        }
    }

    pub fn context(&self, kind: ContextKind) -> &Context {
        match kind {
            ContextKind::Instance => &self.instances,
            ContextKind::Singleton => &self.singletons,
        }
    }

    pub fn context_mut(&mut self, kind: ContextKind) -> &mut Context {
        match kind {
            ContextKind::Instance => &mut self.instances,
            ContextKind::Singleton => &mut self.singletons,
        }
    }

    /// The entity that carries every singleton component.
    pub fn singleton_root(&self) -> Entity {
        self.root
    }

    pub fn singleton<T: Component>(&self) -> Result<&T, EcsError> {
        self.singletons.get::<T>(self.root)
    }

    pub fn has_singleton<T: Component>(&self) -> bool {
        self.singletons.has::<T>(self.root)
    }

    pub fn set_singleton<T: Component>(&mut self, value: T) -> Result<(), EcsError> {
        self.singletons.replace(self.root, value)
    }

    pub fn update_singleton<T, F>(&mut self, f: F) -> Result<(), EcsError>
    where
        T: Component,
        F: FnOnce(&mut T),
    {
        self.singletons.update::<T, F>(self.root, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Round(u32);
    crate::define_component!(Round, "Round");

    #[derive(Clone, Debug)]
    struct Marker;
    crate::define_component!(Marker, "Marker");

    fn world() -> World {
        World::new(
            ComponentLayout::new().with::<Marker>().unwrap(),
            ComponentLayout::new().with::<Round>().unwrap(),
        )
    }

    #[test]
    fn singleton_roundtrip() {
        let mut world = world();
        assert!(world.singleton::<Round>().is_err());

        world.set_singleton(Round(1)).unwrap();
        world.update_singleton::<Round, _>(|r| r.0 += 1).unwrap();
        assert_eq!(world.singleton::<Round>().unwrap(), &Round(2));
    }

    #[test]
    fn contexts_are_independent() {
        let mut world = world();
        let e = world.instances.create_entity();
        world.instances.add(e, Marker).unwrap();

        assert_eq!(world.instances.len(), 1);
        assert_eq!(world.singletons.len(), 1);
        assert!(!world.singletons.has::<Round>(world.singleton_root()));
        assert!(world.set_singleton(Marker).is_err());
    }
}
