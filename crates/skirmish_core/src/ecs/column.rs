// column.rs - per-component storage for one context
//
// A column stores `Rc<T>` per entity slot. Replacing a value swaps the
// allocation instead of writing through it, so an `Rc` handed out earlier
// in the tick keeps observing the value it was given. Indices declared
// against the component live next to the values they mirror.

use crate::ecs::index::ComponentIndex;
use crate::ecs::{Component, EcsError, Entity};
use std::any::Any;
use std::rc::Rc;

/// Object-safe view used where the component type is not known statically.
pub(crate) trait ErasedColumn {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Drop the entity's value and its index entries. Returns whether a value existed.
    fn remove_entity(&mut self, entity: Entity) -> bool;
}

pub(crate) struct Column<T: Component> {
    slots: Vec<Option<Rc<T>>>,
    indices: Vec<Box<dyn ComponentIndex<T>>>,
}

impl<T: Component> Column<T> {
    pub fn boxed() -> Box<dyn ErasedColumn> {
        Box::new(Self {
            slots: Vec::new(),
            indices: Vec::new(),
        })
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&Rc<T>> {
        self.slots
            .get(entity.index() as usize)
            .and_then(|slot| slot.as_ref())
    }

    /// Check every index before anything is written.
    pub fn validate(&self, entity: Entity, value: &T) -> Result<(), EcsError> {
        for index in &self.indices {
            index.validate(entity, value)?;
        }
        Ok(())
    }

    /// Store `value`, returning the previous allocation. Callers validate first.
    pub fn insert(&mut self, entity: Entity, value: Rc<T>) -> Option<Rc<T>> {
        let slot = entity.index() as usize;
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }

        let previous = self.slots[slot].replace(Rc::clone(&value));
        if previous.is_some() {
            for index in &mut self.indices {
                index.remove(entity);
            }
        }
        for index in &mut self.indices {
            index.insert(entity, &value);
        }
        previous
    }

    pub fn take(&mut self, entity: Entity) -> Option<Rc<T>> {
        let previous = self
            .slots
            .get_mut(entity.index() as usize)
            .and_then(|slot| slot.take());
        if previous.is_some() {
            for index in &mut self.indices {
                index.remove(entity);
            }
        }
        previous
    }

    pub fn push_index(&mut self, index: Box<dyn ComponentIndex<T>>) -> usize {
        self.indices.push(index);
        self.indices.len() - 1
    }

    pub fn index_at(&self, position: usize) -> Option<&dyn ComponentIndex<T>> {
        self.indices.get(position).map(|index| index.as_ref())
    }
}

impl<T: Component> ErasedColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }
}
