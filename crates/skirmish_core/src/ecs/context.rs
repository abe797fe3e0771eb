// context.rs - one entity/component domain with its indices and collectors
//
// Every structural mutation (add, replace, remove, destroy) updates the
// affected column, its indices, the entity mask and the collectors before
// returning, so no reader can observe a component without its index entry.

use crate::ecs::collector::{Change, Collector};
use crate::ecs::column::{Column, ErasedColumn};
use crate::ecs::entity::{EntityAllocator, EntityRecord};
use crate::ecs::index::KeyedIndex;
use crate::ecs::{
    CollectorId, Component, ComponentId, ComponentLayout, ComponentMask, EcsError, Entity,
    IndexHandle, IndexKind, Trigger,
};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// Which half of the world a context represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContextKind {
    /// Many entities: combatants, casts, projectiles.
    Instance,
    /// A single root entity carrying global state.
    Singleton,
}

pub struct Context {
    kind: ContextKind,
    layout: ComponentLayout,
    entities: EntityAllocator,
    columns: Vec<Box<dyn ErasedColumn>>,
    collectors: Vec<Collector>,
}

impl Context {
    /// Create a context; the layout is sealed from here on.
    pub fn new(kind: ContextKind, layout: ComponentLayout) -> Self {
        let columns = layout.build_columns();
        Self {
            kind,
            layout,
            entities: EntityAllocator::default(),
            columns,
            collectors: Vec::new(),
        }
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn layout(&self) -> &ComponentLayout {
        &self.layout
    }

    pub fn component_id<T: Component>(&self) -> Result<ComponentId, EcsError> {
        self.layout.id_of::<T>()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.alive_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.allocate();
        tracing::trace!(context = ?self.kind, %entity, "entity created");
        entity
    }

    /// Remove every component in slot order, firing the usual index and
    /// collector updates, then recycle the slot.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        let mask = self.record(entity)?.mask;
        for id in mask.iter() {
            if let Some(column) = self.columns.get_mut(id.index()) {
                column.remove_entity(entity);
            }
            if let Some(record) = self.entities.record_mut(entity) {
                record.mask.remove(id);
            }
            self.notify(entity, id, Change::Removed);
        }
        self.entities.release(entity);
        tracing::trace!(context = ?self.kind, %entity, "entity destroyed");
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.record(entity).is_some()
    }

    pub fn is_enabled(&self, entity: Entity) -> bool {
        self.entities
            .record(entity)
            .map(|record| record.enabled)
            .unwrap_or(false)
    }

    /// Disabled entities keep their components but drop out of group views.
    pub fn set_enabled(&mut self, entity: Entity, enabled: bool) -> Result<(), EcsError> {
        self.entities
            .record_mut(entity)
            .ok_or(EcsError::StaleEntity { entity })?
            .enabled = enabled;
        Ok(())
    }

    pub fn mask_of(&self, entity: Entity) -> Result<ComponentMask, EcsError> {
        Ok(self.record(entity)?.mask)
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach a component the entity does not have yet.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        self.store(entity, value, false)
    }

    /// Store a fresh value, attaching the component if it is absent.
    pub fn replace<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        self.store(entity, value, true)
    }

    /// Clone, modify and replace.
    pub fn update<T, F>(&mut self, entity: Entity, f: F) -> Result<(), EcsError>
    where
        T: Component,
        F: FnOnce(&mut T),
    {
        let mut value = self.get::<T>(entity)?.clone();
        f(&mut value);
        self.replace(entity, value)
    }

    /// Detach a component, handing back the last stored value.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Result<Rc<T>, EcsError> {
        let id = self.layout.id_of::<T>()?;
        self.record(entity)?;
        let previous = self
            .column_mut::<T>(id)?
            .take(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::NAME,
            })?;
        if let Some(record) = self.entities.record_mut(entity) {
            record.mask.remove(id);
        }
        self.notify(entity, id, Change::Removed);
        Ok(previous)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        match (self.layout.id_of::<T>(), self.entities.record(entity)) {
            (Ok(id), Some(record)) => record.mask.contains(id),
            _ => false,
        }
    }

    /// Borrow a component; absence is an error, never a default.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.shared_ref::<T>(entity).map(|value| value.as_ref())
    }

    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.get::<T>(entity).ok()
    }

    /// Snapshot handle that stays valid after later replacements.
    pub fn shared<T: Component>(&self, entity: Entity) -> Result<Rc<T>, EcsError> {
        self.shared_ref::<T>(entity).map(Rc::clone)
    }

    // ------------------------------------------------------------------
    // Group queries
    // ------------------------------------------------------------------

    /// Live view over enabled entities holding every slot in `mask`, in
    /// slot order. The borrow prevents mutation while iterating; use
    /// [`Context::collect_with`] when the loop body mutates.
    pub fn entities_with(&self, mask: ComponentMask) -> impl Iterator<Item = Entity> + '_ {
        self.entities
            .iter()
            .filter(move |(_, record)| record.enabled && record.mask.contains_all(&mask))
            .map(|(entity, _)| entity)
    }

    pub fn collect_with(&self, mask: ComponentMask) -> Vec<Entity> {
        self.entities_with(mask).collect()
    }

    /// Snapshot of enabled entities holding `T`.
    pub fn entities_having<T: Component>(&self) -> Result<Vec<Entity>, EcsError> {
        let id = self.layout.id_of::<T>()?;
        Ok(self.collect_with(ComponentMask::from_ids([id])))
    }

    /// Enabled entities holding `T`, paired with their values.
    pub fn view<T: Component>(&self) -> Result<impl Iterator<Item = (Entity, &T)> + '_, EcsError> {
        let id = self.layout.id_of::<T>()?;
        let column = self.column::<T>(id)?;
        Ok(self
            .entities_with(ComponentMask::from_ids([id]))
            .filter_map(move |entity| column.get(entity).map(|value| (entity, value.as_ref()))))
    }

    // ------------------------------------------------------------------
    // Indices
    // ------------------------------------------------------------------

    /// Declare an index over `T`, seeded from the entities that already
    /// hold it.
    pub fn add_index<T, K>(
        &mut self,
        name: &'static str,
        kind: IndexKind,
        extract: fn(&T) -> Vec<K>,
    ) -> Result<IndexHandle<T, K>, EcsError>
    where
        T: Component,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        use crate::ecs::index::ComponentIndex;

        let id = self.layout.id_of::<T>()?;
        let mut index = KeyedIndex::new(name, kind, extract);
        let holders: Vec<Entity> = self
            .entities
            .iter()
            .filter(|(_, record)| record.mask.contains(id))
            .map(|(entity, _)| entity)
            .collect();

        let column = self.column_mut::<T>(id)?;
        for entity in holders {
            if let Some(value) = column.get(entity) {
                index.validate(entity, value)?;
                index.insert(entity, value);
            }
        }
        let position = column.push_index(Box::new(index));
        tracing::debug!(index = name, component = T::NAME, "index registered");
        Ok(IndexHandle::new(id, position))
    }

    pub fn index<T, K>(&self, handle: &IndexHandle<T, K>) -> Result<&KeyedIndex<T, K>, EcsError>
    where
        T: Component,
        K: Eq + Hash + Clone + fmt::Debug + 'static,
    {
        self.column::<T>(handle.component)?
            .index_at(handle.position)
            .and_then(|index| index.as_any().downcast_ref::<KeyedIndex<T, K>>())
            .ok_or(EcsError::UnknownIndex {
                component: handle.component,
                position: handle.position,
            })
    }

    // ------------------------------------------------------------------
    // Collectors
    // ------------------------------------------------------------------

    pub fn add_collector(&mut self, triggers: Vec<Trigger>) -> CollectorId {
        self.collectors.push(Collector::new(triggers));
        CollectorId(self.collectors.len() - 1)
    }

    /// Take the accumulated entities, dropping any destroyed since they
    /// were collected.
    pub fn drain_collector(&mut self, id: CollectorId) -> Result<Vec<Entity>, EcsError> {
        let mut entities = self
            .collectors
            .get_mut(id.0)
            .ok_or(EcsError::UnknownCollector(id))?
            .take();
        entities.retain(|entity| self.entities.record(*entity).is_some());
        Ok(entities)
    }

    pub fn collector_len(&self, id: CollectorId) -> Result<usize, EcsError> {
        self.collectors
            .get(id.0)
            .map(Collector::len)
            .ok_or(EcsError::UnknownCollector(id))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn store<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
        allow_replace: bool,
    ) -> Result<(), EcsError> {
        let id = self.layout.id_of::<T>()?;
        let present = self.record(entity)?.mask.contains(id);
        if present && !allow_replace {
            return Err(EcsError::ComponentAlreadyPresent {
                entity,
                component: T::NAME,
            });
        }

        let column = self.column_mut::<T>(id)?;
        column.validate(entity, &value)?;
        column.insert(entity, Rc::new(value));
        if let Some(record) = self.entities.record_mut(entity) {
            record.mask.insert(id);
        }

        let change = if present { Change::Replaced } else { Change::Added };
        self.notify(entity, id, change);
        Ok(())
    }

    fn notify(&mut self, entity: Entity, id: ComponentId, change: Change) {
        for collector in &mut self.collectors {
            collector.notify(entity, id, change);
        }
    }

    fn record(&self, entity: Entity) -> Result<&EntityRecord, EcsError> {
        self.entities
            .record(entity)
            .ok_or(EcsError::StaleEntity { entity })
    }

    fn shared_ref<T: Component>(&self, entity: Entity) -> Result<&Rc<T>, EcsError> {
        let id = self.layout.id_of::<T>()?;
        self.record(entity)?;
        self.column::<T>(id)?
            .get(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                component: T::NAME,
            })
    }

    fn column<T: Component>(&self, id: ComponentId) -> Result<&Column<T>, EcsError> {
        self.columns
            .get(id.index())
            .and_then(|column| column.as_any().downcast_ref::<Column<T>>())
            .ok_or(EcsError::UnregisteredComponent { component: T::NAME })
    }

    fn column_mut<T: Component>(&mut self, id: ComponentId) -> Result<&mut Column<T>, EcsError> {
        self.columns
            .get_mut(id.index())
            .and_then(|column| column.as_any_mut().downcast_mut::<Column<T>>())
            .ok_or(EcsError::UnregisteredComponent { component: T::NAME })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("kind", &self.kind)
            .field("entities", &self.len())
            .field("layout", &self.layout)
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::GroupEvent;

    #[derive(Clone, Debug, PartialEq)]
    struct Health(i32);
    crate::define_component!(Health, "Health");

    #[derive(Clone, Debug, PartialEq)]
    struct Tag(u32);
    crate::define_component!(Tag, "Tag");

    fn context() -> Context {
        let layout = ComponentLayout::new()
            .with::<Health>()
            .and_then(|l| l.with::<Tag>())
            .unwrap();
        Context::new(ContextKind::Instance, layout)
    }

    #[test]
    fn get_missing_component_fails() {
        let mut ctx = context();
        let e = ctx.create_entity();
        assert!(matches!(
            ctx.get::<Health>(e),
            Err(EcsError::MissingComponent { component: "Health", .. })
        ));
    }

    #[test]
    fn add_twice_fails_but_replace_succeeds() {
        let mut ctx = context();
        let e = ctx.create_entity();
        ctx.add(e, Health(10)).unwrap();
        assert!(matches!(
            ctx.add(e, Health(5)),
            Err(EcsError::ComponentAlreadyPresent { .. })
        ));
        ctx.replace(e, Health(5)).unwrap();
        assert_eq!(ctx.get::<Health>(e).unwrap(), &Health(5));
    }

    #[test]
    fn replace_swaps_allocation() {
        let mut ctx = context();
        let e = ctx.create_entity();
        ctx.add(e, Health(10)).unwrap();
        let before = ctx.shared::<Health>(e).unwrap();

        ctx.update::<Health, _>(e, |h| h.0 -= 3).unwrap();

        assert_eq!(*before, Health(10));
        assert_eq!(ctx.get::<Health>(e).unwrap(), &Health(7));
    }

    #[test]
    fn stale_handle_is_rejected_after_destroy() {
        let mut ctx = context();
        let e = ctx.create_entity();
        ctx.add(e, Health(1)).unwrap();
        ctx.destroy_entity(e).unwrap();

        let reused = ctx.create_entity();
        assert_eq!(reused.index(), e.index());
        assert!(!ctx.has::<Health>(reused));
        assert!(matches!(ctx.get::<Health>(e), Err(EcsError::StaleEntity { .. })));
        assert!(ctx.destroy_entity(e).is_err());
    }

    #[test]
    fn group_view_skips_disabled_entities() {
        let mut ctx = context();
        let a = ctx.create_entity();
        let b = ctx.create_entity();
        let c = ctx.create_entity();
        for e in [a, b, c] {
            ctx.add(e, Health(1)).unwrap();
        }
        ctx.add(b, Tag(1)).unwrap();
        ctx.set_enabled(c, false).unwrap();

        let health = ctx.component_id::<Health>().unwrap();
        assert_eq!(ctx.collect_with(ComponentMask::from_ids([health])), vec![a, b]);
        assert!(ctx.get::<Health>(c).is_ok());
    }

    #[test]
    fn primary_index_rejects_conflict_without_mutating() {
        let mut ctx = context();
        let handle = ctx
            .add_index::<Tag, u32>("tag", IndexKind::Primary, |t| vec![t.0])
            .unwrap();
        let a = ctx.create_entity();
        let b = ctx.create_entity();
        ctx.add(a, Tag(7)).unwrap();

        assert!(matches!(
            ctx.add(b, Tag(7)),
            Err(EcsError::IndexKeyConflict { .. })
        ));
        assert!(!ctx.has::<Tag>(b));
        assert_eq!(ctx.index(&handle).unwrap().get_entity(&7), Some(a));

        // Re-storing the same key on its holder is fine.
        ctx.replace(a, Tag(7)).unwrap();
    }

    #[test]
    fn index_tracks_replace_and_remove() {
        let mut ctx = context();
        let e = ctx.create_entity();
        ctx.add(e, Tag(1)).unwrap();
        let handle = ctx
            .add_index::<Tag, u32>("tag", IndexKind::Bucket, |t| vec![t.0])
            .unwrap();
        assert_eq!(ctx.index(&handle).unwrap().get_entities(&1), &[e]);

        ctx.replace(e, Tag(2)).unwrap();
        let index = ctx.index(&handle).unwrap();
        assert!(index.get_entities(&1).is_empty());
        assert_eq!(index.get_entities(&2), &[e]);

        ctx.remove::<Tag>(e).unwrap();
        assert!(!ctx.index(&handle).unwrap().contains(e));
    }

    #[test]
    fn collector_sees_removals_from_destroy_only_while_alive() {
        let mut ctx = context();
        let health = ctx.component_id::<Health>().unwrap();
        let collector = ctx.add_collector(vec![Trigger::new(health, GroupEvent::Removed)]);

        let kept = ctx.create_entity();
        let destroyed = ctx.create_entity();
        ctx.add(kept, Health(1)).unwrap();
        ctx.add(destroyed, Health(1)).unwrap();

        ctx.remove::<Health>(kept).unwrap();
        ctx.destroy_entity(destroyed).unwrap();

        assert_eq!(ctx.collector_len(collector).unwrap(), 2);
        assert_eq!(ctx.drain_collector(collector).unwrap(), vec![kept]);
    }
}
