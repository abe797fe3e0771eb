// index.rs - secondary indices kept in lockstep with a component column
//
// An index entry exists for entity E under key K exactly when E holds the
// indexed component and the extractor yields K for its value. Entries are
// written by the owning column inside the same call that stores or drops
// the value.

use crate::ecs::{Component, ComponentId, EcsError, Entity};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Lookup shape of a keyed index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndexKind {
    /// At most one entity per key (network identity, unique names).
    Primary,
    /// One key per entity, many entities per key (faction, tag).
    Bucket,
    /// Any number of keys per entity (external object handles).
    Multi,
}

pub(crate) trait ComponentIndex<T>: Any {
    fn validate(&self, entity: Entity, value: &T) -> Result<(), EcsError>;
    fn insert(&mut self, entity: Entity, value: &T);
    fn remove(&mut self, entity: Entity);
    fn as_any(&self) -> &dyn Any;
}

/// Index over component `T` keyed by `K`.
pub struct KeyedIndex<T, K> {
    name: &'static str,
    kind: IndexKind,
    extract: fn(&T) -> Vec<K>,
    by_key: HashMap<K, Vec<Entity>>,
    by_entity: HashMap<Entity, Vec<K>>,
}

impl<T, K> KeyedIndex<T, K>
where
    T: Component,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    pub(crate) fn new(name: &'static str, kind: IndexKind, extract: fn(&T) -> Vec<K>) -> Self {
        Self {
            name,
            kind,
            extract,
            by_key: HashMap::new(),
            by_entity: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// The entity holding `key`; for non-primary indices, the earliest holder.
    pub fn get_entity(&self, key: &K) -> Option<Entity> {
        self.by_key.get(key).and_then(|holders| holders.first().copied())
    }

    /// Every entity under `key` in insertion order.
    pub fn get_entities(&self, key: &K) -> &[Entity] {
        self.by_key.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys_of(&self, entity: Entity) -> &[K] {
        self.by_entity.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.by_entity.contains_key(&entity)
    }

    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    fn keys_for(&self, value: &T) -> Vec<K> {
        let mut keys = (self.extract)(value);
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys.drain(..) {
            if !unique.contains(&key) {
                unique.push(key);
            }
        }
        unique
    }
}

impl<T, K> ComponentIndex<T> for KeyedIndex<T, K>
where
    T: Component,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    fn validate(&self, entity: Entity, value: &T) -> Result<(), EcsError> {
        if self.kind != IndexKind::Primary {
            return Ok(());
        }
        for key in self.keys_for(value) {
            if let Some(holder) = self
                .by_key
                .get(&key)
                .and_then(|holders| holders.iter().find(|holder| **holder != entity))
            {
                return Err(EcsError::IndexKeyConflict {
                    index: self.name,
                    key: format!("{key:?}"),
                    holder: *holder,
                    entity,
                });
            }
        }
        Ok(())
    }

    fn insert(&mut self, entity: Entity, value: &T) {
        let keys = self.keys_for(value);
        for key in &keys {
            self.by_key.entry(key.clone()).or_default().push(entity);
        }
        self.by_entity.insert(entity, keys);
    }

    fn remove(&mut self, entity: Entity) {
        let Some(keys) = self.by_entity.remove(&entity) else {
            return;
        };
        for key in keys {
            if let Some(holders) = self.by_key.get_mut(&key) {
                holders.retain(|holder| *holder != entity);
                if holders.is_empty() {
                    self.by_key.remove(&key);
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T, K: fmt::Debug> fmt::Debug for KeyedIndex<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedIndex")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("keys", &self.by_key.len())
            .field("entities", &self.by_entity.len())
            .finish()
    }
}

/// Typed handle returned when an index is declared on a context.
pub struct IndexHandle<T, K> {
    pub(crate) component: ComponentId,
    pub(crate) position: usize,
    _marker: PhantomData<fn() -> (T, K)>,
}

impl<T, K> IndexHandle<T, K> {
    pub(crate) fn new(component: ComponentId, position: usize) -> Self {
        Self {
            component,
            position,
            _marker: PhantomData,
        }
    }

    pub fn component(&self) -> ComponentId {
        self.component
    }
}

impl<T, K> Clone for IndexHandle<T, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, K> Copy for IndexHandle<T, K> {}

impl<T, K> fmt::Debug for IndexHandle<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexHandle({}, {})", self.component, self.position)
    }
}
