//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that address a slot in a
//! context. The generation counter prevents use-after-free bugs: once an
//! entity is destroyed its slot is recycled under a new generation and
//! every old handle is rejected as stale.

use crate::ecs::ComponentMask;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Format: [32-bit index | 32-bit generation]
/// - Index: Position in the context's entity records
/// - Generation: Incremented on entity destruction (prevents use-after-free)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for networking/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EntityRecord {
    pub generation: u32,
    pub alive: bool,
    pub enabled: bool,
    pub mask: ComponentMask,
}

/// Slot allocator with a LIFO free list.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    records: Vec<EntityRecord>,
    free: Vec<u32>,
    alive: usize,
}

impl EntityAllocator {
    pub fn allocate(&mut self) -> Entity {
        self.alive += 1;
        if let Some(index) = self.free.pop() {
            let record = &mut self.records[index as usize];
            record.alive = true;
            record.enabled = true;
            record.mask = ComponentMask::EMPTY;
            return Entity::new(index, record.generation);
        }

        let index = self.records.len() as u32;
        self.records.push(EntityRecord {
            generation: 0,
            alive: true,
            enabled: true,
            mask: ComponentMask::EMPTY,
        });
        Entity::new(index, 0)
    }

    /// Retire the slot; the caller must have stripped every component first.
    pub fn release(&mut self, entity: Entity) -> bool {
        match self.records.get_mut(entity.index as usize) {
            Some(record) if record.alive && record.generation == entity.generation => {
                record.alive = false;
                record.enabled = false;
                record.mask = ComponentMask::EMPTY;
                record.generation = record.generation.wrapping_add(1);
                self.free.push(entity.index);
                self.alive -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records
            .get(entity.index as usize)
            .filter(|record| record.alive && record.generation == entity.generation)
    }

    pub fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(entity.index as usize)
            .filter(|record| record.alive && record.generation == entity.generation)
    }

    pub fn alive_count(&self) -> usize {
        self.alive
    }

    /// Live entities in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &EntityRecord)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(index, record)| (Entity::new(index as u32, record.generation), record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip_preserves_generation() {
        let entity = Entity::new(7, 3);
        let restored = Entity::from_bits(entity.to_bits());
        assert_eq!(restored, entity);
        assert_eq!(restored.generation(), 3);
    }

    #[test]
    fn released_slot_is_reused_with_new_generation() {
        let mut allocator = EntityAllocator::default();
        let first = allocator.allocate();
        assert!(allocator.release(first));
        let second = allocator.allocate();

        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(allocator.record(first).is_none());
        assert!(allocator.record(second).is_some());
    }

    #[test]
    fn double_release_is_rejected() {
        let mut allocator = EntityAllocator::default();
        let entity = allocator.allocate();
        assert!(allocator.release(entity));
        assert!(!allocator.release(entity));
        assert_eq!(allocator.alive_count(), 0);
    }
}
