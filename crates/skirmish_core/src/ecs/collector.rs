// collector.rs - accumulates entities for reactive systems
//
// A collector records every entity whose structural change matches one of
// its triggers. Entities are kept once, in first-seen order, until the
// owning system drains the list.

use crate::ecs::{ComponentId, Entity};
use std::collections::HashSet;
use std::fmt;

/// Which transition of a component a trigger listens for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GroupEvent {
    /// The component was attached to an entity that lacked it.
    Added,
    /// The component was detached (explicitly or by entity destruction).
    Removed,
    AddedOrRemoved,
    /// A new value was stored, either by adding or by replacing.
    Replaced,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Change {
    Added,
    Replaced,
    Removed,
}

impl GroupEvent {
    pub(crate) fn matches(self, change: Change) -> bool {
        matches!(
            (self, change),
            (GroupEvent::Added, Change::Added)
                | (GroupEvent::Removed, Change::Removed)
                | (GroupEvent::AddedOrRemoved, Change::Added | Change::Removed)
                | (GroupEvent::Replaced, Change::Added | Change::Replaced)
        )
    }
}

/// A component slot paired with the transition that wakes a collector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub component: ComponentId,
    pub event: GroupEvent,
}

impl Trigger {
    pub fn new(component: ComponentId, event: GroupEvent) -> Self {
        Self { component, event }
    }

    pub fn added(component: ComponentId) -> Self {
        Self::new(component, GroupEvent::Added)
    }

    pub fn removed(component: ComponentId) -> Self {
        Self::new(component, GroupEvent::Removed)
    }

    pub fn replaced(component: ComponentId) -> Self {
        Self::new(component, GroupEvent::Replaced)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CollectorId(pub(crate) usize);

impl fmt::Display for CollectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "collector#{}", self.0)
    }
}

#[derive(Debug)]
pub(crate) struct Collector {
    triggers: Vec<Trigger>,
    entities: Vec<Entity>,
    seen: HashSet<Entity>,
}

impl Collector {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        Self {
            triggers,
            entities: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn notify(&mut self, entity: Entity, component: ComponentId, change: Change) {
        let interested = self
            .triggers
            .iter()
            .any(|trigger| trigger.component == component && trigger.event.matches(change));
        if interested && self.seen.insert(entity) {
            self.entities.push(entity);
        }
    }

    pub fn take(&mut self) -> Vec<Entity> {
        self.seen.clear();
        std::mem::take(&mut self.entities)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaced_trigger_fires_on_add_and_replace() {
        assert!(GroupEvent::Replaced.matches(Change::Added));
        assert!(GroupEvent::Replaced.matches(Change::Replaced));
        assert!(!GroupEvent::Replaced.matches(Change::Removed));
        assert!(!GroupEvent::Added.matches(Change::Replaced));
    }

    #[test]
    fn entities_are_deduplicated_until_drained() {
        let slot = ComponentId::new(0);
        let entity = Entity::new(1, 0);
        let mut collector = Collector::new(vec![Trigger::replaced(slot)]);

        collector.notify(entity, slot, Change::Added);
        collector.notify(entity, slot, Change::Replaced);
        assert_eq!(collector.len(), 1);

        assert_eq!(collector.take(), vec![entity]);
        collector.notify(entity, slot, Change::Replaced);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn unrelated_component_is_ignored() {
        let mut collector = Collector::new(vec![Trigger::added(ComponentId::new(0))]);
        collector.notify(Entity::new(0, 0), ComponentId::new(1), Change::Added);
        assert_eq!(collector.len(), 0);
    }
}
