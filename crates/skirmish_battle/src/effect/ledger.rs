// ledger.rs - what an effect contributed, so it can be taken back
//
// Every modifier or flag override an effect writes under its reason is
// recorded here. Ending the effect reverts exactly the ledger; nothing
// else clears effect reasons.

use crate::property::{FlagKey, Properties, PropertyKey, ReasonKey};
use skirmish_core::ecs::{EcsError, Entity, World};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    Modifier {
        target: Entity,
        key: PropertyKey,
        reason: ReasonKey,
    },
    Flag {
        target: Entity,
        flag: FlagKey,
        reason: ReasonKey,
    },
}

impl LedgerEntry {
    pub fn target(&self) -> Entity {
        match self {
            LedgerEntry::Modifier { target, .. } | LedgerEntry::Flag { target, .. } => *target,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifierLedger {
    entries: Vec<LedgerEntry>,
}

impl ModifierLedger {
    pub fn record_modifier(&mut self, target: Entity, key: PropertyKey, reason: ReasonKey) {
        self.push(LedgerEntry::Modifier { target, key, reason });
    }

    pub fn record_flag(&mut self, target: Entity, flag: FlagKey, reason: ReasonKey) {
        self.push(LedgerEntry::Flag { target, flag, reason });
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear every recorded contribution that is still present. Targets
    /// destroyed in the meantime took their properties with them.
    pub fn revert(&mut self, world: &mut World) -> Result<usize, EcsError> {
        let mut cleared = 0;
        for entry in self.entries.drain(..) {
            let target = entry.target();
            if !world.instances.has::<Properties>(target) {
                continue;
            }
            let mut removed = false;
            world.instances.update::<Properties, _>(target, |props| {
                removed = match entry {
                    LedgerEntry::Modifier { key, reason, .. } => props.clear_modifier(key, reason),
                    LedgerEntry::Flag { flag, reason, .. } => props.clear_flag(flag, reason),
                };
            })?;
            cleared += usize::from(removed);
        }
        Ok(cleared)
    }

    fn push(&mut self, entry: LedgerEntry) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::ModifierMode;
    use skirmish_core::ecs::ComponentLayout;

    #[test]
    fn revert_restores_every_recorded_value() {
        let layout = ComponentLayout::new().with::<Properties>().unwrap();
        let mut world = World::new(layout, ComponentLayout::new());
        let target = world.instances.create_entity();
        world
            .instances
            .add(target, Properties::new().with_base(PropertyKey::Attack, 100.0))
            .unwrap();
        let before = world.instances.get::<Properties>(target).unwrap().clone();

        let reason = ReasonKey::effect(9, 0);
        let mut ledger = ModifierLedger::default();
        world
            .instances
            .update::<Properties, _>(target, |props| {
                props.add_modifier(PropertyKey::Attack, reason, 20.0);
                props.set_modifier(PropertyKey::Defense, reason, ModifierMode::Percent, 0.5);
                props.set_flag(FlagKey::CanMove, reason, false);
            })
            .unwrap();
        ledger.record_modifier(target, PropertyKey::Attack, reason);
        ledger.record_modifier(target, PropertyKey::Attack, reason);
        ledger.record_modifier(target, PropertyKey::Defense, reason);
        ledger.record_flag(target, FlagKey::CanMove, reason);
        assert_eq!(ledger.len(), 3);

        assert_eq!(ledger.revert(&mut world).unwrap(), 3);
        assert!(ledger.is_empty());
        assert_eq!(world.instances.get::<Properties>(target).unwrap(), &before);
    }
}
