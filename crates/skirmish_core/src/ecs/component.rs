// component.rs - Component trait and the per-context slot layout
//
// Components are identified by a dense u16 slot assigned at setup time,
// not by reflection at runtime. The slot order is part of any save or
// network format that references components by number, so a layout can
// export a manifest and verify it against a previously recorded one.

use crate::ecs::column::{Column, ErasedColumn};
use crate::ecs::EcsError;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Upper bound on component types per context (size of [`ComponentMask`](crate::ecs::ComponentMask)).
pub const MAX_COMPONENTS: usize = 256;

/// Dense slot of a component type inside one context layout.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(u16);

impl ComponentId {
    pub(crate) const fn new(slot: u16) -> Self {
        Self(slot)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Plain data attached to an entity.
///
/// Values are immutable once stored: replacing a component swaps in a
/// fresh allocation, so `Clone` is what mutation is built on.
pub trait Component: Any + Clone + fmt::Debug {
    /// Human-readable name for diagnostics and layout manifests.
    const NAME: &'static str;
}

/// Helper macro to implement the [`Component`] trait.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Debug)]
/// struct Health { current: f64 }
///
/// define_component!(Health, "Health");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const NAME: &'static str = $name;
        }
    };
}

struct SlotInfo {
    name: &'static str,
    make_column: fn() -> Box<dyn ErasedColumn>,
}

/// Ordered set of component types for one context.
#[derive(Default)]
pub struct ComponentLayout {
    slots: Vec<SlotInfo>,
    by_type: HashMap<TypeId, ComponentId>,
}

impl ComponentLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next slot to `T`.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        if self.by_type.contains_key(&TypeId::of::<T>()) {
            return Err(EcsError::DuplicateComponent { component: T::NAME });
        }
        if self.slots.len() >= MAX_COMPONENTS {
            return Err(EcsError::LayoutFull { max: MAX_COMPONENTS });
        }

        let id = ComponentId::new(self.slots.len() as u16);
        self.slots.push(SlotInfo {
            name: T::NAME,
            make_column: Column::<T>::boxed,
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        Ok(id)
    }

    /// Builder-style registration for setup code.
    pub fn with<T: Component>(mut self) -> Result<Self, EcsError> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn id_of<T: Component>(&self) -> Result<ComponentId, EcsError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent { component: T::NAME })
    }

    pub fn contains<T: Component>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    pub fn name_of(&self, id: ComponentId) -> Option<&'static str> {
        self.slots.get(id.index()).map(|slot| slot.name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot assignment as serializable data.
    pub fn manifest(&self) -> LayoutManifest {
        LayoutManifest {
            slots: self
                .slots
                .iter()
                .enumerate()
                .map(|(slot, info)| ManifestEntry {
                    slot: slot as u16,
                    name: info.name.to_string(),
                })
                .collect(),
        }
    }

    /// Reject this layout if it disagrees with a recorded manifest.
    ///
    /// Appending new slots after the recorded ones is allowed; moving,
    /// renaming or dropping a recorded slot is not.
    pub fn verify(&self, recorded: &LayoutManifest) -> Result<(), EcsError> {
        for entry in &recorded.slots {
            let found = self
                .slots
                .get(entry.slot as usize)
                .map(|info| info.name.to_string())
                .unwrap_or_else(|| "<missing>".to_string());
            if found != entry.name {
                return Err(EcsError::LayoutMismatch {
                    slot: entry.slot,
                    expected: entry.name.clone(),
                    found,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn build_columns(&self) -> Vec<Box<dyn ErasedColumn>> {
        self.slots.iter().map(|slot| (slot.make_column)()).collect()
    }
}

impl fmt::Debug for ComponentLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|slot| slot.name))
            .finish()
    }
}

/// Recorded slot order of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutManifest {
    pub slots: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub slot: u16,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Position;
    crate::define_component!(Position, "Position");

    #[derive(Clone, Debug)]
    struct Velocity;
    crate::define_component!(Velocity, "Velocity");

    #[test]
    fn slots_follow_registration_order() {
        let mut layout = ComponentLayout::new();
        let position = layout.register::<Position>().unwrap();
        let velocity = layout.register::<Velocity>().unwrap();

        assert_eq!(position.index(), 0);
        assert_eq!(velocity.index(), 1);
        assert_eq!(layout.id_of::<Velocity>().unwrap(), velocity);
        assert_eq!(layout.name_of(position), Some("Position"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut layout = ComponentLayout::new();
        layout.register::<Position>().unwrap();
        assert!(matches!(
            layout.register::<Position>(),
            Err(EcsError::DuplicateComponent { component: "Position" })
        ));
    }

    #[test]
    fn unregistered_lookup_fails() {
        let layout = ComponentLayout::new();
        assert!(matches!(
            layout.id_of::<Position>(),
            Err(EcsError::UnregisteredComponent { .. })
        ));
    }

    #[test]
    fn reordered_layout_fails_manifest_check() {
        let recorded = ComponentLayout::new()
            .with::<Position>()
            .and_then(|l| l.with::<Velocity>())
            .unwrap()
            .manifest();

        let reordered = ComponentLayout::new()
            .with::<Velocity>()
            .and_then(|l| l.with::<Position>())
            .unwrap();
        assert!(matches!(
            reordered.verify(&recorded),
            Err(EcsError::LayoutMismatch { slot: 0, .. })
        ));

        let appended = ComponentLayout::new()
            .with::<Position>()
            .and_then(|l| l.with::<Velocity>())
            .unwrap();
        assert!(appended.verify(&recorded).is_ok());
    }

    #[test]
    fn manifest_serializes_to_json() {
        let manifest = ComponentLayout::new().with::<Position>().unwrap().manifest();
        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: LayoutManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, manifest);
    }
}
