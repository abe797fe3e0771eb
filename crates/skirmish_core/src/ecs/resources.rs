use crate::ecs::EcsError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Type-keyed storage for kernel state shared between systems.
#[derive(Default)]
pub struct Resources {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert<R: Any>(&mut self, resource: R) -> Option<R> {
        self.entries
            .insert(TypeId::of::<R>(), Box::new(resource))
            .and_then(|previous| previous.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    pub fn get<R: Any>(&self) -> Result<&R, EcsError> {
        self.entries
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_ref::<R>())
            .ok_or(EcsError::MissingResource {
                resource: type_name::<R>(),
            })
    }

    pub fn get_mut<R: Any>(&mut self) -> Result<&mut R, EcsError> {
        self.entries
            .get_mut(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast_mut::<R>())
            .ok_or(EcsError::MissingResource {
                resource: type_name::<R>(),
            })
    }

    pub fn remove<R: Any>(&mut self) -> Option<R> {
        self.entries
            .remove(&TypeId::of::<R>())
            .and_then(|entry| entry.downcast::<R>().ok())
            .map(|boxed| *boxed)
    }

    pub fn contains<R: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<R>())
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn missing_resource_is_an_error() {
        let resources = Resources::new();
        assert!(matches!(
            resources.get::<Score>(),
            Err(EcsError::MissingResource { .. })
        ));
    }

    #[test]
    fn insert_overwrites_and_returns_previous() {
        let mut resources = Resources::new();
        assert!(resources.insert(Score(1)).is_none());
        assert_eq!(resources.insert(Score(2)), Some(Score(1)));
        resources.get_mut::<Score>().unwrap().0 += 1;
        assert_eq!(resources.get::<Score>().unwrap(), &Score(3));
        assert_eq!(resources.remove::<Score>(), Some(Score(3)));
        assert!(!resources.contains::<Score>());
    }
}
