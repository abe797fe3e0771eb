//! Object pooling with scoped acquisition
//!
//! Acquiring from an [`ObjectPool`] returns a [`Pooled`] guard. The guard
//! resets the object and hands it back when dropped, so early returns and
//! `?` paths release exactly like the happy path.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Objects that can be wiped back to a reusable state.
pub trait Poolable: Default {
    fn reset(&mut self);
}

pub struct ObjectPool<T: Poolable> {
    free: Vec<T>,
    capacity: usize,
    outstanding: usize,
    created: usize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Pre-allocates `capacity` objects. Acquiring past that allocates a
    /// fresh object; releasing past it drops the object.
    pub fn new(capacity: usize) -> Self {
        let free = (0..capacity).map(|_| T::default()).collect();
        Self {
            free,
            capacity,
            outstanding: 0,
            created: capacity,
        }
    }

    pub fn acquire(&mut self) -> Pooled<'_, T> {
        let value = match self.free.pop() {
            Some(value) => value,
            None => {
                self.created += 1;
                tracing::debug!(created = self.created, "object pool grew past capacity");
                T::default()
            }
        };
        self.outstanding += 1;
        Pooled { pool: self, value }
    }

    fn release(&mut self, mut value: T) {
        value.reset();
        self.outstanding -= 1;
        if self.free.len() < self.capacity {
            self.free.push(value);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Objects currently handed out.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Objects ever constructed, including the initial fill.
    pub fn created(&self) -> usize {
        self.created
    }
}

impl<T: Poolable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.capacity)
            .field("available", &self.free.len())
            .field("outstanding", &self.outstanding)
            .finish()
    }
}

/// Borrowed pool object; returned on drop.
pub struct Pooled<'a, T: Poolable> {
    pool: &'a mut ObjectPool<T>,
    value: T,
}

impl<T: Poolable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Poolable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Poolable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let value = std::mem::take(&mut self.value);
        self.pool.release(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug)]
    struct Scratch {
        items: Vec<u32>,
    }

    impl Poolable for Scratch {
        fn reset(&mut self) {
            self.items.clear();
        }
    }

    fn fill(pool: &mut ObjectPool<Scratch>, fail: bool) -> Result<usize, &'static str> {
        let mut scratch = pool.acquire();
        scratch.items.extend([1, 2, 3]);
        if fail {
            return Err("bail out early");
        }
        Ok(scratch.items.len())
    }

    #[test]
    fn guard_releases_on_every_exit_path() {
        let mut pool = ObjectPool::<Scratch>::new(1);
        assert_eq!(fill(&mut pool, false), Ok(3));
        assert!(fill(&mut pool, true).is_err());

        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.available(), 1);
        assert!(pool.acquire().items.is_empty());
    }

    #[test]
    fn pool_grows_but_keeps_capacity_bound() {
        let mut pool = ObjectPool::<Scratch>::new(0);
        drop(pool.acquire());
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.available(), 0);
    }
}
