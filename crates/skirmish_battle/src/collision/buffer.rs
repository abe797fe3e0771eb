// buffer.rs - bounded per-tick storage for raw overlaps

use super::{ColliderShape, RawHit};
use crate::components::Transform;

/// Geometric query supplied by the host's physics scene.
pub trait PhysicsQuery {
    /// Push every object overlapping `shape` placed at `transform`.
    /// Pushes beyond the buffer's capacity are dropped by the buffer.
    fn overlap(&self, shape: &ColliderShape, transform: &Transform, hits: &mut HitBuffer);
}

/// Fixed-capacity hit list, allocated once and reused every check.
#[derive(Debug)]
pub struct HitBuffer {
    hits: Vec<RawHit>,
    capacity: usize,
    dropped: usize,
}

impl HitBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Returns `false` when the buffer is full and the hit was dropped.
    pub fn push(&mut self, hit: RawHit) -> bool {
        if self.hits.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.hits.push(hit);
        true
    }

    pub fn hits(&self) -> &[RawHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hits dropped since the last clear.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.hits.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::HitKind;
    use crate::components::ObjectHandle;
    use glam::Vec3;

    fn hit(object: u64) -> RawHit {
        RawHit {
            object: ObjectHandle(object),
            point: Vec3::ZERO,
            normal: Vec3::Y,
            kind: HitKind::Entity,
        }
    }

    #[test]
    fn overflow_is_counted_and_cleared() {
        let mut buffer = HitBuffer::with_capacity(2);
        assert!(buffer.push(hit(1)));
        assert!(buffer.push(hit(2)));
        assert!(!buffer.push(hit(3)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.dropped(), 1);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped(), 0);
        assert_eq!(buffer.capacity(), 2);
    }
}
