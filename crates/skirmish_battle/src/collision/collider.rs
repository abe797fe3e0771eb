// collider.rs - per-instance hit state of a collider

use super::ColliderSpec;
use skirmish_core::define_component;
use skirmish_core::ecs::Entity;

/// Tolerance for accumulated tick deltas against the hit interval.
const INTERVAL_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct HitCollider {
    pub spec: ColliderSpec,
    /// Entity the hits are attributed to; never hit by its own collider.
    pub caster: Option<Entity>,
    pub enabled: bool,
    since_check: f64,
    total_hits: u32,
    per_target: Vec<(Entity, u32)>,
    blacklist: Vec<Entity>,
}
define_component!(HitCollider, "HitCollider");

impl HitCollider {
    /// A fresh collider checks on its first tick.
    pub fn new(spec: ColliderSpec, caster: Option<Entity>) -> Self {
        let since_check = spec.hit_interval;
        Self {
            spec,
            caster,
            enabled: true,
            since_check,
            total_hits: 0,
            per_target: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    /// Accumulate `dt`; true when enough time has passed to check.
    pub(crate) fn advance(&mut self, dt: f64) -> bool {
        self.since_check += dt;
        self.since_check + INTERVAL_EPSILON >= self.spec.hit_interval
    }

    /// Restart the interval after a check that found something.
    pub(crate) fn restart_interval(&mut self) {
        self.since_check = 0.0;
    }

    pub fn total_hits(&self) -> u32 {
        self.total_hits
    }

    pub fn hits_on(&self, target: Entity) -> u32 {
        self.per_target
            .iter()
            .find(|(entity, _)| *entity == target)
            .map_or(0, |(_, count)| *count)
    }

    pub fn is_exhausted(&self) -> bool {
        self.spec
            .max_hits
            .is_some_and(|max| self.total_hits >= max)
    }

    pub fn can_hit(&self, target: Entity) -> bool {
        if self.is_exhausted() || self.blacklist.contains(&target) {
            return false;
        }
        self.spec
            .max_hits_per_target
            .map_or(true, |cap| self.hits_on(target) < cap)
    }

    pub(crate) fn count_hit(&mut self, target: Option<Entity>) {
        self.total_hits += 1;
        let Some(target) = target else {
            return;
        };
        match self.per_target.iter_mut().find(|(entity, _)| *entity == target) {
            Some((_, count)) => *count += 1,
            None => self.per_target.push((target, 1)),
        }
    }

    pub fn blacklist(&mut self, target: Entity) {
        if !self.blacklist.contains(&target) {
            self.blacklist.push(target);
        }
    }

    pub fn is_blacklisted(&self, target: Entity) -> bool {
        self.blacklist.contains(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::ColliderShape;
    use skirmish_core::ecs::{ComponentLayout, Context, ContextKind};

    fn spec(interval: f64) -> ColliderSpec {
        ColliderSpec {
            hit_interval: interval,
            max_hits: Some(3),
            max_hits_per_target: Some(2),
            ..ColliderSpec::new(ColliderShape::Sphere { radius: 1.0 })
        }
    }

    #[test]
    fn interval_gates_checks() {
        let mut collider = HitCollider::new(spec(0.5), None);
        assert!(collider.advance(0.1));
        collider.restart_interval();
        let ready: Vec<bool> = (0..5).map(|_| collider.advance(0.1)).collect();
        assert_eq!(ready, vec![false, false, false, false, true]);
    }

    #[test]
    fn caps_apply_per_target_and_overall() {
        let mut context = Context::new(ContextKind::Instance, ComponentLayout::new());
        let a = context.create_entity();
        let b = context.create_entity();
        let mut collider = HitCollider::new(spec(0.0), None);

        collider.count_hit(Some(a));
        collider.count_hit(Some(a));
        assert!(!collider.can_hit(a));
        assert!(collider.can_hit(b));

        collider.count_hit(Some(b));
        assert!(collider.is_exhausted());
        assert!(!collider.can_hit(b));
    }

    #[test]
    fn blacklisted_targets_are_refused() {
        let mut context = Context::new(ContextKind::Instance, ComponentLayout::new());
        let a = context.create_entity();
        let mut collider = HitCollider::new(spec(0.0), None);
        collider.blacklist(a);
        collider.blacklist(a);
        assert!(collider.is_blacklisted(a));
        assert!(!collider.can_hit(a));
    }
}
