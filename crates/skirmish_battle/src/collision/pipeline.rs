// pipeline.rs - raw overlaps to dispatched hits
//
// One collider is processed at a time: check, handle, cleanup. The buffer
// is shared by every collider and cleared after each one whatever the
// outcome, so nothing found for one owner or one tick is seen by the next.

use super::{
    HitBuffer, HitCollider, HitKind, HitRecord, HitTarget, PhysicsQuery, RawHit,
    SymmetricHitPolicy,
};
use crate::components::{Dead, Faction, ObjectHandle, ObjectLinks, Transform};
use crate::damage::enter_death;
use crate::error::BattleError;
use crate::property::{FlagKey, Properties};
use crate::signal::{publish, BattleSignal};
use crate::singletons::DamagePolicy;
use skirmish_core::ecs::{EcsError, Entity, IndexHandle, World};
use std::rc::Rc;

/// What one collider produced this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitCheck {
    pub records: Vec<HitRecord>,
    /// Hits resolved from the struck side of bidirectional pairs.
    pub mirrored: Vec<HitRecord>,
    pub owner_died: bool,
}

pub struct CollisionPipeline {
    physics: Rc<dyn PhysicsQuery>,
    buffer: HitBuffer,
    objects: IndexHandle<ObjectLinks, ObjectHandle>,
    policy: SymmetricHitPolicy,
}

impl CollisionPipeline {
    pub fn new(
        physics: Rc<dyn PhysicsQuery>,
        buffer_capacity: usize,
        objects: IndexHandle<ObjectLinks, ObjectHandle>,
        policy: SymmetricHitPolicy,
    ) -> Self {
        Self {
            physics,
            buffer: HitBuffer::with_capacity(buffer_capacity),
            objects,
            policy,
        }
    }

    pub fn policy(&self) -> SymmetricHitPolicy {
        self.policy
    }

    /// Check, handle and clean up one collider.
    pub fn process(
        &mut self,
        world: &mut World,
        owner: Entity,
        dt: f64,
    ) -> Result<HitCheck, BattleError> {
        let outcome = match self.check_raw_hits(world, owner, dt) {
            Ok(true) => self.handle_raw_hits(world, owner),
            Ok(false) => Ok(HitCheck::default()),
            Err(error) => Err(error),
        };
        self.cleanup();
        outcome
    }

    /// Query the physics scene for `owner` once its hit interval allows.
    /// Returns whether anything overlapped.
    pub fn check_raw_hits(
        &mut self,
        world: &mut World,
        owner: Entity,
        dt: f64,
    ) -> Result<bool, BattleError> {
        let mut collider = world.instances.get::<HitCollider>(owner)?.clone();
        if !collider.enabled {
            return Ok(false);
        }

        let ready = collider.advance(dt);
        if ready {
            let transform = *world.instances.get::<Transform>(owner)?;
            self.physics
                .overlap(&collider.spec.shape, &transform, &mut self.buffer);
            if self.buffer.dropped() > 0 {
                tracing::warn!(
                    %owner,
                    dropped = self.buffer.dropped(),
                    capacity = self.buffer.capacity(),
                    "hit buffer overflow"
                );
            }
            if !self.buffer.is_empty() {
                collider.restart_interval();
            }
        }
        world.instances.replace(owner, collider)?;
        Ok(ready && !self.buffer.is_empty())
    }

    /// Filter the buffered overlaps of `owner` into hits and dispatch them.
    pub fn handle_raw_hits(
        &mut self,
        world: &mut World,
        owner: Entity,
    ) -> Result<HitCheck, BattleError> {
        let mut check = HitCheck::default();
        if world.instances.has::<Dead>(owner) {
            tracing::trace!(%owner, "dead collider owner, hits ignored");
            return Ok(check);
        }

        let friendly_fire = world.singleton::<DamagePolicy>()?.friendly_fire;
        let mut collider = world.instances.get::<HitCollider>(owner)?.clone();
        let faction = faction_of(world, owner, collider.caster);
        let mut struck: Vec<Entity> = Vec::new();
        let raw_hits: Vec<RawHit> = self.buffer.hits().to_vec();

        for raw in raw_hits {
            if collider.is_exhausted() {
                break;
            }
            if raw.kind == HitKind::Obstacle {
                if collider.spec.ignore_obstacles {
                    continue;
                }
                collider.count_hit(None);
                check.records.push(HitRecord {
                    source: owner,
                    target: HitTarget::Obstacle(raw.object),
                    point: raw.point,
                    normal: raw.normal,
                    kind: raw.kind,
                });
                continue;
            }

            let Some(target) = self.resolve(world, raw.object)? else {
                tracing::trace!(object = raw.object.0, "hit object has no owner");
                continue;
            };
            // several parts of one target count once per check
            if target == owner || Some(target) == collider.caster || struck.contains(&target) {
                continue;
            }
            if !collider.can_hit(target) || !is_eligible(world, faction, target, friendly_fire) {
                continue;
            }

            struck.push(target);
            collider.count_hit(Some(target));
            check.records.push(HitRecord {
                source: owner,
                target: HitTarget::Entity(target),
                point: raw.point,
                normal: raw.normal,
                kind: raw.kind,
            });

            if collider.spec.bidirectional {
                if let Some(mirror) = self.mirror(world, owner, target, &raw, friendly_fire)? {
                    check.mirrored.push(mirror);
                }
            }
        }

        let exhausted = collider.is_exhausted() && collider.spec.destroy_on_hit;
        world.instances.replace(owner, collider)?;

        let targets_this_check = struck.len() as u32;
        for record in &check.records {
            publish(
                world,
                owner,
                BattleSignal::Hit {
                    record: *record,
                    targets_this_check,
                },
            )?;
        }
        for record in &check.mirrored {
            publish(
                world,
                record.source,
                BattleSignal::Hit {
                    record: *record,
                    targets_this_check: 1,
                },
            )?;
        }

        if exhausted {
            check.owner_died = enter_death(world, owner, None)?;
        }
        tracing::trace!(%owner, hits = check.records.len(), "hits handled");
        Ok(check)
    }

    /// Clear tick-scoped data.
    pub fn cleanup(&mut self) {
        self.buffer.clear();
    }

    fn resolve(&self, world: &World, object: ObjectHandle) -> Result<Option<Entity>, EcsError> {
        let index = world.instances.index(&self.objects)?;
        Ok(index.get_entities(&object).first().copied())
    }

    /// Resolve `target` hitting `owner` when both carry colliders.
    fn mirror(
        &self,
        world: &mut World,
        owner: Entity,
        target: Entity,
        raw: &RawHit,
        friendly_fire: bool,
    ) -> Result<Option<HitRecord>, BattleError> {
        let Some(other) = world.instances.try_get::<HitCollider>(target) else {
            return Ok(None);
        };
        let allowed = match self.policy {
            SymmetricHitPolicy::Never => false,
            SymmetricHitPolicy::Always => true,
            SymmetricHitPolicy::ActiveSourcesOnly => other.enabled && other.spec.active_as_source,
        };
        if !allowed || world.instances.has::<Dead>(target) || !other.can_hit(owner) {
            return Ok(None);
        }
        let faction = faction_of(world, target, other.caster);
        if Some(owner) == other.caster || !is_eligible(world, faction, owner, friendly_fire) {
            return Ok(None);
        }

        let mut other = other.clone();
        other.count_hit(Some(owner));
        let exhausted = other.is_exhausted() && other.spec.destroy_on_hit;
        world.instances.replace(target, other)?;
        if exhausted {
            enter_death(world, target, None)?;
        }

        Ok(Some(HitRecord {
            source: target,
            target: HitTarget::Entity(owner),
            point: raw.point,
            normal: -raw.normal,
            kind: HitKind::Entity,
        }))
    }
}

/// The collider owner's team, falling back to the caster's.
fn faction_of(world: &World, owner: Entity, caster: Option<Entity>) -> Option<Faction> {
    world
        .instances
        .try_get::<Faction>(owner)
        .or_else(|| caster.and_then(|caster| world.instances.try_get::<Faction>(caster)))
        .copied()
}

/// Alive, hostile unless friendly fire is on, blockable and hittable.
/// Entities without properties (projectiles) only need to be alive.
fn is_eligible(world: &World, source: Option<Faction>, target: Entity, friendly_fire: bool) -> bool {
    let instances = &world.instances;
    if !instances.is_alive(target) || instances.has::<Dead>(target) {
        return false;
    }
    if !friendly_fire {
        let hostile = match (source, instances.try_get::<Faction>(target)) {
            (Some(source), Some(target)) => source.is_hostile_to(target),
            _ => true,
        };
        if !hostile {
            return false;
        }
    }
    instances.try_get::<Properties>(target).map_or(true, |props| {
        props.flag(FlagKey::Alive) && props.flag(FlagKey::Blockable) && props.flag(FlagKey::Hittable)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{ColliderShape, ColliderSpec};
    use crate::components::Team;
    use crate::signal::BattleSignals;
    use glam::Vec3;
    use skirmish_core::ecs::{ComponentLayout, IndexKind};
    use std::cell::RefCell;

    /// Reports the same overlaps on every query.
    struct Scripted(RefCell<Vec<RawHit>>);

    impl PhysicsQuery for Scripted {
        fn overlap(&self, _: &ColliderShape, _: &Transform, hits: &mut HitBuffer) {
            for hit in self.0.borrow().iter() {
                hits.push(*hit);
            }
        }
    }

    fn raw(object: u64, kind: HitKind) -> RawHit {
        RawHit {
            object: ObjectHandle(object),
            point: Vec3::ZERO,
            normal: Vec3::X,
            kind,
        }
    }

    struct Fixture {
        world: World,
        pipeline: CollisionPipeline,
        physics: Rc<Scripted>,
    }

    fn fixture(policy: SymmetricHitPolicy) -> Fixture {
        let instances = ComponentLayout::new()
            .with::<Faction>()
            .and_then(|l| l.with::<Transform>())
            .and_then(|l| l.with::<ObjectLinks>())
            .and_then(|l| l.with::<Properties>())
            .and_then(|l| l.with::<Dead>())
            .and_then(|l| l.with::<HitCollider>())
            .unwrap();
        let singletons = ComponentLayout::new().with::<DamagePolicy>().unwrap();
        let mut world = World::new(instances, singletons);
        world.set_singleton(DamagePolicy::default()).unwrap();
        world.resources.insert(BattleSignals::new());
        let objects = world
            .instances
            .add_index::<ObjectLinks, ObjectHandle>("objects", IndexKind::Multi, |links| {
                links.handles.clone()
            })
            .unwrap();
        let physics = Rc::new(Scripted(RefCell::new(Vec::new())));
        let pipeline = CollisionPipeline::new(physics.clone(), 8, objects, policy);
        Fixture {
            world,
            pipeline,
            physics,
        }
    }

    fn body(world: &mut World, team: Team, objects: &[u64]) -> Entity {
        let entity = world.instances.create_entity();
        world.instances.add(entity, Faction { team }).unwrap();
        world.instances.add(entity, Transform::default()).unwrap();
        world
            .instances
            .add(
                entity,
                ObjectLinks {
                    handles: objects.iter().copied().map(ObjectHandle).collect(),
                },
            )
            .unwrap();
        world.instances.add(entity, Properties::new()).unwrap();
        entity
    }

    fn arm(world: &mut World, owner: Entity, spec: ColliderSpec) {
        world
            .instances
            .add(owner, HitCollider::new(spec, None))
            .unwrap();
    }

    fn sphere() -> ColliderSpec {
        ColliderSpec::new(ColliderShape::Sphere { radius: 1.0 })
    }

    #[test]
    fn sub_parts_and_allies_are_filtered() {
        let mut f = fixture(SymmetricHitPolicy::default());
        let owner = body(&mut f.world, Team::Blue, &[1]);
        let ally = body(&mut f.world, Team::Blue, &[2]);
        let enemy = body(&mut f.world, Team::Red, &[3, 4]);
        arm(&mut f.world, owner, sphere());
        *f.physics.0.borrow_mut() = vec![
            raw(1, HitKind::Entity),
            raw(2, HitKind::Entity),
            raw(3, HitKind::Entity),
            raw(4, HitKind::SubPart),
            raw(99, HitKind::Obstacle),
        ];

        let check = f.pipeline.process(&mut f.world, owner, 0.1).unwrap();

        assert_eq!(check.records.len(), 1);
        assert_eq!(check.records[0].target, HitTarget::Entity(enemy));
        assert_eq!(f.world.instances.get::<HitCollider>(owner).unwrap().hits_on(ally), 0);
    }

    #[test]
    fn obstacles_count_when_not_ignored() {
        let mut f = fixture(SymmetricHitPolicy::default());
        let owner = body(&mut f.world, Team::Blue, &[1]);
        arm(
            &mut f.world,
            owner,
            ColliderSpec {
                ignore_obstacles: false,
                max_hits: Some(1),
                destroy_on_hit: true,
                ..sphere()
            },
        );
        *f.physics.0.borrow_mut() = vec![raw(99, HitKind::Obstacle)];

        let check = f.pipeline.process(&mut f.world, owner, 0.1).unwrap();

        assert_eq!(check.records[0].target, HitTarget::Obstacle(ObjectHandle(99)));
        assert!(check.owner_died);
        assert!(f.world.instances.has::<Dead>(owner));
    }

    #[test]
    fn unhittable_target_is_skipped() {
        let mut f = fixture(SymmetricHitPolicy::default());
        let owner = body(&mut f.world, Team::Blue, &[1]);
        let enemy = body(&mut f.world, Team::Red, &[2]);
        f.world
            .instances
            .update::<Properties, _>(enemy, |props| props.set_flag_base(FlagKey::Hittable, false))
            .unwrap();
        arm(&mut f.world, owner, sphere());
        *f.physics.0.borrow_mut() = vec![raw(2, HitKind::Entity)];

        assert!(f.pipeline.process(&mut f.world, owner, 0.1).unwrap().records.is_empty());
    }

    #[test]
    fn symmetric_policy_controls_passive_receivers() {
        let passive = ColliderSpec {
            active_as_source: false,
            ..sphere()
        };
        let bidirectional = ColliderSpec {
            bidirectional: true,
            ..sphere()
        };

        for (policy, expected) in [
            (SymmetricHitPolicy::ActiveSourcesOnly, 0),
            (SymmetricHitPolicy::Always, 1),
            (SymmetricHitPolicy::Never, 0),
        ] {
            let mut f = fixture(policy);
            let owner = body(&mut f.world, Team::Blue, &[1]);
            let hazard = body(&mut f.world, Team::Red, &[2]);
            arm(&mut f.world, owner, bidirectional.clone());
            arm(&mut f.world, hazard, passive.clone());
            *f.physics.0.borrow_mut() = vec![raw(2, HitKind::Entity)];

            let check = f.pipeline.process(&mut f.world, owner, 0.1).unwrap();

            assert_eq!(check.records.len(), 1, "{policy:?}");
            assert_eq!(check.mirrored.len(), expected, "{policy:?}");
            let hazard_hits = f.world.instances.get::<HitCollider>(hazard).unwrap().hits_on(owner);
            assert_eq!(hazard_hits, expected as u32, "{policy:?}");
        }
    }

    #[test]
    fn active_sources_mirror_each_other() {
        let mut f = fixture(SymmetricHitPolicy::ActiveSourcesOnly);
        let spec = ColliderSpec {
            bidirectional: true,
            ..sphere()
        };
        let left = body(&mut f.world, Team::Blue, &[1]);
        let right = body(&mut f.world, Team::Red, &[2]);
        arm(&mut f.world, left, spec.clone());
        arm(&mut f.world, right, spec);
        *f.physics.0.borrow_mut() = vec![raw(2, HitKind::Entity)];

        let check = f.pipeline.process(&mut f.world, left, 0.1).unwrap();

        assert_eq!(check.mirrored.len(), 1);
        assert_eq!(check.mirrored[0].source, right);
        assert_eq!(check.mirrored[0].target, HitTarget::Entity(left));
    }

    #[test]
    fn dead_owner_dispatches_nothing_and_buffer_is_cleared() {
        let mut f = fixture(SymmetricHitPolicy::default());
        let owner = body(&mut f.world, Team::Blue, &[1]);
        body(&mut f.world, Team::Red, &[2]);
        arm(&mut f.world, owner, sphere());
        f.world.instances.add(owner, Dead::default()).unwrap();
        *f.physics.0.borrow_mut() = vec![raw(2, HitKind::Entity)];

        let check = f.pipeline.process(&mut f.world, owner, 0.1).unwrap();

        assert!(check.records.is_empty());
        assert!(f.pipeline.buffer.is_empty());
    }
}
