// status.rs - timed statuses and control locks
//
// A status contributes its modifiers and flag overrides under a reason
// derived from its content id, so applying it again refreshes the timer
// instead of stacking. Control locks are timed flag overrides keyed by the
// cast and effect slot that imposed them. Expiry clears the reason.

use crate::components::Dead;
use crate::config::{ContentId, StatusConfig};
use crate::property::{FlagKey, Properties, ReasonKey};
use skirmish_core::define_component;
use skirmish_core::ecs::{EcsError, Entity, World};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ActiveStatus {
    pub id: ContentId,
    pub remaining: f64,
}

impl ActiveStatus {
    pub fn reason(&self) -> ReasonKey {
        ReasonKey::status(u64::from(self.id.0))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSet {
    pub active: Vec<ActiveStatus>,
}
define_component!(StatusSet, "StatusSet");

impl StatusSet {
    pub fn has(&self, id: ContentId) -> bool {
        self.active.iter().any(|status| status.id == id)
    }

    pub fn remaining(&self, id: ContentId) -> Option<f64> {
        self.active
            .iter()
            .find(|status| status.id == id)
            .map(|status| status.remaining)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlLock {
    pub reason: ReasonKey,
    pub flags: Vec<FlagKey>,
    pub remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlLocks {
    pub locks: Vec<ControlLock>,
}
define_component!(ControlLocks, "ControlLocks");

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Applied,
    Refreshed,
    /// Target gone, dead or without properties.
    Ignored,
}

fn can_receive(world: &World, target: Entity) -> bool {
    world.instances.is_alive(target)
        && !world.instances.has::<Dead>(target)
        && world.instances.has::<Properties>(target)
}

/// Apply `status` to `target`, or restart its timer when already active.
pub fn apply_status(
    world: &mut World,
    target: Entity,
    status: &StatusConfig,
) -> Result<StatusOutcome, EcsError> {
    if !can_receive(world, target) {
        return Ok(StatusOutcome::Ignored);
    }

    let mut set = world
        .instances
        .try_get::<StatusSet>(target)
        .cloned()
        .unwrap_or_default();
    if let Some(active) = set.active.iter_mut().find(|active| active.id == status.id) {
        active.remaining = status.duration;
        world.instances.replace(target, set)?;
        tracing::trace!(%target, status = %status.id, "status refreshed");
        return Ok(StatusOutcome::Refreshed);
    }

    let entry = ActiveStatus {
        id: status.id,
        remaining: status.duration,
    };
    let reason = entry.reason();
    world.instances.update::<Properties, _>(target, |props| {
        for modifier in &status.modifiers {
            props.set_modifier(modifier.property, reason, modifier.mode, modifier.value);
        }
        for flag in &status.flags {
            props.set_flag(flag.flag, reason, flag.value);
        }
    })?;
    set.active.push(entry);
    world.instances.replace(target, set)?;
    tracing::debug!(%target, status = %status.id, name = %status.name, "status applied");
    Ok(StatusOutcome::Applied)
}

/// Lock `flags` off on `target` for `duration` seconds under `reason`.
/// Targets that are not stunnable are left alone.
pub fn apply_control(
    world: &mut World,
    target: Entity,
    reason: ReasonKey,
    flags: &[FlagKey],
    duration: f64,
) -> Result<StatusOutcome, EcsError> {
    if !can_receive(world, target) {
        return Ok(StatusOutcome::Ignored);
    }
    if !world
        .instances
        .get::<Properties>(target)?
        .flag(FlagKey::Stunnable)
    {
        tracing::trace!(%target, "control rejected, target not stunnable");
        return Ok(StatusOutcome::Ignored);
    }

    world.instances.update::<Properties, _>(target, |props| {
        for flag in flags {
            props.set_flag(*flag, reason, false);
        }
    })?;

    let mut locks = world
        .instances
        .try_get::<ControlLocks>(target)
        .cloned()
        .unwrap_or_default();
    let outcome = match locks.locks.iter_mut().find(|lock| lock.reason == reason) {
        Some(lock) => {
            lock.remaining = duration;
            lock.flags = flags.to_vec();
            StatusOutcome::Refreshed
        }
        None => {
            locks.locks.push(ControlLock {
                reason,
                flags: flags.to_vec(),
                remaining: duration,
            });
            StatusOutcome::Applied
        }
    };
    world.instances.replace(target, locks)?;
    Ok(outcome)
}

/// Count statuses and locks down by `dt`, clearing whatever ran out.
/// Returns how many expired.
pub fn tick_timers(world: &mut World, entity: Entity, dt: f64) -> Result<usize, EcsError> {
    let mut expired: Vec<ReasonKey> = Vec::new();

    if let Some(set) = world.instances.try_get::<StatusSet>(entity) {
        let mut set = set.clone();
        set.active.retain_mut(|status| {
            status.remaining -= dt;
            if status.remaining <= 0.0 {
                expired.push(status.reason());
                false
            } else {
                true
            }
        });
        world.instances.replace(entity, set)?;
    }

    if let Some(locks) = world.instances.try_get::<ControlLocks>(entity) {
        let mut locks = locks.clone();
        locks.locks.retain_mut(|lock| {
            lock.remaining -= dt;
            if lock.remaining <= 0.0 {
                expired.push(lock.reason);
                false
            } else {
                true
            }
        });
        world.instances.replace(entity, locks)?;
    }

    if !expired.is_empty() && world.instances.has::<Properties>(entity) {
        world.instances.update::<Properties, _>(entity, |props| {
            for reason in &expired {
                props.clear_reason(*reason);
            }
        })?;
        tracing::trace!(%entity, expired = expired.len(), "timers expired");
    }
    Ok(expired.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlagOverride, StatusModifier};
    use crate::property::{ModifierMode, PropertyKey};
    use skirmish_core::ecs::ComponentLayout;

    fn world() -> (World, Entity) {
        let instances = ComponentLayout::new()
            .with::<Properties>()
            .and_then(|l| l.with::<Dead>())
            .and_then(|l| l.with::<StatusSet>())
            .and_then(|l| l.with::<ControlLocks>())
            .unwrap();
        let mut world = World::new(instances, ComponentLayout::new());
        let entity = world.instances.create_entity();
        world
            .instances
            .add(entity, Properties::new().with_base(PropertyKey::MoveSpeed, 4.0))
            .unwrap();
        (world, entity)
    }

    fn haste() -> StatusConfig {
        StatusConfig {
            id: ContentId(7),
            name: "haste".into(),
            duration: 1.0,
            modifiers: vec![StatusModifier {
                property: PropertyKey::MoveSpeed,
                mode: ModifierMode::Percent,
                value: 0.5,
            }],
            flags: vec![FlagOverride {
                flag: FlagKey::Stunnable,
                value: false,
            }],
        }
    }

    #[test]
    fn status_refreshes_instead_of_stacking() {
        let (mut world, entity) = world();

        assert_eq!(apply_status(&mut world, entity, &haste()).unwrap(), StatusOutcome::Applied);
        tick_timers(&mut world, entity, 0.6).unwrap();
        assert_eq!(apply_status(&mut world, entity, &haste()).unwrap(), StatusOutcome::Refreshed);

        let props = world.instances.get::<Properties>(entity).unwrap();
        assert_eq!(props.get(PropertyKey::MoveSpeed), 6.0);
        assert!(!props.flag(FlagKey::Stunnable));
        let set = world.instances.get::<StatusSet>(entity).unwrap();
        assert_eq!(set.remaining(ContentId(7)), Some(1.0));
    }

    #[test]
    fn expiry_restores_properties() {
        let (mut world, entity) = world();
        apply_status(&mut world, entity, &haste()).unwrap();

        assert_eq!(tick_timers(&mut world, entity, 0.5).unwrap(), 0);
        assert_eq!(tick_timers(&mut world, entity, 0.5).unwrap(), 1);

        let props = world.instances.get::<Properties>(entity).unwrap();
        assert_eq!(props.get(PropertyKey::MoveSpeed), 4.0);
        assert!(props.flag(FlagKey::Stunnable));
        assert!(!world.instances.get::<StatusSet>(entity).unwrap().has(ContentId(7)));
    }

    #[test]
    fn control_needs_a_stunnable_target() {
        let (mut world, entity) = world();
        let reason = ReasonKey::control(1, 0);

        assert_eq!(
            apply_control(&mut world, entity, reason, &[FlagKey::CanMove], 0.3).unwrap(),
            StatusOutcome::Applied
        );
        assert!(!world.instances.get::<Properties>(entity).unwrap().flag(FlagKey::CanMove));

        // haste makes the target unstunnable
        apply_status(&mut world, entity, &haste()).unwrap();
        let other = ReasonKey::control(2, 0);
        assert_eq!(
            apply_control(&mut world, entity, other, &[FlagKey::CanAct], 0.3).unwrap(),
            StatusOutcome::Ignored
        );

        tick_timers(&mut world, entity, 0.3).unwrap();
        assert!(world.instances.get::<Properties>(entity).unwrap().flag(FlagKey::CanMove));
    }
}
