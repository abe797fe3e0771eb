// damage.rs - damage and recovery resolution, death transition
//
// Rejections (not damageable, already dead, no health left) are ordinary
// outcomes, never errors. Entities without properties are neither
// damageable nor healable. Errors are reserved for a broken world such as
// a missing damage policy or signal bus.

use crate::components::{Dead, Health};
use crate::error::BattleError;
use crate::property::{FlagKey, Properties, PropertyKey};
use crate::signal::{publish, BattleSignal};
use crate::singletons::DamagePolicy;
use skirmish_core::ecs::{EcsError, Entity, World};
use skirmish_core::math::DeterministicRng;
use std::cell::Cell;
use std::rc::Rc;

/// Attack minus defense, floored at 1 when the attacker has any real
/// attack and at 0 otherwise.
pub fn base_damage(attack: f64, defense: f64) -> f64 {
    let raw = attack - defense;
    if raw <= 0.0 {
        if attack > 1.0 {
            1.0
        } else {
            0.0
        }
    } else {
        raw
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DamageBase {
    /// Multiplies the attack/defense base.
    Rate(f64),
    Fixed(f64),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DamageRequest {
    pub attacker: Option<Entity>,
    pub defender: Entity,
    pub base: DamageBase,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RecoveryRequest {
    pub healer: Option<Entity>,
    pub target: Entity,
    pub amount: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The entity was destroyed.
    Gone,
    NotDamageable,
    AlreadyDead,
    /// No health component or nothing left to lose.
    NoHealth,
    NotHealable,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DamageOutcome {
    Applied {
        amount: f64,
        critical: bool,
        /// The hit moved the defender into the death state.
        lethal: bool,
        remaining: f64,
    },
    Rejected(RejectReason),
}

impl DamageOutcome {
    pub fn amount(&self) -> f64 {
        match self {
            DamageOutcome::Applied { amount, .. } => *amount,
            DamageOutcome::Rejected(_) => 0.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RecoveryOutcome {
    Applied { amount: f64, remaining: f64 },
    Rejected(RejectReason),
}

/// Extension points around damage and recovery.
pub trait DamageHooks {
    /// Multiplier applied to every hit.
    fn damage_rate(&self, _world: &World, _request: &DamageRequest) -> f64 {
        1.0
    }

    fn is_critical(&self, _world: &World, _request: &DamageRequest) -> bool {
        false
    }

    fn before_damage(&self, _world: &mut World, _request: &DamageRequest) -> Result<(), BattleError> {
        Ok(())
    }

    fn after_damage(
        &self,
        _world: &mut World,
        _request: &DamageRequest,
        _outcome: &DamageOutcome,
    ) -> Result<(), BattleError> {
        Ok(())
    }

    fn before_recovery(
        &self,
        _world: &mut World,
        _request: &RecoveryRequest,
    ) -> Result<(), BattleError> {
        Ok(())
    }

    fn after_recovery(
        &self,
        _world: &mut World,
        _request: &RecoveryRequest,
        _outcome: &RecoveryOutcome,
    ) -> Result<(), BattleError> {
        Ok(())
    }
}

/// Rate and crit read from properties; hit reactions for hitbackable
/// survivors.
#[derive(Debug)]
pub struct StandardHooks {
    rng: Cell<DeterministicRng>,
}

impl StandardHooks {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Cell::new(DeterministicRng::new(seed)),
        }
    }
}

impl Default for StandardHooks {
    fn default() -> Self {
        Self::new(0x5eed)
    }
}

impl DamageHooks for StandardHooks {
    fn damage_rate(&self, world: &World, request: &DamageRequest) -> f64 {
        let dealt = request
            .attacker
            .and_then(|attacker| world.instances.try_get::<Properties>(attacker))
            .map_or(1.0, |props| props.get(PropertyKey::DamageRate));
        let taken = world
            .instances
            .try_get::<Properties>(request.defender)
            .map_or(1.0, |props| props.get(PropertyKey::DamageTakenRate));
        dealt * taken
    }

    fn is_critical(&self, world: &World, request: &DamageRequest) -> bool {
        let crit_rate = request
            .attacker
            .and_then(|attacker| world.instances.try_get::<Properties>(attacker))
            .map_or(0.0, |props| props.get(PropertyKey::CritRate));
        let mut rng = self.rng.get();
        let critical = rng.chance(crit_rate);
        self.rng.set(rng);
        critical
    }

    fn after_damage(
        &self,
        world: &mut World,
        request: &DamageRequest,
        outcome: &DamageOutcome,
    ) -> Result<(), BattleError> {
        if !matches!(outcome, DamageOutcome::Applied { .. }) {
            return Ok(());
        }
        let hitbackable = world
            .instances
            .get::<Properties>(request.defender)?
            .flag(FlagKey::Hitbackable);
        if hitbackable {
            publish(
                world,
                request.defender,
                BattleSignal::HitReaction {
                    attacker: request.attacker,
                },
            )?;
        }
        Ok(())
    }
}

/// Applies damage and healing to instance entities.
#[derive(Clone)]
pub struct DamageResolver {
    hooks: Rc<dyn DamageHooks>,
}

impl DamageResolver {
    pub fn new(hooks: Rc<dyn DamageHooks>) -> Self {
        Self { hooks }
    }

    pub fn apply_damage(
        &self,
        world: &mut World,
        request: &DamageRequest,
    ) -> Result<DamageOutcome, BattleError> {
        let defender = request.defender;
        if let Some(reason) = damage_gate(world, defender)? {
            tracing::trace!(%defender, ?reason, "damage rejected");
            return Ok(DamageOutcome::Rejected(reason));
        }

        self.hooks.before_damage(world, request)?;

        let base = match request.base {
            DamageBase::Fixed(value) => value,
            DamageBase::Rate(rate) => {
                let attack = request
                    .attacker
                    .and_then(|attacker| world.instances.try_get::<Properties>(attacker))
                    .map_or(0.0, |props| props.get(PropertyKey::Attack));
                let defense = world
                    .instances
                    .get::<Properties>(defender)?
                    .get(PropertyKey::Defense);
                base_damage(attack, defense) * rate
            }
        };
        let critical = self.hooks.is_critical(world, request);
        let multiplier = if critical {
            world.singleton::<DamagePolicy>()?.crit_multiplier
        } else {
            1.0
        };
        let amount = (base * self.hooks.damage_rate(world, request) * multiplier).max(0.0);

        let current = world.instances.get::<Health>(defender)?.current;
        let remaining = (current - amount).max(0.0);
        world
            .instances
            .replace(defender, Health { current: remaining })?;

        let mut lethal = false;
        if remaining <= 0.0 {
            let can_die = world
                .instances
                .get::<Properties>(defender)?
                .flag(FlagKey::CanDie);
            if can_die {
                lethal = enter_death(world, defender, request.attacker)?;
            }
        }

        let outcome = DamageOutcome::Applied {
            amount,
            critical,
            lethal,
            remaining,
        };
        publish(
            world,
            defender,
            BattleSignal::Damaged {
                attacker: request.attacker,
                amount,
                critical,
                remaining,
            },
        )?;
        self.hooks.after_damage(world, request, &outcome)?;
        tracing::debug!(%defender, amount, critical, remaining, "damage applied");
        Ok(outcome)
    }

    pub fn apply_recovery(
        &self,
        world: &mut World,
        request: &RecoveryRequest,
    ) -> Result<RecoveryOutcome, BattleError> {
        let target = request.target;
        if let Some(reason) = recovery_gate(world, target)? {
            tracing::trace!(%target, ?reason, "recovery rejected");
            return Ok(RecoveryOutcome::Rejected(reason));
        }

        self.hooks.before_recovery(world, request)?;

        let props = world.instances.get::<Properties>(target)?;
        let scaled = (request.amount * props.get(PropertyKey::HealRate)).max(0.0);
        let max_hp = props.get(PropertyKey::MaxHp);
        let current = world.instances.get::<Health>(target)?.current;
        let remaining = (current + scaled).min(max_hp);
        let amount = (remaining - current).max(0.0);
        world
            .instances
            .replace(target, Health { current: remaining })?;

        let outcome = RecoveryOutcome::Applied { amount, remaining };
        publish(world, target, BattleSignal::Healed { amount, remaining })?;
        self.hooks.after_recovery(world, request, &outcome)?;
        tracing::debug!(%target, amount, remaining, "recovery applied");
        Ok(outcome)
    }
}

impl Default for DamageResolver {
    fn default() -> Self {
        Self::new(Rc::new(StandardHooks::default()))
    }
}

fn damage_gate(world: &World, defender: Entity) -> Result<Option<RejectReason>, EcsError> {
    let instances = &world.instances;
    if !instances.is_alive(defender) {
        return Ok(Some(RejectReason::Gone));
    }
    if instances.has::<Dead>(defender) {
        return Ok(Some(RejectReason::AlreadyDead));
    }
    let damageable = instances
        .try_get::<Properties>(defender)
        .is_some_and(|props| props.flag(FlagKey::Damageable));
    if !damageable {
        return Ok(Some(RejectReason::NotDamageable));
    }
    match instances.try_get::<Health>(defender) {
        Some(health) if health.current > 0.0 => Ok(None),
        _ => Ok(Some(RejectReason::NoHealth)),
    }
}

fn recovery_gate(world: &World, target: Entity) -> Result<Option<RejectReason>, EcsError> {
    let instances = &world.instances;
    if !instances.is_alive(target) {
        return Ok(Some(RejectReason::Gone));
    }
    if instances.has::<Dead>(target) {
        return Ok(Some(RejectReason::AlreadyDead));
    }
    let Some(props) = instances.try_get::<Properties>(target) else {
        return Ok(Some(RejectReason::NotHealable));
    };
    if !props.flag(FlagKey::Alive) {
        return Ok(Some(RejectReason::AlreadyDead));
    }
    if !props.flag(FlagKey::CanHeal) {
        return Ok(Some(RejectReason::NotHealable));
    }
    if !instances.has::<Health>(target) {
        return Ok(Some(RejectReason::NoHealth));
    }
    Ok(None)
}

/// Move an entity into the death state. Returns `false` when it was
/// already dead, in which case nothing changes.
pub fn enter_death(
    world: &mut World,
    entity: Entity,
    killer: Option<Entity>,
) -> Result<bool, EcsError> {
    if world.instances.has::<Dead>(entity) {
        return Ok(false);
    }
    if world.instances.has::<Properties>(entity) {
        world.instances.update::<Properties, _>(entity, |props| {
            for flag in FlagKey::DEATH_GATES {
                props.set_flag_base(flag, false);
            }
        })?;
    }
    world.instances.add(entity, Dead { killer })?;
    publish(world, entity, BattleSignal::Died { killer })?;
    tracing::debug!(%entity, ?killer, "entered death state");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{BattleSignalKind, BattleSignals};
    use skirmish_core::ecs::ComponentLayout;

    fn world() -> World {
        let instances = ComponentLayout::new()
            .with::<Properties>()
            .and_then(|layout| layout.with::<Health>())
            .and_then(|layout| layout.with::<Dead>())
            .unwrap();
        let singletons = ComponentLayout::new().with::<DamagePolicy>().unwrap();
        let mut world = World::new(instances, singletons);
        world.set_singleton(DamagePolicy::default()).unwrap();
        world.resources.insert(BattleSignals::new());
        world
    }

    fn fighter(world: &mut World, attack: f64, defense: f64, hp: f64) -> Entity {
        let entity = world.instances.create_entity();
        let props = Properties::new()
            .with_base(PropertyKey::Attack, attack)
            .with_base(PropertyKey::Defense, defense)
            .with_base(PropertyKey::MaxHp, hp);
        world.instances.add(entity, props).unwrap();
        world.instances.add(entity, Health { current: hp }).unwrap();
        entity
    }

    fn rate(attacker: Entity, defender: Entity, rate: f64) -> DamageRequest {
        DamageRequest {
            attacker: Some(attacker),
            defender,
            base: DamageBase::Rate(rate),
        }
    }

    #[test]
    fn base_damage_floor() {
        assert_eq!(base_damage(50.0, 20.0), 30.0);
        assert_eq!(base_damage(10.0, 40.0), 1.0);
        assert_eq!(base_damage(1.0, 5.0), 0.0);
        assert_eq!(base_damage(0.5, 0.0), 0.5);
    }

    #[test]
    fn crit_uses_policy_multiplier() {
        let mut world = world();
        let a = fighter(&mut world, 50.0, 0.0, 100.0);
        let b = fighter(&mut world, 0.0, 20.0, 100.0);
        world
            .instances
            .update::<Properties, _>(a, |props| props.set_base(PropertyKey::CritRate, 1.0))
            .unwrap();

        let outcome = DamageResolver::default()
            .apply_damage(&mut world, &rate(a, b, 1.0))
            .unwrap();

        assert_eq!(
            outcome,
            DamageOutcome::Applied {
                amount: 45.0,
                critical: true,
                lethal: false,
                remaining: 55.0
            }
        );
    }

    #[test]
    fn non_damageable_target_is_untouched() {
        let mut world = world();
        let a = fighter(&mut world, 50.0, 0.0, 100.0);
        let b = fighter(&mut world, 0.0, 0.0, 100.0);
        world
            .instances
            .update::<Properties, _>(b, |props| props.set_flag_base(FlagKey::Damageable, false))
            .unwrap();

        let outcome = DamageResolver::default()
            .apply_damage(&mut world, &rate(a, b, 1.0))
            .unwrap();

        assert_eq!(outcome, DamageOutcome::Rejected(RejectReason::NotDamageable));
        assert_eq!(world.instances.get::<Health>(b).unwrap().current, 100.0);
    }

    #[test]
    fn undying_target_stops_at_zero() {
        let mut world = world();
        let a = fighter(&mut world, 50.0, 0.0, 100.0);
        let b = fighter(&mut world, 0.0, 0.0, 10.0);
        world
            .instances
            .update::<Properties, _>(b, |props| props.set_flag_base(FlagKey::CanDie, false))
            .unwrap();
        let resolver = DamageResolver::default();

        let first = resolver.apply_damage(&mut world, &rate(a, b, 1.0)).unwrap();
        let second = resolver.apply_damage(&mut world, &rate(a, b, 1.0)).unwrap();

        assert!(matches!(first, DamageOutcome::Applied { lethal: false, remaining, .. } if remaining == 0.0));
        assert_eq!(second, DamageOutcome::Rejected(RejectReason::NoHealth));
        assert!(!world.instances.has::<Dead>(b));
    }

    #[test]
    fn recovery_is_capped_and_scaled() {
        let mut world = world();
        let b = fighter(&mut world, 0.0, 0.0, 100.0);
        world.instances.replace(b, Health { current: 60.0 }).unwrap();
        world
            .instances
            .update::<Properties, _>(b, |props| props.set_base(PropertyKey::HealRate, 2.0))
            .unwrap();
        let resolver = DamageResolver::default();

        let outcome = resolver
            .apply_recovery(
                &mut world,
                &RecoveryRequest {
                    healer: None,
                    target: b,
                    amount: 15.0,
                },
            )
            .unwrap();

        assert_eq!(
            outcome,
            RecoveryOutcome::Applied {
                amount: 30.0,
                remaining: 90.0
            }
        );

        let capped = resolver
            .apply_recovery(
                &mut world,
                &RecoveryRequest {
                    healer: None,
                    target: b,
                    amount: 50.0,
                },
            )
            .unwrap();
        assert_eq!(
            capped,
            RecoveryOutcome::Applied {
                amount: 10.0,
                remaining: 100.0
            }
        );
    }

    #[test]
    fn dead_cannot_be_healed() {
        let mut world = world();
        let b = fighter(&mut world, 0.0, 0.0, 100.0);
        enter_death(&mut world, b, None).unwrap();

        let outcome = DamageResolver::default()
            .apply_recovery(
                &mut world,
                &RecoveryRequest {
                    healer: None,
                    target: b,
                    amount: 10.0,
                },
            )
            .unwrap();
        assert_eq!(outcome, RecoveryOutcome::Rejected(RejectReason::AlreadyDead));
    }

    #[test]
    fn hit_reaction_only_for_survivors() {
        let mut world = world();
        let watcher = world
            .resources
            .get_mut::<BattleSignals>()
            .unwrap()
            .subscribe("test", &[BattleSignalKind::HitReaction]);
        let a = fighter(&mut world, 50.0, 0.0, 100.0);
        let tough = fighter(&mut world, 0.0, 0.0, 100.0);
        let frail = fighter(&mut world, 0.0, 0.0, 10.0);
        let resolver = DamageResolver::default();

        resolver.apply_damage(&mut world, &rate(a, tough, 1.0)).unwrap();
        resolver.apply_damage(&mut world, &rate(a, frail, 1.0)).unwrap();

        let reactions = world
            .resources
            .get_mut::<BattleSignals>()
            .unwrap()
            .drain(watcher)
            .unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].entity, tough);
    }
}
