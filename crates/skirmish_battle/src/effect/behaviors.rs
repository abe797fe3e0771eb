// behaviors.rs - the five effect kinds

use super::{EffectAction, EffectBehavior, EffectEnv, EffectOutcome, EffectTag, ModifierLedger};
use crate::components::Health;
use crate::config::{ContentId, DamageMode, LoadedEffectKind};
use crate::damage::{DamageBase, DamageRequest, RecoveryRequest};
use crate::error::BattleError;
use crate::formula::{CompiledFormula, FormulaParams};
use crate::property::{FlagKey, ModifierMode, Properties, PropertyKey, ReasonKey};
use crate::status::{apply_control, apply_status};
use skirmish_core::ecs::{Entity, World};
use std::rc::Rc;

/// Fill `params` with every combat parameter for `caster` acting on
/// `target`. Missing entities contribute zeros.
pub fn formula_params(
    world: &World,
    caster: Option<Entity>,
    target: Option<Entity>,
    targets: u32,
    params: &mut FormulaParams,
) {
    let props = |entity: Option<Entity>| {
        entity.and_then(|entity| world.instances.try_get::<Properties>(entity))
    };
    let health = |entity: Option<Entity>| {
        entity
            .and_then(|entity| world.instances.try_get::<Health>(entity))
            .map_or(0.0, |health| health.current)
    };
    let read = |props: Option<&Properties>, key: PropertyKey| props.map_or(0.0, |p| p.get(key));

    let caster_props = props(caster);
    let target_props = props(target);
    params.set("atk", read(caster_props, PropertyKey::Attack));
    params.set("def", read(target_props, PropertyKey::Defense));
    params.set("caster_hp", health(caster));
    params.set("caster_max_hp", read(caster_props, PropertyKey::MaxHp));
    params.set("target_hp", health(target));
    params.set("target_max_hp", read(target_props, PropertyKey::MaxHp));
    params.set("targets", f64::from(targets));
    params.set("crit_rate", read(caster_props, PropertyKey::CritRate));
}

fn scaled(formula: &dyn CompiledFormula, action: &EffectAction) -> Result<f64, BattleError> {
    Ok(formula.evaluate(&action.params)? * action.multiplier)
}

fn shared(behavior: impl EffectBehavior + 'static) -> Option<Rc<dyn EffectBehavior>> {
    Some(Rc::new(behavior))
}

#[derive(Debug)]
pub struct DamageEffect {
    formula: Rc<dyn CompiledFormula>,
    mode: DamageMode,
}

impl DamageEffect {
    pub fn build(kind: &LoadedEffectKind) -> Option<Rc<dyn EffectBehavior>> {
        match kind {
            LoadedEffectKind::Damage { formula, mode } => shared(DamageEffect {
                formula: Rc::clone(formula),
                mode: *mode,
            }),
            _ => None,
        }
    }
}

impl EffectBehavior for DamageEffect {
    fn tag(&self) -> EffectTag {
        EffectTag::Damage
    }

    fn apply(
        &self,
        env: &EffectEnv<'_>,
        world: &mut World,
        action: &EffectAction,
        _ledger: &mut ModifierLedger,
    ) -> Result<EffectOutcome, BattleError> {
        let Some(defender) = action.target else {
            return Ok(EffectOutcome::Skipped);
        };
        let value = scaled(self.formula.as_ref(), action)?;
        let base = match self.mode {
            DamageMode::Rate => DamageBase::Rate(value),
            DamageMode::Fixed => DamageBase::Fixed(value),
        };
        let request = DamageRequest {
            attacker: action.caster,
            defender,
            base,
        };
        Ok(EffectOutcome::Damage(env.resolver.apply_damage(world, &request)?))
    }
}

#[derive(Debug)]
pub struct CureEffect {
    formula: Rc<dyn CompiledFormula>,
}

impl CureEffect {
    pub fn build(kind: &LoadedEffectKind) -> Option<Rc<dyn EffectBehavior>> {
        match kind {
            LoadedEffectKind::Cure { formula } => shared(CureEffect {
                formula: Rc::clone(formula),
            }),
            _ => None,
        }
    }
}

impl EffectBehavior for CureEffect {
    fn tag(&self) -> EffectTag {
        EffectTag::Cure
    }

    fn apply(
        &self,
        env: &EffectEnv<'_>,
        world: &mut World,
        action: &EffectAction,
        _ledger: &mut ModifierLedger,
    ) -> Result<EffectOutcome, BattleError> {
        let Some(target) = action.target else {
            return Ok(EffectOutcome::Skipped);
        };
        let request = RecoveryRequest {
            healer: action.caster,
            target,
            amount: scaled(self.formula.as_ref(), action)?,
        };
        Ok(EffectOutcome::Recovery(
            env.resolver.apply_recovery(world, &request)?,
        ))
    }
}

/// Changes a property, either until the cast ends or for good.
#[derive(Debug)]
pub struct AttributeModifyEffect {
    property: PropertyKey,
    mode: ModifierMode,
    formula: Rc<dyn CompiledFormula>,
    revert_on_end: bool,
}

impl AttributeModifyEffect {
    pub fn build(kind: &LoadedEffectKind) -> Option<Rc<dyn EffectBehavior>> {
        match kind {
            LoadedEffectKind::AttributeModify {
                property,
                mode,
                formula,
                revert_on_end,
            } => shared(AttributeModifyEffect {
                property: *property,
                mode: *mode,
                formula: Rc::clone(formula),
                revert_on_end: *revert_on_end,
            }),
            _ => None,
        }
    }
}

impl EffectBehavior for AttributeModifyEffect {
    fn tag(&self) -> EffectTag {
        EffectTag::AttributeModify
    }

    fn apply(
        &self,
        _env: &EffectEnv<'_>,
        world: &mut World,
        action: &EffectAction,
        ledger: &mut ModifierLedger,
    ) -> Result<EffectOutcome, BattleError> {
        let Some(target) = action.target else {
            return Ok(EffectOutcome::Skipped);
        };
        if !world.instances.has::<Properties>(target) {
            return Ok(EffectOutcome::Skipped);
        }
        let value = scaled(self.formula.as_ref(), action)?;
        let (property, mode) = (self.property, self.mode);

        if self.revert_on_end {
            let reason = ReasonKey::effect(action.cast_key, action.slot);
            world.instances.update::<Properties, _>(target, |props| {
                props.set_modifier(property, reason, mode, value);
            })?;
            ledger.record_modifier(target, property, reason);
        } else {
            world.instances.update::<Properties, _>(target, |props| {
                let base = props.base(property);
                let next = match mode {
                    ModifierMode::Additive => base + value,
                    ModifierMode::Percent => base * (1.0 + value),
                };
                props.set_base(property, next);
            })?;
        }
        Ok(EffectOutcome::Modified { property, value })
    }
}

#[derive(Debug)]
pub struct AddStatusEffect {
    status: ContentId,
}

impl AddStatusEffect {
    pub fn build(kind: &LoadedEffectKind) -> Option<Rc<dyn EffectBehavior>> {
        match kind {
            LoadedEffectKind::AddStatus { status } => shared(AddStatusEffect { status: *status }),
            _ => None,
        }
    }
}

impl EffectBehavior for AddStatusEffect {
    fn tag(&self) -> EffectTag {
        EffectTag::AddStatus
    }

    fn apply(
        &self,
        env: &EffectEnv<'_>,
        world: &mut World,
        action: &EffectAction,
        _ledger: &mut ModifierLedger,
    ) -> Result<EffectOutcome, BattleError> {
        let Some(target) = action.target else {
            return Ok(EffectOutcome::Skipped);
        };
        let status = env
            .catalog
            .status(self.status)
            .ok_or(BattleError::UnknownStatus(self.status))?;
        Ok(EffectOutcome::Status(apply_status(world, target, status)?))
    }
}

/// Timed flag locks such as a stun or a root.
#[derive(Debug)]
pub struct ActionControlEffect {
    locks: Vec<FlagKey>,
    duration: f64,
}

impl ActionControlEffect {
    pub fn build(kind: &LoadedEffectKind) -> Option<Rc<dyn EffectBehavior>> {
        match kind {
            LoadedEffectKind::ActionControl { locks, duration } => shared(ActionControlEffect {
                locks: locks.clone(),
                duration: *duration,
            }),
            _ => None,
        }
    }
}

impl EffectBehavior for ActionControlEffect {
    fn tag(&self) -> EffectTag {
        EffectTag::ActionControl
    }

    fn apply(
        &self,
        _env: &EffectEnv<'_>,
        world: &mut World,
        action: &EffectAction,
        _ledger: &mut ModifierLedger,
    ) -> Result<EffectOutcome, BattleError> {
        let Some(target) = action.target else {
            return Ok(EffectOutcome::Skipped);
        };
        let reason = ReasonKey::control(action.cast_key, action.slot);
        Ok(EffectOutcome::Control(apply_control(
            world,
            target,
            reason,
            &self.locks,
            self.duration,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Dead;
    use crate::config::Catalog;
    use crate::damage::{DamageOutcome, DamageResolver};
    use crate::formula::{ExpressionEvaluator, FormulaEvaluator};
    use crate::signal::BattleSignals;
    use crate::singletons::DamagePolicy;
    use crate::status::{ControlLocks, StatusSet};
    use skirmish_core::ecs::ComponentLayout;

    fn world() -> World {
        let instances = ComponentLayout::new()
            .with::<Properties>()
            .and_then(|l| l.with::<Health>())
            .and_then(|l| l.with::<Dead>())
            .and_then(|l| l.with::<StatusSet>())
            .and_then(|l| l.with::<ControlLocks>())
            .unwrap();
        let singletons = ComponentLayout::new().with::<DamagePolicy>().unwrap();
        let mut world = World::new(instances, singletons);
        world.set_singleton(DamagePolicy::default()).unwrap();
        world.resources.insert(BattleSignals::new());
        world
    }

    fn unit(world: &mut World, attack: f64, hp: f64) -> Entity {
        let entity = world.instances.create_entity();
        let props = Properties::new()
            .with_base(PropertyKey::Attack, attack)
            .with_base(PropertyKey::MaxHp, hp);
        world.instances.add(entity, props).unwrap();
        world.instances.add(entity, Health { current: hp }).unwrap();
        entity
    }

    fn action(world: &World, caster: Entity, target: Entity, multiplier: f64) -> EffectAction {
        let mut action = EffectAction {
            cast_key: 77,
            slot: 1,
            caster: Some(caster),
            target: Some(target),
            targets: 1,
            multiplier,
            ..EffectAction::default()
        };
        formula_params(world, action.caster, action.target, 1, &mut action.params);
        action
    }

    fn formula(source: &str) -> Rc<dyn CompiledFormula> {
        ExpressionEvaluator.compile(source).unwrap()
    }

    #[test]
    fn damage_formula_scales_with_decorators() {
        let mut world = world();
        let caster = unit(&mut world, 40.0, 100.0);
        let target = unit(&mut world, 0.0, 100.0);
        let effect = DamageEffect::build(&LoadedEffectKind::Damage {
            formula: formula("atk * 0.5"),
            mode: DamageMode::Fixed,
        })
        .unwrap();
        let resolver = DamageResolver::default();
        let catalog = Catalog::default();
        let env = EffectEnv {
            resolver: &resolver,
            catalog: &catalog,
        };
        let action = action(&world, caster, target, 0.5);

        let outcome = effect
            .apply(&env, &mut world, &action, &mut ModifierLedger::default())
            .unwrap();

        assert!(matches!(
            outcome,
            EffectOutcome::Damage(DamageOutcome::Applied { amount, .. }) if amount == 10.0
        ));
        assert_eq!(world.instances.get::<Health>(target).unwrap().current, 90.0);
    }

    #[test]
    fn reverting_modify_is_ledgered_and_permanent_is_not() {
        let mut world = world();
        let caster = unit(&mut world, 10.0, 100.0);
        let target = unit(&mut world, 10.0, 100.0);
        let resolver = DamageResolver::default();
        let catalog = Catalog::default();
        let env = EffectEnv {
            resolver: &resolver,
            catalog: &catalog,
        };
        let action = action(&world, caster, target, 1.0);
        let mut ledger = ModifierLedger::default();

        let buff = AttributeModifyEffect::build(&LoadedEffectKind::AttributeModify {
            property: PropertyKey::Attack,
            mode: ModifierMode::Additive,
            formula: formula("5"),
            revert_on_end: true,
        })
        .unwrap();
        let permanent = AttributeModifyEffect::build(&LoadedEffectKind::AttributeModify {
            property: PropertyKey::Defense,
            mode: ModifierMode::Additive,
            formula: formula("3"),
            revert_on_end: false,
        })
        .unwrap();
        buff.apply(&env, &mut world, &action, &mut ledger).unwrap();
        permanent.apply(&env, &mut world, &action, &mut ledger).unwrap();

        assert_eq!(ledger.len(), 1);
        ledger.revert(&mut world).unwrap();
        let props = world.instances.get::<Properties>(target).unwrap();
        assert_eq!(props.get(PropertyKey::Attack), 10.0);
        assert_eq!(props.base(PropertyKey::Defense), 3.0);
    }

    #[test]
    fn unknown_status_is_an_error() {
        let mut world = world();
        let caster = unit(&mut world, 10.0, 100.0);
        let resolver = DamageResolver::default();
        let catalog = Catalog::default();
        let env = EffectEnv {
            resolver: &resolver,
            catalog: &catalog,
        };
        let effect = AddStatusEffect::build(&LoadedEffectKind::AddStatus {
            status: ContentId(404),
        })
        .unwrap();
        let action = action(&world, caster, caster, 1.0);

        let result = effect.apply(&env, &mut world, &action, &mut ModifierLedger::default());
        assert!(matches!(result, Err(BattleError::UnknownStatus(ContentId(404)))));
    }

    #[test]
    fn factories_reject_foreign_kinds() {
        let kind = LoadedEffectKind::AddStatus {
            status: ContentId(1),
        };
        assert!(DamageEffect::build(&kind).is_none());
        assert!(CureEffect::build(&kind).is_none());
        assert!(AddStatusEffect::build(&kind).is_some());
    }
}
