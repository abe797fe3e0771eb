// effect_assign.rs - applies cast effects on start-assign and hit signals
//
// Each application pulls an action from the pool, fills it from the signal
// and the current world, and hands it to the effect's behavior. The
// target is validated again immediately before every single application:
// an earlier effect of the same pass may have killed it.

use crate::collision::HitTarget;
use crate::components::{Cast, Dead, Identity};
use crate::config::{Catalog, EffectTrigger, TargetRule};
use crate::damage::DamageResolver;
use crate::effect::{formula_params, ActiveEffects, EffectAction, EffectEnv};
use crate::error::BattleError;
use crate::signal::{BattleSignal, BattleSignalKind, BattleSignals};
use skirmish_core::ecs::{
    Entity, SignalEnvelope, SubscriberId, System, SystemDescriptor, SystemError, World,
};
use skirmish_core::pool::ObjectPool;
use skirmish_core::time::TickTime;
use std::rc::Rc;

const ACTION_POOL_CAPACITY: usize = 32;

pub struct EffectAssignSystem {
    catalog: Rc<Catalog>,
    resolver: DamageResolver,
    actions: ObjectPool<EffectAction>,
    subscriber: Option<SubscriberId>,
}

/// What a signal asks the cast to do.
struct Assignment {
    trigger: EffectTrigger,
    struck: Option<Entity>,
    targets: u32,
}

impl EffectAssignSystem {
    pub fn new(catalog: Rc<Catalog>, resolver: DamageResolver) -> Self {
        Self {
            catalog,
            resolver,
            actions: ObjectPool::new(ACTION_POOL_CAPACITY),
            subscriber: None,
        }
    }

    pub fn actions(&self) -> &ObjectPool<EffectAction> {
        &self.actions
    }

    fn assign(
        &mut self,
        world: &mut World,
        envelope: SignalEnvelope<BattleSignal>,
    ) -> Result<(), BattleError> {
        let cast_entity = envelope.entity;
        let assignment = match envelope.signal {
            BattleSignal::StartAssign => Assignment {
                trigger: EffectTrigger::OnCast,
                struck: None,
                targets: 1,
            },
            BattleSignal::Hit {
                record,
                targets_this_check,
            } => Assignment {
                trigger: EffectTrigger::OnHit,
                struck: match record.target {
                    HitTarget::Entity(entity) => Some(entity),
                    HitTarget::Obstacle(_) => None,
                },
                targets: targets_this_check,
            },
            _ => return Ok(()),
        };

        // hits on colliders that are not casts carry no effects
        if !world.instances.is_alive(cast_entity) || !world.instances.has::<ActiveEffects>(cast_entity)
        {
            return Ok(());
        }
        let cast = *world.instances.get::<Cast>(cast_entity)?;
        let cast_key = world.instances.get::<Identity>(cast_entity)?.0;
        let mut active = world.instances.get::<ActiveEffects>(cast_entity)?.clone();
        let ledgers_before: usize = active.effects.iter().map(|effect| effect.ledger.len()).sum();

        let env = EffectEnv {
            resolver: &self.resolver,
            catalog: self.catalog.as_ref(),
        };

        for effect in &mut active.effects {
            if effect.config.trigger != assignment.trigger {
                continue;
            }
            let target = match effect.config.target {
                TargetRule::Caster => Some(cast.caster),
                TargetRule::Target => match assignment.trigger {
                    EffectTrigger::OnCast => cast.target,
                    EffectTrigger::OnHit => assignment.struck,
                },
            };
            let Some(target) = target else {
                continue;
            };
            if !world.instances.is_alive(target) || world.instances.has::<Dead>(target) {
                tracing::trace!(cast = %cast_entity, %target, "target no longer valid");
                continue;
            }

            let mut action = self.actions.acquire();
            action.cast = Some(cast_entity);
            action.cast_key = cast_key;
            action.slot = effect.slot;
            action.caster = Some(cast.caster);
            action.target = Some(target);
            action.targets = assignment.targets;
            action.multiplier = effect.multiplier(assignment.targets);
            formula_params(
                world,
                action.caster,
                action.target,
                assignment.targets,
                &mut action.params,
            );

            match effect.behavior.apply(&env, world, &action, &mut effect.ledger) {
                Ok(outcome) => {
                    tracing::trace!(
                        cast = %cast_entity,
                        effect = %effect.config.id,
                        tag = effect.behavior.tag().name(),
                        ?outcome,
                        "effect applied"
                    );
                }
                Err(error) => {
                    tracing::error!(
                        cast = %cast_entity,
                        effect = %effect.config.id,
                        %error,
                        "effect failed"
                    );
                }
            }
        }

        let ledgers_after: usize = active.effects.iter().map(|effect| effect.ledger.len()).sum();
        if ledgers_after != ledgers_before {
            world.instances.replace(cast_entity, active)?;
        }
        Ok(())
    }
}

impl System for EffectAssignSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("effect_assign").in_group("battle")
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        let bus = world.resources.get_mut::<BattleSignals>()?;
        self.subscriber = Some(bus.subscribe(
            "effect_assign",
            &[BattleSignalKind::StartAssign, BattleSignalKind::Hit],
        ));
        Ok(())
    }

    fn execute(&mut self, world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        let subscriber = self
            .subscriber
            .ok_or_else(|| SystemError::failed("effect_assign ran before initialization"))?;
        let signals = world.resources.get_mut::<BattleSignals>()?.drain(subscriber)?;
        for envelope in signals {
            let cast = envelope.entity;
            if let Err(error) = self.assign(world, envelope) {
                tracing::error!(%cast, %error, "effect assignment failed");
            }
        }
        Ok(())
    }
}
