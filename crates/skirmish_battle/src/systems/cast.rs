// cast.rs - turns cast requests into cast entities

use super::isolate;
use crate::collision::HitCollider;
use crate::components::{
    Cast, CastLifetime, CastRequest, Dead, Faction, Identity, Transform, Velocity,
};
use crate::config::Catalog;
use crate::effect::{ActiveEffects, DecoratorRegistry, EffectRegistry};
use crate::error::BattleError;
use crate::net::{OutboundMessage, Outbox};
use crate::property::{FlagKey, Properties};
use crate::signal::{publish, BattleSignal};
use crate::IdentityAllocator;
use skirmish_core::ecs::{
    Context, EcsError, Entity, ReactiveSystem, SystemDescriptor, SystemError, Trigger, World,
};
use skirmish_core::time::TickTime;
use std::rc::Rc;

/// Reacts to `CastRequest` being placed on a caster.
pub struct CastSystem {
    catalog: Rc<Catalog>,
    effects: Rc<EffectRegistry>,
    decorators: Rc<DecoratorRegistry>,
}

impl CastSystem {
    pub fn new(
        catalog: Rc<Catalog>,
        effects: Rc<EffectRegistry>,
        decorators: Rc<DecoratorRegistry>,
    ) -> Self {
        Self {
            catalog,
            effects,
            decorators,
        }
    }

    fn start_cast(&self, world: &mut World, caster: Entity) -> Result<(), BattleError> {
        let request = *world.instances.remove::<CastRequest>(caster)?;

        if world.instances.has::<Dead>(caster) {
            tracing::debug!(%caster, "dead caster, cast ignored");
            return Ok(());
        }
        let can_act = world
            .instances
            .try_get::<Properties>(caster)
            .map_or(true, |props| props.flag(FlagKey::CanAct));
        if !can_act {
            tracing::debug!(%caster, "caster cannot act, cast ignored");
            return Ok(());
        }
        let ability = self
            .catalog
            .ability(request.ability)
            .ok_or(BattleError::UnknownAbility(request.ability))?;
        let effects = ActiveEffects::attach(ability, &self.effects, &self.decorators)?;

        let identity = world.resources.get_mut::<IdentityAllocator>()?.allocate();
        let cast = world.instances.create_entity();
        world.instances.add(cast, Identity(identity))?;
        world.instances.add(
            cast,
            Cast {
                ability: ability.id,
                caster,
                target: request.target,
            },
        )?;
        world.instances.add(
            cast,
            CastLifetime {
                remaining: ability.duration,
            },
        )?;
        if let Some(faction) = world.instances.try_get::<Faction>(caster).copied() {
            world.instances.add(cast, faction)?;
        }
        world.instances.add(cast, effects)?;

        if let Some(hitbox) = &ability.hitbox {
            let transform = *world.instances.get::<Transform>(caster)?;
            world.instances.add(cast, transform)?;
            if hitbox.speed > 0.0 {
                world
                    .instances
                    .add(cast, Velocity(transform.forward() * hitbox.speed))?;
            }
            world
                .instances
                .add(cast, HitCollider::new(hitbox.collider.clone(), Some(caster)))?;
        }

        publish(world, cast, BattleSignal::StartAssign)?;
        if let Some(caster_identity) = world.instances.try_get::<Identity>(caster).map(|id| id.0) {
            world.resources.get_mut::<Outbox>()?.push(OutboundMessage::CastStarted {
                cast: identity,
                caster: caster_identity,
                ability: ability.id,
            });
        }
        tracing::debug!(%caster, %cast, ability = %ability.id, name = %ability.name, "cast started");
        Ok(())
    }
}

impl ReactiveSystem for CastSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("cast").in_group("battle")
    }

    fn triggers(&self, context: &Context) -> Result<Vec<Trigger>, EcsError> {
        Ok(vec![Trigger::replaced(context.component_id::<CastRequest>()?)])
    }

    fn filter(&self, world: &World, entity: Entity) -> bool {
        world.instances.has::<CastRequest>(entity)
    }

    fn react(
        &mut self,
        world: &mut World,
        entities: &[Entity],
        _time: &TickTime,
    ) -> Result<(), SystemError> {
        for &caster in entities {
            isolate("cast", caster, || self.start_cast(world, caster));
        }
        Ok(())
    }
}
