// network.rs - transport boundary: inbound commands in, outbound events out

use super::isolate;
use crate::components::{Cast, CastRequest, Identity};
use crate::error::BattleError;
use crate::net::{InboundMessage, NetworkSink, OutboundMessage, Outbox};
use crate::signal::{publish, BattleSignal, BattleSignalKind, BattleSignals};
use skirmish_core::ecs::{
    Entity, IndexHandle, SubscriberId, System, SystemDescriptor, SystemError, TickQueue, TickSender,
    World,
};
use skirmish_core::time::TickTime;

pub struct NetworkSystem {
    inbound: TickQueue<InboundMessage>,
    sink: Box<dyn NetworkSink>,
    identities: IndexHandle<Identity, u64>,
    subscriber: Option<SubscriberId>,
}

impl NetworkSystem {
    pub fn new(
        inbound: TickQueue<InboundMessage>,
        sink: Box<dyn NetworkSink>,
        identities: IndexHandle<Identity, u64>,
    ) -> Self {
        Self {
            inbound,
            sink,
            identities,
            subscriber: None,
        }
    }

    /// Handle for transport threads.
    pub fn sender(&self) -> TickSender<InboundMessage> {
        self.inbound.sender()
    }

    fn lookup(&self, world: &World, identity: u64) -> Result<Option<Entity>, BattleError> {
        Ok(world
            .instances
            .index(&self.identities)?
            .get_entity(&identity))
    }

    fn apply(&self, world: &mut World, message: InboundMessage) -> Result<(), BattleError> {
        match message {
            InboundMessage::CastAbility {
                caster,
                ability,
                target,
            } => {
                let Some(entity) = self.lookup(world, caster)? else {
                    tracing::debug!(caster, "cast request for unknown identity");
                    return Ok(());
                };
                let target = match target {
                    Some(target) => self.lookup(world, target)?,
                    None => None,
                };
                world
                    .instances
                    .replace(entity, CastRequest { ability, target })?;
            }
            InboundMessage::Reassign { cast } => {
                match self.lookup(world, cast)? {
                    Some(entity) if world.instances.has::<Cast>(entity) => {
                        publish(world, entity, BattleSignal::StartAssign)?;
                    }
                    _ => tracing::debug!(cast, "reassign for unknown cast"),
                }
            }
        }
        Ok(())
    }
}

fn identity_of(world: &World, entity: Entity) -> Option<u64> {
    world.instances.try_get::<Identity>(entity).map(|id| id.0)
}

impl System for NetworkSystem {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("network").in_group("network")
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        let bus = world.resources.get_mut::<BattleSignals>()?;
        self.subscriber = Some(bus.subscribe(
            "network",
            &[
                BattleSignalKind::Damaged,
                BattleSignalKind::Healed,
                BattleSignalKind::Died,
            ],
        ));
        if !world.resources.contains::<Outbox>() {
            world.resources.insert(Outbox::new());
        }
        Ok(())
    }

    fn execute(&mut self, world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        for message in self.inbound.drain() {
            let ok = isolate("network", world.singleton_root(), || {
                self.apply(world, message.clone())
            });
            if !ok {
                tracing::warn!(?message, "inbound message dropped");
            }
        }
        Ok(())
    }

    fn late_execute(&mut self, world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        let subscriber = self
            .subscriber
            .ok_or_else(|| SystemError::failed("network system ran before initialization"))?;
        let signals = world.resources.get_mut::<BattleSignals>()?.drain(subscriber)?;

        let mut outgoing = Vec::with_capacity(signals.len());
        for envelope in signals {
            let Some(entity) = identity_of(world, envelope.entity) else {
                continue;
            };
            let message = match envelope.signal {
                BattleSignal::Damaged {
                    attacker,
                    amount,
                    critical,
                    remaining,
                } => OutboundMessage::DamageDealt {
                    target: entity,
                    attacker: attacker.and_then(|attacker| identity_of(world, attacker)),
                    amount,
                    critical,
                    remaining,
                },
                BattleSignal::Healed { amount, remaining } => OutboundMessage::Healed {
                    target: entity,
                    amount,
                    remaining,
                },
                BattleSignal::Died { killer } => OutboundMessage::EntityDied {
                    entity,
                    killer: killer.and_then(|killer| identity_of(world, killer)),
                },
                _ => continue,
            };
            outgoing.push(message);
        }

        let outbox = world.resources.get_mut::<Outbox>()?;
        for message in outgoing {
            outbox.push(message);
        }
        let sent = outbox.flush(self.sink.as_mut());
        if sent > 0 {
            tracing::trace!(sent, "outbound flushed");
        }
        Ok(())
    }
}
