//! Arena
//!
//! Owns the world, the scheduler and the simulation clock for one
//! encounter. Setup happens in three fixed steps:
//!
//! 1. [`setup_component_layout`] registers every component in a fixed
//!    order; the resulting slot numbers are part of the wire contract.
//! 2. [`init_component`] seeds singletons, resources and indices.
//! 3. [`init_system`] registers the systems in their run order.

use crate::collision::{CollisionPipeline, HitCollider, PhysicsQuery, SymmetricHitPolicy};
use crate::components::{
    Cast, CastLifetime, CastRequest, Dead, DeathProcess, Faction, Health, Identity, ObjectHandle,
    ObjectLinks, Team, Transform, Velocity, View,
};
use crate::config::{Catalog, ContentId};
use crate::damage::{DamageHooks, DamageResolver, StandardHooks};
use crate::effect::{ActiveEffects, DecoratorRegistry, EffectRegistry};
use crate::error::BattleError;
use crate::net::{InboundMessage, NetworkSink, NullSink, Outbox};
use crate::property::{Properties, PropertyKey};
use crate::signal::BattleSignals;
use crate::singletons::{CameraBlend, DamagePolicy, GameMode, ModeKind, Roster, RosterEntry};
use crate::status::{ControlLocks, StatusSet};
use crate::systems::{
    CastLifetimeSystem, CastSystem, CollisionSystem, CorpseSystem, DeathReactionSystem,
    EffectAssignSystem, HealthClampSystem, MotionSystem, NetworkSystem, StatusSystem,
    ViewSyncSystem,
};
use crate::view::{NullViewSink, ViewSink};
use glam::Vec3;
use skirmish_core::ecs::{
    ComponentLayout, DestroySystem, EcsError, Entity, IndexHandle, IndexKind, PendingDestroy,
    Scheduler, TickQueue, TickReport, TickSender, World,
};
use skirmish_core::time::{SimulationClock, TickTime, TICK_RATE_HZ};
use std::rc::Rc;

/// Index handles shared through the world's resources.
#[derive(Debug, Clone, Copy)]
pub struct ArenaIndices {
    pub identity: IndexHandle<Identity, u64>,
    pub faction: IndexHandle<Faction, Team>,
    pub objects: IndexHandle<ObjectLinks, ObjectHandle>,
}

/// Hands out network identities. Zero is never allocated.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    next: u64,
}

impl IdentityAllocator {
    pub fn allocate(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub tick_rate_hz: u32,
    pub hit_buffer_capacity: usize,
    pub symmetric_hits: SymmetricHitPolicy,
    pub damage: DamagePolicy,
    pub mode: ModeKind,
    /// Seed for the critical-hit roll.
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: TICK_RATE_HZ,
            hit_buffer_capacity: 64,
            symmetric_hits: SymmetricHitPolicy::default(),
            damage: DamagePolicy::default(),
            mode: ModeKind::default(),
            seed: 0x5eed,
        }
    }
}

/// Collaborators the arena talks to but does not own the state of.
pub struct ArenaServices {
    pub catalog: Rc<Catalog>,
    pub physics: Rc<dyn PhysicsQuery>,
    pub view: Box<dyn ViewSink>,
    pub network: Box<dyn NetworkSink>,
    /// Replaces the standard damage hooks when set.
    pub hooks: Option<Rc<dyn DamageHooks>>,
}

impl ArenaServices {
    pub fn new(catalog: Rc<Catalog>, physics: Rc<dyn PhysicsQuery>) -> Self {
        Self {
            catalog,
            physics,
            view: Box::new(NullViewSink),
            network: Box::new(NullSink),
            hooks: None,
        }
    }

    pub fn with_view(mut self, view: Box<dyn ViewSink>) -> Self {
        self.view = view;
        self
    }

    pub fn with_network(mut self, network: Box<dyn NetworkSink>) -> Self {
        self.network = network;
        self
    }

    pub fn with_hooks(mut self, hooks: Rc<dyn DamageHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// Everything needed to put one fighter on the field.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatantSpec {
    pub name: String,
    pub team: Team,
    pub position: Vec3,
    pub max_hp: f64,
    pub attack: f64,
    pub defense: f64,
    pub crit_rate: f64,
    /// Physics objects (body, hit zones) owned by this combatant.
    pub objects: Vec<ObjectHandle>,
    pub view: Option<u64>,
}

impl CombatantSpec {
    pub fn new(name: impl Into<String>, team: Team) -> Self {
        Self {
            name: name.into(),
            team,
            position: Vec3::ZERO,
            max_hp: 100.0,
            attack: 10.0,
            defense: 0.0,
            crit_rate: 0.0,
            objects: Vec::new(),
            view: None,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_stats(mut self, max_hp: f64, attack: f64, defense: f64) -> Self {
        self.max_hp = max_hp;
        self.attack = attack;
        self.defense = defense;
        self
    }

    pub fn with_objects(mut self, objects: impl IntoIterator<Item = ObjectHandle>) -> Self {
        self.objects = objects.into_iter().collect();
        self
    }

    pub fn with_view(mut self, handle: u64) -> Self {
        self.view = Some(handle);
        self
    }
}

/// Component registration order for both contexts.
pub fn setup_component_layout() -> Result<(ComponentLayout, ComponentLayout), EcsError> {
    let instances = ComponentLayout::new()
        .with::<Identity>()?
        .with::<Faction>()?
        .with::<Transform>()?
        .with::<Velocity>()?
        .with::<View>()?
        .with::<ObjectLinks>()?
        .with::<Properties>()?
        .with::<Health>()?
        .with::<Dead>()?
        .with::<DeathProcess>()?
        .with::<HitCollider>()?
        .with::<CastRequest>()?
        .with::<Cast>()?
        .with::<CastLifetime>()?
        .with::<ActiveEffects>()?
        .with::<StatusSet>()?
        .with::<ControlLocks>()?
        .with::<PendingDestroy>()?;

    let singletons = ComponentLayout::new()
        .with::<GameMode>()?
        .with::<DamagePolicy>()?
        .with::<CameraBlend>()?
        .with::<Roster>()?;

    Ok((instances, singletons))
}

fn identity_key(identity: &Identity) -> Vec<u64> {
    vec![identity.0]
}

fn faction_key(faction: &Faction) -> Vec<Team> {
    vec![faction.team]
}

fn object_keys(links: &ObjectLinks) -> Vec<ObjectHandle> {
    links.handles.clone()
}

/// Seed singletons, shared resources and indices.
pub fn init_component(world: &mut World, config: &ArenaConfig) -> Result<ArenaIndices, EcsError> {
    world.set_singleton(GameMode::new(config.mode))?;
    world.set_singleton(config.damage)?;
    world.set_singleton(CameraBlend::default())?;
    world.set_singleton(Roster::default())?;

    let indices = ArenaIndices {
        identity: world
            .instances
            .add_index("identity", IndexKind::Primary, identity_key)?,
        faction: world
            .instances
            .add_index("faction", IndexKind::Bucket, faction_key)?,
        objects: world
            .instances
            .add_index("objects", IndexKind::Multi, object_keys)?,
    };

    world.resources.insert(BattleSignals::new());
    world.resources.insert(Outbox::new());
    world.resources.insert(IdentityAllocator::default());
    world.resources.insert(indices);
    Ok(indices)
}

/// Register every system in run order. Returns the scheduler and the
/// producer half of the inbound network queue.
pub fn init_system(
    config: &ArenaConfig,
    services: ArenaServices,
    indices: ArenaIndices,
) -> Result<(Scheduler, TickSender<InboundMessage>), BattleError> {
    let hooks = services
        .hooks
        .unwrap_or_else(|| Rc::new(StandardHooks::new(config.seed)));
    let resolver = DamageResolver::new(hooks);
    let effects = Rc::new(EffectRegistry::standard());
    let decorators = Rc::new(DecoratorRegistry::standard());
    let pipeline = CollisionPipeline::new(
        services.physics,
        config.hit_buffer_capacity,
        indices.objects,
        config.symmetric_hits,
    );

    let network = NetworkSystem::new(TickQueue::unbounded(), services.network, indices.identity);
    let inbound = network.sender();

    let mut scheduler = Scheduler::new();
    scheduler.register(network)?;
    scheduler.register_reactive(CastSystem::new(
        Rc::clone(&services.catalog),
        effects,
        decorators,
    ))?;
    scheduler.register(MotionSystem::new())?;
    scheduler.register(CollisionSystem::new(pipeline))?;
    scheduler.register(EffectAssignSystem::new(services.catalog, resolver))?;
    scheduler.register(StatusSystem::new())?;
    scheduler.register(CastLifetimeSystem::new())?;
    scheduler.register_reactive(HealthClampSystem::new())?;
    scheduler.register_reactive(DeathReactionSystem::new(indices.faction))?;
    scheduler.register(CorpseSystem::new())?;
    scheduler.register_reactive(DestroySystem::new())?;
    scheduler.register(ViewSyncSystem::new(services.view))?;

    Ok((scheduler, inbound))
}

/// One encounter.
pub struct Arena {
    world: World,
    scheduler: Scheduler,
    clock: SimulationClock,
    indices: ArenaIndices,
    inbound: TickSender<InboundMessage>,
}

impl Arena {
    pub fn new(config: ArenaConfig, services: ArenaServices) -> Result<Self, BattleError> {
        let (instances, singletons) = setup_component_layout()?;
        let mut world = World::new(instances, singletons);
        let indices = init_component(&mut world, &config)?;
        let (mut scheduler, inbound) = init_system(&config, services, indices)?;
        scheduler.initialize(&mut world)?;

        tracing::info!(
            tick_rate = config.tick_rate_hz,
            mode = ?config.mode,
            policy = ?config.symmetric_hits,
            "arena ready"
        );
        Ok(Self {
            world,
            scheduler,
            clock: SimulationClock::new(config.tick_rate_hz),
            indices,
            inbound,
        })
    }

    /// Advance by `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> Result<TickReport, BattleError> {
        let time = self.clock.advance(dt);
        self.run(time)
    }

    /// Advance by one fixed step of the configured tick rate.
    pub fn tick_fixed(&mut self) -> Result<TickReport, BattleError> {
        let time = self.clock.advance_fixed();
        self.run(time)
    }

    fn run(&mut self, time: TickTime) -> Result<TickReport, BattleError> {
        let report = self.scheduler.tick(&mut self.world, &time)?;
        if !report.failures.is_empty() {
            tracing::warn!(tick = time.tick, failures = report.failures.len(), "tick had failures");
        }
        Ok(report)
    }

    pub fn spawn_combatant(&mut self, spec: &CombatantSpec) -> Result<Entity, BattleError> {
        let identity = self
            .world
            .resources
            .get_mut::<IdentityAllocator>()?
            .allocate();
        let props = Properties::new()
            .with_base(PropertyKey::MaxHp, spec.max_hp)
            .with_base(PropertyKey::Attack, spec.attack)
            .with_base(PropertyKey::Defense, spec.defense)
            .with_base(PropertyKey::CritRate, spec.crit_rate);
        let max_hp = props.get(PropertyKey::MaxHp);

        let entity = self.world.instances.create_entity();
        let instances = &mut self.world.instances;
        instances.add(entity, Identity(identity))?;
        instances.add(entity, Faction { team: spec.team })?;
        instances.add(entity, Transform::at(spec.position))?;
        instances.add(
            entity,
            ObjectLinks {
                handles: spec.objects.clone(),
            },
        )?;
        instances.add(entity, props)?;
        instances.add(entity, Health { current: max_hp })?;
        if let Some(handle) = spec.view {
            instances.add(entity, View { handle })?;
        }

        let entry = RosterEntry {
            identity,
            name: spec.name.clone(),
            team: spec.team,
        };
        self.world
            .update_singleton::<Roster, _>(|roster| roster.players.push(entry))?;

        tracing::debug!(%entity, identity, name = %spec.name, team = %spec.team, "combatant spawned");
        Ok(entity)
    }

    /// Request a cast; it starts on the next tick.
    pub fn cast(
        &mut self,
        caster: Entity,
        ability: ContentId,
        target: Option<Entity>,
    ) -> Result<(), BattleError> {
        self.world
            .instances
            .replace(caster, CastRequest { ability, target })?;
        Ok(())
    }

    pub fn identity_of(&self, entity: Entity) -> Option<u64> {
        self.world
            .instances
            .try_get::<Identity>(entity)
            .map(|identity| identity.0)
    }

    pub fn entity_of(&self, identity: u64) -> Result<Option<Entity>, BattleError> {
        Ok(self
            .world
            .instances
            .index(&self.indices.identity)?
            .get_entity(&identity))
    }

    /// Producer half of the inbound queue, for transport threads.
    pub fn inbound_sender(&self) -> TickSender<InboundMessage> {
        self.inbound.clone()
    }

    pub fn indices(&self) -> ArenaIndices {
        self.indices
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn shutdown(&mut self) -> Result<(), BattleError> {
        self.scheduler.teardown(&mut self.world)?;
        Ok(())
    }
}
