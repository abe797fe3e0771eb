// system.rs - system traits, descriptors and handles

use crate::ecs::{Context, ContextKind, EcsError, Entity, SystemError, Trigger, World};
use crate::time::TickTime;
use std::fmt;

/// Name and group label of a registered system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    group: String,
}

impl SystemDescriptor {
    /// Create a new descriptor with the provided name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: String::from("default"),
        }
    }

    /// Subsystem this system belongs to (battle, death, view sync...).
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

/// Handle assigned to each registered system; also its run position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the raw index backing this handle.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A system that runs every tick in registration order.
///
/// Systems receive their collaborators at construction; the world is the
/// only thing passed in per call.
pub trait System {
    fn descriptor(&self) -> SystemDescriptor;

    /// Runs once before the first tick. An error here aborts startup.
    fn initialize(&mut self, _world: &mut World) -> Result<(), SystemError> {
        Ok(())
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError>;

    /// Runs after every system's `execute` for the same tick.
    fn late_execute(&mut self, _world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        Ok(())
    }

    fn teardown(&mut self, _world: &mut World) {}
}

/// A system driven by component transitions instead of table scans.
///
/// The scheduler creates a collector from [`ReactiveSystem::triggers`]
/// during initialization and, each tick, hands [`ReactiveSystem::react`]
/// the deduplicated entities collected since the previous run. Nothing is
/// called when the collector is empty.
pub trait ReactiveSystem {
    fn descriptor(&self) -> SystemDescriptor;

    fn context(&self) -> ContextKind {
        ContextKind::Instance
    }

    fn triggers(&self, context: &Context) -> Result<Vec<Trigger>, EcsError>;

    /// Final gate applied to each collected entity before `react`.
    fn filter(&self, _world: &World, _entity: Entity) -> bool {
        true
    }

    fn initialize(&mut self, _world: &mut World) -> Result<(), SystemError> {
        Ok(())
    }

    fn react(
        &mut self,
        world: &mut World,
        entities: &[Entity],
        time: &TickTime,
    ) -> Result<(), SystemError>;

    fn teardown(&mut self, _world: &mut World) {}
}
