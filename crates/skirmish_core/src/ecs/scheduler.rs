// scheduler.rs - ordered, phased execution of systems
//
// Registration order is run order. A tick runs every `execute` phase, then
// every `late_execute` phase. A failing system is logged and recorded in
// the tick report; the remaining systems still run. A failure during
// initialization aborts startup.

use crate::ecs::{
    CollectorId, ContextKind, Entity, ReactiveSystem, SchedulerError, System, SystemDescriptor,
    SystemError, SystemHandle, World,
};
use crate::time::TickTime;
use skirmish_metrics::{time_scope, Counter, SystemProfiler};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Uninitialized,
    Running,
    TornDown,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Execute,
    LateExecute,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Execute => f.write_str("execute"),
            Phase::LateExecute => f.write_str("late_execute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFailure {
    pub system: String,
    pub phase: Phase,
    pub message: String,
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: u64,
    pub failures: Vec<SystemFailure>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ScheduledSystem {
    handle: SystemHandle,
    descriptor: SystemDescriptor,
    system: Box<dyn System>,
}

pub struct Scheduler {
    systems: Vec<ScheduledSystem>,
    names: HashMap<String, SystemHandle>,
    state: SchedulerState,
    profiler: SystemProfiler,
    counters: Counter,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            names: HashMap::new(),
            state: SchedulerState::Uninitialized,
            profiler: SystemProfiler::new(),
            counters: Counter::new(),
        }
    }

    pub fn register<S>(&mut self, system: S) -> Result<SystemHandle, SchedulerError>
    where
        S: System + 'static,
    {
        self.push(Box::new(system))
    }

    pub fn register_reactive<R>(&mut self, system: R) -> Result<SystemHandle, SchedulerError>
    where
        R: ReactiveSystem + 'static,
    {
        self.push(Box::new(Reactor {
            inner: system,
            collector: None,
        }))
    }

    fn push(&mut self, system: Box<dyn System>) -> Result<SystemHandle, SchedulerError> {
        self.expect_state(SchedulerState::Uninitialized, "register a system")?;

        let descriptor = system.descriptor();
        if self.names.contains_key(descriptor.name()) {
            return Err(SchedulerError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }

        let handle = SystemHandle::new(self.systems.len() as u32);
        self.names.insert(descriptor.name().to_string(), handle);
        tracing::debug!(
            system = descriptor.name(),
            group = descriptor.group(),
            %handle,
            "system registered"
        );
        self.systems.push(ScheduledSystem {
            handle,
            descriptor,
            system,
        });
        Ok(handle)
    }

    /// Initialize every system in order; the first failure is fatal.
    pub fn initialize(&mut self, world: &mut World) -> Result<(), SchedulerError> {
        self.expect_state(SchedulerState::Uninitialized, "initialize")?;
        for entry in &mut self.systems {
            entry.system.initialize(world).map_err(|source| {
                tracing::error!(system = entry.descriptor.name(), error = %source, "system failed to initialize");
                SchedulerError::InitializationFailed {
                    system: entry.descriptor.name().to_string(),
                    source,
                }
            })?;
        }
        self.state = SchedulerState::Running;
        tracing::info!(systems = self.systems.len(), "scheduler initialized");
        Ok(())
    }

    /// Run one tick: every execute phase, then every late phase.
    pub fn tick(&mut self, world: &mut World, time: &TickTime) -> Result<TickReport, SchedulerError> {
        self.expect_state(SchedulerState::Running, "tick")?;
        let mut report = TickReport {
            tick: time.tick,
            failures: Vec::new(),
        };

        for phase in [Phase::Execute, Phase::LateExecute] {
            for entry in &mut self.systems {
                let name = entry.descriptor.name();
                let system = &mut entry.system;
                let result = time_scope!(self.profiler, name, {
                    match phase {
                        Phase::Execute => system.execute(world, time),
                        Phase::LateExecute => system.late_execute(world, time),
                    }
                });

                if let Err(error) = result {
                    tracing::error!(system = name, %phase, tick = time.tick, error = %error, "system failed");
                    self.counters.increment("system_failures", 1);
                    report.failures.push(SystemFailure {
                        system: name.to_string(),
                        phase,
                        message: error.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Tear systems down in reverse registration order.
    pub fn teardown(&mut self, world: &mut World) -> Result<(), SchedulerError> {
        self.expect_state(SchedulerState::Running, "tear down")?;
        for entry in self.systems.iter_mut().rev() {
            entry.system.teardown(world);
        }
        self.state = SchedulerState::TornDown;
        tracing::info!("scheduler torn down");
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn handle_of(&self, name: &str) -> Option<SystemHandle> {
        self.names.get(name).copied()
    }

    pub fn descriptor(&self, handle: SystemHandle) -> Option<&SystemDescriptor> {
        self.systems
            .get(handle.index() as usize)
            .map(|entry| &entry.descriptor)
    }

    /// Descriptors in run order.
    pub fn iter(&self) -> impl Iterator<Item = (SystemHandle, &SystemDescriptor)> {
        self.systems
            .iter()
            .map(|entry| (entry.handle, &entry.descriptor))
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn failure_count(&self) -> usize {
        self.counters.get("system_failures")
    }

    fn expect_state(
        &self,
        expected: SchedulerState,
        action: &'static str,
    ) -> Result<(), SchedulerError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SchedulerError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a reactive system to the execute phase through its collector.
struct Reactor<R> {
    inner: R,
    collector: Option<CollectorId>,
}

impl<R: ReactiveSystem> Reactor<R> {
    fn kind(&self) -> ContextKind {
        self.inner.context()
    }
}

impl<R: ReactiveSystem> System for Reactor<R> {
    fn descriptor(&self) -> SystemDescriptor {
        self.inner.descriptor()
    }

    fn initialize(&mut self, world: &mut World) -> Result<(), SystemError> {
        self.inner.initialize(world)?;
        let context = world.context_mut(self.kind());
        let triggers = self.inner.triggers(context)?;
        self.collector = Some(context.add_collector(triggers));
        Ok(())
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        let collector = self
            .collector
            .ok_or_else(|| SystemError::failed("reactive system ran before initialization"))?;
        let collected = world.context_mut(self.kind()).drain_collector(collector)?;
        let entities: Vec<Entity> = collected
            .into_iter()
            .filter(|entity| self.inner.filter(world, *entity))
            .collect();
        if entities.is_empty() {
            return Ok(());
        }
        self.inner.react(world, &entities, time)
    }

    fn teardown(&mut self, world: &mut World) {
        self.inner.teardown(world);
    }
}
