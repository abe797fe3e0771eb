use skirmish_core::define_component;
use skirmish_core::ecs::{
    ComponentLayout, ComponentMask, Context, DestroySystem, EcsError, Entity, IndexKind,
    PendingDestroy, ReactiveSystem, Scheduler, SchedulerError, SchedulerState, System,
    SystemDescriptor, SystemError, Trigger, World,
};
use skirmish_core::time::{SimulationClock, TickTime};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
struct Burning;
define_component!(Burning, "Burning");

#[derive(Clone, Debug, PartialEq)]
struct Owner(u64);
define_component!(Owner, "Owner");

type Log = Rc<RefCell<Vec<String>>>;

fn world() -> World {
    let instances = ComponentLayout::new()
        .with::<Burning>()
        .and_then(|l| l.with::<Owner>())
        .and_then(|l| l.with::<PendingDestroy>())
        .unwrap();
    World::new(instances, ComponentLayout::new())
}

struct Recorder {
    name: &'static str,
    log: Log,
    fail: bool,
}

impl System for Recorder {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new(self.name)
    }

    fn execute(&mut self, _world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        self.log.borrow_mut().push(format!("{}:execute", self.name));
        if self.fail {
            return Err(SystemError::failed("boom"));
        }
        Ok(())
    }

    fn late_execute(&mut self, _world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        self.log.borrow_mut().push(format!("{}:late", self.name));
        Ok(())
    }
}

struct BurnWatcher {
    seen: Rc<RefCell<Vec<Vec<Entity>>>>,
}

impl ReactiveSystem for BurnWatcher {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("burn_watcher")
    }

    fn triggers(&self, context: &Context) -> Result<Vec<Trigger>, EcsError> {
        Ok(vec![Trigger::added(context.component_id::<Burning>()?)])
    }

    fn react(
        &mut self,
        _world: &mut World,
        entities: &[Entity],
        _time: &TickTime,
    ) -> Result<(), SystemError> {
        self.seen.borrow_mut().push(entities.to_vec());
        Ok(())
    }
}

struct Ignite {
    target: Entity,
    on_tick: u64,
}

impl System for Ignite {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("ignite")
    }

    fn execute(&mut self, world: &mut World, time: &TickTime) -> Result<(), SystemError> {
        if time.tick == self.on_tick {
            world.instances.replace(self.target, Burning)?;
        }
        Ok(())
    }
}

struct FailsToStart;

impl System for FailsToStart {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("fails_to_start")
    }

    fn initialize(&mut self, _world: &mut World) -> Result<(), SystemError> {
        Err(SystemError::failed("missing collaborator"))
    }

    fn execute(&mut self, _world: &mut World, _time: &TickTime) -> Result<(), SystemError> {
        Ok(())
    }
}

#[test]
fn execute_then_late_in_registration_order_with_failures_isolated() {
    let log: Log = Rc::default();
    let mut world = world();
    let mut scheduler = Scheduler::new();
    for (name, fail) in [("first", false), ("second", true), ("third", false)] {
        scheduler
            .register(Recorder {
                name,
                log: Rc::clone(&log),
                fail,
            })
            .unwrap();
    }
    scheduler.initialize(&mut world).unwrap();

    let mut clock = SimulationClock::new(10);
    let report = scheduler.tick(&mut world, &clock.advance_fixed()).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "first:execute",
            "second:execute",
            "third:execute",
            "first:late",
            "second:late",
            "third:late"
        ]
    );
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].system, "second");
}

#[test]
fn duplicate_names_are_rejected() {
    let log: Log = Rc::default();
    let mut scheduler = Scheduler::new();
    let recorder = |log: &Log| Recorder {
        name: "same",
        log: Rc::clone(log),
        fail: false,
    };
    scheduler.register(recorder(&log)).unwrap();
    assert!(matches!(
        scheduler.register(recorder(&log)),
        Err(SchedulerError::DuplicateName { .. })
    ));
}

#[test]
fn initialization_failure_is_fatal() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    scheduler.register(FailsToStart).unwrap();

    let error = scheduler.initialize(&mut world).unwrap_err();
    assert!(matches!(error, SchedulerError::InitializationFailed { ref system, .. } if system == "fails_to_start"));
    assert_eq!(scheduler.state(), SchedulerState::Uninitialized);

    let time = SimulationClock::default().advance_fixed();
    assert!(matches!(
        scheduler.tick(&mut world, &time),
        Err(SchedulerError::InvalidTransition { .. })
    ));
}

#[test]
fn registration_after_initialize_is_an_invalid_transition() {
    let mut world = world();
    let mut scheduler = Scheduler::new();
    scheduler.initialize(&mut world).unwrap();
    assert!(matches!(
        scheduler.register(FailsToStart),
        Err(SchedulerError::InvalidTransition { .. })
    ));
    scheduler.teardown(&mut world).unwrap();
    assert!(scheduler.teardown(&mut world).is_err());
}

#[test]
fn reactive_system_sees_an_entity_exactly_once() {
    let mut world = world();
    let target = world.instances.create_entity();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let mut scheduler = Scheduler::new();
    scheduler
        .register_reactive(BurnWatcher {
            seen: Rc::clone(&seen),
        })
        .unwrap();
    scheduler.initialize(&mut world).unwrap();

    let mut clock = SimulationClock::new(10);
    scheduler.tick(&mut world, &clock.advance_fixed()).unwrap();
    assert!(seen.borrow().is_empty());

    // Structural change between tick N and N+1.
    world.instances.add(target, Burning).unwrap();
    scheduler.tick(&mut world, &clock.advance_fixed()).unwrap();
    scheduler.tick(&mut world, &clock.advance_fixed()).unwrap();

    assert_eq!(*seen.borrow(), vec![vec![target]]);
}

#[test]
fn reactive_system_observes_changes_made_earlier_in_the_same_tick() {
    let mut world = world();
    let target = world.instances.create_entity();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let mut scheduler = Scheduler::new();
    scheduler.register(Ignite { target, on_tick: 2 }).unwrap();
    scheduler
        .register_reactive(BurnWatcher {
            seen: Rc::clone(&seen),
        })
        .unwrap();
    scheduler.initialize(&mut world).unwrap();

    let mut clock = SimulationClock::new(10);
    scheduler.tick(&mut world, &clock.advance_fixed()).unwrap();
    scheduler.tick(&mut world, &clock.advance_fixed()).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn pending_destroy_keeps_indices_consistent() {
    let mut world = world();
    let owners = world
        .instances
        .add_index::<Owner, u64>("owner", IndexKind::Bucket, |o| vec![o.0])
        .unwrap();

    let doomed = world.instances.create_entity();
    let survivor = world.instances.create_entity();
    world.instances.add(doomed, Owner(9)).unwrap();
    world.instances.add(survivor, Owner(9)).unwrap();

    let mut scheduler = Scheduler::new();
    scheduler.register_reactive(DestroySystem::new()).unwrap();
    scheduler.initialize(&mut world).unwrap();

    world.instances.add(doomed, PendingDestroy).unwrap();
    let report = scheduler
        .tick(&mut world, &SimulationClock::default().advance_fixed())
        .unwrap();
    assert!(report.is_clean());

    assert!(!world.instances.is_alive(doomed));
    let index = world.instances.index(&owners).unwrap();
    assert_eq!(index.get_entities(&9), &[survivor]);

    let owner_id = world.instances.component_id::<Owner>().unwrap();
    for entity in world.instances.collect_with(ComponentMask::from_ids([owner_id])) {
        assert!(index.contains(entity));
    }
}
