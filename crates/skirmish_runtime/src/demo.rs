//! Headless demo encounter
//!
//! Two teams trade abilities from the catalog until one side is
//! eliminated or the tick budget runs out. Physics is a list of static
//! spheres, one per combatant body.

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use skirmish_battle::collision::{ColliderShape, HitBuffer, HitKind, PhysicsQuery, RawHit};
use skirmish_battle::components::{Dead, ObjectHandle, Team, Transform, View};
use skirmish_battle::net::{NetworkSink, OutboundMessage};
use skirmish_battle::singletons::GameMode;
use skirmish_battle::view::ViewSink;
use skirmish_battle::{Arena, ArenaServices, Catalog, CombatantSpec, ContentId};
use skirmish_core::ecs::Entity;
use skirmish_metrics::SystemTiming;
use skirmish_services::KernelSettings;
use std::cell::{Cell, RefCell};
use std::f32::consts::PI;
use std::rc::Rc;

const BODY_RADIUS: f32 = 0.6;

/// Seconds between two casts of one combatant.
const CAST_COOLDOWN: f64 = 1.0;

const FIREBALL: ContentId = ContentId(1);
const CLEAVE: ContentId = ContentId(2);
const MEND: ContentId = ContentId(3);
const SHACKLE: ContentId = ContentId(4);

#[derive(Debug, Clone, Copy)]
struct Body {
    object: ObjectHandle,
    center: Vec3,
}

/// Sphere-vs-sphere overlap against registered bodies.
#[derive(Default)]
pub struct DemoPhysics {
    bodies: RefCell<Vec<Body>>,
}

impl DemoPhysics {
    fn add_body(&self, object: ObjectHandle, center: Vec3) {
        self.bodies.borrow_mut().push(Body { object, center });
    }
}

impl PhysicsQuery for DemoPhysics {
    fn overlap(&self, shape: &ColliderShape, transform: &Transform, hits: &mut HitBuffer) {
        let reach = shape.bounding_radius() + BODY_RADIUS;
        for body in self.bodies.borrow().iter() {
            let offset = body.center - transform.position;
            if offset.length() > reach {
                continue;
            }
            hits.push(RawHit {
                object: body.object,
                point: transform.position + offset * 0.5,
                normal: offset.normalize_or_zero(),
                kind: HitKind::Entity,
            });
        }
    }
}

struct LoggingView;

impl ViewSink for LoggingView {
    fn view_added(&mut self, entity: Entity, view: &View, transform: &Transform) {
        tracing::debug!(%entity, view = view.handle, position = ?transform.position, "view added");
    }

    fn view_removed(&mut self, entity: Entity, view: &View) {
        tracing::debug!(%entity, view = view.handle, "view removed");
    }

    fn sync_transform(&mut self, entity: Entity, view: &View, transform: &Transform) {
        tracing::trace!(%entity, view = view.handle, position = ?transform.position, "view synced");
    }
}

struct LoggingNetwork {
    sent: Rc<Cell<usize>>,
}

impl NetworkSink for LoggingNetwork {
    fn send(&mut self, message: &OutboundMessage) {
        self.sent.set(self.sent.get() + 1);
        match serde_json::to_string(message) {
            Ok(json) => tracing::info!(target: "skirmish::net", "{json}"),
            Err(error) => tracing::warn!(%error, "outbound message not serialisable"),
        }
    }
}

struct Fighter {
    entity: Entity,
    team: Team,
    ability: ContentId,
    cooldown: f64,
}

#[derive(Debug)]
pub struct DemoSummary {
    pub ticks: u64,
    pub winner: Option<Team>,
    pub messages: usize,
}

pub fn run(settings: &KernelSettings, catalog: Catalog) -> Result<DemoSummary> {
    let physics = Rc::new(DemoPhysics::default());
    let sent = Rc::new(Cell::new(0));
    let services = ArenaServices::new(Rc::new(catalog), physics.clone())
        .with_view(Box::new(LoggingView))
        .with_network(Box::new(LoggingNetwork { sent: sent.clone() }));
    let mut arena = Arena::new(settings.arena_config(), services).context("build arena")?;

    let roster = [
        ("vanguard", Team::Blue, Vec3::new(0.0, 0.0, 0.0), CLEAVE),
        ("pyromancer", Team::Blue, Vec3::new(-1.5, 0.0, -2.0), FIREBALL),
        ("raider", Team::Red, Vec3::new(0.0, 0.0, 1.8), CLEAVE),
        ("warden", Team::Red, Vec3::new(1.5, 0.0, 4.0), SHACKLE),
        ("cleric", Team::Red, Vec3::new(-1.0, 0.0, 5.0), MEND),
    ];

    let mut fighters = Vec::with_capacity(roster.len());
    for (slot, (name, team, position, ability)) in roster.into_iter().enumerate() {
        let object = ObjectHandle(slot as u64 + 1);
        let spec = CombatantSpec::new(name, team)
            .at(position)
            .with_stats(120.0, 24.0, 6.0)
            .with_objects([object])
            .with_view(100 + slot as u64);
        let entity = arena
            .spawn_combatant(&spec)
            .with_context(|| format!("spawn {name}"))?;
        physics.add_body(object, position);

        // blue faces +z, red faces back towards blue
        if team == Team::Red {
            arena
                .world_mut()
                .instances
                .update::<Transform, _>(entity, |transform| {
                    transform.rotation = Quat::from_rotation_y(PI);
                })?;
        }
        fighters.push(Fighter {
            entity,
            team,
            ability,
            cooldown: slot as f64 * 0.2,
        });
    }

    let dt = arena.clock().fixed_dt();
    let mut ticks = 0;
    while ticks < settings.simulation.tick_budget {
        for index in 0..fighters.len() {
            let fighter = &fighters[index];
            if fighter.cooldown > 0.0 || !standing(&arena, fighter.entity) {
                continue;
            }
            let target = fighters
                .iter()
                .find(|other| other.team != fighter.team && standing(&arena, other.entity))
                .map(|other| other.entity);
            let (caster, ability) = (fighter.entity, fighter.ability);
            let target = if ability == MEND { Some(caster) } else { target };
            arena.cast(caster, ability, target)?;
            fighters[index].cooldown = CAST_COOLDOWN;
        }

        let report = arena.tick_fixed()?;
        ticks = report.tick;
        for fighter in &mut fighters {
            fighter.cooldown -= dt;
        }
        if arena.world().singleton::<GameMode>()?.is_over() {
            break;
        }
    }

    let winner = arena.world().singleton::<GameMode>()?.winner;
    log_timings(&arena.scheduler().profiler().report());
    arena.shutdown()?;

    Ok(DemoSummary {
        ticks,
        winner,
        messages: sent.get(),
    })
}

fn standing(arena: &Arena, entity: Entity) -> bool {
    let instances = &arena.world().instances;
    instances.is_alive(entity) && !instances.has::<Dead>(entity)
}

fn log_timings(timings: &[SystemTiming]) {
    for timing in timings {
        tracing::debug!(
            system = %timing.name,
            calls = timing.calls,
            average = ?timing.average(),
            total = ?timing.total,
            "system timing"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_battle::ExpressionEvaluator;

    #[test]
    fn bundled_encounter_runs() {
        let (catalog, report) =
            Catalog::from_json(include_str!("../data/catalog.json"), &ExpressionEvaluator).unwrap();
        assert!(report.skipped.is_empty(), "{:?}", report.skipped);

        let mut settings = KernelSettings::default();
        settings.simulation.tick_budget = 120;
        let summary = run(&settings, catalog).unwrap();

        assert!(summary.ticks > 0 && summary.ticks <= 120);
        assert!(summary.messages > 0);
    }
}
