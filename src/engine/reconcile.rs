// Entity reconciliation: diff one authoritative snapshot against the tracked table.
//
// The bevy_ecs World is the arena; `EntityTable` maps server ids to entities per
// category. Despawning an entity drops its render state with it, so table
// membership and render-handle lifetime can never diverge.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

use super::components::*;
use super::mesh::RenderMesh;
use super::pose::CarPose;
use super::primitives::CarModel;
use super::snapshot::{AgentSnapshot, ObstacleSnapshot, SignalSnapshot};

const CAR_PALETTE: [Color; 6] = [
    Color::new(0.2, 0.45, 0.9),
    Color::new(0.95, 0.75, 0.15),
    Color::new(0.85, 0.85, 0.88),
    Color::new(0.55, 0.25, 0.7),
    Color::new(0.1, 0.65, 0.65),
    Color::new(0.9, 0.45, 0.2),
];

pub const OBSTACLE_COLOR: Color = Color::new(0.45, 0.45, 0.5);

/// Id → entity lookup for each tracked category.
#[derive(Default)]
pub struct EntityTable {
    agents: HashMap<String, Entity>,
    signals: HashMap<String, Entity>,
    obstacles: HashMap<String, Entity>,
    spawned_agents: usize,
}

impl EntityTable {
    #[cfg(test)]
    pub fn agent(&self, id: &str) -> Option<Entity> {
        self.agents.get(id).copied()
    }

    #[cfg(test)]
    pub fn signal(&self, id: &str) -> Option<Entity> {
        self.signals.get(id).copied()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }
}

/// What one reconciliation pass did, for logging and tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub updated: usize,
    /// Removed because the entry carried the departure flag.
    pub departed: Vec<String>,
    /// Removed because the id was missing from the snapshot.
    pub removed: Vec<String>,
    /// Hidden entities that got a reveal scheduled this pass.
    pub reveals_scheduled: usize,
}

impl ReconcileReport {
    pub fn is_quiet(&self) -> bool {
        self.created.is_empty() && self.departed.is_empty() && self.removed.is_empty()
    }
}

/// Apply one `/getAgents` snapshot.
///
/// - unknown id: spawn hidden at the reported position
/// - known id: `previous ← current`, `current ← reported`
/// - departure flag: despawn immediately, whatever the position says
/// - tracked id missing from the snapshot: despawn
///
/// A hidden car whose position changed gets a reveal scheduled `reveal_delay`
/// seconds out (see [`reveal_system`](super::systems::reveal_system)).
pub fn reconcile_agents(
    world: &mut World,
    table: &mut EntityTable,
    snapshot: &[AgentSnapshot],
    model: &CarModel,
    reveal_delay: f32,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());

    for entry in snapshot {
        seen.insert(entry.id.as_str());

        if entry.arrived {
            if let Some(entity) = table.agents.remove(&entry.id) {
                world.despawn(entity);
                report.departed.push(entry.id.clone());
            }
            continue;
        }

        let known = table.agents.get(&entry.id).copied();
        let Some(entity) = known else {
            let color = CAR_PALETTE[table.spawned_agents % CAR_PALETTE.len()];
            table.spawned_agents += 1;
            let entity = world
                .spawn((
                    AgentId(entry.id.clone()),
                    Positions::at(entry.position),
                    Visibility::Hidden,
                    Heading::default(),
                    CarPose::new(model, entry.position),
                    color,
                ))
                .id();
            table.agents.insert(entry.id.clone(), entity);
            report.created.push(entry.id.clone());
            continue;
        };

        let mut tracked = world.entity_mut(entity);
        let moved = {
            let mut positions = tracked
                .get_mut::<Positions>()
                .expect("tracked agent has no Positions");
            positions.advance(entry.position);
            positions.moved()
        };
        report.updated += 1;

        let hidden = tracked.get::<Visibility>() == Some(&Visibility::Hidden);
        if moved && hidden && !tracked.contains::<PendingReveal>() {
            tracked.insert(PendingReveal { remaining: reveal_delay });
            report.reveals_scheduled += 1;
        }
    }

    report.removed = despawn_missing(world, &mut table.agents, &seen);
    report
}

/// Apply one `/getSemaphores` snapshot.
///
/// Signals have no departure flag and no reveal delay; the light state is
/// applied every cycle without recreating the entity.
pub fn reconcile_signals(
    world: &mut World,
    table: &mut EntityTable,
    snapshot: &[SignalSnapshot],
    mesh: &Arc<RenderMesh>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());

    for entry in snapshot {
        seen.insert(entry.id.as_str());
        let light = SignalLight::from_active(entry.active);

        let known = table.signals.get(&entry.id).copied();
        let Some(entity) = known else {
            let entity = world
                .spawn((
                    SignalId(entry.id.clone()),
                    Positions::at(entry.position),
                    Visibility::Visible,
                    light,
                    light.color(),
                    place(mesh, entry.position),
                ))
                .id();
            table.signals.insert(entry.id.clone(), entity);
            report.created.push(entry.id.clone());
            continue;
        };

        let mut tracked = world.entity_mut(entity);
        let moved = {
            let mut positions = tracked
                .get_mut::<Positions>()
                .expect("tracked signal has no Positions");
            positions.advance(entry.position);
            positions.moved()
        };
        if moved {
            tracked.insert(place(mesh, entry.position));
        }
        tracked.insert((light, light.color()));
        report.updated += 1;
    }

    report.removed = despawn_missing(world, &mut table.signals, &seen);
    report
}

/// Replace the static obstacle set. The server reports it once after `/init`.
pub fn place_obstacles(
    world: &mut World,
    table: &mut EntityTable,
    snapshot: &[ObstacleSnapshot],
    mesh: &Arc<RenderMesh>,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for (id, entity) in table.obstacles.drain() {
        world.despawn(entity);
        report.removed.push(id);
    }

    for entry in snapshot {
        let entity = world
            .spawn((
                ObstacleId(entry.id.clone()),
                Visibility::Visible,
                OBSTACLE_COLOR,
                place(mesh, entry.position),
            ))
            .id();
        if let Some(stale) = table.obstacles.insert(entry.id.clone(), entity) {
            world.despawn(stale);
        }
        report.created.push(entry.id.clone());
    }
    report
}

fn place(mesh: &RenderMesh, position: Vec3) -> StaticModel {
    let mut placed = mesh.clone();
    placed.transform_from(mesh, &Mat4::from_translation(position));
    StaticModel { mesh: placed }
}

fn despawn_missing(
    world: &mut World,
    tracked: &mut HashMap<String, Entity>,
    seen: &HashSet<&str>,
) -> Vec<String> {
    let missing: Vec<String> = tracked
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .cloned()
        .collect();

    for id in &missing {
        if let Some(entity) = tracked.remove(id) {
            world.despawn(entity);
        }
    }
    missing
}
