// Per-frame systems over the tracked entity table.
// Timing is passed in explicitly; nothing here reads a global clock or does I/O.

use bevy_ecs::prelude::*;

use super::components::*;
use super::interpolate::{facing, interpolate};
use super::mesh::{RenderMesh, SceneBatch};
use super::pose::CarPose;

pub const WHEEL_COLOR: Color = Color::new(0.08, 0.08, 0.08);
pub const FLOOR_COLOR: Color = Color::new(0.22, 0.24, 0.22);

/// Count down scheduled reveals and show entities whose delay has elapsed.
/// Returns how many were revealed this frame.
pub fn reveal_system(world: &mut World, delta: f32) -> usize {
    let mut due = Vec::new();
    let mut query = world.query::<(Entity, &mut PendingReveal)>();
    for (entity, mut pending) in query.iter_mut(world) {
        pending.remaining -= delta;
        if pending.remaining <= 0.0 {
            due.push(entity);
        }
    }

    for &entity in &due {
        let mut tracked = world.entity_mut(entity);
        tracked.remove::<PendingReveal>();
        tracked.insert(Visibility::Visible);
    }
    due.len()
}

/// Interpolate every car between its last two positions and re-project its meshes.
///
/// `blend` is the blend factor of the current polling interval, `ride_height`
/// replaces the render height of both endpoints, `spin_degrees` is the wheel
/// angle for this frame. Hidden cars are posed too so they appear in place.
pub fn interpolation_system(world: &mut World, blend: f32, ride_height: f32, spin_degrees: f32) {
    let mut query = world.query_filtered::<(&Positions, &mut Heading, &mut CarPose), With<AgentId>>();
    for (positions, mut heading, mut pose) in query.iter_mut(world) {
        let mut previous = positions.previous;
        let mut current = positions.current;
        previous.y = ride_height;
        current.y = ride_height;

        let step = interpolate(previous, current, blend);
        let direction = facing(step.direction, heading.direction);
        if direction != heading.direction {
            heading.direction = direction;
        }
        pose.apply(step.position, direction, spin_degrees);
    }
}

/// Gather every visible mesh of the frame into one batch.
pub fn collect_scene(world: &mut World, floor: &RenderMesh, batch: &mut SceneBatch) {
    batch.clear();
    batch.push(floor, FLOOR_COLOR);

    let mut cars = world.query::<(&CarPose, &Color, &Visibility)>();
    for (pose, color, visibility) in cars.iter(world) {
        if *visibility != Visibility::Visible {
            continue;
        }
        batch.push(&pose.body, *color);
        for wheel in &pose.wheels {
            batch.push(&wheel.mesh, WHEEL_COLOR);
        }
    }

    let mut models = world.query::<(&StaticModel, &Color, &Visibility)>();
    for (model, color, visibility) in models.iter(world) {
        if *visibility == Visibility::Visible {
            batch.push(&model.mesh, *color);
        }
    }
}

/// How many cars are currently shown.
pub fn visible_agents(world: &mut World) -> usize {
    world
        .query_filtered::<&Visibility, With<AgentId>>()
        .iter(world)
        .filter(|v| **v == Visibility::Visible)
        .count()
}
