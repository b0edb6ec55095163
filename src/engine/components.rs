// Core ECS components for tracked entities.
// Each tracked entity lives in the bevy_ecs World; despawning it drops its render state.

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::mesh::RenderMesh;

/// Server id of a tracked car.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AgentId(pub String);

/// Server id of a tracked traffic light. Separate namespace from cars.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalId(pub String);

/// Server id of a static obstacle.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObstacleId(pub String);

/// The last two authoritative positions, in render space.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Positions {
    pub previous: Vec3,
    pub current: Vec3,
}

impl Positions {
    pub fn at(position: Vec3) -> Self {
        Self { previous: position, current: position }
    }

    /// Shift `current` into `previous` and record the new authoritative position.
    pub fn advance(&mut self, next: Vec3) {
        self.previous = self.current;
        self.current = next;
    }

    pub fn moved(&self) -> bool {
        self.previous != self.current
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Counts down frame time until a hidden entity is shown.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PendingReveal {
    pub remaining: f32,
}

/// Last non-zero movement direction; kept while the car stands still.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    pub direction: Vec3,
}

impl Default for Heading {
    fn default() -> Self {
        Self { direction: Vec3::Z }
    }
}

/// RGB color for rendering
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Traffic light state as shown to the viewer.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalLight {
    Go,
    Stop,
}

impl SignalLight {
    pub const GO_COLOR: Color = Color::new(0.1, 0.85, 0.2);
    pub const STOP_COLOR: Color = Color::new(0.9, 0.12, 0.1);

    pub fn from_active(active: bool) -> Self {
        if active { Self::Go } else { Self::Stop }
    }

    pub fn color(self) -> Color {
        match self {
            Self::Go => Self::GO_COLOR,
            Self::Stop => Self::STOP_COLOR,
        }
    }
}

/// Geometry that only moves when its authoritative position changes
/// (traffic lights and obstacles). Already in world space.
#[derive(Component, Debug, Clone)]
pub struct StaticModel {
    pub mesh: RenderMesh,
}
