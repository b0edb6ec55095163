// Authoritative snapshot records, already in render space.
// One snapshot = the full list of live entities for one feed at one server tick.

use glam::Vec3;

/// Map wire coordinates onto render space.
///
/// The server reports `(x, y)` on the ground plane and `z` as height, the
/// renderer treats Y as up: wire `(x, y, z)` becomes render `(x, z, y)`.
pub fn wire_to_render(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, z, y)
}

/// One car as reported by `/getAgents`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSnapshot {
    pub id: String,
    pub position: Vec3,
    /// The car reached its destination and leaves the simulation.
    pub arrived: bool,
}

#[cfg(test)]
impl AgentSnapshot {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self { id: id.into(), position, arrived: false }
    }

    pub fn departed(id: impl Into<String>, position: Vec3) -> Self {
        Self { id: id.into(), position, arrived: true }
    }
}

/// One traffic light as reported by `/getSemaphores`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSnapshot {
    pub id: String,
    pub position: Vec3,
    /// `true` = green.
    pub active: bool,
}

/// One static obstacle (building block) as reported by `/getObstacles`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSnapshot {
    pub id: String,
    pub position: Vec3,
}
