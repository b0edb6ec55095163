// Per-frame motion interpolation between the last two authoritative positions.
// Runs once per render frame, never per network tick.

use glam::Vec3;

/// Directions shorter than this are treated as "not moving".
const MIN_DIRECTION_SQ: f32 = 1e-10;

/// Explicit frame timing, passed into every per-frame system.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since startup.
    pub elapsed: f32,
}

impl FrameTime {
    pub fn advance(&mut self, delta: f32) {
        self.delta = delta;
        self.elapsed += delta;
    }
}

/// Normalized progress through the current polling interval.
///
/// Restarted whenever a new agent snapshot is applied, then advanced with the
/// frame delta so the blend factor reaches 1 after one period regardless of frame rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendClock {
    elapsed: f32,
    period: f32,
}

impl BlendClock {
    pub fn new(period: f32) -> Self {
        debug_assert!(period > 0.0, "polling period must be positive");
        // Nothing to blend before the first snapshot.
        Self { elapsed: period, period }
    }

    pub fn restart(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn advance(&mut self, delta: f32) {
        self.elapsed = (self.elapsed + delta).min(self.period);
    }

    /// Blend factor `dt` in `[0, 1]`.
    pub fn factor(&self) -> f32 {
        (self.elapsed / self.period).clamp(0.0, 1.0)
    }
}

/// Interpolated pose for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interpolated {
    pub position: Vec3,
    /// Remaining travel towards `current`; zero once the blend is complete.
    pub direction: Vec3,
}

/// `position = lerp(previous, current, dt)`, `direction = current - position`.
pub fn interpolate(previous: Vec3, current: Vec3, dt: f32) -> Interpolated {
    let dt = dt.clamp(0.0, 1.0);
    let position = previous.lerp(current, dt);
    Interpolated { position, direction: current - position }
}

/// Facing to render with: the new direction, or `last` when the car is not moving.
pub fn facing(direction: Vec3, last: Vec3) -> Vec3 {
    if direction.length_squared() > MIN_DIRECTION_SQ { direction } else { last }
}
