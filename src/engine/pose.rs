// Procedural mesh transformer: re-projects a car body and its wheels every frame.
//
//   body  vertex' = T(position) · R_y(yaw) · vertex
//   wheel vertex' = T(position) · R_y(yaw) · T(mount) · R_x(spin) · vertex
//
// Base vertices are shared and never written; each frame starts from them again,
// so there is no accumulated drift however long a car lives.

use std::sync::Arc;

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

use super::mesh::RenderMesh;
use super::primitives::CarModel;

/// Default wheel spin in degrees per second of wall-clock time.
pub const DEFAULT_SPIN_RATE: f32 = 12.0;

/// Planar heading of a movement direction, in degrees.
///
/// Measured counter-clockwise from +Z (north) seen from above:
/// +Z → 0°, +X (east) → -90°, -X (west) → 90°.
/// Pitch and roll are always zero.
pub fn yaw_degrees(direction: Vec3) -> f32 {
    (-direction.x).atan2(direction.z).to_degrees()
}

/// Rotation about the vertical axis for a heading from [`yaw_degrees`].
///
/// A positive glam rotation about Y turns +Z towards +X, which is clockwise seen
/// from above in this left-handed space; the heading is counter-clockwise, hence the sign.
/// The result turns the model's +Z forward onto the movement direction.
pub fn yaw_rotation(yaw_degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(-yaw_degrees.to_radians())
}

/// Car composite transform = translation(position) × rotation(yaw).
pub fn car_composite(position: Vec3, yaw_degrees: f32) -> Mat4 {
    Mat4::from_translation(position) * yaw_rotation(yaw_degrees)
}

/// Wheel transform = car composite × translation(mount) × rotation_x(spin).
pub fn wheel_transform(car: &Mat4, mount: Vec3, spin_degrees: f32) -> Mat4 {
    *car * Mat4::from_translation(mount) * Mat4::from_rotation_x(spin_degrees.to_radians())
}

/// Wheel spin angle after `elapsed_secs` of wall-clock time at `rate` degrees/s.
///
/// Decoupled from how far the car moved.
pub fn spin_degrees(elapsed_secs: f32, rate: f32) -> f32 {
    (elapsed_secs * rate).rem_euclid(360.0)
}

/// One wheel: fixed mount point, shared base geometry, owned working buffer.
pub struct WheelPose {
    pub mount: Vec3,
    base: Arc<RenderMesh>,
    pub mesh: RenderMesh,
}

impl WheelPose {
    fn new(base: &Arc<RenderMesh>, mount: Vec3) -> Self {
        Self {
            mount,
            base: Arc::clone(base),
            mesh: base.as_ref().clone(),
        }
    }

    fn apply(&mut self, car: &Mat4, spin_degrees: f32) {
        let transform = wheel_transform(car, self.mount, spin_degrees);
        self.mesh.transform_from(&self.base, &transform);
    }

    /// World-space hub position for the last applied pose.
    #[cfg(test)]
    pub fn hub(&self, car: &Mat4) -> Vec3 {
        car.transform_point3(self.mount)
    }
}

/// Render state owned by one tracked car.
#[derive(Component)]
pub struct CarPose {
    body_base: Arc<RenderMesh>,
    pub body: RenderMesh,
    pub wheels: Vec<WheelPose>,
    composite: Mat4,
}

impl CarPose {
    /// Instantiate the car model at `position`, facing +Z.
    pub fn new(model: &CarModel, position: Vec3) -> Self {
        let mut pose = Self {
            body_base: Arc::clone(&model.body),
            body: model.body.as_ref().clone(),
            wheels: model
                .wheel_mounts
                .iter()
                .map(|&mount| WheelPose::new(&model.wheel, mount))
                .collect(),
            composite: Mat4::IDENTITY,
        };
        pose.apply(position, Vec3::Z, 0.0);
        pose
    }

    /// Re-project body and wheels for this frame.
    pub fn apply(&mut self, position: Vec3, direction: Vec3, spin_degrees: f32) {
        self.composite = car_composite(position, yaw_degrees(direction));
        self.body.transform_from(&self.body_base, &self.composite);

        for wheel in &mut self.wheels {
            wheel.apply(&self.composite, spin_degrees);
        }
    }

    #[cfg(test)]
    pub fn composite(&self) -> Mat4 {
        self.composite
    }

    #[cfg(test)]
    pub fn base(&self) -> &RenderMesh {
        &self.body_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn yaw_follows_the_planar_heading() {
        assert!(yaw_degrees(Vec3::Z).abs() < EPS);
        assert!((yaw_degrees(Vec3::X) + 90.0).abs() < EPS);
        assert!((yaw_degrees(Vec3::NEG_X) - 90.0).abs() < EPS);
        assert!((yaw_degrees(Vec3::NEG_Z).abs() - 180.0).abs() < EPS);
        // Height does not change the heading.
        assert!((yaw_degrees(Vec3::new(1.0, 5.0, 0.0)) + 90.0).abs() < EPS);
    }

    #[test]
    fn composite_turns_forward_onto_direction() {
        let directions = [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(-3.0, 0.0, 0.5),
        ];
        for d in directions {
            let m = car_composite(Vec3::new(4.0, 0.2, 7.0), yaw_degrees(d));
            let forward = m.transform_vector3(Vec3::Z);
            assert!(forward.abs_diff_eq(d.normalize(), EPS), "{d:?} -> {forward:?}");
            assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(Vec3::new(4.0, 0.2, 7.0), EPS));
        }
    }

    #[test]
    fn repeated_transforms_do_not_drift() {
        let model = CarModel::new();
        let mut pose = CarPose::new(&model, Vec3::ZERO);

        pose.apply(Vec3::new(1.0, 0.2, 1.0), Vec3::X, 30.0);
        let first = pose.body.clone();
        let first_wheel = pose.wheels[0].mesh.clone();

        for i in 0..100 {
            pose.apply(Vec3::new(i as f32, 0.2, -(i as f32)), Vec3::new(1.0, 0.0, -1.0), i as f32 * 7.0);
        }
        pose.apply(Vec3::new(1.0, 0.2, 1.0), Vec3::X, 30.0);

        assert_eq!(pose.body, first);
        assert_eq!(pose.wheels[0].mesh, first_wheel);
        assert_eq!(pose.base(), model.body.as_ref());
    }

    #[test]
    fn body_normals_match_transformed_faces() {
        let model = CarModel::new();
        let mut pose = CarPose::new(&model, Vec3::ZERO);
        pose.apply(Vec3::new(3.0, 0.2, 2.0), Vec3::new(-1.0, 0.0, 2.0), 0.0);

        let mesh = &pose.body;
        for tri in mesh.indices.chunks_exact(3) {
            let p: Vec<Vec3> = tri.iter().map(|&i| Vec3::from_array(mesh.vertices[i as usize].position)).collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]).normalize();
            for &i in tri {
                let n = Vec3::from_array(mesh.vertices[i as usize].normal);
                assert!(n.abs_diff_eq(face, EPS), "stale normal {n:?} vs face {face:?}");
            }
        }
    }

    #[test]
    fn wheels_ride_on_their_mounts_while_spinning() {
        let model = CarModel::new();
        let mut pose = CarPose::new(&model, Vec3::ZERO);
        let position = Vec3::new(5.0, 0.2, 5.0);

        for spin in [0.0, 45.0, 200.0] {
            pose.apply(position, Vec3::NEG_X, spin);
            let car = pose.composite();
            for wheel in &pose.wheels {
                let count = wheel.mesh.vertices.len() as f32;
                let centroid = wheel.mesh.positions().sum::<Vec3>() / count;
                let base_centroid = model.wheel.positions().sum::<Vec3>() / count;
                let expected = wheel.hub(&car) + car.transform_vector3(base_centroid);
                assert!(centroid.abs_diff_eq(expected, 1e-3), "spin {spin}: {centroid:?} vs {expected:?}");
            }
        }
    }

    #[test]
    fn spin_changes_wheel_vertices_not_body() {
        let model = CarModel::new();
        let mut pose = CarPose::new(&model, Vec3::ZERO);
        pose.apply(Vec3::ZERO, Vec3::Z, 0.0);
        let body = pose.body.clone();
        let wheel = pose.wheels[2].mesh.clone();

        pose.apply(Vec3::ZERO, Vec3::Z, 10.0);
        assert_eq!(pose.body, body);
        assert_ne!(pose.wheels[2].mesh, wheel);
    }

    #[test]
    fn spin_is_driven_by_wall_clock_only() {
        assert!((spin_degrees(2.0, DEFAULT_SPIN_RATE) - 24.0).abs() < EPS);
        assert!((spin_degrees(31.0, DEFAULT_SPIN_RATE) - 12.0).abs() < EPS);
        assert!(spin_degrees(0.0, DEFAULT_SPIN_RATE).abs() < EPS);
    }
}
