// Procedural geometry for everything the viewer draws.
// Asset loading is out of scope, so cars, wheels, lights, buildings and the
// floor are generated here at startup and shared behind `Arc`s.
//
// Model space (left-handed): +Y up, +Z forward, +X to the car's right. Origin = car centre at
// ride height; wheels touch the ground at y = -0.2.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec3;

use super::mesh::{triangulate_smooth, PolyMesh, RenderMesh};

/// Wheel mount points relative to the car origin (front-right, front-left, rear-right, rear-left).
pub const WHEEL_MOUNTS: [Vec3; 4] = [
    Vec3::new( 0.2, -0.1,  0.24),
    Vec3::new(-0.2, -0.1,  0.24),
    Vec3::new( 0.2, -0.1, -0.24),
    Vec3::new(-0.2, -0.1, -0.24),
];

pub const WHEEL_RADIUS: f32 = 0.1;
const WHEEL_WIDTH: f32 = 0.06;
const WHEEL_SEGMENTS: usize = 16;

// ============================================================================
// BOX
// ============================================================================

/// Axis-aligned box with half-extents `half` around `center`.
///
/// Every face gets its own four vertices so smooth-normal accumulation still
/// produces flat faces with hard edges (24 vertices, 6 quads).
///
/// Winding verification (front face, +Z):
///   N = (v1-v0) × (v3-v0) = (2hx,0,0) × (0,2hy,0) = (0,0,4hx·hy) → +Z (outward) ✓
pub fn box_mesh(center: Vec3, half: Vec3) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let corner = |sx: f32, sy: f32, sz: f32| center + Vec3::new(sx * half.x, sy * half.y, sz * half.z);

    // Each face listed CCW as seen from outside.
    let faces: [[Vec3; 4]; 6] = [
        [corner(-1.0, -1.0,  1.0), corner( 1.0, -1.0,  1.0), corner( 1.0,  1.0,  1.0), corner(-1.0,  1.0,  1.0)], // front  (+Z)
        [corner( 1.0, -1.0, -1.0), corner(-1.0, -1.0, -1.0), corner(-1.0,  1.0, -1.0), corner( 1.0,  1.0, -1.0)], // back   (-Z)
        [corner(-1.0, -1.0, -1.0), corner(-1.0, -1.0,  1.0), corner(-1.0,  1.0,  1.0), corner(-1.0,  1.0, -1.0)], // -X side
        [corner( 1.0, -1.0,  1.0), corner( 1.0, -1.0, -1.0), corner( 1.0,  1.0, -1.0), corner( 1.0,  1.0,  1.0)], // right  (+X)
        [corner(-1.0,  1.0,  1.0), corner( 1.0,  1.0,  1.0), corner( 1.0,  1.0, -1.0), corner(-1.0,  1.0, -1.0)], // top    (+Y)
        [corner(-1.0, -1.0, -1.0), corner( 1.0, -1.0, -1.0), corner( 1.0, -1.0,  1.0), corner(-1.0, -1.0,  1.0)], // bottom (-Y)
    ];

    for quad in faces {
        let idx: Vec<usize> = quad.iter().map(|&p| mesh.add_vertex(p)).collect();
        mesh.add_face(idx);
    }
    mesh
}

// ============================================================================
// WHEEL
// ============================================================================

/// Cylinder around the X axis (the car's lateral axis), centred on the origin.
///
/// The tread ring shares vertices between neighbouring quads so it shades
/// round; each cap is a single n-gon with its own vertices.
pub fn wheel_mesh(radius: f32, width: f32, segments: usize) -> PolyMesh {
    let mut mesh = PolyMesh::new();
    let hw = width * 0.5;
    let ring = |x: f32, i: usize| {
        let a = TAU * i as f32 / segments as f32;
        Vec3::new(x, radius * a.sin(), radius * a.cos())
    };

    // Tread: outer (+X) and inner (-X) rings.
    let outer: Vec<usize> = (0..segments).map(|i| mesh.add_vertex(ring(hw, i))).collect();
    let inner: Vec<usize> = (0..segments).map(|i| mesh.add_vertex(ring(-hw, i))).collect();
    for i in 0..segments {
        let j = (i + 1) % segments;
        mesh.add_face(vec![outer[i], outer[j], inner[j], inner[i]]);
    }

    // Caps. Angle increases from +Z towards +Y, which is CCW seen from -X.
    let cap_inner: Vec<usize> = (0..segments).map(|i| mesh.add_vertex(ring(-hw, i))).collect();
    mesh.add_face(cap_inner);
    let cap_outer: Vec<usize> = (0..segments).rev().map(|i| mesh.add_vertex(ring(hw, i))).collect();
    mesh.add_face(cap_outer);

    mesh
}

// ============================================================================
// MODELS
// ============================================================================

/// Shared geometry for every car: one body and one wheel, mounted four times.
pub struct CarModel {
    pub body: Arc<RenderMesh>,
    pub wheel: Arc<RenderMesh>,
    pub wheel_mounts: Vec<Vec3>,
}

impl CarModel {
    pub fn new() -> Self {
        let mut body = box_mesh(Vec3::new(0.0, -0.07, 0.0), Vec3::new(0.17, 0.07, 0.36));
        body.merge(box_mesh(Vec3::new(0.0, 0.05, -0.04), Vec3::new(0.15, 0.05, 0.18)));

        Self {
            body: Arc::new(triangulate_smooth(&body)),
            wheel: Arc::new(triangulate_smooth(&wheel_mesh(WHEEL_RADIUS, WHEEL_WIDTH, WHEEL_SEGMENTS))),
            wheel_mounts: WHEEL_MOUNTS.to_vec(),
        }
    }
}

/// Traffic light: a post with the lamp block on top. Origin on the ground.
pub fn signal_mesh() -> Arc<RenderMesh> {
    let mut poly = box_mesh(Vec3::new(0.0, 0.25, 0.0), Vec3::new(0.04, 0.25, 0.04));
    poly.merge(box_mesh(Vec3::new(0.0, 0.6, 0.0), Vec3::new(0.1, 0.12, 0.1)));
    Arc::new(triangulate_smooth(&poly))
}

/// City block filling most of one grid cell. Origin on the ground.
pub fn obstacle_mesh() -> Arc<RenderMesh> {
    Arc::new(triangulate_smooth(&box_mesh(Vec3::new(0.0, 0.3, 0.0), Vec3::new(0.45, 0.3, 0.45))))
}

/// Ground plane under a `width` × `height` cell grid whose cell centres sit on
/// integer coordinates. Top face at y = 0.
pub fn floor_mesh(width: u32, height: u32) -> RenderMesh {
    let half = Vec3::new(width as f32 * 0.5, 0.01, height as f32 * 0.5);
    let center = Vec3::new(width as f32 * 0.5 - 0.5, -0.01, height as f32 * 0.5 - 0.5);
    triangulate_smooth(&box_mesh(center, half))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(mesh: &PolyMesh, face: &[usize]) -> Vec3 {
        let a = mesh.positions[face[0]];
        let b = mesh.positions[face[1]];
        let c = mesh.positions[face[2]];
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn box_faces_point_outward() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let mesh = box_mesh(center, Vec3::new(0.5, 0.25, 1.0));
        assert_eq!(mesh.vertex_count(), 24);
        for face in &mesh.faces {
            let centroid: Vec3 = face.iter().map(|&i| mesh.positions[i]).sum::<Vec3>() / 4.0;
            assert!(face_normal(&mesh, face).dot(centroid - center) > 0.0);
        }
    }

    #[test]
    fn wheel_faces_point_outward() {
        let mesh = wheel_mesh(1.0, 0.5, 12);
        assert_eq!(mesh.faces.len(), 14);
        for face in &mesh.faces {
            let centroid: Vec3 = face.iter().map(|&i| mesh.positions[i]).sum::<Vec3>() / face.len() as f32;
            assert!(face_normal(&mesh, face).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn wheels_touch_the_ground() {
        for mount in WHEEL_MOUNTS {
            assert!((mount.y - WHEEL_RADIUS + 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn floor_covers_the_grid() {
        let floor = floor_mesh(26, 26);
        let (min, max) = floor.positions().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(lo, hi), p| (lo.min(p), hi.max(p)),
        );
        assert!((min.x + 0.5).abs() < 1e-5 && (max.x - 25.5).abs() < 1e-5);
        assert!((min.z + 0.5).abs() < 1e-5 && (max.z - 25.5).abs() < 1e-5);
        assert!(max.y.abs() < 1e-6);
    }
}
