// Procedural mesh types, triangulation and per-frame vertex buffers.
//
// Three-layer architecture:
//   primitives → PolyMesh → triangulate_smooth() → RenderMesh (base, shared)
//   RenderMesh (base) → transform_from() → RenderMesh (working, per entity) → SceneBatch → GPU

use glam::{Mat4, Vec3};

use super::components::Color;

// ============================================================================
// MESH VERTEX
// ============================================================================

/// CPU-side vertex with position and normal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh for procedural construction.
/// Supports n-gon faces (arbitrary vertex count per face).
/// Faces use CCW winding when viewed from outside (consistent with back-face culling).
/// Only used at startup; heap allocation per face is acceptable.
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,  // each face = CCW-ordered vertex index list
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            faces:     Vec::new(),
        }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }

    /// Append another mesh, re-indexing its faces.
    pub fn merge(&mut self, other: PolyMesh) {
        let base = self.vertex_count();
        self.positions.extend(other.positions);
        for face in other.faces {
            self.faces.push(face.into_iter().map(|i| i + base).collect());
        }
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// Triangulated mesh with per-vertex normals.
///
/// Base meshes are built once and shared behind an `Arc`; every tracked entity
/// owns a working copy whose positions are rewritten each frame from the base.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    #[cfg(test)]
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| Vec3::from_array(v.position))
    }

    /// Overwrite this mesh's positions with `transform * base`, then rebuild normals.
    ///
    /// `base` is only read; the working buffer must have been cloned from it.
    pub fn transform_from(&mut self, base: &RenderMesh, transform: &Mat4) {
        debug_assert_eq!(self.vertices.len(), base.vertices.len(), "working buffer does not match its base");
        for (out, src) in self.vertices.iter_mut().zip(&base.vertices) {
            out.position = transform
                .transform_point3(Vec3::from_array(src.position))
                .to_array();
        }
        self.recompute_normals();
    }

    /// Rebuild area-weighted smooth normals from the current positions.
    ///
    /// The cross product magnitude = 2×triangle_area, giving automatic area-weighting.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let (ia, ib, ic) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let a = Vec3::from_array(self.vertices[ia].position);
            let b = Vec3::from_array(self.vertices[ib].position);
            let c = Vec3::from_array(self.vertices[ic].position);
            let weighted_normal = (b - a).cross(c - a);
            accum[ia] += weighted_normal;
            accum[ib] += weighted_normal;
            accum[ic] += weighted_normal;
        }
        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.normalize_or_zero().to_array();
        }
    }
}

// ============================================================================
// TRIANGULATION + SMOOTH NORMALS
// ============================================================================

/// Convert a PolyMesh to a RenderMesh using smooth (area-weighted) normals.
///
/// Vertices are shared across the triangles of the faces that reference them.
/// Primitives that want hard edges give each face its own vertices.
///
/// Algorithm:
///   1. Fan-triangulate each face (from vertex 0) into the index buffer.
///   2. Accumulate area-weighted face normals per vertex and normalize.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let mut indices: Vec<u32> = Vec::new();
    for face in &poly.faces {
        let n = face.len();
        for i in 1..(n - 1) {
            indices.push(face[0]     as u32);
            indices.push(face[i]     as u32);
            indices.push(face[i + 1] as u32);
        }
    }

    let vertices = poly.positions.iter()
        .map(|pos| GpuVertex { position: pos.to_array(), normal: [0.0; 3] })
        .collect();

    let mut mesh = RenderMesh { vertices, indices };
    mesh.recompute_normals();
    mesh
}

// ============================================================================
// SCENE BATCH
// ============================================================================

/// Vertex uploaded to the GPU: world-space position, normal and flat color.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
///   @location(2) color:    vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
    pub color:    [f32; 3],
}

impl SceneVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// Every visible working mesh of one frame, concatenated for a single draw call.
#[derive(Default)]
pub struct SceneBatch {
    pub vertices: Vec<SceneVertex>,
    pub indices:  Vec<u32>,
}

impl SceneBatch {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    pub fn push(&mut self, mesh: &RenderMesh, color: Color) {
        let base = self.vertices.len() as u32;
        let rgb = [color.r, color.g, color.b];
        self.vertices.extend(mesh.vertices.iter().map(|v| SceneVertex {
            position: v.position,
            normal:   v.normal,
            color:    rgb,
        }));
        self.indices.extend(mesh.indices.iter().map(|i| base + i));
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> u32 { self.indices.len() as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> RenderMesh {
        let mut poly = PolyMesh::new();
        let a = poly.add_vertex(Vec3::new(0.0, 0.0, 0.0));
        let b = poly.add_vertex(Vec3::new(1.0, 0.0, 0.0));
        let c = poly.add_vertex(Vec3::new(1.0, 1.0, 0.0));
        let d = poly.add_vertex(Vec3::new(0.0, 1.0, 0.0));
        poly.add_face(vec![a, b, c, d]);
        triangulate_smooth(&poly)
    }

    #[test]
    fn fan_triangulation_of_a_quad() {
        let mesh = quad();
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        for v in &mesh.vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn normals_follow_transformed_positions() {
        let base = quad();
        let mut working = base.clone();
        // Quarter turn about X: the +Z facing quad now faces +Y.
        let turn = Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2);
        working.transform_from(&base, &turn);

        for v in &working.vertices {
            let n = Vec3::from_array(v.normal);
            assert!(n.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5), "stale normal {n:?}");
        }
        // Base untouched.
        assert_eq!(base, quad());
    }

    #[test]
    fn batch_offsets_indices_per_mesh() {
        let mesh = quad();
        let mut batch = SceneBatch::default();
        batch.push(&mesh, Color::new(1.0, 0.0, 0.0));
        batch.push(&mesh, Color::new(0.0, 1.0, 0.0));

        assert_eq!(batch.vertices.len(), 8);
        assert_eq!(&batch.indices[6..], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(batch.vertices[5].color, [0.0, 1.0, 0.0]);

        batch.clear();
        assert_eq!(batch.index_count(), 0);
    }
}
