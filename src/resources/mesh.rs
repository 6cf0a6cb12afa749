//! Mesh data structures and generation

use crate::backend::types::Vertex;
use glam::Vec3;

/// A mesh with vertex and index data.
///
/// Vertices always carry normals (computed when the source geometry has
/// none), so the GPU-side stride is fixed. Indices are 16-bit and describe
/// a triangle list.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Geometry tag ("tetrahedron", "cube", ...)
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Build a mesh from bare positions, computing smooth vertex normals
    /// (area-weighted average of incident face normals).
    pub fn from_positions(name: &str, positions: &[Vec3], indices: Vec<u16>) -> Self {
        let normals = compute_smooth_normals(positions, &indices);
        let vertices = positions
            .iter()
            .zip(normals)
            .map(|(position, normal)| Vertex::new(*position, normal))
            .collect();
        Self {
            name: name.to_string(),
            vertices,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// The four-vertex demo solid: a tetrahedron around the origin
    pub fn tetrahedron() -> Self {
        let positions = [
            Vec3::new(0.5, 0.5, 0.0),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(-0.5, -0.5, 0.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3, 0, 3, 1, 1, 3, 2];
        Self::from_positions("tetrahedron", &positions, indices)
    }

    /// Create a unit cube centered at origin, with flat face normals
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");

        let faces: [(Vec3, [Vec3; 4]); 6] = [
            (
                Vec3::Z,
                [
                    Vec3::new(-0.5, -0.5, 0.5),
                    Vec3::new(0.5, -0.5, 0.5),
                    Vec3::new(0.5, 0.5, 0.5),
                    Vec3::new(-0.5, 0.5, 0.5),
                ],
            ),
            (
                -Vec3::Z,
                [
                    Vec3::new(0.5, -0.5, -0.5),
                    Vec3::new(-0.5, -0.5, -0.5),
                    Vec3::new(-0.5, 0.5, -0.5),
                    Vec3::new(0.5, 0.5, -0.5),
                ],
            ),
            (
                Vec3::X,
                [
                    Vec3::new(0.5, -0.5, 0.5),
                    Vec3::new(0.5, -0.5, -0.5),
                    Vec3::new(0.5, 0.5, -0.5),
                    Vec3::new(0.5, 0.5, 0.5),
                ],
            ),
            (
                -Vec3::X,
                [
                    Vec3::new(-0.5, -0.5, -0.5),
                    Vec3::new(-0.5, -0.5, 0.5),
                    Vec3::new(-0.5, 0.5, 0.5),
                    Vec3::new(-0.5, 0.5, -0.5),
                ],
            ),
            (
                Vec3::Y,
                [
                    Vec3::new(-0.5, 0.5, 0.5),
                    Vec3::new(0.5, 0.5, 0.5),
                    Vec3::new(0.5, 0.5, -0.5),
                    Vec3::new(-0.5, 0.5, -0.5),
                ],
            ),
            (
                -Vec3::Y,
                [
                    Vec3::new(-0.5, -0.5, -0.5),
                    Vec3::new(0.5, -0.5, -0.5),
                    Vec3::new(0.5, -0.5, 0.5),
                    Vec3::new(-0.5, -0.5, 0.5),
                ],
            ),
        ];

        for (normal, corners) in faces {
            let base = mesh.vertices.len() as u16;
            for corner in corners {
                mesh.vertices.push(Vertex::new(corner, normal));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Create a flat quad on the XZ plane, facing up
    pub fn plane(width: f32, depth: f32) -> Self {
        let half_width = width / 2.0;
        let half_depth = depth / 2.0;

        let mut mesh = Mesh::new("plane");
        for position in [
            Vec3::new(-half_width, 0.0, -half_depth),
            Vec3::new(-half_width, 0.0, half_depth),
            Vec3::new(half_width, 0.0, half_depth),
            Vec3::new(half_width, 0.0, -half_depth),
        ] {
            mesh.vertices.push(Vertex::new(position, Vec3::Y));
        }
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
        mesh
    }
}

/// Area-weighted smooth normals: accumulate unnormalized face normals per
/// vertex, then normalize. Degenerate accumulations fall back to +Y.
fn compute_smooth_normals(positions: &[Vec3], indices: &[u16]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let face_normal = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face_normal;
        normals[b] += face_normal;
        normals[c] += face_normal;
    }

    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tetrahedron_matches_source_geometry() {
        let mesh = Mesh::tetrahedron();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 12);
        assert_eq!(mesh.triangle_count(), 4);
        assert_eq!(mesh.name, "tetrahedron");
    }

    #[test]
    fn computed_normals_are_unit_length() {
        let mesh = Mesh::tetrahedron();
        for vertex in &mesh.vertices {
            assert_relative_eq!(vertex.normal.length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn vertex_bytes_use_the_declared_stride() {
        let mesh = Mesh::cube();
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertex_count() * 24);
        assert_eq!(mesh.index_bytes().len(), mesh.index_count() * 2);
    }

    #[test]
    fn cube_is_a_closed_triangle_list() {
        let mesh = Mesh::cube();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.index_count() % 3, 0);
        let max_index = *mesh.indices.iter().max().unwrap() as usize;
        assert!(max_index < mesh.vertex_count());
    }

    #[test]
    fn plane_faces_up() {
        let mesh = Mesh::plane(10.0, 10.0);
        assert!(mesh.vertices.iter().all(|v| v.normal == Vec3::Y));
        assert_eq!(mesh.triangle_count(), 2);
    }
}
