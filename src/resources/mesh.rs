//! Mesh data structures and generation

use crate::backend::traits::*;
use crate::backend::types::*;
use glam::{Vec2, Vec3};

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: PrimitiveTopology,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology: PrimitiveTopology::TriangleList,
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Quad covering clip space, drawn as a strip without an element buffer
    pub fn fullscreen_quad() -> Self {
        let mut mesh = Mesh::new("fullscreen_quad");
        mesh.topology = PrimitiveTopology::TriangleStrip;
        for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            mesh.vertices.push(Vertex::new(
                Vec3::new(x, y, 0.0),
                Vec3::Z,
                Vec2::new((x + 1.0) * 0.5, (y + 1.0) * 0.5),
            ));
        }
        mesh
    }

    /// Indexed unit quad in the XY plane, used for sprites and UI
    pub fn quad() -> Self {
        let mut mesh = Mesh::new("quad");
        for (x, y) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            mesh.vertices.push(Vertex::new(
                Vec3::new(x, y, 0.0),
                Vec3::Z,
                Vec2::new(x + 0.5, 0.5 - y),
            ));
        }
        mesh.indices = vec![0, 1, 2, 0, 2, 3];
        mesh
    }

    /// Unit line segment along +X, scaled and rotated by the draw transform
    pub fn line() -> Self {
        let mut mesh = Mesh::new("line");
        mesh.topology = PrimitiveTopology::LineList;
        mesh.vertices.push(Vertex::new(Vec3::ZERO, Vec3::Y, Vec2::ZERO));
        mesh.vertices.push(Vertex::new(Vec3::X, Vec3::Y, Vec2::X));
        mesh
    }

    /// Create a unit cube centered at origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");
        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];

        for (normal, right) in faces {
            let up = normal.cross(right);
            let base = mesh.vertices.len() as u32;
            for (u, v) in [(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)] {
                let position = (normal + right * (u * 2.0 - 1.0) + up * (1.0 - v * 2.0)) * 0.5;
                mesh.vertices
                    .push(Vertex::new(position, normal, Vec2::new(u, v)));
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        mesh
    }

    /// Create a plane on the XZ axis
    pub fn plane(width: f32, depth: f32, subdivisions: u32) -> Self {
        let mut mesh = Mesh::new("plane");
        let subdivisions = subdivisions.max(1);

        let step_x = width / subdivisions as f32;
        let step_z = depth / subdivisions as f32;

        for z in 0..=subdivisions {
            for x in 0..=subdivisions {
                mesh.vertices.push(Vertex::new(
                    Vec3::new(
                        -width / 2.0 + x as f32 * step_x,
                        0.0,
                        -depth / 2.0 + z as f32 * step_z,
                    ),
                    Vec3::Y,
                    Vec2::new(x as f32 / subdivisions as f32, z as f32 / subdivisions as f32),
                ));
            }
        }

        for z in 0..subdivisions {
            for x in 0..subdivisions {
                let current = z * (subdivisions + 1) + x;
                let next = current + subdivisions + 1;
                mesh.indices.extend_from_slice(&[
                    current,
                    next,
                    current + 1,
                    current + 1,
                    next,
                    next + 1,
                ]);
            }
        }

        mesh
    }
}

/// A mesh uploaded to the GPU.
#[derive(Debug, Clone)]
pub struct VertexArray {
    id: VertexArrayId,
    label: String,
    vertex_count: u32,
    element_count: Option<u32>,
    topology: PrimitiveTopology,
}

impl VertexArray {
    pub(crate) fn create(backend: &mut dyn GraphicsBackend, mesh: &Mesh) -> BackendResult<Self> {
        let indices = (!mesh.indices.is_empty()).then_some(mesh.indices.as_slice());
        let id = backend.create_vertex_array(&VertexArrayDescriptor {
            label: Some(mesh.name.as_str()),
            layout: Vertex::layout(),
            vertex_data: mesh.vertex_bytes(),
            vertex_count: mesh.vertex_count() as u32,
            indices,
        })?;

        Ok(Self {
            id,
            label: mesh.name.clone(),
            vertex_count: mesh.vertex_count() as u32,
            element_count: indices.map(|i| i.len() as u32),
            topology: mesh.topology,
        })
    }

    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices, `None` when there is no element buffer
    pub fn element_count(&self) -> Option<u32> {
        self.element_count
    }

    pub fn has_elements(&self) -> bool {
        self.element_count.is_some()
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;

    #[test]
    fn test_cube_counts() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert!(cube
            .vertices
            .iter()
            .all(|v| v.position.abs().max_element() <= 0.5 + f32::EPSILON));
    }

    #[test]
    fn test_fullscreen_quad_has_no_elements() {
        let mut backend = DummyBackend::default();
        let va = VertexArray::create(&mut backend, &Mesh::fullscreen_quad()).unwrap();
        assert!(!va.has_elements());
        assert_eq!(va.vertex_count(), 4);
        assert_eq!(va.topology(), PrimitiveTopology::TriangleStrip);
    }

    #[test]
    fn test_indexed_vertex_array() {
        let mut backend = DummyBackend::default();
        let va = VertexArray::create(&mut backend, &Mesh::quad()).unwrap();
        assert_eq!(va.element_count(), Some(6));
    }
}
