//! Mesh geometry
//!
//! Provides indexed meshes and the primitive shapes the demo scene is built from.

use super::{Aabb, Geometry};
use crate::context::WgpuContext;
use crate::core::buffer::{IndexBuffer, VertexBuffer};
use crate::core::vertex::VertexPN;
use glam::Vec3;

/// A mesh with vertex and index data.
pub struct Mesh {
    vertex_buffer: VertexBuffer,
    index_buffer: Option<IndexBuffer>,
    draw_count: u32,
    aabb: Aabb,
}

impl Mesh {
    /// Create a new mesh from vertices and indices.
    pub fn new(
        ctx: &WgpuContext,
        vertices: &[VertexPN],
        indices: Option<&[u32]>,
        label: Option<&str>,
    ) -> Self {
        let vertex_buffer = VertexBuffer::new(ctx, vertices, label);

        let (index_buffer, draw_count) = if let Some(indices) = indices {
            let ib = IndexBuffer::new(ctx, indices, label);
            let count = indices.len() as u32;
            (Some(ib), count)
        } else {
            (None, vertices.len() as u32)
        };

        let aabb = Aabb::from_points(vertices.iter().map(|v| Vec3::from(v.position)));

        Self {
            vertex_buffer,
            index_buffer,
            draw_count,
            aabb,
        }
    }

    /// Create a box centred on the origin with the given edge lengths.
    pub fn cuboid(ctx: &WgpuContext, size: Vec3) -> Self {
        let (vertices, indices) = cuboid_vertices(size * 0.5);
        Self::new(ctx, &vertices, Some(&indices), Some("cuboid"))
    }
}

impl Geometry for Mesh {
    fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertex_buffer
    }

    fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.index_buffer.as_ref()
    }

    fn draw_count(&self) -> u32 {
        self.draw_count
    }

    fn aabb(&self) -> Aabb {
        self.aabb
    }
}

// (normal, u, v) per face, with u x v == normal so quads wind CCW from outside.
const CUBOID_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

/// Vertices and indices of a box with the given half extents.
pub fn cuboid_vertices(half: Vec3) -> (Vec<VertexPN>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u, v) in CUBOID_FACES {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let corner = (normal + u * su + v * sv) * half;
            vertices.push(VertexPN::new(corner.to_array(), normal.to_array()));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}
