//! Geometry abstractions
//!
//! Provides mesh geometry and the trait passes use to draw it.

mod mesh;

pub use mesh::{cuboid_vertices, Mesh};

use crate::core::buffer::{IndexBuffer, VertexBuffer};
use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a set of points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);

        for p in points {
            min = min.min(p);
            max = max.max(p);
        }

        Self { min, max }
    }

    /// Get the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size of the AABB.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Radius of the sphere through the corners, centred on [`Aabb::center`].
    pub fn bounding_radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// The box moved by `offset`.
    pub fn translated(&self, offset: Vec3) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }

    /// Merge two AABBs.
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

/// Trait for geometry that can be rendered.
pub trait Geometry {
    /// Get the vertex buffer.
    fn vertex_buffer(&self) -> &VertexBuffer;

    /// Get the index buffer if available.
    fn index_buffer(&self) -> Option<&IndexBuffer>;

    /// Get the number of primitives to draw.
    fn draw_count(&self) -> u32;

    /// Get the axis-aligned bounding box.
    fn aabb(&self) -> Aabb;

    /// Draw the geometry using the given render pass.
    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer().slice());
        if let Some(index_buffer) = self.index_buffer() {
            render_pass.set_index_buffer(index_buffer.slice(), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.draw_count(), 0, 0..1);
        } else {
            render_pass.draw(0..self.draw_count(), 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points([Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, -2.0, 0.0)]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 0.0, 2.0));
        assert_eq!(aabb.center(), Vec3::new(1.0, -1.0, 1.0));
    }

    #[test]
    fn test_aabb_merge_translated() {
        let unit = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let merged = unit.merge(&unit.translated(Vec3::X * 2.0));
        assert_eq!(merged.min, Vec3::splat(-0.5));
        assert_eq!(merged.max, Vec3::new(2.5, 0.5, 0.5));
        assert!((unit.bounding_radius() - 3.0f32.sqrt() * 0.5).abs() < 1e-6);
    }
}
