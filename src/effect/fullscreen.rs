//! Fullscreen quad for post-processing effects

use crate::context::WgpuContext;
use crate::core::buffer::VertexBuffer;
use crate::core::vertex::VertexPT;

/// Clip-space quad covering [-1, 1] with texture coordinates, drawn as a
/// triangle strip. Clip-space bottom-left maps to uv (0, 1).
pub const QUAD_VERTICES: [VertexPT; 4] = [
    VertexPT::new([-1.0, -1.0], [0.0, 1.0]),
    VertexPT::new([1.0, -1.0], [1.0, 1.0]),
    VertexPT::new([-1.0, 1.0], [0.0, 0.0]),
    VertexPT::new([1.0, 1.0], [1.0, 0.0]),
];

/// A fullscreen quad for rendering post-processing effects.
pub struct FullscreenQuad {
    vertex_buffer: VertexBuffer,
}

impl FullscreenQuad {
    /// Primitive topology pipelines drawing the quad must use.
    pub const TOPOLOGY: wgpu::PrimitiveTopology = wgpu::PrimitiveTopology::TriangleStrip;

    /// Create a new fullscreen quad.
    pub fn new(ctx: &WgpuContext) -> Self {
        let vertex_buffer = VertexBuffer::new(ctx, &QUAD_VERTICES, Some("fullscreen quad"));

        Self { vertex_buffer }
    }

    /// Draw the fullscreen quad.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice());
        render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}
