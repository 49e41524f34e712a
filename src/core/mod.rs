//! Core rendering abstractions
//!
//! This module provides mid-level abstractions over wgpu primitives.

pub mod buffer;
pub mod pipeline;
pub mod readback;
pub mod render_states;
pub mod state;
pub mod texture;
pub mod vertex;

pub use buffer::{DynamicUniformBuffer, IndexBuffer, RawUniformBuffer, VertexBuffer};
pub use pipeline::PipelineBuilder;
pub use readback::read_rgba8;
pub use render_states::{ClearState, CullState, DepthState, FULLY_LIT};
pub use state::{
    Framebuffer, RenderState, StateScope, StateStack, TextureId, TextureUnits, MAX_TEXTURE_UNITS,
};
pub use texture::{border_sampler, DepthTexture, Texture2D};
pub use vertex::{VertexPN, VertexPT};
