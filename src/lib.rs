//! Penumbra
//!
//! Soft shadows for wgpu renderers: a light renders linear depth from its own
//! viewpoint, blurs it with a separable Gaussian, and gives the main pass a
//! single matrix from eye space into the filtered shadow map.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **context** - Core wgpu wrapper (Device, Queue)
//! 2. **core** - GPU primitives (buffers, textures, pipelines, render state)
//! 3. **renderer** - Cameras, lights and mesh geometry
//! 4. **effect** - Full-screen passes (Gaussian blur, debug blit)
//! 5. **shadow** - The shadow-casting light and its passes
//!
//! # Frame
//!
//! ```no_run
//! use penumbra::{
//!     Camera, Mat4, Mesh, RenderState, ShadowCaster, ShadowMapConfig, ShadowMapLight,
//!     StateStack, Vec3, WgpuContext,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = WgpuContext::new_blocking(None)?;
//! let mut light = ShadowMapLight::new(&ctx)?;
//! light.initialize(&ctx, ShadowMapConfig::new().resolution(2048))?;
//! light.orbit(30.0, 30.0, 50.0, Vec3::ZERO);
//!
//! let floor = Mesh::cuboid(&ctx, Vec3::new(32.0, 1.0, 32.0));
//! let eye = Vec3::new(30.0, 15.0, 20.0);
//! let camera = Camera::new_perspective(eye, Vec3::ZERO, Vec3::Y, 45.0, 1.0, 0.1, 100.0);
//! let mut state = StateStack::new(RenderState::new(1280, 720));
//!
//! light.render(&ctx, &mut state, |pass| pass.draw(Mat4::IDENTITY, &floor));
//! light.update_receiver(&ctx, &camera);
//! // Main pass: bind `light.shadow_bind_group()` with a `ShadowTextureBinding`.
//! # let _ = light.is_set_up();
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod core;
pub mod effect;
pub mod error;
pub mod renderer;
pub mod shadow;

// Re-export commonly used types
pub use context::WgpuContext;

pub use core::{
    read_rgba8, ClearState, CullState, DepthState, DepthTexture, Framebuffer, IndexBuffer,
    PipelineBuilder, RawUniformBuffer, RenderState, StateScope, StateStack, Texture2D, TextureId,
    TextureUnits, VertexBuffer, VertexPN, VertexPT,
};

pub use renderer::{
    Aabb, Camera, Geometry, Light, LightState, LightType, Mesh, Projection, Viewer, Viewport,
};

pub use effect::{gaussian_weights, BlurParams, DebugBlit, FullscreenQuad, SeparableBlur};

pub use error::ShadowError;

pub use shadow::{
    shadow_receiver_wgsl, shadow_transform, LightProjection, ReceiverUniform, ShadowCaster,
    ShadowMapConfig, ShadowMapLight, ShadowPass, ShadowTargets, ShadowTextureBinding, BIAS,
    SHADOW_RECEIVER_WGSL,
};

// Re-export glam for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
