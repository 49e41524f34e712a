//! Shadow-casting light
//!
//! Combines a base [`LightState`] with the targets, passes and uniforms
//! that produce a blurred linear-depth shadow map every frame.

use super::depth_pass::{LinearDepthPass, ShadowPass};
use super::projection::LightProjection;
use super::targets::ShadowTargets;
use super::transform::shadow_transform;
use super::{ShadowCaster, ShadowMapConfig};
use crate::context::WgpuContext;
use crate::core::buffer::RawUniformBuffer;
use crate::core::state::{RenderState, StateStack, TextureId};
use crate::core::texture::Texture2D;
use crate::effect::{BlurParams, DebugBlit, SeparableBlur};
use crate::error::ShadowError;
use crate::renderer::geometry::Geometry;
use crate::renderer::light::{Light, LightState, LightType, LightUniforms};
use crate::renderer::viewer::Viewer;
use glam::{Mat4, Vec3};

/// Receiver uniform data for main-pass shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ReceiverUniform {
    /// Eye space to shadow texture space.
    pub shadow_matrix: [[f32; 4]; 4],
    /// Eye space to light view space.
    pub light_view_from_eye: [[f32; 4]; 4],
    /// 1 / (far - near) of the light frustum.
    pub linear_depth_constant: f32,
    /// Exponential shadow sharpness.
    pub esm_exponent: f32,
    /// 1.0 when shadows apply, 0.0 to render fully lit.
    pub enabled: f32,
    _pad: f32,
}

impl ReceiverUniform {
    /// Uniform that makes every receiver fully lit.
    pub fn disabled() -> Self {
        Self {
            shadow_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            light_view_from_eye: Mat4::IDENTITY.to_cols_array_2d(),
            linear_depth_constant: 0.0,
            esm_exponent: 0.0,
            enabled: 0.0,
            _pad: 0.0,
        }
    }

    /// Whether receivers will be shadowed.
    pub fn is_enabled(&self) -> bool {
        self.enabled > 0.5
    }
}

/// A light that renders and filters its own shadow map.
///
/// Construct once with [`ShadowMapLight::new`], then [`initialize`] to
/// allocate targets. Until initialisation succeeds every render operation
/// is a no-op and receivers sample a white fallback (fully lit).
///
/// [`initialize`]: ShadowMapLight::initialize
pub struct ShadowMapLight {
    base: LightState,
    config: ShadowMapConfig,
    projection: LightProjection,
    view: Mat4,

    targets: Option<ShadowTargets>,
    needs_reconfiguration: bool,
    allocations: u32,

    depth_pass: LinearDepthPass,
    blur: SeparableBlur,

    bind_group_layout: wgpu::BindGroupLayout,
    receiver_buffer: RawUniformBuffer,
    fallback: Texture2D,
    shadow_bind_group: wgpu::BindGroup,
    texture_id: TextureId,
}

impl ShadowMapLight {
    /// Create the light's pipelines and fallback texture. No shadow targets
    /// are allocated yet.
    pub fn new(ctx: &WgpuContext) -> anyhow::Result<Self> {
        let format = ShadowTargets::color_format(ctx);
        let depth_pass = LinearDepthPass::new(ctx, format)?;
        let blur = SeparableBlur::new(ctx, format)?;

        let uniform_size = wgpu::BufferSize::new(std::mem::size_of::<ReceiverUniform>() as u64);
        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("shadow receiver bind group layout"),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: uniform_size,
                            },
                            count: None,
                        },
                    ],
                });

        let receiver_buffer =
            RawUniformBuffer::for_type::<ReceiverUniform>(ctx, Some("shadow receiver uniform"));
        receiver_buffer.write(ctx, &ReceiverUniform::disabled());

        let fallback =
            Texture2D::from_rgba8(ctx, 1, 1, &[255, 255, 255, 255], Some("shadow fallback"));
        let shadow_bind_group =
            create_shadow_bind_group(ctx, &bind_group_layout, &fallback, &receiver_buffer);

        let config = ShadowMapConfig::default();
        let projection = LightProjection::default();
        let mut base = LightState::default();
        base.set_spotlight(projection.fov_degrees * 0.5);
        let view = base.view_matrix();

        Ok(Self {
            base,
            config,
            projection,
            view,
            targets: None,
            needs_reconfiguration: true,
            allocations: 0,
            depth_pass,
            blur,
            bind_group_layout,
            receiver_buffer,
            fallback,
            shadow_bind_group,
            texture_id: TextureId::next(),
        })
    }

    /// Apply `config`, allocating targets if the resolution changed.
    ///
    /// Calling this again with the same resolution only updates the
    /// frustum, blur and exponent. On error the light is left without
    /// targets and renders fully lit until a later call succeeds.
    pub fn initialize(
        &mut self,
        ctx: &WgpuContext,
        config: ShadowMapConfig,
    ) -> Result<(), ShadowError> {
        match self.configure(ctx, config) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(%err, "shadow map unavailable, rendering fully lit");
                self.release(ctx);
                Err(err)
            }
        }
    }

    fn configure(&mut self, ctx: &WgpuContext, config: ShadowMapConfig) -> Result<(), ShadowError> {
        let projection = config.validate()?;
        ShadowTargets::check_resolution(ctx, config.resolution)?;

        self.needs_reconfiguration = self
            .targets
            .as_ref()
            .is_none_or(|targets| targets.resolution() != config.resolution);
        self.config = config;
        self.set_projection(projection);

        if !self.needs_reconfiguration {
            tracing::debug!(resolution = config.resolution, "shadow targets reused");
            return Ok(());
        }

        if let Some(previous) = self.targets.take() {
            tracing::debug!(
                from = previous.resolution(),
                to = config.resolution,
                "reallocating shadow targets"
            );
            previous.destroy();
        }

        let targets = ShadowTargets::new(ctx, config.resolution)?;
        self.allocations += 1;
        self.shadow_bind_group = create_shadow_bind_group(
            ctx,
            &self.bind_group_layout,
            targets.linear_depth(),
            &self.receiver_buffer,
        );
        self.targets = Some(targets);
        self.needs_reconfiguration = false;

        tracing::info!(
            resolution = config.resolution,
            fov = config.fov_degrees,
            near = config.near,
            far = config.far,
            "shadow map ready"
        );
        Ok(())
    }

    /// Free the shadow targets. Receivers fall back to fully lit.
    pub fn release(&mut self, ctx: &WgpuContext) {
        if let Some(targets) = self.targets.take() {
            targets.destroy();
        }
        self.needs_reconfiguration = true;
        self.shadow_bind_group = create_shadow_bind_group(
            ctx,
            &self.bind_group_layout,
            &self.fallback,
            &self.receiver_buffer,
        );
        self.receiver_buffer.write(ctx, &ReceiverUniform::disabled());
    }

    fn set_projection(&mut self, projection: LightProjection) {
        self.projection = projection;
        self.base.spot_cutoff_degrees = projection.fov_degrees * 0.5;
    }

    /// Whether the targets must be (re)allocated before shadows render.
    pub fn needs_reconfiguration(&self) -> bool {
        self.needs_reconfiguration
    }

    /// Number of times targets have been allocated over the light's life.
    pub fn allocation_count(&self) -> u32 {
        self.allocations
    }

    /// Current configuration.
    pub fn config(&self) -> &ShadowMapConfig {
        &self.config
    }

    /// Change the blur sigma. Takes effect on the next pass.
    pub fn set_blur_factor(&mut self, blur_factor: f32) {
        self.config.blur_factor = blur_factor;
    }

    /// Get the blur sigma.
    pub fn blur_factor(&self) -> f32 {
        self.config.blur_factor
    }

    /// Base light state.
    pub fn light(&self) -> &LightState {
        &self.base
    }

    /// Modify the base light state; the view matrix follows.
    pub fn update_light(&mut self, update: impl FnOnce(&mut LightState)) {
        update(&mut self.base);
        self.update_view();
    }

    /// Move the light.
    pub fn set_position(&mut self, position: Vec3) {
        self.update_light(|light| light.set_position(position));
    }

    /// Turn the light to face `target`.
    pub fn look_at(&mut self, target: Vec3) {
        self.update_light(|light| light.look_at(target));
    }

    /// Place the light on a sphere around `center`, facing it.
    pub fn orbit(&mut self, longitude: f32, latitude: f32, radius: f32, center: Vec3) {
        self.update_light(|light| light.orbit(longitude, latitude, radius, center));
    }

    fn update_view(&mut self) {
        self.view = self.base.view_matrix();
    }

    /// World to light view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Light view to clip matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Light frustum.
    pub fn projection(&self) -> &LightProjection {
        &self.projection
    }

    /// Open a light-space depth pass over `state`.
    ///
    /// Returns `None`, leaving `state` untouched, when the light has no
    /// targets; the frame then renders fully lit.
    pub fn begin_pass<'a, 'g>(
        &'a mut self,
        ctx: &'a WgpuContext,
        state: &'a mut StateStack,
    ) -> Option<ShadowPass<'a, 'g>> {
        let Some(resolution) = self.targets.as_ref().map(ShadowTargets::resolution) else {
            tracing::debug!("shadow pass skipped, light not set up");
            return None;
        };
        Some(ShadowPass::new(ctx, self, state.scoped(), resolution))
    }

    /// Run a whole depth pass: `draw_scene` records the casters.
    ///
    /// Returns whether the map was rendered.
    pub fn render<'g, F>(
        &mut self,
        ctx: &WgpuContext,
        state: &mut StateStack,
        draw_scene: F,
    ) -> bool
    where
        F: FnOnce(&mut ShadowPass<'_, 'g>),
    {
        let Some(mut pass) = self.begin_pass(ctx, state) else {
            return false;
        };
        draw_scene(&mut pass);
        pass.end();
        true
    }

    /// Depth pass, horizontal blur and vertical blur in one submission.
    pub(crate) fn render_shadow_map(
        &mut self,
        ctx: &WgpuContext,
        state: &RenderState,
        draws: &[(Mat4, &dyn Geometry)],
    ) {
        let Some(targets) = &self.targets else {
            return;
        };

        let mut encoder = ctx.create_encoder(Some("shadow map"));
        self.depth_pass.record(
            ctx,
            &mut encoder,
            targets,
            state,
            self.projection.linear_depth_scalar(),
            draws,
        );
        self.blur.run(
            ctx,
            &mut encoder,
            targets.linear_depth(),
            targets.scratch(),
            BlurParams::new(self.config.blur_factor, targets.texel_size()),
        );
        ctx.submit([encoder.finish()]);
    }

    /// Write the receiver uniform for `viewer` and return it.
    ///
    /// A light without targets, or a viewer whose view matrix cannot be
    /// inverted, yields a disabled uniform so the frame renders fully lit.
    pub fn update_receiver(&self, ctx: &WgpuContext, viewer: &dyn Viewer) -> ReceiverUniform {
        let uniform = match (&self.targets, self.shadow_matrix(viewer)) {
            (Some(_), Ok(shadow_matrix)) => ReceiverUniform {
                shadow_matrix: shadow_matrix.to_cols_array_2d(),
                light_view_from_eye: (self.view * viewer.view_matrix().inverse())
                    .to_cols_array_2d(),
                linear_depth_constant: self.projection.linear_depth_scalar(),
                esm_exponent: self.config.esm_exponent,
                enabled: 1.0,
                _pad: 0.0,
            },
            (None, _) => ReceiverUniform::disabled(),
            (Some(_), Err(err)) => {
                tracing::warn!(%err, "skipping shadow lookups this frame");
                ReceiverUniform::disabled()
            }
        };
        self.receiver_buffer.write(ctx, &uniform);
        uniform
    }

    /// Layout of [`ShadowCaster::shadow_bind_group`], for main-pass pipelines.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// The filtered shadow map texture, when set up.
    pub fn shadow_texture(&self) -> Option<&Texture2D> {
        self.targets.as_ref().map(ShadowTargets::linear_depth)
    }

    /// Target A's raw depth attachment, when set up.
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.targets.as_ref().map(|targets| targets.depth().view())
    }

    /// Draw the filtered map into the top-left of `output` for inspection.
    /// Does nothing when the light is not set up.
    pub fn debug_draw(
        &self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        blit: &DebugBlit,
        output: &wgpu::TextureView,
        output_size: (u32, u32),
    ) {
        if let Some(texture) = self.shadow_texture() {
            blit.draw(ctx, encoder, texture, output, output_size);
        }
    }
}

impl ShadowCaster for ShadowMapLight {
    fn is_set_up(&self) -> bool {
        self.targets.is_some()
    }

    fn shadow_matrix(&self, viewer: &dyn Viewer) -> Result<Mat4, ShadowError> {
        shadow_transform(viewer.view_matrix(), self.view, self.projection.matrix())
    }

    fn linear_depth_scalar(&self) -> f32 {
        self.projection.linear_depth_scalar()
    }

    fn shadow_view(&self) -> Option<&wgpu::TextureView> {
        self.shadow_texture().map(Texture2D::view)
    }

    fn shadow_bind_group(&self) -> &wgpu::BindGroup {
        &self.shadow_bind_group
    }

    fn texture_id(&self) -> TextureId {
        self.texture_id
    }
}

impl Light for ShadowMapLight {
    fn light_type(&self) -> LightType {
        self.base.light_type()
    }

    fn uniforms(&self) -> LightUniforms {
        self.base.uniforms()
    }
}

fn create_shadow_bind_group(
    ctx: &WgpuContext,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture2D,
    receiver: &RawUniformBuffer,
) -> wgpu::BindGroup {
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("shadow receiver bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(texture.view()),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(texture.sampler()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: receiver.buffer().as_entire_binding(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::core::pipeline::PipelineBuilder;
    use crate::core::readback::read_rgba8;
    use crate::core::render_states::CullState;
    use crate::core::state::Framebuffer;
    use crate::core::vertex::VertexPT;
    use crate::effect::FullscreenQuad;
    use crate::renderer::geometry::Mesh;
    use crate::renderer::viewer::{Camera, Viewport};
    use crate::shadow::shadow_receiver_wgsl;

    fn camera() -> Camera {
        Camera::new_perspective(
            Vec3::new(30.0, 15.0, 20.0),
            Vec3::ZERO,
            Vec3::Y,
            45.0,
            1.0,
            0.1,
            100.0,
        )
    }

    fn blit_map(
        ctx: &WgpuContext,
        light: &ShadowMapLight,
        uv_min: glam::Vec2,
        uv_max: glam::Vec2,
    ) -> Vec<u8> {
        let blit = DebugBlit::new(ctx, wgpu::TextureFormat::Rgba8Unorm).unwrap();
        let output = Texture2D::render_target(
            ctx,
            64,
            64,
            wgpu::TextureFormat::Rgba8Unorm,
            Some("debug output"),
        );
        let texture = light.shadow_texture().unwrap();
        let mut encoder = ctx.create_encoder(Some("debug blit"));
        blit.draw_region(
            ctx,
            &mut encoder,
            texture,
            output.view(),
            (64, 64),
            uv_min,
            uv_max,
        );
        ctx.submit([encoder.finish()]);
        read_rgba8(ctx, output.texture()).unwrap()
    }

    fn lit_light(ctx: &WgpuContext, config: ShadowMapConfig) -> ShadowMapLight {
        let mut light = ShadowMapLight::new(ctx).unwrap();
        light.initialize(ctx, config).unwrap();
        light.set_position(Vec3::new(0.0, 0.0, 10.0));
        light.look_at(Vec3::ZERO);
        light
    }

    #[test]
    fn test_empty_pass_is_fully_lit() {
        let Some(ctx) = test_context() else { return };
        let config = ShadowMapConfig::new()
            .resolution(1024)
            .projection(60.0, 0.1, 200.0);
        let mut light = lit_light(&ctx, config);
        let mut state = StateStack::new(RenderState::new(640, 480));

        assert!(light.render(&ctx, &mut state, |_| {}));

        let pixels = blit_map(&ctx, &light, glam::Vec2::ZERO, glam::Vec2::ONE);
        assert!(pixels.chunks(4).all(|px| px[0] == 255));
    }

    #[test]
    fn test_occluder_darkens_map() {
        let Some(ctx) = test_context() else { return };
        let mut light = lit_light(&ctx, ShadowMapConfig::new().resolution(128));
        let mut state = StateStack::new(RenderState::new(640, 480));
        let wall = Mesh::cuboid(&ctx, Vec3::new(40.0, 40.0, 1.0));

        light.render(&ctx, &mut state, |pass| pass.draw(Mat4::IDENTITY, &wall));

        // The wall fills the frustum, so the map itself is dark.
        let inside = blit_map(
            &ctx,
            &light,
            glam::Vec2::splat(0.25),
            glam::Vec2::splat(0.75),
        );
        assert!(inside.chunks(4).all(|px| px[0] < 255));
    }

    // One eye-space point per output pixel. With the light at (0, 0, 10)
    // facing a wall at the origin: behind the wall, in front of it, then far
    // outside the light frustum.
    const SAMPLE_POINTS_WGSL: &str = r#"
@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    var points = array<vec3<f32>, 3>(
        vec3<f32>(0.0, 0.0, -5.0),
        vec3<f32>(0.0, 0.0, 5.0),
        vec3<f32>(50.0, 0.0, -5.0),
    );
    let visibility = shadow_visibility(points[u32(frag_coord.x)]);
    return vec4<f32>(visibility, visibility, visibility, 1.0);
}
"#;

    /// Run `shadow_visibility` with `light`'s bind group at group 0 and
    /// return the red channel for each sample point.
    fn receiver_visibility(ctx: &WgpuContext, light: &ShadowMapLight) -> [u8; 3] {
        let source = format!("{}\n{}", shadow_receiver_wgsl(0), SAMPLE_POINTS_WGSL);
        let pipeline = PipelineBuilder::new(ctx)
            .label("receiver test pipeline")
            .shader(&source)
            .vertex_layout(VertexPT::layout())
            .bind_group_layout(light.bind_group_layout())
            .color_format(wgpu::TextureFormat::Rgba8Unorm)
            .cull(CullState::None)
            .topology(FullscreenQuad::TOPOLOGY)
            .build()
            .unwrap();
        let quad = FullscreenQuad::new(ctx);
        let output = Texture2D::render_target(
            ctx,
            3,
            1,
            wgpu::TextureFormat::Rgba8Unorm,
            Some("receiver output"),
        );

        let mut encoder = ctx.create_encoder(Some("receiver test"));
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("receiver test"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, light.shadow_bind_group(), &[]);
            quad.draw(&mut pass);
        }
        ctx.submit([encoder.finish()]);

        let pixels = read_rgba8(ctx, output.texture()).unwrap();
        [pixels[0], pixels[4], pixels[8]]
    }

    #[test]
    fn test_receiver_visibility() {
        let Some(ctx) = test_context() else { return };
        let mut light = lit_light(&ctx, ShadowMapConfig::new().resolution(128));
        let mut state = StateStack::new(RenderState::new(640, 480));
        let wall = Mesh::cuboid(&ctx, Vec3::new(40.0, 40.0, 1.0));
        // Eye space equals world space.
        let viewer = Camera::new_perspective(
            Vec3::ZERO,
            Vec3::NEG_Z,
            Vec3::Y,
            45.0,
            1.0,
            0.1,
            100.0,
        );

        light.render(&ctx, &mut state, |pass| pass.draw(Mat4::IDENTITY, &wall));
        assert!(light.update_receiver(&ctx, &viewer).is_enabled());

        let [behind, front, outside] = receiver_visibility(&ctx, &light);
        assert!(behind < 128, "behind the wall reads {behind}");
        assert_eq!(front, 255);
        // Outside the frustum the lookup reads the border, whatever the
        // sampler's address mode.
        assert_eq!(outside, 255);

        light.release(&ctx);
        assert!(!light.update_receiver(&ctx, &viewer).is_enabled());
        assert_eq!(receiver_visibility(&ctx, &light), [255, 255, 255]);
    }

    #[test]
    fn test_invalid_resolution_leaves_light_unset() {
        let Some(ctx) = test_context() else { return };
        let mut light = ShadowMapLight::new(&ctx).unwrap();
        let mut state = StateStack::new(RenderState::new(64, 64));

        let result = light.initialize(&ctx, ShadowMapConfig::new().resolution(0));
        assert_eq!(result, Err(ShadowError::InvalidResolution(0)));
        assert!(!light.is_set_up());
        assert!(light.needs_reconfiguration());
        assert_eq!(light.allocation_count(), 0);
        assert!(light.begin_pass(&ctx, &mut state).is_none());
        assert!(!light.update_receiver(&ctx, &camera()).is_enabled());
    }

    #[test]
    fn test_failed_reinitialize_releases_targets() {
        let Some(ctx) = test_context() else { return };
        let mut light = lit_light(&ctx, ShadowMapConfig::new().resolution(64));
        assert!(light.is_set_up());

        let too_big = ctx.max_texture_dimension() + 1;
        assert!(matches!(
            light.initialize(&ctx, ShadowMapConfig::new().resolution(too_big)),
            Err(ShadowError::ResourceExhausted { .. })
        ));
        assert!(!light.is_set_up());
        assert!(light.shadow_view().is_none());
    }

    #[test]
    fn test_reinitialize_same_resolution_reuses_targets() {
        let Some(ctx) = test_context() else { return };
        let mut light = ShadowMapLight::new(&ctx).unwrap();
        let config = ShadowMapConfig::new().resolution(256);

        light.initialize(&ctx, config).unwrap();
        light
            .initialize(&ctx, config.projection(45.0, 0.5, 80.0))
            .unwrap();

        assert_eq!(light.allocation_count(), 1);
        assert!(!light.needs_reconfiguration());
        assert!((light.linear_depth_scalar() - 1.0 / 79.5).abs() < 1e-7);
    }

    #[test]
    fn test_reinitialize_new_resolution_reallocates() {
        let Some(ctx) = test_context() else { return };
        let mut light = ShadowMapLight::new(&ctx).unwrap();

        light
            .initialize(&ctx, ShadowMapConfig::new().resolution(64))
            .unwrap();
        light
            .initialize(&ctx, ShadowMapConfig::new().resolution(128))
            .unwrap();

        assert_eq!(light.allocation_count(), 2);
        assert_eq!(light.shadow_texture().unwrap().size(), (128, 128));
    }

    #[test]
    fn test_blur_factor_applies_without_reallocation() {
        let Some(ctx) = test_context() else { return };
        let mut light = lit_light(&ctx, ShadowMapConfig::new().resolution(64));
        let mut state = StateStack::new(RenderState::new(64, 64));
        let block = Mesh::cuboid(&ctx, Vec3::splat(2.0));

        light.set_blur_factor(0.25);
        light.render(&ctx, &mut state, |pass| pass.draw(Mat4::IDENTITY, &block));
        let sharp = blit_map(&ctx, &light, glam::Vec2::ZERO, glam::Vec2::ONE);

        light.set_blur_factor(8.0);
        light.render(&ctx, &mut state, |pass| pass.draw(Mat4::IDENTITY, &block));
        let soft = blit_map(&ctx, &light, glam::Vec2::ZERO, glam::Vec2::ONE);

        assert_ne!(sharp, soft);
        assert_eq!(light.allocation_count(), 1);
        assert_eq!(light.blur_factor(), 8.0);
    }

    #[test]
    fn test_pass_restores_caller_state() {
        let Some(ctx) = test_context() else { return };
        let mut light = lit_light(&ctx, ShadowMapConfig::new().resolution(32));
        let mut state = StateStack::new(RenderState::new(800, 600));
        state.current_mut().view = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let before = *state.current();

        let light_view = light.view_matrix();
        {
            let pass = light.begin_pass(&ctx, &mut state).unwrap();
            assert_eq!(pass.state().view, light_view);
            assert_eq!(pass.state().viewport, Viewport::new(32, 32));
            assert_eq!(pass.state().framebuffer, Framebuffer::ShadowDepth);
            pass.end();
        }

        assert_eq!(*state.current(), before);
        assert_eq!(state.depth(), 0);
    }

    #[test]
    fn test_repositioned_light_updates_transform() {
        let Some(ctx) = test_context() else { return };
        let mut light = lit_light(&ctx, ShadowMapConfig::default());
        let viewer = camera();

        let before = light.shadow_matrix(&viewer).unwrap();
        light.orbit(45.0, 30.0, 50.0, Vec3::ZERO);
        let after = light.shadow_matrix(&viewer).unwrap();

        assert_ne!(before, after);
        let expected = shadow_transform(
            viewer.view_matrix(),
            light.light().view_matrix(),
            light.projection_matrix(),
        )
        .unwrap();
        assert_eq!(after, expected);
    }

    struct Degenerate;

    impl Viewer for Degenerate {
        fn position(&self) -> Vec3 {
            Vec3::ZERO
        }

        fn view_matrix(&self) -> Mat4 {
            Mat4::ZERO
        }

        fn projection_matrix(&self) -> Mat4 {
            Mat4::IDENTITY
        }

        fn viewport(&self) -> Viewport {
            Viewport::new(1, 1)
        }
    }

    #[test]
    fn test_receiver_uniform_layout() {
        // Two mat4x4 plus four scalars, as declared in shadow_receiver.wgsl.
        assert_eq!(std::mem::size_of::<ReceiverUniform>(), 144);
        assert_eq!(ReceiverUniform::disabled().enabled, 0.0);
    }

    #[test]
    fn test_receiver_uniform() {
        let Some(ctx) = test_context() else { return };
        let light = lit_light(
            &ctx,
            ShadowMapConfig::new().resolution(512).esm_exponent(40.0),
        );
        let viewer = camera();

        let uniform = light.update_receiver(&ctx, &viewer);
        assert!(uniform.is_enabled());
        assert_eq!(
            uniform.shadow_matrix,
            light.shadow_matrix(&viewer).unwrap().to_cols_array_2d()
        );
        assert_eq!(uniform.esm_exponent, 40.0);
        assert_eq!(
            uniform.linear_depth_constant,
            light.projection().linear_depth_scalar()
        );

        assert!(!light.update_receiver(&ctx, &Degenerate).is_enabled());
    }

    #[test]
    fn test_spotlight_cutoff_follows_fov() {
        let Some(ctx) = test_context() else { return };
        let light = lit_light(&ctx, ShadowMapConfig::new().projection(50.0, 0.1, 10.0));
        assert_eq!(light.light_type(), LightType::Spot);
        assert_eq!(light.light().spot_cutoff_degrees, 25.0);
    }
}
