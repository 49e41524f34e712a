//! Light-space depth pass
//!
//! Renders caller geometry from the light's viewpoint into target A, writing
//! each fragment's distance from the light scaled by the linear depth scalar.

use super::light::ShadowMapLight;
use super::targets::ShadowTargets;
use crate::context::WgpuContext;
use crate::core::buffer::DynamicUniformBuffer;
use crate::core::pipeline::PipelineBuilder;
use crate::core::render_states::{ClearState, CullState, DepthState};
use crate::core::state::{Framebuffer, RenderState, StateScope};
use crate::core::vertex::VertexPN;
use crate::renderer::geometry::Geometry;
use crate::renderer::viewer::Viewport;
use glam::Mat4;

/// Per-draw uniform data for the depth pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DepthPassUniform {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub linear_depth_constant: f32,
    _pad: [f32; 3],
}

impl DepthPassUniform {
    pub fn new(model_view: Mat4, projection: Mat4, linear_depth_constant: f32) -> Self {
        Self {
            model_view: model_view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            linear_depth_constant,
            _pad: [0.0; 3],
        }
    }
}

/// Pipeline and per-draw uniforms for rendering linear depth.
pub struct LinearDepthPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: DynamicUniformBuffer<DepthPassUniform>,
    bind_group: wgpu::BindGroup,
}

impl LinearDepthPass {
    /// Initial number of draws the uniform buffer holds before growing.
    const INITIAL_CAPACITY: usize = 64;

    /// Create the pass for colour targets of `format`.
    pub fn new(ctx: &WgpuContext, format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        let shader = include_str!("../shaders/linear_depth.wgsl");

        let uniform_size = wgpu::BufferSize::new(std::mem::size_of::<DepthPassUniform>() as u64);
        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("linear depth bind group layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: uniform_size,
                        },
                        count: None,
                    }],
                });

        // Front faces culled: casters write the depth of their far side.
        let pipeline = PipelineBuilder::new(ctx)
            .label("linear depth pipeline")
            .shader(shader)
            .vertex_layout(VertexPN::position_layout())
            .bind_group_layout(&bind_group_layout)
            .color_format(format)
            .depth(DepthState::less_equal())
            .cull(CullState::Front)
            .build()?;

        let uniforms =
            DynamicUniformBuffer::new(ctx, Self::INITIAL_CAPACITY, Some("linear depth uniforms"));
        let bind_group = Self::create_bind_group(ctx, &bind_group_layout, &uniforms);

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniforms,
            bind_group,
        })
    }

    fn create_bind_group(
        ctx: &WgpuContext,
        layout: &wgpu::BindGroupLayout,
        uniforms: &DynamicUniformBuffer<DepthPassUniform>,
    ) -> wgpu::BindGroup {
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("linear depth bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.binding(),
            }],
        })
    }

    /// Record the pass into `encoder`: clear A to fully lit and far depth,
    /// then draw every `(model, geometry)` pair with the given light matrices.
    pub fn record(
        &mut self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        targets: &ShadowTargets,
        state: &RenderState,
        linear_depth_constant: f32,
        draws: &[(Mat4, &dyn Geometry)],
    ) {
        let uniforms: Vec<DepthPassUniform> = draws
            .iter()
            .map(|(model, _)| {
                DepthPassUniform::new(state.view * *model, state.projection, linear_depth_constant)
            })
            .collect();

        if self.uniforms.write_all(ctx, &uniforms) {
            self.bind_group = Self::create_bind_group(ctx, &self.bind_group_layout, &self.uniforms);
        }

        let clear = ClearState::fully_lit();
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("linear depth pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: targets.linear_depth().view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: clear.color_load_op(),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.depth().view(),
                depth_ops: Some(wgpu::Operations {
                    load: clear.depth_load_op(),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let viewport = state.viewport;
        render_pass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        render_pass.set_pipeline(&self.pipeline);

        for (i, (_, geometry)) in draws.iter().enumerate() {
            render_pass.set_bind_group(0, &self.bind_group, &[self.uniforms.offset(i)]);
            geometry.draw(&mut render_pass);
        }
    }
}

/// An open light-space depth pass.
///
/// Created by [`ShadowMapLight::begin_pass`]. While it lives, the caller's
/// render state holds the light's view, projection and viewport with front
/// faces culled; draws are collected with [`ShadowPass::draw`]. Ending the
/// pass (explicitly or by dropping it) renders and blurs the map, submits
/// the work, and restores the caller's state.
///
/// The pass mutably borrows the light, so passes cannot nest and every
/// begin has exactly one end.
pub struct ShadowPass<'a, 'g> {
    ctx: &'a WgpuContext,
    light: &'a mut ShadowMapLight,
    scope: StateScope<'a>,
    draws: Vec<(Mat4, &'g dyn Geometry)>,
}

impl<'a, 'g> ShadowPass<'a, 'g> {
    pub(crate) fn new(
        ctx: &'a WgpuContext,
        light: &'a mut ShadowMapLight,
        mut scope: StateScope<'a>,
        resolution: u32,
    ) -> Self {
        scope.view = light.view_matrix();
        scope.projection = light.projection_matrix();
        scope.viewport = Viewport::new(resolution, resolution);
        scope.cull = CullState::Front;
        scope.depth_test = true;
        scope.framebuffer = Framebuffer::ShadowDepth;

        Self {
            ctx,
            light,
            scope,
            draws: Vec::new(),
        }
    }

    /// Render state the pass draws with.
    pub fn state(&self) -> &RenderState {
        &self.scope
    }

    /// Queue `geometry` to be drawn with the `model` transform.
    pub fn draw(&mut self, model: Mat4, geometry: &'g dyn Geometry) {
        self.draws.push((model, geometry));
    }

    /// Number of draws recorded so far.
    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    /// Render, blur and submit the shadow map, then restore the caller's state.
    pub fn end(self) {
        drop(self);
    }
}

impl Drop for ShadowPass<'_, '_> {
    fn drop(&mut self) {
        let draws = std::mem::take(&mut self.draws);
        let state = *self.scope;
        self.light.render_shadow_map(self.ctx, &state, &draws);
    }
}
