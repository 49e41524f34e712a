//! Debug blit for inspecting single-channel maps on screen

use super::FullscreenQuad;
use crate::context::WgpuContext;
use crate::core::buffer::RawUniformBuffer;
use crate::core::pipeline::PipelineBuilder;
use crate::core::render_states::{ClearState, CullState};
use crate::core::texture::Texture2D;
use crate::core::vertex::VertexPT;
use glam::Vec2;

/// Edge length of the on-screen debug view in pixels.
pub const DEBUG_BLIT_SIZE: u32 = 256;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitUniform {
    uv_offset: [f32; 2],
    uv_scale: [f32; 2],
}

/// Draws a texture's red channel as greyscale into the top-left corner of
/// an output view, on top of whatever is already there.
///
/// The output must be single-sampled. The UV window is a uniform, so only
/// one blit per queue submission shows its own window; later blits in the
/// same submission reuse the last one written.
pub struct DebugBlit {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: RawUniformBuffer,
    quad: FullscreenQuad,
}

impl DebugBlit {
    /// Create a debug blit targeting views of `format`.
    pub fn new(ctx: &WgpuContext, format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        let shader = include_str!("../shaders/debug_blit.wgsl");

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("debug blit bind group layout"),
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
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline = PipelineBuilder::new(ctx)
            .label("debug blit pipeline")
            .shader(shader)
            .vertex_layout(VertexPT::layout())
            .bind_group_layout(&bind_group_layout)
            .color_format(format)
            .cull(CullState::None)
            .topology(FullscreenQuad::TOPOLOGY)
            .build()?;

        let uniform_buffer =
            RawUniformBuffer::for_type::<BlitUniform>(ctx, Some("debug blit uniform"));
        let quad = FullscreenQuad::new(ctx);

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            quad,
        })
    }

    /// Draw all of `source`.
    pub fn draw(
        &self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &Texture2D,
        output: &wgpu::TextureView,
        output_size: (u32, u32),
    ) {
        self.draw_region(
            ctx,
            encoder,
            source,
            output,
            output_size,
            Vec2::ZERO,
            Vec2::ONE,
        );
    }

    /// Draw the `uv_min..uv_max` window of `source`. Parts of the window
    /// outside [0, 1] show the border value (white).
    #[allow(clippy::too_many_arguments)]
    pub fn draw_region(
        &self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        source: &Texture2D,
        output: &wgpu::TextureView,
        output_size: (u32, u32),
        uv_min: Vec2,
        uv_max: Vec2,
    ) {
        let size = DEBUG_BLIT_SIZE.min(output_size.0).min(output_size.1);
        if size == 0 {
            return;
        }

        self.uniform_buffer.write(
            ctx,
            &BlitUniform {
                uv_offset: uv_min.to_array(),
                uv_scale: (uv_max - uv_min).to_array(),
            },
        );

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("debug blit bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(source.sampler()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.buffer().as_entire_binding(),
                },
            ],
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("debug blit pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: ClearState::none().color_load_op(),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        render_pass.set_viewport(0.0, 0.0, size as f32, size as f32, 0.0, 1.0);
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        self.quad.draw(&mut render_pass);
    }
}
