//! Separable Gaussian blur
//!
//! Softens a single-channel map in two passes: horizontal from the target
//! into a scratch texture, then vertical from the scratch back into the
//! target. Taps that land outside the map read as 1.0, so the blur never
//! darkens the map's edges.

use super::FullscreenQuad;
use crate::context::WgpuContext;
use crate::core::buffer::RawUniformBuffer;
use crate::core::pipeline::PipelineBuilder;
use crate::core::render_states::{ClearState, CullState, FULLY_LIT};
use crate::core::texture::Texture2D;
use crate::core::vertex::VertexPT;

/// Taps sampled on each side of the centre texel.
pub const TAPS_PER_SIDE: usize = 2;

/// Smallest sigma passed to the shader; zero would divide by zero.
const MIN_SIGMA: f32 = 1.0e-3;

/// Blur uniform data for GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniform {
    pub sigma: f32,
    pub texel_size: f32,
    _pad: [f32; 2],
}

/// Per-run blur parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurParams {
    /// Gaussian spread in texels.
    pub sigma: f32,
    /// Size of one texel in UV units (1 / resolution).
    pub texel_size: f32,
}

impl BlurParams {
    /// Create blur parameters.
    pub fn new(sigma: f32, texel_size: f32) -> Self {
        Self { sigma, texel_size }
    }

    /// Get the uniform data for shaders.
    pub fn uniform(&self) -> BlurUniform {
        BlurUniform {
            sigma: self.sigma.max(MIN_SIGMA),
            texel_size: self.texel_size,
            _pad: [0.0; 2],
        }
    }
}

/// Normalised weights of the incremental Gaussian the blur shader evaluates,
/// from `-taps_per_side` to `+taps_per_side`.
pub fn gaussian_weights(sigma: f32, taps_per_side: usize) -> Vec<f32> {
    let sigma = sigma.max(MIN_SIGMA);
    let mut g = [
        1.0 / ((2.0 * std::f32::consts::PI).sqrt() * sigma),
        (-0.5 / (sigma * sigma)).exp(),
        0.0,
    ];
    g[2] = g[1] * g[1];

    let mut side = Vec::with_capacity(taps_per_side + 1);
    for _ in 0..=taps_per_side {
        side.push(g[0]);
        g[0] *= g[1];
        g[1] *= g[2];
    }

    let total = side[0] + 2.0 * side[1..].iter().sum::<f32>();
    side.iter()
        .rev()
        .chain(side.iter().skip(1))
        .map(|w| w / total)
        .collect()
}

/// Two-pass separable Gaussian blur.
pub struct SeparableBlur {
    horizontal: wgpu::RenderPipeline,
    vertical: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: RawUniformBuffer,
    quad: FullscreenQuad,
}

impl SeparableBlur {
    /// Create a blur for targets of the given colour format.
    pub fn new(ctx: &WgpuContext, format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        let shader = include_str!("../shaders/gaussian_blur.wgsl");

        let uniform_size = wgpu::BufferSize::new(std::mem::size_of::<BlurUniform>() as u64);
        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("blur bind group layout"),
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
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: uniform_size,
                            },
                            count: None,
                        },
                    ],
                });

        let build = |label: &'static str, entry: &'static str| {
            PipelineBuilder::new(ctx)
                .label(label)
                .shader(shader)
                .fragment_entry(entry)
                .vertex_layout(VertexPT::layout())
                .bind_group_layout(&bind_group_layout)
                .color_format(format)
                .cull(CullState::None)
                .topology(FullscreenQuad::TOPOLOGY)
                .build()
        };
        let horizontal = build("horizontal blur pipeline", "fs_horizontal")?;
        let vertical = build("vertical blur pipeline", "fs_vertical")?;

        let uniform_buffer = RawUniformBuffer::for_type::<BlurUniform>(ctx, Some("blur uniform"));
        let quad = FullscreenQuad::new(ctx);

        Ok(Self {
            horizontal,
            vertical,
            bind_group_layout,
            uniform_buffer,
            quad,
        })
    }

    /// Blur `target` in place, using `scratch` for the intermediate pass.
    ///
    /// Parameters are uploaded on every run, so changes apply to the next
    /// submission without touching the textures.
    pub fn run(
        &self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &Texture2D,
        scratch: &Texture2D,
        params: BlurParams,
    ) {
        self.uniform_buffer.write(ctx, &params.uniform());

        self.apply(
            ctx,
            encoder,
            &self.horizontal,
            target,
            scratch,
            "horizontal blur pass",
        );
        self.apply(
            ctx,
            encoder,
            &self.vertical,
            scratch,
            target,
            "vertical blur pass",
        );
    }

    fn apply(
        &self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        input: &Texture2D,
        output: &Texture2D,
        label: &str,
    ) {
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("blur bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(input.sampler()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.buffer().as_entire_binding(),
                },
            ],
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: ClearState::color(FULLY_LIT).color_load_op(),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        self.quad.draw(&mut render_pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::core::readback::read_rgba8;
    use crate::effect::DebugBlit;

    #[test]
    fn test_gaussian_weights_normalised() {
        for sigma in [0.5, 1.0, 4.0, 16.0] {
            let weights = gaussian_weights(sigma, TAPS_PER_SIDE);
            assert_eq!(weights.len(), 2 * TAPS_PER_SIDE + 1);
            let sum: f32 = weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_gaussian_weights_shape() {
        let weights = gaussian_weights(2.0, TAPS_PER_SIDE);
        assert_eq!(weights[0], weights[4]);
        assert_eq!(weights[1], weights[3]);
        assert!(weights[2] > weights[1] && weights[1] > weights[0]);

        // Wider sigma flattens the kernel.
        let wide = gaussian_weights(8.0, TAPS_PER_SIDE);
        assert!(wide[2] < weights[2]);
        assert!(wide[0] > weights[0]);
    }

    #[test]
    fn test_gaussian_weights_match_closed_form() {
        let sigma = 3.0f32;
        let weights = gaussian_weights(sigma, TAPS_PER_SIDE);
        let raw: Vec<f32> = (-2i32..=2)
            .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
            .collect();
        let total: f32 = raw.iter().sum();
        for (w, r) in weights.iter().zip(raw) {
            assert!((w - r / total).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_sigma_is_clamped() {
        let uniform = BlurParams::new(0.0, 1.0 / 512.0).uniform();
        assert!(uniform.sigma > 0.0);
        assert!(gaussian_weights(0.0, TAPS_PER_SIDE)
            .iter()
            .all(|w| w.is_finite()));
    }

    fn clear(ctx: &WgpuContext, texture: &Texture2D, value: f32) {
        let mut encoder = ctx.create_encoder(Some("test clear"));
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: texture.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: ClearState::color([value, value, value, 1.0]).color_load_op(),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        ctx.submit([encoder.finish()]);
    }

    #[test]
    fn test_blur_edges_read_border() {
        let Some(ctx) = test_context() else { return };
        let size = 16;
        let format = wgpu::TextureFormat::R16Float;
        let target = Texture2D::render_target(&ctx, size, size, format, Some("blur target"));
        let scratch = Texture2D::render_target(&ctx, size, size, format, Some("blur scratch"));
        clear(&ctx, &target, 0.0);

        let blur = SeparableBlur::new(&ctx, format).unwrap();
        let blit = DebugBlit::new(&ctx, wgpu::TextureFormat::Rgba8Unorm).unwrap();
        let output = Texture2D::render_target(
            &ctx,
            size,
            size,
            wgpu::TextureFormat::Rgba8Unorm,
            Some("blur output"),
        );

        let mut encoder = ctx.create_encoder(Some("blur test"));
        blur.run(
            &ctx,
            &mut encoder,
            &target,
            &scratch,
            BlurParams::new(4.0, 1.0 / size as f32),
        );
        blit.draw(&ctx, &mut encoder, &target, output.view(), (size, size));
        ctx.submit([encoder.finish()]);

        let pixels = read_rgba8(&ctx, output.texture()).unwrap();
        let at = |x: u32, y: u32| pixels[((y * size + x) * 4) as usize];

        // Interior texels only see the zeroed map; edge texels pick up the border.
        assert_eq!(at(8, 8), 0);
        assert!(at(0, 0) > 0);
        assert!(at(size - 1, 8) > 0);
        assert!(at(0, 0) > at(0, 8));
    }
}
