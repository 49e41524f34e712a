//! Demo scene: a floor slab and a cloud of boxes, lit by one shadowed light.

use glam::{Mat4, Vec3};
use penumbra::core::DynamicUniformBuffer;
use penumbra::{
    shadow_receiver_wgsl, ClearState, DepthState, DepthTexture, Geometry, Light, Mesh,
    PipelineBuilder, ShadowCaster, ShadowMapLight, ShadowPass, ShadowTextureBinding, Texture2D,
    TextureUnits, VertexPN, Viewer, WgpuContext,
};

const SCENE_WGSL: &str = include_str!("scene.wgsl");

/// Bind group index (texture unit) the shadow map is bound to.
pub const SHADOW_UNIT: u32 = 1;

/// Ambient term applied to every surface, lit or not.
const GLOBAL_AMBIENT: f32 = 0.05;

/// One box in the scene.
#[derive(Debug, Clone, Copy)]
pub struct SceneObject {
    pub position: Vec3,
    pub size: Vec3,
    pub color: Vec3,
}

impl SceneObject {
    pub fn model(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(self.size)
    }
}

/// Small xorshift generator so every run lays the boxes out identically.
struct XorShift(u32);

impl XorShift {
    fn next_unit(&mut self) -> f32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// The floor slab followed by `count` boxes scattered in a cube of
/// half-extent `bounds`.
pub fn scene_objects(count: usize, bounds: f32, seed: u32) -> Vec<SceneObject> {
    let mut rng = XorShift(seed.max(1));
    let mut objects = Vec::with_capacity(count + 1);

    objects.push(SceneObject {
        position: Vec3::ZERO,
        size: Vec3::new(32.0, 1.0, 32.0),
        color: Vec3::splat(0.8),
    });

    for _ in 0..count {
        let mut coord = || bounds - rng.next_unit() * bounds * 2.0;
        let position = Vec3::new(coord(), coord(), coord());
        let size = (rng.next_unit() * 5.0).max(0.05);
        objects.push(SceneObject {
            position,
            size: Vec3::splat(size),
            color: Vec3::new(0.9, 0.6 + 0.3 * rng.next_unit(), 0.4),
        });
    }

    objects
}

/// Queue every object into a light-space depth pass.
pub fn draw_casters<'g>(
    pass: &mut ShadowPass<'_, 'g>,
    objects: &[SceneObject],
    cube: &'g Mesh,
) {
    for object in objects {
        pass.draw(object.model(), cube);
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    model_view: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_position: [f32; 4],
    color: [f32; 4],
    lighting: [f32; 4],
}

/// Forward pass drawing the scene with shadow lookups.
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: DynamicUniformBuffer<DrawUniform>,
    bind_group: wgpu::BindGroup,
}

impl ScenePass {
    pub fn new(
        ctx: &WgpuContext,
        light: &ShadowMapLight,
        format: wgpu::TextureFormat,
    ) -> anyhow::Result<Self> {
        let shader = format!("{}\n{}", shadow_receiver_wgsl(SHADOW_UNIT), SCENE_WGSL);

        let uniform_size = wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64);
        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("scene bind group layout"),
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

        let pipeline = PipelineBuilder::new(ctx)
            .label("scene pipeline")
            .shader(&shader)
            .vertex_layout(VertexPN::layout())
            .bind_group_layout(&bind_group_layout)
            .bind_group_layout(light.bind_group_layout())
            .color_format(format)
            .depth(DepthState::read_write())
            .build()?;

        let uniforms = DynamicUniformBuffer::new(ctx, 512, Some("scene uniforms"));
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
        uniforms: &DynamicUniformBuffer<DrawUniform>,
    ) -> wgpu::BindGroup {
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.binding(),
            }],
        })
    }

    /// Draw `objects` from `viewer` into `color`, sampling `light`'s shadow
    /// map through texture unit [`SHADOW_UNIT`].
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        &mut self,
        ctx: &WgpuContext,
        encoder: &mut wgpu::CommandEncoder,
        color: &Texture2D,
        depth: &DepthTexture,
        viewer: &dyn Viewer,
        light: &ShadowMapLight,
        units: &mut TextureUnits,
        objects: &[SceneObject],
        cube: &Mesh,
    ) {
        light.update_receiver(ctx, viewer);

        let view = viewer.view_matrix();
        let projection = viewer.projection_matrix();
        let light_uniforms = light.uniforms();
        let light_position = view * light.light().position.extend(1.0);
        let lighting = [
            GLOBAL_AMBIENT + light_uniforms.ambient[0],
            light_uniforms.diffuse[0],
            light_uniforms.specular_enabled[0] * light_uniforms.specular_enabled[3],
            0.0,
        ];

        let uniforms: Vec<DrawUniform> = objects
            .iter()
            .map(|object| {
                let model_view = view * object.model();
                DrawUniform {
                    model_view: model_view.to_cols_array_2d(),
                    normal_matrix: model_view.inverse().transpose().to_cols_array_2d(),
                    projection: projection.to_cols_array_2d(),
                    light_position: light_position.to_array(),
                    color: object.color.extend(1.0).to_array(),
                    lighting,
                }
            })
            .collect();
        if self.uniforms.write_all(ctx, &uniforms) {
            self.bind_group = Self::create_bind_group(ctx, &self.bind_group_layout, &self.uniforms);
        }

        let clear = ClearState::color_and_depth([0.02, 0.02, 0.03, 1.0], 1.0);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: clear.color_load_op(),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth.view(),
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

        render_pass.set_pipeline(&self.pipeline);

        let mut binding = ShadowTextureBinding::new();
        binding.bind(&mut render_pass, units, light, SHADOW_UNIT);
        for (i, _) in objects.iter().enumerate() {
            render_pass.set_bind_group(0, &self.bind_group, &[self.uniforms.offset(i)]);
            cube.draw(&mut render_pass);
        }
        binding.unbind(&mut render_pass, units);

        if !light.is_set_up() {
            log::debug!("scene drawn without shadows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_is_deterministic() {
        let a = scene_objects(400, 12.0, 7);
        let b = scene_objects(400, 12.0, 7);
        assert_eq!(a.len(), 401);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.position, y.position);
            assert_eq!(x.size, y.size);
        }
    }

    #[test]
    fn test_boxes_within_bounds() {
        let objects = scene_objects(400, 12.0, 7);
        assert_eq!(objects[0].size, Vec3::new(32.0, 1.0, 32.0));
        for object in &objects[1..] {
            assert!(object.position.abs().max_element() <= 12.0);
            assert!(object.size.x > 0.0 && object.size.x < 5.0);
        }
    }
}
