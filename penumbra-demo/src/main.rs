mod scene;

use glam::Vec3;
use penumbra::{
    read_rgba8, Camera, DebugBlit, DepthTexture, Mesh, RenderState, ShadowMapConfig,
    ShadowMapLight, StateStack, Texture2D, TextureUnits, WgpuContext,
};
use scene::{draw_casters, scene_objects, ScenePass};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const FRAMES: u32 = 120;
const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ctx = WgpuContext::new_blocking(None)?;
    log::info!("{ctx:?}");

    let mut light = ShadowMapLight::new(&ctx)?;
    light.initialize(
        &ctx,
        ShadowMapConfig::new()
            .resolution(2048)
            .projection(45.0, 0.1, 80.0)
            .blur_factor(4.0),
    )?;
    light.update_light(|base| {
        base.set_ambient([0.0, 0.0, 0.0]);
        base.set_diffuse([0.9, 0.9, 0.9]);
        base.set_specular([1.0, 1.0, 1.0]);
    });
    light.set_position(Vec3::new(10.0, 10.0, 45.0));

    let camera = Camera::new_perspective(
        Vec3::new(30.0, 15.0, 20.0),
        Vec3::ZERO,
        Vec3::Y,
        45.0,
        WIDTH as f32 / HEIGHT as f32,
        0.1,
        100.0,
    );

    let cube = Mesh::cuboid(&ctx, Vec3::ONE);
    let objects = scene_objects(400, 12.0, 0x5eed);

    let color = Texture2D::render_target(&ctx, WIDTH, HEIGHT, OUTPUT_FORMAT, Some("scene color"));
    let depth = DepthTexture::new(&ctx, WIDTH, HEIGHT, Some("scene depth"));
    let mut scene_pass = ScenePass::new(&ctx, &light, OUTPUT_FORMAT)?;
    let debug_blit = DebugBlit::new(&ctx, OUTPUT_FORMAT)?;

    let mut state = StateStack::new(RenderState::new(WIDTH, HEIGHT));
    let mut units = TextureUnits::default();
    let mut angle = 0.0f32;

    for frame in 0..FRAMES {
        angle += 0.25;
        light.look_at(Vec3::ZERO);
        light.orbit(angle, 30.0, 50.0, Vec3::ZERO);

        light.render(&ctx, &mut state, |pass| draw_casters(pass, &objects, &cube));

        let mut encoder = ctx.create_encoder(Some("scene frame"));
        scene_pass.record(
            &ctx,
            &mut encoder,
            &color,
            &depth,
            &camera,
            &light,
            &mut units,
            &objects,
            &cube,
        );
        if frame + 1 == FRAMES {
            light.debug_draw(
                &ctx,
                &mut encoder,
                &debug_blit,
                color.view(),
                (WIDTH, HEIGHT),
            );
        }
        ctx.submit([encoder.finish()]);
    }

    let pixels = read_rgba8(&ctx, color.texture())?;
    let mean = pixels
        .chunks_exact(4)
        .map(|px| (px[0] as f64 + px[1] as f64 + px[2] as f64) / (3.0 * 255.0))
        .sum::<f64>()
        / (WIDTH * HEIGHT) as f64;

    log::info!("rendered {FRAMES} frames, mean luminance {mean:.3}");
    Ok(())
}
