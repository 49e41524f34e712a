//! Offscreen render targets for the shadow map
//!
//! Target A pairs a depth attachment with a single-channel float colour
//! attachment holding linear depth. Target B is a colour attachment of the
//! same size and format, used as blur scratch.

use crate::context::WgpuContext;
use crate::core::texture::{DepthTexture, Texture2D};
use crate::error::ShadowError;

/// The render target pair owned by a shadow-casting light.
pub struct ShadowTargets {
    resolution: u32,
    format: wgpu::TextureFormat,
    depth: DepthTexture,
    linear_depth: Texture2D,
    scratch: Texture2D,
}

impl ShadowTargets {
    /// Colour format for the linear depth maps on this device.
    ///
    /// `R32Float` is only filterable with `FLOAT32_FILTERABLE`; without it
    /// the maps fall back to `R16Float`.
    pub fn color_format(ctx: &WgpuContext) -> wgpu::TextureFormat {
        if ctx.supports(wgpu::Features::FLOAT32_FILTERABLE) {
            wgpu::TextureFormat::R32Float
        } else {
            wgpu::TextureFormat::R16Float
        }
    }

    /// Reject resolutions the device cannot allocate, without touching the GPU.
    pub fn check_resolution(ctx: &WgpuContext, resolution: u32) -> Result<(), ShadowError> {
        if resolution == 0 {
            return Err(ShadowError::InvalidResolution(resolution));
        }
        let max = ctx.max_texture_dimension();
        if resolution > max {
            return Err(ShadowError::ResourceExhausted {
                requested: resolution,
                max,
            });
        }
        if !resolution.is_power_of_two() {
            tracing::warn!(
                resolution,
                "shadow map resolution is not a power of two; filtering quality may suffer"
            );
        }
        Ok(())
    }

    /// Allocate both targets at `resolution`×`resolution` and verify them.
    pub fn new(ctx: &WgpuContext, resolution: u32) -> Result<Self, ShadowError> {
        Self::check_resolution(ctx, resolution)?;

        let format = Self::color_format(ctx);
        let depth = DepthTexture::new(ctx, resolution, resolution, Some("shadow depth"));
        let linear_depth = Texture2D::render_target(
            ctx,
            resolution,
            resolution,
            format,
            Some("shadow linear depth"),
        );
        let scratch = Texture2D::render_target(
            ctx,
            resolution,
            resolution,
            format,
            Some("shadow blur scratch"),
        );

        let targets = Self {
            resolution,
            format,
            depth,
            linear_depth,
            scratch,
        };

        if let Err(err) = targets.verify() {
            targets.destroy();
            return Err(err);
        }

        tracing::debug!(resolution, ?format, "allocated shadow targets");
        Ok(targets)
    }

    /// Completeness check over every attachment.
    pub fn verify(&self) -> Result<(), ShadowError> {
        check_attachment(
            "A depth",
            self.depth.texture(),
            self.resolution,
            DepthTexture::FORMAT,
        )?;
        check_attachment(
            "A colour",
            self.linear_depth.texture(),
            self.resolution,
            self.format,
        )?;
        check_attachment(
            "B colour",
            self.scratch.texture(),
            self.resolution,
            self.format,
        )
    }

    /// Edge length in texels.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Size of one texel in UV units.
    pub fn texel_size(&self) -> f32 {
        1.0 / self.resolution as f32
    }

    /// Colour format of both colour attachments.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Target A's depth attachment.
    pub fn depth(&self) -> &DepthTexture {
        &self.depth
    }

    /// Target A's colour attachment: linear depth, filtered after a blur.
    pub fn linear_depth(&self) -> &Texture2D {
        &self.linear_depth
    }

    /// Target B's colour attachment.
    pub fn scratch(&self) -> &Texture2D {
        &self.scratch
    }

    /// Release all attachments.
    pub fn destroy(&self) {
        self.depth.destroy();
        self.linear_depth.destroy();
        self.scratch.destroy();
    }
}

/// Check that an attachment is exactly `resolution` square, single-sampled,
/// of `format`, and usable both as a render attachment and for sampling.
pub fn check_attachment(
    target: &'static str,
    texture: &wgpu::Texture,
    resolution: u32,
    format: wgpu::TextureFormat,
) -> Result<(), ShadowError> {
    let incomplete = |reason: String| ShadowError::IncompleteTarget { target, reason };

    if texture.width() != resolution || texture.height() != resolution {
        return Err(incomplete(format!(
            "size {}x{}, expected {resolution}x{resolution}",
            texture.width(),
            texture.height()
        )));
    }
    if texture.format() != format {
        return Err(incomplete(format!(
            "format {:?}, expected {format:?}",
            texture.format()
        )));
    }
    if texture.sample_count() != 1 {
        return Err(incomplete(format!(
            "{} samples, expected 1",
            texture.sample_count()
        )));
    }
    let required = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    if !texture.usage().contains(required) {
        return Err(incomplete(format!(
            "usage {:?} lacks {required:?}",
            texture.usage()
        )));
    }
    Ok(())
}
