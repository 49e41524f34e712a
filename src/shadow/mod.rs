//! Shadow mapping module
//!
//! Provides a shadow-casting light that renders linear depth from its own
//! viewpoint, softens it with a separable Gaussian blur, and hands the main
//! pass a matrix and texture for exponential shadow lookups.

mod binding;
mod depth_pass;
mod light;
mod projection;
mod targets;
mod transform;

pub use binding::ShadowTextureBinding;
pub use depth_pass::{DepthPassUniform, LinearDepthPass, ShadowPass};
pub use light::{ReceiverUniform, ShadowMapLight};
pub use projection::LightProjection;
pub use targets::{check_attachment, ShadowTargets};
pub use transform::{shadow_transform, BIAS};

use crate::core::state::TextureId;
use crate::error::ShadowError;
use crate::renderer::viewer::Viewer;
use glam::Mat4;

/// WGSL declarations for sampling the shadow map in a main-pass shader.
///
/// Defines the `ShadowReceiver` uniform, the shadow map bindings and
/// `shadow_visibility(eye_position) -> f32`. The bind group index is the
/// `{{group}}` placeholder; use [`shadow_receiver_wgsl`] to fill it in.
pub const SHADOW_RECEIVER_WGSL: &str = include_str!("../shaders/shadow_receiver.wgsl");

/// [`SHADOW_RECEIVER_WGSL`] with its bindings placed in bind group `unit`.
pub fn shadow_receiver_wgsl(unit: u32) -> String {
    SHADOW_RECEIVER_WGSL.replace("{{group}}", &unit.to_string())
}

/// Shadow map configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowMapConfig {
    /// Shadow map resolution (width and height). Powers of two filter best.
    pub resolution: u32,
    /// Light field of view in degrees.
    pub fov_degrees: f32,
    /// Light near plane.
    pub near: f32,
    /// Light far plane.
    pub far: f32,
    /// Gaussian sigma of the blur, in texels.
    pub blur_factor: f32,
    /// Sharpness of the exponential shadow test in the receiver shader.
    pub esm_exponent: f32,
}

impl Default for ShadowMapConfig {
    fn default() -> Self {
        Self {
            resolution: 1024,
            fov_degrees: 60.0,
            near: 0.1,
            far: 200.0,
            blur_factor: 4.0,
            esm_exponent: 80.0,
        }
    }
}

impl ShadowMapConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shadow map resolution.
    pub fn resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the light frustum.
    pub fn projection(mut self, fov_degrees: f32, near: f32, far: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self.near = near;
        self.far = far;
        self
    }

    /// Set the blur sigma.
    pub fn blur_factor(mut self, blur_factor: f32) -> Self {
        self.blur_factor = blur_factor;
        self
    }

    /// Set the exponential shadow sharpness.
    pub fn esm_exponent(mut self, esm_exponent: f32) -> Self {
        self.esm_exponent = esm_exponent;
        self
    }

    /// Size of one shadow map texel in UV units.
    pub fn texel_size(&self) -> f32 {
        1.0 / self.resolution as f32
    }

    /// Validate everything that can be checked without a device.
    pub fn validate(&self) -> Result<LightProjection, ShadowError> {
        if self.resolution == 0 {
            return Err(ShadowError::InvalidResolution(self.resolution));
        }
        LightProjection::new(self.fov_degrees, self.near, self.far)
    }
}

/// Capability of a light that casts a filtered shadow map.
pub trait ShadowCaster {
    /// Whether targets are allocated and the map is being rendered.
    fn is_set_up(&self) -> bool;

    /// Matrix from the viewer's eye space to shadow texture space.
    fn shadow_matrix(&self, viewer: &dyn Viewer) -> Result<Mat4, ShadowError>;

    /// Scale taking distance from the light into [0, 1].
    fn linear_depth_scalar(&self) -> f32;

    /// The filtered shadow map, when set up.
    fn shadow_view(&self) -> Option<&wgpu::TextureView>;

    /// Bind group with the shadow map, its sampler and the receiver uniform.
    /// Holds a white fallback texture when not set up.
    fn shadow_bind_group(&self) -> &wgpu::BindGroup;

    /// Identity used to track which texture unit the map occupies.
    fn texture_id(&self) -> TextureId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ShadowMapConfig::new()
            .resolution(2048)
            .projection(45.0, 0.1, 80.0)
            .blur_factor(2.0)
            .esm_exponent(40.0);
        assert_eq!(config.resolution, 2048);
        assert_eq!(config.fov_degrees, 45.0);
        assert_eq!(config.far, 80.0);
        assert_eq!(config.blur_factor, 2.0);
        assert_eq!(config.esm_exponent, 40.0);
        assert_eq!(config.texel_size(), 1.0 / 2048.0);
    }

    #[test]
    fn test_config_defaults() {
        let config = ShadowMapConfig::default();
        assert_eq!(config.resolution, 1024);
        assert_eq!(config.blur_factor, 4.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            ShadowMapConfig::new().resolution(0).validate(),
            Err(ShadowError::InvalidResolution(0))
        );
        assert!(matches!(
            ShadowMapConfig::new()
                .projection(60.0, 10.0, 1.0)
                .validate(),
            Err(ShadowError::InvalidProjection { .. })
        ));
    }

    #[test]
    fn test_receiver_wgsl_group() {
        let source = shadow_receiver_wgsl(2);
        assert!(source.contains("@group(2) @binding(0)"));
        assert!(!source.contains("{{group}}"));
        assert!(source.contains("fn shadow_visibility"));
    }
}
