//! Camera-eye to shadow texture space

use crate::error::ShadowError;
use glam::Mat4;

/// Remaps light clip space to shadow texture space.
///
/// x and y go from [-1, 1] to [0, 1] with v pointing down, matching wgpu
/// texture coordinates. Clip z is already in [0, 1] and passes through.
pub const BIAS: Mat4 = Mat4::from_cols_array(&[
    0.5, 0.0, 0.0, 0.0, //
    0.0, -0.5, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.5, 0.5, 0.0, 1.0,
]);

const MIN_DETERMINANT: f32 = 1.0e-12;

/// Matrix taking a camera eye-space position straight to shadow texture
/// coordinates (divide xy by w before sampling).
///
/// Pure: the result depends only on the three inputs.
pub fn shadow_transform(
    camera_view: Mat4,
    light_view: Mat4,
    light_projection: Mat4,
) -> Result<Mat4, ShadowError> {
    let determinant = camera_view.determinant();
    if !camera_view.is_finite() || !determinant.is_finite() || determinant.abs() < MIN_DETERMINANT {
        return Err(ShadowError::DegenerateCameraView);
    }

    Ok(BIAS * light_projection * light_view * camera_view.inverse())
}
