//! Light frustum parameters

use crate::error::ShadowError;
use crate::renderer::viewer::Projection;
use glam::Mat4;

/// Perspective frustum of a shadow-casting light.
///
/// The shadow map is square, so the aspect ratio is always 1.0 regardless
/// of the output the scene is finally drawn to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightProjection {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl LightProjection {
    /// Create a projection, rejecting `near <= 0`, `far <= near` and fields
    /// of view outside (0, 180) degrees.
    pub fn new(fov_degrees: f32, near: f32, far: f32) -> Result<Self, ShadowError> {
        let projection = Self {
            fov_degrees,
            near,
            far,
        };
        if projection.perspective().is_valid() {
            Ok(projection)
        } else {
            Err(ShadowError::InvalidProjection {
                fov: fov_degrees,
                near,
                far,
            })
        }
    }

    fn perspective(&self) -> Projection {
        Projection::perspective(self.fov_degrees, 1.0, self.near, self.far)
    }

    /// Light-view to clip matrix.
    pub fn matrix(&self) -> Mat4 {
        self.perspective().matrix()
    }

    /// Scale taking distance from the light into [0, 1] over the frustum depth.
    pub fn linear_depth_scalar(&self) -> f32 {
        1.0 / (self.far - self.near)
    }
}

impl Default for LightProjection {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            near: 0.1,
            far: 200.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_rejects_bad_planes() {
        assert!(LightProjection::new(60.0, 0.1, 200.0).is_ok());
        assert_eq!(
            LightProjection::new(60.0, 5.0, 1.0),
            Err(ShadowError::InvalidProjection {
                fov: 60.0,
                near: 5.0,
                far: 1.0
            })
        );
        assert!(LightProjection::new(60.0, -1.0, 10.0).is_err());
        assert!(LightProjection::new(180.0, 0.1, 10.0).is_err());
        assert!(LightProjection::new(0.0, 0.1, 10.0).is_err());
    }

    #[test]
    fn test_linear_depth_scalar() {
        let projection = LightProjection::new(60.0, 0.1, 200.0).unwrap();
        let expected = 1.0 / 199.9;
        assert!((projection.linear_depth_scalar() - expected).abs() < 1e-7);
    }

    #[test]
    fn test_square_aspect() {
        let projection = LightProjection::new(90.0, 1.0, 10.0).unwrap();
        let m = projection.matrix();
        // With a 90 degree fov and aspect 1, x and y scale identically.
        assert!((m.x_axis.x - m.y_axis.y).abs() < 1e-6);
        assert!((m.y_axis.y - 1.0).abs() < 1e-6);

        let near = m * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = m * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-6);
        assert!((far.z / far.w - 1.0).abs() < 1e-6);
    }
}
