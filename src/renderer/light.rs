//! Light types
//!
//! Provides the base light state shared by every light source: pose,
//! colours and the spotlight flag.

use glam::{Mat4, Quat, Vec3};

/// Light type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Point,
    Spot,
}

/// Light uniform data for GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniforms {
    /// World-space position (w = 1).
    pub position: [f32; 4],
    /// Look direction (xyz) and spot cutoff cosine (w, -1 for point lights).
    pub direction_cutoff: [f32; 4],
    /// Ambient colour (rgb), a unused.
    pub ambient: [f32; 4],
    /// Diffuse colour (rgb), a unused.
    pub diffuse: [f32; 4],
    /// Specular colour (rgb), a = 1 when enabled, 0 when disabled.
    pub specular_enabled: [f32; 4],
}

/// Trait for light sources.
pub trait Light {
    /// Get the light type.
    fn light_type(&self) -> LightType;

    /// Get the light uniforms for GPU.
    fn uniforms(&self) -> LightUniforms;
}

/// Pose and colour of a light.
///
/// The orientation is a rotation taking the light's local frame (looking
/// down -Z with +Y up) to world space.
#[derive(Debug, Clone, PartialEq)]
pub struct LightState {
    /// World-space position.
    pub position: Vec3,
    /// Orientation of the light's local frame.
    pub orientation: Quat,
    /// Ambient colour (RGB).
    pub ambient: [f32; 3],
    /// Diffuse colour (RGB).
    pub diffuse: [f32; 3],
    /// Specular colour (RGB).
    pub specular: [f32; 3],
    /// Cone light instead of omnidirectional.
    pub spotlight: bool,
    /// Spot cone half-angle in degrees.
    pub spot_cutoff_degrees: f32,
    /// Whether the light contributes at all.
    pub enabled: bool,
}

impl LightState {
    /// Create a white point light at `position` looking down -Z.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            ambient: [0.0, 0.0, 0.0],
            diffuse: [1.0, 1.0, 1.0],
            specular: [1.0, 1.0, 1.0],
            spotlight: false,
            spot_cutoff_degrees: 45.0,
            enabled: true,
        }
    }

    /// Move the light, keeping its orientation.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Turn the light to face `target`. Does nothing if `target` is the
    /// light's own position.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(direction) = (target - self.position).try_normalize() else {
            tracing::debug!(?target, "look_at target coincides with light position");
            return;
        };
        let view = Mat4::look_at_rh(self.position, self.position + direction, up_for(direction));
        self.orientation = Quat::from_mat4(&view.inverse()).normalize();
    }

    /// Place the light on a sphere around `center` and face the centre.
    ///
    /// Longitude rotates about +Y, latitude tilts towards +Y; both in degrees.
    /// At zero longitude and latitude the light sits on +Z.
    pub fn orbit(&mut self, longitude: f32, latitude: f32, radius: f32, center: Vec3) {
        let rotation = Quat::from_rotation_y(longitude.to_radians())
            * Quat::from_rotation_x(-latitude.to_radians());
        self.position = center + rotation * Vec3::new(0.0, 0.0, radius);
        self.look_at(center);
    }

    /// Unit vector the light is facing.
    pub fn look_direction(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// World-to-light view matrix for the current pose.
    pub fn view_matrix(&self) -> Mat4 {
        let direction = self.look_direction();
        Mat4::look_at_rh(self.position, self.position + direction, up_for(direction))
    }

    /// Set the ambient colour.
    pub fn set_ambient(&mut self, color: [f32; 3]) {
        self.ambient = color;
    }

    /// Set the diffuse colour.
    pub fn set_diffuse(&mut self, color: [f32; 3]) {
        self.diffuse = color;
    }

    /// Set the specular colour.
    pub fn set_specular(&mut self, color: [f32; 3]) {
        self.specular = color;
    }

    /// Make this a cone light with the given half-angle in degrees.
    pub fn set_spotlight(&mut self, cutoff_degrees: f32) {
        self.spotlight = true;
        self.spot_cutoff_degrees = cutoff_degrees;
    }

    /// Make this an omnidirectional light.
    pub fn set_point_light(&mut self) {
        self.spotlight = false;
    }
}

impl Default for LightState {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Light for LightState {
    fn light_type(&self) -> LightType {
        if self.spotlight {
            LightType::Spot
        } else {
            LightType::Point
        }
    }

    fn uniforms(&self) -> LightUniforms {
        let p = self.position;
        let d = self.look_direction();
        let cutoff = if self.spotlight {
            self.spot_cutoff_degrees.to_radians().cos()
        } else {
            -1.0
        };
        let [ar, ag, ab] = self.ambient;
        let [dr, dg, db] = self.diffuse;
        let [sr, sg, sb] = self.specular;
        LightUniforms {
            position: [p.x, p.y, p.z, 1.0],
            direction_cutoff: [d.x, d.y, d.z, cutoff],
            ambient: [ar, ag, ab, 0.0],
            diffuse: [dr, dg, db, 0.0],
            specular_enabled: [sr, sg, sb, if self.enabled { 1.0 } else { 0.0 }],
        }
    }
}

/// Up vector for a view along `direction`, avoiding the degenerate case
/// of looking straight up or down.
pub(crate) fn up_for(direction: Vec3) -> Vec3 {
    if direction.normalize_or_zero().dot(Vec3::Y).abs() > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_look_at_direction() {
        let mut light = LightState::new(Vec3::new(0.0, 10.0, 10.0));
        light.look_at(Vec3::ZERO);
        let expected = Vec3::new(0.0, -1.0, -1.0).normalize();
        assert!(approx(light.look_direction(), expected));
    }

    #[test]
    fn test_look_straight_down() {
        let mut light = LightState::new(Vec3::new(0.0, 20.0, 0.0));
        light.look_at(Vec3::ZERO);
        assert!(approx(light.look_direction(), Vec3::NEG_Y));
        assert!(light.view_matrix().is_finite());
    }

    #[test]
    fn test_look_at_self_keeps_orientation() {
        let mut light = LightState::new(Vec3::ONE);
        let before = light.orientation;
        light.look_at(Vec3::ONE);
        assert_eq!(light.orientation, before);
    }

    #[test]
    fn test_orbit_position() {
        let mut light = LightState::default();
        light.orbit(0.0, 0.0, 5.0, Vec3::ZERO);
        assert!(approx(light.position, Vec3::new(0.0, 0.0, 5.0)));

        light.orbit(90.0, 0.0, 5.0, Vec3::ZERO);
        assert!(approx(light.position, Vec3::new(5.0, 0.0, 0.0)));

        light.orbit(0.0, 90.0, 5.0, Vec3::new(1.0, 0.0, 0.0));
        assert!(approx(light.position, Vec3::new(1.0, 5.0, 0.0)));
    }

    #[test]
    fn test_orbit_faces_center() {
        let mut light = LightState::default();
        let center = Vec3::new(2.0, 1.0, -3.0);
        light.orbit(35.0, 40.0, 12.0, center);
        let to_center = (center - light.position).normalize();
        assert!(approx(light.look_direction(), to_center));

        let in_view = light.view_matrix().transform_point3(center);
        assert!(in_view.x.abs() < 1e-3 && in_view.y.abs() < 1e-3);
        assert!((in_view.z + 12.0).abs() < 1e-3);
    }

    #[test]
    fn test_uniforms() {
        let mut light = LightState::new(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(light.light_type(), LightType::Point);
        assert_eq!(light.uniforms().direction_cutoff[3], -1.0);

        light.set_spotlight(60.0);
        assert_eq!(light.light_type(), LightType::Spot);
        let u = light.uniforms();
        assert!((u.direction_cutoff[3] - 0.5).abs() < 1e-5);
        assert_eq!(u.position, [1.0, 2.0, 3.0, 1.0]);

        light.enabled = false;
        assert_eq!(light.uniforms().specular_enabled[3], 0.0);
    }
}
