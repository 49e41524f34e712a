//! Binding the filtered shadow map for the main pass
//!
//! A texture unit here is a bind group index of the main-pass pipeline.
//! [`TextureUnits`] mirrors what occupies each index so that binding and
//! unbinding can restore it exactly.

use super::ShadowCaster;
use crate::core::state::{TextureId, TextureUnits, MAX_TEXTURE_UNITS};

/// Tracks which unit a shadow caster's map is bound to.
///
/// Unit 0 doubles as "nothing bound": binding to unit 0 works, but
/// [`unbind`](ShadowTextureBinding::unbind) then does nothing, leaving the
/// map in unit 0 and the active unit unchanged. Callers that need a clean
/// unbind must use units 1 and up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowTextureBinding {
    bound_unit: u32,
    previous_active: u32,
}

impl ShadowTextureBinding {
    /// The "nothing bound" sentinel.
    pub const UNBOUND: u32 = 0;

    /// Create a binding with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit currently recorded as bound ([`Self::UNBOUND`] if none).
    pub fn bound_unit(&self) -> u32 {
        self.bound_unit
    }

    /// Bind `caster`'s shadow bind group at index `unit` and make it the
    /// active unit.
    ///
    /// Binding over an occupied unit, or binding again without unbinding,
    /// is a caller error.
    pub fn bind(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        units: &mut TextureUnits,
        caster: &dyn ShadowCaster,
        unit: u32,
    ) {
        if self.attach(units, caster.texture_id(), unit) {
            pass.set_bind_group(unit, caster.shadow_bind_group(), &[]);
        }
    }

    /// Detach the map from the unit it was bound to and restore the unit
    /// that was active before [`bind`](Self::bind).
    pub fn unbind(&mut self, pass: &mut wgpu::RenderPass<'_>, units: &mut TextureUnits) {
        if let Some(unit) = self.detach(units) {
            pass.set_bind_group(unit, None::<&wgpu::BindGroup>, &[]);
        }
    }

    fn attach(&mut self, units: &mut TextureUnits, texture: TextureId, unit: u32) -> bool {
        if unit >= MAX_TEXTURE_UNITS {
            tracing::warn!(unit, "cannot bind shadow map, texture unit out of range");
            return false;
        }
        debug_assert_eq!(
            self.bound_unit,
            Self::UNBOUND,
            "shadow map already bound to unit {}",
            self.bound_unit
        );
        debug_assert!(
            units.occupant(unit).is_none(),
            "texture unit {unit} already occupied"
        );

        self.previous_active = units.active();
        units.set_active(unit);
        units.bind(texture);
        self.bound_unit = unit;
        true
    }

    fn detach(&mut self, units: &mut TextureUnits) -> Option<u32> {
        if self.bound_unit == Self::UNBOUND {
            return None;
        }

        let unit = self.bound_unit;
        units.set_active(unit);
        units.clear();
        units.set_active(self.previous_active);
        self.bound_unit = Self::UNBOUND;
        Some(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_context;
    use crate::core::texture::Texture2D;
    use crate::shadow::{ShadowMapConfig, ShadowMapLight};

    #[test]
    fn test_round_trip_restores_units() {
        let texture = TextureId::next();
        for unit in 1..MAX_TEXTURE_UNITS {
            for active in 0..MAX_TEXTURE_UNITS {
                let mut units = TextureUnits::default();
                units.set_active(active);
                let before = units;

                let mut binding = ShadowTextureBinding::new();
                assert!(binding.attach(&mut units, texture, unit));
                assert_eq!(units.occupant(unit), Some(texture));
                assert_eq!(units.active(), unit);

                assert_eq!(binding.detach(&mut units), Some(unit));
                assert_eq!(units, before);
                assert_eq!(binding.bound_unit(), ShadowTextureBinding::UNBOUND);
            }
        }
    }

    #[test]
    fn test_round_trip_keeps_other_units() {
        let other = TextureId::next();
        let mut units = TextureUnits::default();
        units.set_active(3);
        units.bind(other);
        units.set_active(0);
        let before = units;

        let mut binding = ShadowTextureBinding::new();
        binding.attach(&mut units, TextureId::next(), 1);
        binding.detach(&mut units);

        assert_eq!(units, before);
        assert_eq!(units.occupant(3), Some(other));
    }

    #[test]
    fn test_unit_zero_is_sentinel() {
        let texture = TextureId::next();
        let mut units = TextureUnits::default();
        let mut binding = ShadowTextureBinding::new();

        assert!(binding.attach(&mut units, texture, 0));
        assert_eq!(binding.detach(&mut units), None);
        // Still bound: unit 0 cannot be told apart from "nothing bound".
        assert_eq!(units.occupant(0), Some(texture));
    }

    #[test]
    fn test_out_of_range_unit_ignored() {
        let mut units = TextureUnits::default();
        let before = units;
        let mut binding = ShadowTextureBinding::new();

        assert!(!binding.attach(&mut units, TextureId::next(), MAX_TEXTURE_UNITS));
        assert_eq!(units, before);
        assert_eq!(binding.detach(&mut units), None);
    }

    #[test]
    #[should_panic(expected = "already bound")]
    #[cfg(debug_assertions)]
    fn test_double_bind_asserts() {
        let mut units = TextureUnits::default();
        let mut binding = ShadowTextureBinding::new();
        binding.attach(&mut units, TextureId::next(), 1);
        binding.attach(&mut units, TextureId::next(), 2);
    }

    #[test]
    fn test_bind_in_render_pass() {
        let Some(ctx) = test_context() else { return };
        let mut light = ShadowMapLight::new(&ctx).unwrap();
        light
            .initialize(&ctx, ShadowMapConfig::new().resolution(16))
            .unwrap();

        let target = Texture2D::render_target(&ctx, 4, 4, wgpu::TextureFormat::Rgba8Unorm, None);
        let mut units = TextureUnits::default();
        let before = units;
        let mut binding = ShadowTextureBinding::new();

        let mut encoder = ctx.create_encoder(Some("binding test"));
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("binding test"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            binding.bind(&mut pass, &mut units, &light, 1);
            assert_eq!(units.occupant(1), Some(light.texture_id()));
            binding.unbind(&mut pass, &mut units);
        }
        ctx.submit([encoder.finish()]);

        assert_eq!(units, before);
    }
}
