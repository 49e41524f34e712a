//! Caller-visible render state with scoped save/restore
//!
//! wgpu has no global matrix stack or bound-texture state, but the frame still
//! has one: which matrices the next pass renders with, its viewport, cull mode
//! and which texture sits in which bind group slot. [`StateStack`] keeps that
//! state in one place and [`StateScope`] restores it when dropped, so a pass
//! that temporarily switches to the light's point of view leaves nothing
//! behind for the main pass.

use crate::core::render_states::CullState;
use crate::renderer::viewer::Viewport;
use glam::Mat4;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of texture units (bind group slots) tracked per frame.
pub const MAX_TEXTURE_UNITS: u32 = 4;

/// Identity of a texture that can occupy a texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    /// Allocate a fresh process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Framebuffer that draws are currently directed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framebuffer {
    /// The caller's output (surface or offscreen view).
    #[default]
    Default,
    /// Shadow Target A (depth + linear depth colour).
    ShadowDepth,
}

/// Which texture occupies each unit, plus the active unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureUnits {
    active: u32,
    slots: [Option<TextureId>; MAX_TEXTURE_UNITS as usize],
}

impl TextureUnits {
    /// The currently active unit.
    pub fn active(&self) -> u32 {
        self.active
    }

    /// Make `unit` the active unit. Out-of-range units are ignored.
    pub fn set_active(&mut self, unit: u32) {
        if unit < MAX_TEXTURE_UNITS {
            self.active = unit;
        } else {
            tracing::warn!(unit, "texture unit out of range");
        }
    }

    /// Texture bound to `unit`, if any.
    pub fn occupant(&self, unit: u32) -> Option<TextureId> {
        self.slots.get(unit as usize).copied().flatten()
    }

    /// Bind `texture` to the active unit.
    pub fn bind(&mut self, texture: TextureId) {
        self.slots[self.active as usize] = Some(texture);
    }

    /// Detach whatever is bound to the active unit.
    pub fn clear(&mut self) {
        self.slots[self.active as usize] = None;
    }
}

/// Render state observed by every pass in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// View (model-view) matrix.
    pub view: Mat4,
    /// Projection matrix.
    pub projection: Mat4,
    /// Viewport in pixels.
    pub viewport: Viewport,
    /// Face culling.
    pub cull: CullState,
    /// Depth testing enabled.
    pub depth_test: bool,
    /// Framebuffer draws go to.
    pub framebuffer: Framebuffer,
    /// Texture unit bindings.
    pub texture_units: TextureUnits,
}

impl RenderState {
    /// State for a viewport of the given size with identity matrices.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            viewport: Viewport {
                x: 0,
                y: 0,
                width,
                height,
            },
            cull: CullState::Back,
            depth_test: true,
            framebuffer: Framebuffer::Default,
            texture_units: TextureUnits::default(),
        }
    }
}

/// Current render state plus the saved states of enclosing scopes.
#[derive(Debug, Clone)]
pub struct StateStack {
    current: RenderState,
    saved: Vec<RenderState>,
}

impl StateStack {
    /// Create a stack holding `initial` as the current state.
    pub fn new(initial: RenderState) -> Self {
        Self {
            current: initial,
            saved: Vec::new(),
        }
    }

    /// The current state.
    pub fn current(&self) -> &RenderState {
        &self.current
    }

    /// Mutable access to the current state.
    pub fn current_mut(&mut self) -> &mut RenderState {
        &mut self.current
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Save the current state; it is restored when the returned scope drops.
    pub fn scoped(&mut self) -> StateScope<'_> {
        self.saved.push(self.current);
        StateScope { stack: self }
    }
}

/// RAII scope over a [`StateStack`].
///
/// Derefs to the current state so the scope owner can change it freely.
pub struct StateScope<'a> {
    stack: &'a mut StateStack,
}

impl Deref for StateScope<'_> {
    type Target = RenderState;

    fn deref(&self) -> &RenderState {
        &self.stack.current
    }
}

impl DerefMut for StateScope<'_> {
    fn deref_mut(&mut self) -> &mut RenderState {
        &mut self.stack.current
    }
}

impl Drop for StateScope<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.stack.saved.pop() {
            self.stack.current = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_scope_restores_on_drop() {
        let mut stack = StateStack::new(RenderState::new(800, 600));
        let before = *stack.current();

        {
            let mut scope = stack.scoped();
            scope.view = Mat4::from_translation(Vec3::X);
            scope.cull = CullState::Front;
            scope.viewport.width = 1024;
            scope.framebuffer = Framebuffer::ShadowDepth;
        }

        assert_eq!(*stack.current(), before);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_nested_scopes() {
        let mut stack = StateStack::new(RenderState::new(64, 64));
        {
            let mut outer = stack.scoped();
            outer.cull = CullState::None;
            assert_eq!(outer.cull, CullState::None);
        }
        {
            let mut scope = stack.scoped();
            scope.depth_test = false;
        }
        assert!(stack.current().depth_test);
        assert_eq!(stack.current().cull, CullState::Back);
    }

    #[test]
    fn test_scope_restores_on_early_return() {
        fn pass(stack: &mut StateStack, bail: bool) -> Option<()> {
            let mut scope = stack.scoped();
            scope.projection = Mat4::ZERO;
            if bail {
                return None;
            }
            Some(())
        }

        let mut stack = StateStack::new(RenderState::new(32, 32));
        assert!(pass(&mut stack, true).is_none());
        assert_eq!(stack.current().projection, Mat4::IDENTITY);
    }

    #[test]
    fn test_texture_units() {
        let mut units = TextureUnits::default();
        let id = TextureId::next();

        units.set_active(2);
        units.bind(id);
        assert_eq!(units.occupant(2), Some(id));
        assert_eq!(units.occupant(0), None);

        units.clear();
        assert_eq!(units.occupant(2), None);

        units.set_active(MAX_TEXTURE_UNITS);
        assert_eq!(units.active(), 2);
        assert_eq!(units.occupant(MAX_TEXTURE_UNITS + 3), None);
    }

    #[test]
    fn test_texture_ids_unique() {
        assert_ne!(TextureId::next(), TextureId::next());
    }
}
