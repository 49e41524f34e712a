//! Render state configurations
//!
//! Provides convenient structs for configuring render pipeline states.

/// Clear value for shadow colour attachments: 1.0 means "fully lit".
pub const FULLY_LIT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Clear state for render targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearState {
    /// Color to clear to (RGBA), or None to not clear.
    pub color: Option<[f32; 4]>,
    /// Depth value to clear to (0.0-1.0), or None to not clear.
    pub depth: Option<f32>,
}

impl ClearState {
    /// Create a clear state that clears color only.
    pub fn color(color: [f32; 4]) -> Self {
        Self {
            color: Some(color),
            depth: None,
        }
    }

    /// Create a clear state that clears both color and depth.
    pub fn color_and_depth(color: [f32; 4], depth: f32) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
        }
    }

    /// Clear color to the fully-lit sentinel and depth to the far plane.
    pub fn fully_lit() -> Self {
        Self::color_and_depth(FULLY_LIT, 1.0)
    }

    /// Create a clear state that doesn't clear anything.
    pub fn none() -> Self {
        Self {
            color: None,
            depth: None,
        }
    }

    /// Get the wgpu load operation for color.
    pub fn color_load_op(&self) -> wgpu::LoadOp<wgpu::Color> {
        match self.color {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        }
    }

    /// Get the wgpu load operation for depth.
    pub fn depth_load_op(&self) -> wgpu::LoadOp<f32> {
        match self.depth {
            Some(d) => wgpu::LoadOp::Clear(d),
            None => wgpu::LoadOp::Load,
        }
    }
}

impl Default for ClearState {
    fn default() -> Self {
        Self::color_and_depth([0.0, 0.0, 0.0, 1.0], 1.0)
    }
}

/// Depth test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Whether to write to the depth buffer.
    pub write: bool,
    /// Comparison function for depth test.
    pub compare: wgpu::CompareFunction,
}

impl DepthState {
    /// Depth testing enabled with writes.
    pub fn read_write() -> Self {
        Self {
            write: true,
            compare: wgpu::CompareFunction::Less,
        }
    }

    /// Depth testing with writes, keeping fragments at or nearer than the stored depth.
    pub fn less_equal() -> Self {
        Self {
            write: true,
            compare: wgpu::CompareFunction::LessEqual,
        }
    }

    /// Depth testing disabled.
    pub fn disabled() -> Self {
        Self {
            write: false,
            compare: wgpu::CompareFunction::Always,
        }
    }

    /// Whether this state performs any depth test.
    pub fn is_enabled(&self) -> bool {
        self.write || self.compare != wgpu::CompareFunction::Always
    }

    /// Convert to wgpu depth stencil state.
    pub fn to_wgpu(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: self.write,
            depth_compare: self.compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

impl Default for DepthState {
    fn default() -> Self {
        Self::read_write()
    }
}

/// Cull mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullState {
    /// No culling.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    #[default]
    Back,
}

impl CullState {
    /// Convert to wgpu cull mode.
    pub fn to_wgpu(&self) -> Option<wgpu::Face> {
        match self {
            CullState::None => None,
            CullState::Front => Some(wgpu::Face::Front),
            CullState::Back => Some(wgpu::Face::Back),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_lit_clear() {
        let clear = ClearState::fully_lit();
        assert_eq!(clear.color, Some(FULLY_LIT));
        assert_eq!(clear.depth, Some(1.0));
        assert!(matches!(clear.depth_load_op(), wgpu::LoadOp::Clear(d) if d == 1.0));
    }

    #[test]
    fn test_none_clear_loads() {
        let clear = ClearState::none();
        assert!(matches!(clear.color_load_op(), wgpu::LoadOp::Load));
        assert!(matches!(clear.depth_load_op(), wgpu::LoadOp::Load));
    }

    #[test]
    fn test_cull_front() {
        assert_eq!(CullState::Front.to_wgpu(), Some(wgpu::Face::Front));
        assert_eq!(CullState::None.to_wgpu(), None);
    }

    #[test]
    fn test_depth_enabled() {
        assert!(DepthState::less_equal().is_enabled());
        assert!(!DepthState::disabled().is_enabled());
    }
}
