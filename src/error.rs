//! Errors reported by the shadow subsystem.

use thiserror::Error;

/// Recoverable shadow-map failures.
///
/// All of these leave the light without shadows (fully lit) rather than
/// aborting the frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShadowError {
    /// A shadow map needs at least one texel.
    #[error("invalid shadow map resolution {0}")]
    InvalidResolution(u32),

    /// Near/far planes or field of view out of range.
    #[error("invalid light projection: fov {fov}\u{b0}, near {near}, far {far}")]
    InvalidProjection { fov: f32, near: f32, far: f32 },

    /// The device cannot allocate a texture this large.
    #[error("shadow map resolution {requested} exceeds device limit {max}")]
    ResourceExhausted { requested: u32, max: u32 },

    /// An allocated attachment does not match what the passes render into.
    #[error("shadow target {target} is incomplete: {reason}")]
    IncompleteTarget {
        target: &'static str,
        reason: String,
    },

    /// The camera view matrix has no inverse.
    #[error("camera view matrix is not invertible")]
    DegenerateCameraView,
}
