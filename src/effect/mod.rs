//! Screen-space effects
//!
//! Provides the full-screen passes the shadow map is filtered and inspected with.

mod blur;
mod debug_blit;
mod fullscreen;

pub use blur::{gaussian_weights, BlurParams, BlurUniform, SeparableBlur, TAPS_PER_SIDE};
pub use debug_blit::{DebugBlit, DEBUG_BLIT_SIZE};
pub use fullscreen::{FullscreenQuad, QUAD_VERTICES};
