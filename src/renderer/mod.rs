//! High-level rendering abstractions
//!
//! This module provides cameras, lights and mesh geometry.

pub mod geometry;
pub mod light;
pub mod viewer;

pub use geometry::{Aabb, Geometry, Mesh};
pub use light::{Light, LightState, LightType, LightUniforms};
pub use viewer::{Camera, Projection, Viewer, Viewport};
