//! # engine_math
//!
//! Spatial components for 2D scenes. Re-exports [`glam`] for linear algebra;
//! every type defined here implements
//! [`Component`](engine_component::Component) and serde, so it can be
//! registered for snapshots.

pub mod transform;
pub mod velocity;

pub use glam::{Mat3, Vec2};

pub use transform::Transform2D;
pub use velocity::Velocity2D;
