//! Linear velocity component.

use engine_component::Component;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::transform::Transform2D;

/// Units per second.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity2D {
    pub linear: Vec2,
}

impl Velocity2D {
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            linear: Vec2::new(x, y),
        }
    }

    /// Move `transform` by this velocity over `dt` seconds.
    pub fn integrate(&self, transform: &mut Transform2D, dt: f32) {
        transform.position += self.linear * dt;
    }

    /// Limit the speed to `max`, keeping the direction.
    pub fn clamp_speed(&mut self, max: f32) {
        self.linear = self.linear.clamp_length_max(max);
    }
}

impl Component for Velocity2D {
    fn type_name() -> &'static str {
        "Velocity2D"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrate() {
        let v = Velocity2D::new(2.0, -4.0);
        let mut t = Transform2D::IDENTITY;
        v.integrate(&mut t, 0.5);
        assert_eq!(t.position, Vec2::new(1.0, -2.0));
    }

    #[test]
    fn test_clamp_speed_keeps_direction() {
        let mut v = Velocity2D::new(30.0, 40.0);
        v.clamp_speed(5.0);
        assert!((v.linear.length() - 5.0).abs() < 1e-5);
        assert!((v.linear.normalize() - Vec2::new(0.6, 0.8)).length() < 1e-5);
    }
}
