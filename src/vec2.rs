//! 2D vector math shared by the planner and EBB driver.
//!
//! Coordinates are millimetres at the planner's input boundary and device
//! microsteps once a `Vec2` is folded into a `Block`. Nothing in this module
//! cares which unit it holds; callers convert with `Device::steps_per_mm`
//! before constructing motion primitives.

use serde::{Deserialize, Serialize};

pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn scale(self, k: f64) -> Vec2 {
        Vec2::new(self.x * k, self.y * k)
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        self.sub(other).norm()
    }

    /// Unit direction from `self` to `other`. Returns `Vec2::ZERO` for a
    /// zero-length segment rather than producing NaN — callers that need a
    /// real direction must check for a zero-length segment first.
    pub fn direction_to(self, other: Vec2) -> Vec2 {
        let d = other.sub(self);
        let n = d.norm();
        if n < EPSILON {
            Vec2::ZERO
        } else {
            d.scale(1.0 / n)
        }
    }

    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self.add(other.sub(self).scale(t))
    }

    /// Rotate counterclockwise by `angle_rad` about the origin.
    pub fn rotate(self, angle_rad: f64) -> Vec2 {
        let (sin, cos) = angle_rad.sin_cos();
        Vec2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}
