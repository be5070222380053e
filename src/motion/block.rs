//! `Block`: a single constant-acceleration segment.

use crate::vec2::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("block has negative initial velocity: {0}")]
    NegativeInitialVelocity(f64),
    #[error("block final velocity {0} is negative beyond numerical noise")]
    NegativeFinalVelocity(f64),
    #[error("block duration must be non-negative, got {0}")]
    NegativeDuration(f64),
    #[error("an XYMotion needs at least one block")]
    EmptyMotion,
    #[error("position discontinuity between consecutive blocks: gap of {0} steps")]
    PositionDiscontinuity(f64),
    #[error("velocity discontinuity between consecutive blocks: delta of {0} steps/s")]
    VelocityDiscontinuity(f64),
}

/// Numerical slack used throughout the planner and block invariants.
pub const VELOCITY_EPSILON: f64 = 1e-6;

/// A single constant-acceleration segment between two points, in device
/// step-space. `vFinal` and `distance` are derived, not stored, so a Block
/// can never become internally inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub accel: f64,
    pub duration: f64,
    pub v_initial: f64,
    pub p1: Vec2,
    pub p2: Vec2,
}

/// Wire-format shadow: deserializing a `Block` re-validates the same
/// invariants the constructor enforces, so a hand-crafted or corrupted
/// wire plan cannot smuggle in a negative velocity or duration.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockWire {
    accel: f64,
    duration: f64,
    v_initial: f64,
    p1: Vec2,
    p2: Vec2,
}

impl<'de> Deserialize<'de> for Block {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = BlockWire::deserialize(deserializer)?;
        Block::new(wire.accel, wire.duration, wire.v_initial, wire.p1, wire.p2).map_err(serde::de::Error::custom)
    }
}

impl Block {
    /// Construct a `Block`, rejecting invariant violations: `v_initial`
    /// must be non-negative, `duration` must be non-negative, and the
    /// derived `v_final` must not be negative beyond `VELOCITY_EPSILON`.
    pub fn new(accel: f64, duration: f64, v_initial: f64, p1: Vec2, p2: Vec2) -> Result<Self, PlannerError> {
        if v_initial < -VELOCITY_EPSILON {
            return Err(PlannerError::NegativeInitialVelocity(v_initial));
        }
        if duration < -VELOCITY_EPSILON {
            return Err(PlannerError::NegativeDuration(duration));
        }
        let duration = duration.max(0.0);
        let v_initial = v_initial.max(0.0);
        let v_final_raw = v_initial + accel * duration;
        if v_final_raw < -VELOCITY_EPSILON {
            return Err(PlannerError::NegativeFinalVelocity(v_final_raw));
        }
        Ok(Self {
            accel,
            duration,
            v_initial,
            p1,
            p2,
        })
    }

    pub fn distance(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    pub fn v_final(&self) -> f64 {
        (self.v_initial + self.accel * self.duration).max(0.0)
    }

    /// Position, distance-along-block, velocity and acceleration at local
    /// time `t` (clamped to `[0, duration]`).
    pub fn instant(&self, t: f64) -> (Vec2, f64, f64) {
        let t = t.clamp(0.0, self.duration);
        let s = (self.v_initial * t + 0.5 * self.accel * t * t).max(0.0);
        let v = (self.v_initial + self.accel * t).max(0.0);
        let d = self.distance();
        let p = if d < crate::vec2::EPSILON {
            self.p1
        } else {
            self.p1.lerp(self.p2, (s / d).clamp(0.0, 1.0))
        };
        (p, v, self.accel)
    }
}
