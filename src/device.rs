//! Device kinematics and tooling profile.
//!
//! `Device` and `ToolingProfile` are immutable value types passed explicitly
//! to the planner and driver — no process-wide singleton, matching the
//! convention of threading configuration through constructors rather than
//! reaching for global state.

use serde::{Deserialize, Serialize};

/// Hardware variant: the two EBB presets, distinguished by which pin drives
/// the pen servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hardware {
    V3,
    Brushless,
}

impl Hardware {
    /// RC servo output pin on the EBB: pin 4 for v3, pin 5 for brushless.
    pub fn servo_pin(self) -> u8 {
        match self {
            Hardware::V3 => 4,
            Hardware::Brushless => 5,
        }
    }
}

/// Immutable device kinematics: microsteps per millimetre and servo PWM
/// range. `pen_pct_to_pos` linearly interpolates between the two, with
/// `pct = 0` mapping to the fully raised position (`servo_max`) and `pct =
/// 100` mapping to fully lowered (`servo_min`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub steps_per_mm: u32,
    pub servo_min: i32,
    pub servo_max: i32,
    pub hardware: Hardware,
}

impl Device {
    pub fn new(steps_per_mm: u32, servo_min: i32, servo_max: i32, hardware: Hardware) -> Self {
        assert!(steps_per_mm > 0, "steps_per_mm must be positive");
        Self {
            steps_per_mm,
            servo_min,
            servo_max,
            hardware,
        }
    }

    /// `pct=0 -> servo_max` (pen up), `pct=100 -> servo_min` (pen down),
    /// rounded to the nearest integer servo count.
    pub fn pen_pct_to_pos(&self, pct: f64) -> i32 {
        let pct = pct.clamp(0.0, 100.0);
        let span = (self.servo_min - self.servo_max) as f64;
        (self.servo_max as f64 + span * (pct / 100.0)).round() as i32
    }

    pub fn mm_to_steps(&self, mm: f64) -> f64 {
        mm * self.steps_per_mm as f64
    }
}

/// Acceleration, max velocity, and cornering factor, in step-units — one
/// instance each for pen-up travel and pen-down drawing moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationProfile {
    pub acceleration: f64,
    pub max_velocity: f64,
    pub cornering_factor: f64,
}

/// Full tooling configuration: the two `AccelerationProfile`s plus servo
/// positions/timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolingProfile {
    pub pen_down_profile: AccelerationProfile,
    pub pen_up_profile: AccelerationProfile,
    pub pen_down_pos: i32,
    pub pen_up_pos: i32,
    pub pen_lift_duration: f64,
    pub pen_drop_duration: f64,
}
