//! Pure command framing and encoding for the EBB ASCII serial protocol.
//!
//! Everything here is side-effect free: parsing a reply line, building a
//! command string, and running the sub-step accumulator are all plain
//! functions over values, kept separate from the transacting driver in
//! `super::driver` so they can be exercised without a serial port.

use crate::motion::{Block, PenMotion};

use super::error::EbbError;

/// Firmware version as reported by the `V` query, parsed from the last
/// whitespace-separated token of the reply (e.g. `"...Firmware Version
/// 2.7.0"` yields `2.7.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FirmwareVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Low-level accelerated move (`LM`) support, added in 2.5.3.
    pub fn supports_lm(self) -> bool {
        self >= FirmwareVersion::new(2, 5, 3)
    }

    /// Servo power-off timeout (`SR`) support, added in 2.6.0.
    pub fn supports_sr(self) -> bool {
        self >= FirmwareVersion::new(2, 6, 0)
    }

    pub fn parse(reply: &str) -> Result<Self, EbbError> {
        let token = reply
            .split_whitespace()
            .last()
            .ok_or_else(|| EbbError::Malformed(reply.to_string()))?;
        let mut parts = token.split('.');
        let mut next = || -> Result<u32, EbbError> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| EbbError::Malformed(reply.to_string()))
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        Ok(FirmwareVersion::new(major, minor, patch))
    }
}

/// `stepMultiplier = 2^(5-m)` for microstepping mode `m` in `[1, 5]`.
pub fn step_multiplier(mode: u8) -> Result<u32, EbbError> {
    if !(1..=5).contains(&mode) {
        return Err(EbbError::Malformed(format!("invalid microstepping mode {mode}")));
    }
    Ok(1u32 << (5 - mode))
}

/// Carries the fractional remainder of a device's ideal continuous
/// displacement across successive integer-quantised move commands, so no
/// microstep is ever lost to rounding. `error.{x,y}` always stays within
/// `[0, 1)` by construction: a reader does not need to re-derive the bound,
/// just trust that each step is a floor of an accumulating float.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubStepAccumulator {
    error_x: f64,
    error_y: f64,
}

impl SubStepAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self) -> (f64, f64) {
        (self.error_x, self.error_y)
    }

    /// Consume an ideal displacement `(dx, dy)` scaled by `mult`, returning
    /// the integer step counts to emit, or `None` if both axes round to
    /// zero (the move would be a no-op on the wire).
    pub fn accumulate(&mut self, dx: f64, dy: f64, mult: f64) -> Option<(i64, i64)> {
        let fx = dx * mult + self.error_x;
        let fy = dy * mult + self.error_y;
        let steps_x = fx.floor();
        let steps_y = fy.floor();
        self.error_x = fx - steps_x;
        self.error_y = fy - steps_y;
        if steps_x == 0.0 && steps_y == 0.0 {
            None
        } else {
            Some((steps_x as i64, steps_y as i64))
        }
    }
}

/// `LM,initRate1,steps1,dR1,initRate2,steps2,dR2` — a low-level accelerated
/// move on the EBB's two CoreXY motor axes (axis1 = X+Y, axis2 = X-Y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmCommand {
    pub init_rate1: i64,
    pub steps1: i64,
    pub delta_r1: i64,
    pub init_rate2: i64,
    pub steps2: i64,
    pub delta_r2: i64,
}

impl LmCommand {
    pub fn to_wire(self) -> String {
        format!(
            "LM,{},{},{},{},{},{}",
            self.init_rate1, self.steps1, self.delta_r1, self.init_rate2, self.steps2, self.delta_r2
        )
    }
}

/// The EBB's 25 kHz fixed-point ISR scale: converts a step rate in full
/// steps/sec to the 32-bit rate register encoding.
const RATE_SCALE: f64 = 2147483648.0 / 25000.0;

fn encode_axis(steps: i64, rate_initial: f64, rate_final: f64) -> (i64, i64) {
    if steps == 0 {
        return (0, 0);
    }
    let init_enc = (rate_initial * RATE_SCALE).round();
    let final_enc = (rate_final * RATE_SCALE).round();
    let rate_sum = rate_initial + rate_final;
    let move_time = if rate_sum.abs() > 1e-9 {
        2.0 * (steps as f64).abs() / rate_sum
    } else {
        0.0
    };
    let delta_r = if move_time.abs() > 1e-9 {
        ((final_enc - init_enc) / (move_time * 25000.0)).round()
    } else {
        0.0
    };
    (init_enc as i64, delta_r as i64)
}

/// Build the `LM` command for one planner `Block`, running its ideal XY
/// displacement through `accumulator` to get integer CoreXY step counts.
/// Returns `None` if the resulting move is a no-op (both axes rounded to
/// zero steps) — the caller should skip emission entirely in that case.
pub fn lm_command_for_block(block: &Block, mult: f64, accumulator: &mut SubStepAccumulator) -> Option<LmCommand> {
    let dx = block.p2.x - block.p1.x;
    let dy = block.p2.y - block.p1.y;
    let (steps_x, steps_y) = accumulator.accumulate(dx, dy, mult)?;
    let steps1 = steps_x + steps_y;
    let steps2 = steps_x - steps_y;

    let distance = block.distance();
    let (ux, uy) = if distance > 1e-9 { (dx / distance, dy / distance) } else { (0.0, 0.0) };
    // Step rates, not mm/step rates: scale by `mult` to match the step
    // counts `steps1`/`steps2` already carry, or `move_time` below mixes a
    // mult-scaled numerator with an unscaled denominator.
    let v_initial = block.v_initial * mult;
    let v_final = block.v_final() * mult;
    let (vx_i, vy_i) = (v_initial * ux, v_initial * uy);
    let (vx_f, vy_f) = (v_final * ux, v_final * uy);

    let r1_i = (vx_i + vy_i).abs();
    let r2_i = (vx_i - vy_i).abs();
    let r1_f = (vx_f + vy_f).abs();
    let r2_f = (vx_f - vy_f).abs();

    let (init_rate1, delta_r1) = encode_axis(steps1, r1_i, r1_f);
    let (init_rate2, delta_r2) = encode_axis(steps2, r2_i, r2_f);

    Some(LmCommand {
        init_rate1,
        steps1,
        delta_r1,
        init_rate2,
        steps2,
        delta_r2,
    })
}

/// `XM,durMs,x,y` — a high-level constant-velocity move over a fixed
/// duration; the EBB performs the CoreXY split internally, so unlike `LM`
/// the host just sends plain per-axis step counts.
pub fn xm_command(duration_ms: i64, dx: f64, dy: f64, mult: f64, accumulator: &mut SubStepAccumulator) -> Option<String> {
    let (steps_x, steps_y) = accumulator.accumulate(dx, dy, mult)?;
    Some(format!("XM,{duration_ms},{steps_x},{steps_y}"))
}

/// `S2,finalPos,pin,rate,delayMs` — move the RC pen servo. `rate` is in
/// servo counts per 24ms tick; `delayMs` doubles as the move's own
/// duration, so the next command is accepted only once the servo has had
/// time to arrive.
pub fn pen_command(pen: &PenMotion, pin: u8) -> String {
    let duration_ms = (pen.duration * 1000.0).round().max(0.0) as i64;
    let delta = (pen.final_pos - pen.initial_pos).unsigned_abs() as f64;
    let rate = if duration_ms > 0 { (delta * 24.0 / duration_ms as f64).round() as i64 } else { 0 };
    format!("S2,{},{},{},{}", pen.final_pos, pin, rate, duration_ms)
}

/// `S2,...` for a client-driven `setPenHeight` request: the rate is given
/// directly by the caller (servo counts per 24ms tick) rather than derived
/// from a planned duration, and the delay is `0` since nothing downstream
/// is waiting on the servo to finish settling.
pub fn pen_command_at_rate(final_pos: i32, pin: u8, rate: i32) -> String {
    format!("S2,{final_pos},{pin},{rate},0")
}

/// `EM,m,m` — enable motors at microstepping mode `m`.
pub fn enable_motors_command(mode: u8) -> String {
    format!("EM,{mode},{mode}")
}

/// `QM` reply: `global,cmd,m1,m2,fifo` motion status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStatus {
    pub global: u32,
    pub command: u32,
    pub motor1: u32,
    pub motor2: u32,
    pub fifo: u32,
}

impl MotionStatus {
    pub fn is_idle(&self) -> bool {
        self.command == 0 && self.fifo == 0
    }

    pub fn parse(reply: &str) -> Result<Self, EbbError> {
        let fields: Vec<&str> = reply.trim().split(',').collect();
        if fields.len() != 5 {
            return Err(EbbError::Malformed(reply.to_string()));
        }
        let parse_field = |s: &str| s.parse::<u32>().map_err(|_| EbbError::Malformed(reply.to_string()));
        Ok(MotionStatus {
            global: parse_field(fields[0])?,
            command: parse_field(fields[1])?,
            motor1: parse_field(fields[2])?,
            motor2: parse_field(fields[3])?,
            fifo: parse_field(fields[4])?,
        })
    }
}
