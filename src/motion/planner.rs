//! Constant-acceleration planner: turns a polyline into a `Plan`.

use super::block::{Block, PlannerError};
use super::pen_motion::PenMotion;
use super::plan::{Motion, Plan};
use super::segment::{assign_corner_velocities, build_segments, dedup_points, Segment};
use super::xy_motion::XYMotion;
use crate::device::{AccelerationProfile, ToolingProfile};
use crate::vec2::Vec2;

/// Per-polyline constant-acceleration trajectory, built by a combined
/// forward/backward sweep over corner-limited segment velocities. `points`
/// are already in device step-space (the caller converts mm -> steps
/// before calling).
pub fn plan_polyline(points: &[Vec2], profile: &AccelerationProfile) -> Result<XYMotion, PlannerError> {
    let deduped = dedup_points(points);

    if deduped.len() <= 1 {
        let p = deduped.first().copied().unwrap_or(Vec2::ZERO);
        let block = Block::new(0.0, 0.0, 0.0, p, p)?;
        return XYMotion::new(vec![block]);
    }

    let mut segments = build_segments(&deduped);
    assign_corner_velocities(&mut segments, profile.acceleration, profile.max_velocity, profile.cornering_factor);

    let blocks = sweep(&mut segments, profile.acceleration, profile.max_velocity)?;
    XYMotion::new(blocks)
}

/// A forward index that occasionally backs up one segment when a junction
/// turns out to have been entered too fast for the segment ahead to shed
/// speed in time.
fn sweep(segments: &mut [Segment], accel: f64, v_max: f64) -> Result<Vec<Block>, PlannerError> {
    // segments.len() - 1 real segments get processed; the last entry is the
    // zero-length terminal used only as the final vOut reference.
    let real_count = segments.len() - 1;
    let mut blocks: Vec<Option<Vec<Block>>> = vec![None; real_count];
    let mut i: usize = 0;

    while i < real_count {
        let d = segments[i].distance();
        let v_in = segments[i].entry_velocity;
        let v_out = segments[i + 1].max_entry_velocity.min(v_max);

        let v_peak_sq = accel * d + (v_in * v_in + v_out * v_out) / 2.0;
        let v_peak = v_peak_sq.max(0.0).sqrt();
        let s1 = (v_peak * v_peak - v_in * v_in) / (2.0 * accel);
        let s2 = d - s1;

        if s1 < -1e-9 {
            // Entered too fast: the deceleration to v_out would have had to
            // start before this segment began. Cap this segment's own entry
            // ceiling and re-derive it by backing up one segment.
            let capped = (v_out * v_out + 2.0 * accel * d).max(0.0).sqrt();
            segments[i].max_entry_velocity = capped;
            blocks[i] = None;
            if i == 0 {
                // Nothing to back up into; clamp entry_velocity directly —
                // only reachable if the caller requested an entry speed
                // above what segment 0 can shed before its own end.
                segments[0].entry_velocity = segments[0].entry_velocity.min(capped);
                continue;
            }
            i -= 1;
            continue;
        } else if s2 <= 0.0 {
            // Acceleration-only: the segment is too short to reach v_out.
            let v_f = (v_in * v_in + 2.0 * accel * d).max(0.0).sqrt();
            let dur = if accel.abs() > 1e-12 { (v_f - v_in) / accel } else if d > 0.0 { d / v_in.max(1e-9) } else { 0.0 };
            let block = Block::new(accel, dur.max(0.0), v_in, segments[i].p1, segments[i].p2)?;
            blocks[i] = Some(vec![block]);
            segments[i + 1].entry_velocity = v_f;
        } else if v_peak > v_max + 1e-9 {
            // Trapezoid: accel to v_max, cruise, decel to v_out.
            let s_accel = (v_max * v_max - v_in * v_in) / (2.0 * accel);
            let s_decel = (v_max * v_max - v_out * v_out) / (2.0 * accel);
            let s_cruise = (d - s_accel - s_decel).max(0.0);

            let p_a = segments[i].p1.lerp(segments[i].p2, (s_accel / d).clamp(0.0, 1.0));
            let p_b = segments[i].p1.lerp(segments[i].p2, ((s_accel + s_cruise) / d).clamp(0.0, 1.0));

            let accel_block = Block::new(accel, ((v_max - v_in) / accel).max(0.0), v_in, segments[i].p1, p_a)?;
            let cruise_block = Block::new(0.0, if v_max > 1e-9 { s_cruise / v_max } else { 0.0 }, v_max, p_a, p_b)?;
            let decel_block = Block::new(-accel, ((v_max - v_out) / accel).max(0.0), v_max, p_b, segments[i].p2)?;

            blocks[i] = Some(vec![accel_block, cruise_block, decel_block]);
            segments[i + 1].entry_velocity = v_out;
        } else {
            // Triangle: accel to v_peak, decel to v_out.
            let p_mid = segments[i].p1.lerp(segments[i].p2, (s1 / d).clamp(0.0, 1.0));
            let accel_block = Block::new(accel, ((v_peak - v_in) / accel).max(0.0), v_in, segments[i].p1, p_mid)?;
            let decel_block = Block::new(-accel, ((v_peak - v_out) / accel).max(0.0), v_peak, p_mid, segments[i].p2)?;
            blocks[i] = Some(vec![accel_block, decel_block]);
            segments[i + 1].entry_velocity = v_out;
        }
        i += 1;
    }

    let mut out = Vec::new();
    for b in blocks {
        out.extend(b.unwrap_or_default());
    }
    Ok(out)
}

/// Assemble the full sandwich plan: `travel -> pen-down -> draw -> pen-up`
/// per polyline, bracketed by a travel from `pen_home` to the first point
/// and a final travel back to `pen_home`.
pub fn plan(paths: &[Vec<Vec2>], profile: &ToolingProfile, pen_home: Vec2) -> Result<Plan, PlannerError> {
    let mut motions = Vec::new();
    let mut cursor = pen_home;

    if paths.is_empty() {
        let home_block = Block::new(0.0, 0.0, 0.0, pen_home, pen_home)?;
        motions.push(Motion::Xy(XYMotion::new(vec![home_block])?));
        return Ok(Plan::new(motions));
    }

    for path in paths {
        let deduped_first = dedup_points(path);
        let first = deduped_first.first().copied().unwrap_or(cursor);

        let travel = plan_polyline(&[cursor, first], &profile.pen_up_profile)?;
        let travel_p2 = travel.p2();
        motions.push(Motion::Xy(travel));

        motions.push(Motion::Pen(PenMotion::new(
            profile.pen_up_pos,
            profile.pen_down_pos,
            profile.pen_drop_duration,
        )));

        let draw = plan_polyline(path, &profile.pen_down_profile)?;
        let draw_p2 = draw.p2();
        motions.push(Motion::Xy(draw));

        motions.push(Motion::Pen(PenMotion::new(
            profile.pen_down_pos,
            profile.pen_up_pos,
            profile.pen_lift_duration,
        )));

        cursor = draw_p2;
        let _ = travel_p2;
    }

    let home_travel = plan_polyline(&[cursor, pen_home], &profile.pen_up_profile)?;
    motions.push(Motion::Xy(home_travel));

    Ok(Plan::new(motions))
}
