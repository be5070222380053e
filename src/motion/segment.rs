//! Segment graph construction and GRBL-style cornering velocity.

use crate::vec2::{Vec2, EPSILON};

/// One leg of a deduped polyline, carrying its own corner-velocity state.
/// The terminal entry (appended after the last real point) has zero length
/// and an undefined direction; it exists purely to force the path to
/// decelerate to rest by the end of the last real segment.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub p1: Vec2,
    pub p2: Vec2,
    pub dir: Vec2,
    /// Corner-limited entry velocity ceiling, assigned once up front.
    pub max_entry_velocity: f64,
    /// Achievable entry velocity, propagated by the forward/backward sweep.
    pub entry_velocity: f64,
}

impl Segment {
    pub fn distance(&self) -> f64 {
        self.p1.distance(self.p2)
    }

    fn is_terminal(&self) -> bool {
        self.dir == Vec2::ZERO
    }
}

/// Drop consecutive points closer than `EPSILON`, preserving order.
pub fn dedup_points(points: &[Vec2]) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map(|&last| last.distance(p) > EPSILON).unwrap_or(true) {
            out.push(p);
        }
    }
    out
}

/// Build the segment graph for a deduped polyline: `N-1` real segments plus
/// one zero-length terminal segment at the final point.
pub fn build_segments(points: &[Vec2]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(points.len());
    for w in points.windows(2) {
        let (p1, p2) = (w[0], w[1]);
        segments.push(Segment {
            p1,
            p2,
            dir: p1.direction_to(p2),
            max_entry_velocity: 0.0,
            entry_velocity: 0.0,
        });
    }
    let last = *points.last().expect("non-empty path");
    segments.push(Segment {
        p1: last,
        p2: last,
        dir: Vec2::ZERO,
        max_entry_velocity: 0.0,
        entry_velocity: 0.0,
    });
    segments
}

/// Velocity limit imposed by the geometric cornering tolerance at the
/// junction between two consecutive unit directions.
///
/// `dot = dir_i . dir_next`: `+1` means the path continues straight (no
/// limit — the inscribed-arc radius is infinite), `-1` means the path
/// reverses on itself (the inscribed arc degenerates the same way; treated
/// as unlimited here too, matching the classical GRBL heuristic's handling
/// of both colinear extremes). Any direction that is undefined — the
/// zero-length terminal segment — short-circuits to `0.0`, forcing the
/// path to come to rest before it.
pub fn corner_velocity(dir_i: Vec2, dir_next: Vec2, acceleration: f64, max_velocity: f64, cornering_factor: f64) -> f64 {
    if dir_i == Vec2::ZERO || dir_next == Vec2::ZERO {
        return 0.0;
    }
    let dot = dir_i.dot(dir_next).clamp(-1.0, 1.0);
    if (dot - 1.0).abs() < 1e-9 {
        return max_velocity;
    }
    if (dot + 1.0).abs() < 1e-9 {
        return max_velocity;
    }
    let c = -dot;
    let s = ((1.0 - c) / 2.0).max(0.0).sqrt();
    if (1.0 - s).abs() < 1e-12 {
        return max_velocity;
    }
    (acceleration * cornering_factor * s / (1.0 - s)).sqrt().min(max_velocity)
}

/// Assign `max_entry_velocity` at every interior joint (including the
/// joint into the terminal segment).
pub fn assign_corner_velocities(segments: &mut [Segment], acceleration: f64, max_velocity: f64, cornering_factor: f64) {
    for i in 0..segments.len().saturating_sub(1) {
        let (dir_i, dir_next) = (segments[i].dir, segments[i + 1].dir);
        segments[i + 1].max_entry_velocity = if segments[i + 1].is_terminal() {
            0.0
        } else {
            corner_velocity(dir_i, dir_next, acceleration, max_velocity, cornering_factor)
        };
    }
}
