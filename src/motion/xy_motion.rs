//! `XYMotion`: an ordered, non-empty sequence of `Block`s forming one
//! continuous constant-acceleration move.

use super::block::{Block, PlannerError, VELOCITY_EPSILON};
use crate::vec2::Vec2;
use serde::{Deserialize, Serialize};

/// A sample of an `XYMotion` at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionInstant {
    pub t: f64,
    pub p: Vec2,
    /// Distance travelled along the motion since its start.
    pub s: f64,
    pub v: f64,
    pub a: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XYMotion {
    blocks: Vec<Block>,
    /// `prefix_duration[i]` = total duration of `blocks[..i]`.
    #[serde(skip)]
    prefix_duration: Vec<f64>,
    /// `prefix_distance[i]` = total distance of `blocks[..i]`.
    #[serde(skip)]
    prefix_distance: Vec<f64>,
}

/// Wire-format shadow: only `blocks` round-trips, the prefix-sum caches are
/// rebuilt on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct XYMotionWire {
    blocks: Vec<Block>,
}

impl<'de> Deserialize<'de> for XYMotion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = XYMotionWire::deserialize(deserializer)?;
        XYMotion::new(wire.blocks).map_err(serde::de::Error::custom)
    }
}

impl XYMotion {
    /// Build an `XYMotion` from a non-empty, contiguous, velocity-continuous
    /// sequence of blocks. Rejects a) empty input, b) position
    /// discontinuities (`blocks[i].p2 != blocks[i+1].p1`), and c) velocity
    /// discontinuities beyond `VELOCITY_EPSILON`.
    pub fn new(blocks: Vec<Block>) -> Result<Self, PlannerError> {
        if blocks.is_empty() {
            return Err(PlannerError::EmptyMotion);
        }
        for w in blocks.windows(2) {
            let (a, b) = (&w[0], &w[1]);
            let gap = a.p2.distance(b.p1);
            if gap > 1e-6 {
                return Err(PlannerError::PositionDiscontinuity(gap));
            }
            let dv = a.v_final() - b.v_initial;
            if dv.abs() > 1e-3 {
                return Err(PlannerError::VelocityDiscontinuity(dv));
            }
        }
        Ok(Self::build(blocks))
    }

    fn build(blocks: Vec<Block>) -> Self {
        let mut prefix_duration = Vec::with_capacity(blocks.len() + 1);
        let mut prefix_distance = Vec::with_capacity(blocks.len() + 1);
        prefix_duration.push(0.0);
        prefix_distance.push(0.0);
        for b in &blocks {
            prefix_duration.push(prefix_duration.last().unwrap() + b.duration);
            prefix_distance.push(prefix_distance.last().unwrap() + b.distance());
        }
        Self {
            blocks,
            prefix_duration,
            prefix_distance,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn p1(&self) -> Vec2 {
        self.blocks[0].p1
    }

    pub fn p2(&self) -> Vec2 {
        self.blocks[self.blocks.len() - 1].p2
    }

    pub fn duration(&self) -> f64 {
        *self.prefix_duration.last().unwrap()
    }

    pub fn distance(&self) -> f64 {
        *self.prefix_distance.last().unwrap()
    }

    /// Locate the block covering time `t` via binary search over the
    /// duration prefix sums: O(log n) instead of a linear scan.
    fn block_index_at(&self, t: f64) -> usize {
        // prefix_duration[0..=n] is non-decreasing; find the last index i
        // such that prefix_duration[i] <= t, clamped to a valid block.
        let mut lo = 0usize;
        let mut hi = self.blocks.len(); // search over block indices 0..n
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.prefix_duration[mid + 1] < t {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo.min(self.blocks.len() - 1)
    }

    /// Time-parameterised sample at absolute motion time `t` (clamped to
    /// `[0, duration]`).
    pub fn instant(&self, t: f64) -> MotionInstant {
        let t = t.clamp(0.0, self.duration());
        let idx = self.block_index_at(t);
        let block = &self.blocks[idx];
        let local_t = t - self.prefix_duration[idx];
        let (p, v, a) = block.instant(local_t);
        let local_s = (block.v_initial * local_t + 0.5 * block.accel * local_t * local_t).max(0.0);
        MotionInstant {
            t,
            p,
            s: self.prefix_distance[idx] + local_s,
            v,
            a,
        }
    }

    /// Start and end velocity are both within `VELOCITY_EPSILON` of zero.
    pub fn starts_and_ends_at_rest(&self) -> bool {
        self.blocks[0].v_initial.abs() < VELOCITY_EPSILON
            && self.blocks[self.blocks.len() - 1].v_final().abs() < VELOCITY_EPSILON
    }
}
