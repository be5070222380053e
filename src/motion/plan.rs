//! `Plan`: the ordered, alternating sequence of XY/pen motions that a
//! [`crate::supervisor::PlotSupervisor`] executes end to end.

use super::pen_motion::PenMotion;
use super::xy_motion::XYMotion;
use serde::{Deserialize, Serialize};

/// `Motion` is a tagged sum of `XYMotion | PenMotion`, matched at the driver
/// boundary rather than modelled as a class hierarchy. The wire
/// representation is untagged: an `XYMotion`
/// serializes as `{"blocks": [...]}`, a `PenMotion` as `{"initialPos":
/// ..., "finalPos": ..., "duration": ...}` — the two shapes never collide,
/// so untagged (de)serialization is unambiguous and round-trips exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Motion {
    Xy(XYMotion),
    Pen(PenMotion),
}

impl Motion {
    pub fn as_xy(&self) -> Option<&XYMotion> {
        match self {
            Motion::Xy(m) => Some(m),
            Motion::Pen(_) => None,
        }
    }

    pub fn as_pen(&self) -> Option<&PenMotion> {
        match self {
            Motion::Pen(m) => Some(m),
            Motion::Xy(_) => None,
        }
    }
}

/// An ordered, immutable sequence of motions built by the planner and
/// consumed without mutation by the EBB driver. A `Plan` with zero input
/// polylines has no motions (the empty plan).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    motions: Vec<Motion>,
}

impl Plan {
    pub fn new(motions: Vec<Motion>) -> Self {
        Self { motions }
    }

    pub fn motions(&self) -> &[Motion] {
        &self.motions
    }

    pub fn len(&self) -> usize {
        self.motions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motions.is_empty()
    }

    /// Substitute new pen-up/pen-down heights while preserving timing — a
    /// pure fold over `PenMotion`s, avoiding a full replan when only the
    /// heights change.
    ///
    /// Every `PenMotion` but the last alternates starting with `up -> down`
    /// (a drop before each draw); the last motion — the final return-to-home
    /// lowering the pen after the last draw — is `down -> up`.
    pub fn with_pen_heights(&self, pen_up_pos: i32, pen_down_pos: i32) -> Plan {
        let pen_motion_count = self
            .motions
            .iter()
            .filter(|m| matches!(m, Motion::Pen(_)))
            .count();
        let mut seen = 0usize;
        let motions = self
            .motions
            .iter()
            .map(|m| match m {
                Motion::Xy(xy) => Motion::Xy(xy.clone()),
                Motion::Pen(pen) => {
                    let is_last = seen + 1 == pen_motion_count;
                    seen += 1;
                    let (initial, final_) = if is_last {
                        (pen_down_pos, pen_up_pos)
                    } else if seen % 2 == 1 {
                        (pen_up_pos, pen_down_pos)
                    } else {
                        (pen_down_pos, pen_up_pos)
                    };
                    Motion::Pen(PenMotion::new(initial, final_, pen.duration))
                }
            })
            .collect();
        Plan::new(motions)
    }

    /// Pen motions, in order.
    pub fn pen_motions(&self) -> impl Iterator<Item = &PenMotion> {
        self.motions.iter().filter_map(Motion::as_pen)
    }

    /// XY motions, in order.
    pub fn xy_motions(&self) -> impl Iterator<Item = &XYMotion> {
        self.motions.iter().filter_map(Motion::as_xy)
    }
}
