//! Motion primitives and the constant-acceleration planner.

pub mod block;
pub mod pen_motion;
pub mod plan;
pub mod planner;
pub mod segment;
pub mod xy_motion;

pub use block::{Block, PlannerError, VELOCITY_EPSILON};
pub use pen_motion::PenMotion;
pub use plan::{Motion, Plan};
pub use planner::plan as build_plan;
pub use xy_motion::{MotionInstant, XYMotion};
