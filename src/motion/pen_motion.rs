//! `PenMotion`: a single servo movement.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenMotion {
    pub initial_pos: i32,
    pub final_pos: i32,
    pub duration: f64,
}

impl PenMotion {
    pub fn new(initial_pos: i32, final_pos: i32, duration: f64) -> Self {
        Self {
            initial_pos,
            final_pos,
            duration,
        }
    }

    /// Pen is "up" iff `final_pos > initial_pos` — larger servo counts mean
    /// the pen is raised higher off the page.
    pub fn is_raising(&self) -> bool {
        self.final_pos > self.initial_pos
    }
}
