//! Wire events broadcast to connected clients, and the control messages
//! they can send back.

use serde::{Deserialize, Serialize};

use crate::motion::Plan;

/// Outbound message: `{"c": <kind>, "p"?: <payload>}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "c", content = "p", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Event {
    /// Connected device summary, sent once a serial handshake completes.
    Dev { firmware: String },
    Pause { paused: bool },
    Progress { motion_index: usize, total: usize },
    Cancelled,
    Finished,
    /// Echoes the accepted plan back for UI preview, sent on subscribe.
    Plan { plan: Plan },
    Pong,
    SvgioEnabled { enabled: bool },
}

/// Inbound message from a control-channel client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "c", content = "p", rename_all = "camelCase")]
pub enum ControlMessage {
    Ping,
    /// Disable motors and let the carriage move freely by hand.
    Limp,
    SetPenHeight { height: i32, rate: i32 },
}
