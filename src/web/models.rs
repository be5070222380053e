//! Request/response bodies for the plot HTTP API.

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotStatusResponse {
    pub plotting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_motion_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_motions: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub result: &'static str,
}

impl OkResponse {
    pub const OK: Self = Self { result: "ok" };
}
