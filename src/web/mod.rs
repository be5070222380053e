//! HTTP and WebSocket surface over the plot supervisor.

pub mod api;
pub mod models;

pub use api::create_router;
