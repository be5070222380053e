//! Core library for the plotter host: motion planning, the EBB serial
//! driver, the plot supervisor, and the HTTP/WebSocket surface in front of
//! it. `src/main.rs` wires these together into the `plotter-host` binary.

pub mod config;
pub mod device;
pub mod ebb;
pub mod events;
pub mod motion;
pub mod supervisor;
pub mod vec2;
pub mod web;
