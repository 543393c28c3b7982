//! Routing Engine Logic
//!
//! The routing engine is split into focused components:
//! - `state`: engine-owned state and statistics
//! - `handlers`: command, transport event and telemetry handlers
//! - `task`: the `RoutingEngine` struct and its coordination loop
//!
//! All registry, conversation and station mutations are serialized through the
//! single `RoutingEngine` task. Transport events, user commands and telemetry
//! ticks arrive on separate channels and are applied one at a time, so a send
//! decision never observes a half-updated peer. Consumers only ever read the
//! immutable snapshots the engine publishes.

pub mod handlers;
pub mod state;
pub mod task;

pub use state::{EngineState, EngineStats};
pub use task::RoutingEngine;
