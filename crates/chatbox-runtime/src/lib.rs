//! ChatBox Runtime Engine
//!
//! This crate contains the orchestration half of ChatBox:
//! - `RoutingEngine`: the single task that owns peers, conversations and
//!   stations and applies every command, transport event and telemetry tick
//! - `EngineBuilder` / `EngineHandle`: construction and the public API
//! - `SimulatedTransport`: a transport adapter with synthetic peers and replies
//! - `TelemetryTicker`: the periodic telemetry driver
//!
//! `chatbox-core` provides the types and pure logic this engine coordinates.

pub mod builder;
pub mod channel;
pub mod logic;
pub mod simulated;
pub mod snapshot;
pub mod telemetry;
pub mod testing;

pub use builder::{EngineBuilder, EngineHandle};
pub use channel::{Command, CommandOutcome};
pub use logic::{EngineState, EngineStats, RoutingEngine};
pub use simulated::SimulatedTransport;
pub use snapshot::EngineSnapshot;
pub use telemetry::TelemetryTicker;

// Re-export core types for convenience
pub use chatbox_core::{
    AlwaysGranted, CapabilityCheck, ChatMessage, ChatboxConfig, ChatboxError, ChatboxResult,
    Chooser, EventSink, FixedChooser, Mode, Peer, PeerId, PeerState, RandomChooser,
    TransportAdapter, TransportEvent,
};
