//! ChatBox Core
//!
//! Foundational types and pure logic for the ChatBox peer-to-peer chat and
//! telemetry demonstrator:
//! - identifiers, peers and chat messages ([`types`])
//! - the flat `<kind>|<scope>|<target>|<id>|<body>` wire codec ([`wire`])
//! - the authoritative peer registry ([`registry`])
//! - public and direct-message conversation stores ([`conversation`])
//! - bike station telemetry and its perturbation step ([`telemetry`])
//! - the transport adapter contract and its event stream ([`transport`])
//! - the randomness seam shared by every simulated component ([`chooser`])
//!
//! The async orchestration lives in `chatbox-runtime`; nothing in this crate
//! spawns tasks or sleeps.

pub mod chooser;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod registry;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod wire;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use chooser::{Chooser, FixedChooser, RandomChooser};
pub use config::{
    ChatboxConfig, EngineConfig, IdentityConfig, SimulatedPeerConfig, SimulationConfig,
    StationConfig, TelemetryConfig,
};
pub use conversation::ConversationStore;
pub use errors::{ChatboxError, ChatboxResult, CodecError, TransportError};
pub use registry::{PeerFilter, PeerRegistry};
pub use telemetry::{BikeStation, StationView};
pub use transport::{
    AlwaysGranted, CapabilityCheck, EventSink, StampedEvent, TransportAdapter, TransportEvent,
};
pub use types::{
    ChatMessage, MessageCategory, MessageId, MessageOrigin, Mode, Peer, PeerId, PeerState,
    Scope,
};
pub use wire::{MessageKind, WireRecord};
