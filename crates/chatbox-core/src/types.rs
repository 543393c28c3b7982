//! Core types for ChatBox
//!
//! Peers are keyed by an opaque, transport-assigned endpoint id. Messages are
//! immutable once built; every constructor here produces a finished value.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Sender label used for locally generated notices
pub const SYSTEM_SENDER: &str = "System";

/// Number of characters kept when a peer id stands in for a display name
pub const SHORT_ID_LEN: usize = 8;

// ----------------------------------------------------------------------------
// Peer Identifier
// ----------------------------------------------------------------------------

/// Opaque endpoint id assigned by the transport
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the id, used when no display name is known
    pub fn short(&self) -> String {
        self.0.chars().take(SHORT_ID_LEN).collect()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ----------------------------------------------------------------------------
// Message Identifier
// ----------------------------------------------------------------------------

/// Short locally generated token used as display key and de-duplication id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Length of freshly generated ids
    pub const LEN: usize = 8;

    /// Generate a fresh id from the first characters of a random UUID
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self(uuid[..Self::LEN].to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ----------------------------------------------------------------------------
// Mode and Scope
// ----------------------------------------------------------------------------

/// Which transport the engine is driving; exactly one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    Simulated,
    Real,
}

impl Mode {
    /// Whether peers owned by this mode carry the simulated origin flag
    pub fn is_simulated(self) -> bool {
        matches!(self, Mode::Simulated)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Simulated => f.write_str("simulated"),
            Mode::Real => f.write_str("real"),
        }
    }
}

/// Message visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Broadcast to every connected peer
    Public,
    /// Addressed to exactly one peer
    Direct,
}

// ----------------------------------------------------------------------------
// Peer
// ----------------------------------------------------------------------------

/// Connection lifecycle of a peer, driven only by transport events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerState {
    Discovered,
    Connecting,
    Connected,
    Disconnected,
}

impl PeerState {
    pub fn is_connected(self) -> bool {
        self == PeerState::Connected
    }
}

impl fmt::Display for PeerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PeerState::Discovered => "discovered",
            PeerState::Connecting => "connecting",
            PeerState::Connected => "connected",
            PeerState::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// A remote participant, real or simulated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub name: String,
    pub state: PeerState,
    /// True when the peer was synthesized by the simulated transport
    pub simulated: bool,
}

impl Peer {
    pub fn new(id: PeerId, name: impl Into<String>, state: PeerState, simulated: bool) -> Self {
        Self {
            id,
            name: name.into(),
            state,
            simulated,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }
}

// ----------------------------------------------------------------------------
// Chat Message
// ----------------------------------------------------------------------------

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageOrigin {
    Local,
    Remote,
}

/// Whether a message is user content or a locally generated notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCategory {
    User,
    System,
}

/// An immutable chat line held in one conversation store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: String,
    pub body: String,
    pub origin: MessageOrigin,
    pub category: MessageCategory,
}

impl ChatMessage {
    /// Optimistic echo of something this node sent
    pub fn local(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self::local_with_id(MessageId::generate(), sender, body)
    }

    /// Local echo reusing the id already put on the wire
    pub fn local_with_id(id: MessageId, sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            sender: sender.into(),
            body: body.into(),
            origin: MessageOrigin::Local,
            category: MessageCategory::User,
        }
    }

    /// Message received from a peer
    pub fn remote(id: MessageId, sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            sender: sender.into(),
            body: body.into(),
            origin: MessageOrigin::Remote,
            category: MessageCategory::User,
        }
    }

    /// Locally generated notice for the public stream
    pub fn system(body: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            sender: SYSTEM_SENDER.to_string(),
            body: body.into(),
            origin: MessageOrigin::Remote,
            category: MessageCategory::System,
        }
    }

    pub fn is_local(&self) -> bool {
        self.origin == MessageOrigin::Local
    }

    pub fn is_system(&self) -> bool {
        self.category == MessageCategory::System
    }
}
