//! Immutable views of engine state for consumers
//!
//! The engine publishes a fresh [`EngineSnapshot`] after every input that
//! changed something. Consumers never see a half-applied update.

use std::collections::BTreeMap;
use std::sync::Arc;

use chatbox_core::telemetry::StationView;
use chatbox_core::{ChatMessage, Mode, Peer, PeerId};

use crate::logic::EngineStats;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub mode: Mode,
    /// Whether the active transport is currently running
    pub transport_active: bool,
    pub generation: u64,
    pub display_name: String,
    pub peers: Vec<Peer>,
    /// Shared with the engine's store; unchanged threads keep their allocation
    pub public: Arc<Vec<ChatMessage>>,
    pub direct: BTreeMap<PeerId, Arc<Vec<ChatMessage>>>,
    pub stations: Vec<StationView>,
    pub proximity: f32,
    pub stats: EngineStats,
}

impl EngineSnapshot {
    pub fn peer(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.iter().find(|peer| &peer.id == id)
    }

    pub fn connected_peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter().filter(|peer| peer.is_connected())
    }

    /// Direct thread with one peer; empty when none exists
    pub fn direct(&self, id: &PeerId) -> &[ChatMessage] {
        self.direct
            .get(id)
            .map(|thread| thread.as_slice())
            .unwrap_or_default()
    }

    /// System notices in the public stream, oldest first
    pub fn notices(&self) -> impl Iterator<Item = &ChatMessage> {
        self.public.iter().filter(|m| m.is_system())
    }

    /// User content in the public stream, oldest first
    pub fn public_chat(&self) -> impl Iterator<Item = &ChatMessage> {
        self.public.iter().filter(|m| !m.is_system())
    }
}
