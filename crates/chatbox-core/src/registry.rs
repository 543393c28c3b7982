//! Peer registry
//!
//! Authoritative mapping from endpoint id to peer record. There is at most one
//! record per id; rediscovery updates the existing record in place. Readers get
//! cloned snapshots, never references into the live map.

use std::collections::HashMap;

use crate::types::{Peer, PeerId, PeerState};

// ----------------------------------------------------------------------------
// Query Filter
// ----------------------------------------------------------------------------

/// Selects peers for a snapshot query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerFilter {
    state: Option<PeerState>,
    simulated: Option<bool>,
}

impl PeerFilter {
    /// Match every peer
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: PeerState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn connected(self) -> Self {
        self.with_state(PeerState::Connected)
    }

    pub fn simulated(mut self) -> Self {
        self.simulated = Some(true);
        self
    }

    pub fn real(mut self) -> Self {
        self.simulated = Some(false);
        self
    }

    pub fn matches(&self, peer: &Peer) -> bool {
        self.state.map_or(true, |s| peer.state == s)
            && self.simulated.map_or(true, |s| peer.simulated == s)
    }
}

// ----------------------------------------------------------------------------
// Peer Registry
// ----------------------------------------------------------------------------

/// Registry of known peers, preserving first-seen order for display
#[derive(Debug, Default, Clone)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, Peer>,
    order: Vec<PeerId>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer or update the existing record in place
    ///
    /// Returns `true` when a new record was created.
    pub fn upsert(
        &mut self,
        id: PeerId,
        name: impl Into<String>,
        state: PeerState,
        simulated: bool,
    ) -> bool {
        let name = name.into();
        match self.peers.get_mut(&id) {
            Some(peer) => {
                peer.name = name;
                peer.state = state;
                peer.simulated = simulated;
                false
            }
            None => {
                self.order.push(id.clone());
                self.peers
                    .insert(id.clone(), Peer::new(id, name, state, simulated));
                true
            }
        }
    }

    /// Change only the connection state of a known peer
    ///
    /// Returns the previous state, or `None` if the peer is unknown.
    pub fn set_state(&mut self, id: &PeerId, state: PeerState) -> Option<PeerState> {
        self.peers
            .get_mut(id)
            .map(|peer| core::mem::replace(&mut peer.state, state))
    }

    /// Mark a peer disconnected, keeping its record. No-op when absent.
    pub fn mark_disconnected(&mut self, id: &PeerId) -> bool {
        self.set_state(id, PeerState::Disconnected).is_some()
    }

    /// Remove every peer matching the predicate, returning how many went
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Peer) -> bool,
    {
        let before = self.peers.len();
        self.peers.retain(|_, peer| !predicate(peer));
        let peers = &self.peers;
        self.order.retain(|id| peers.contains_key(id));
        before - self.peers.len()
    }

    /// Snapshot of matching peers in first-seen order
    pub fn query(&self, filter: PeerFilter) -> Vec<Peer> {
        self.order
            .iter()
            .filter_map(|id| self.peers.get(id))
            .filter(|peer| filter.matches(peer))
            .cloned()
            .collect()
    }

    /// Ids of matching peers in first-seen order
    pub fn ids(&self, filter: PeerFilter) -> Vec<PeerId> {
        self.order
            .iter()
            .filter(|id| self.peers.get(id).is_some_and(|peer| filter.matches(peer)))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Display name for an id, falling back to the truncated id
    pub fn display_name(&self, id: &PeerId) -> String {
        self.peers
            .get(id)
            .map(|peer| peer.name.clone())
            .unwrap_or_else(|| id.short())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
