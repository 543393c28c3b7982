//! Routing Engine State Management
//!
//! Contains the state owned by the routing engine and its statistics.

use chatbox_core::telemetry::{self, BikeStation};
use chatbox_core::{ChatboxConfig, ConversationStore, Mode, PeerFilter, PeerRegistry};

use crate::snapshot::EngineSnapshot;

// ----------------------------------------------------------------------------
// Engine State
// ----------------------------------------------------------------------------

/// Everything the routing engine owns and mutates
#[derive(Debug)]
pub struct EngineState {
    /// Name used as sender on self-authored messages
    pub display_name: String,
    pub mode: Mode,
    /// Bumped whenever a transport stops; events from older generations are dropped
    pub generation: u64,
    pub transport_active: bool,
    pub registry: PeerRegistry,
    pub conversations: ConversationStore,
    pub stations: Vec<BikeStation>,
    pub proximity: f32,
    pub stats: EngineStats,
}

impl EngineState {
    pub fn new(config: &ChatboxConfig) -> Self {
        let proximity = config
            .telemetry
            .clamp_proximity(config.telemetry.proximity)
            .unwrap_or(config.telemetry.proximity_min);

        Self {
            display_name: config.identity.display_name.clone(),
            mode: config.engine.initial_mode,
            generation: 1,
            transport_active: false,
            registry: PeerRegistry::new(),
            conversations: ConversationStore::new(),
            stations: config
                .telemetry
                .stations
                .iter()
                .map(|station| station.to_station())
                .collect(),
            proximity,
            stats: EngineStats::default(),
        }
    }

    /// Invalidate everything scheduled under the current generation
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        tracing::debug!("Generation advanced to {}", self.generation);
        self.generation
    }

    /// Append a system notice to the public stream
    pub fn notice(&mut self, text: impl Into<String>) -> String {
        let text = text.into();
        tracing::info!("Notice: {}", text);
        self.conversations.notice(text.clone());
        text
    }

    /// Peer filter selecting connected peers of the active origin
    pub fn reachable_filter(&self) -> PeerFilter {
        let filter = PeerFilter::all().connected();
        if self.mode.is_simulated() {
            filter.simulated()
        } else {
            filter.real()
        }
    }

    pub fn snapshot(&self, proximity_threshold: f32) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.mode,
            transport_active: self.transport_active,
            generation: self.generation,
            display_name: self.display_name.clone(),
            peers: self.registry.query(PeerFilter::all()),
            public: self.conversations.shared_public(),
            direct: self.conversations.shared_direct(),
            stations: telemetry::views(&self.stations, self.proximity, proximity_threshold),
            proximity: self.proximity,
            stats: self.stats.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

/// Counters kept by the routing engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub commands_processed: u64,
    pub events_processed: u64,
    pub stale_events_dropped: u64,
    pub malformed_payloads_dropped: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub send_failures: u64,
    pub telemetry_ticks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbox_core::{PeerId, PeerState};

    #[test]
    fn test_new_state_clamps_initial_proximity() {
        let config = ChatboxConfig::testing().with_proximity(80.0);
        let state = EngineState::new(&config);
        assert_eq!(state.proximity, 30.0);
        assert_eq!(state.stations.len(), 3);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_reachable_filter_follows_mode() {
        let mut state = EngineState::new(&ChatboxConfig::testing());
        state
            .registry
            .upsert(PeerId::new("SIM-A"), "Laura", PeerState::Connected, true);
        state
            .registry
            .upsert(PeerId::new("R-1"), "Phone", PeerState::Connected, false);

        assert_eq!(
            state.registry.ids(state.reachable_filter()),
            vec![PeerId::new("SIM-A")]
        );
        state.mode = Mode::Real;
        assert_eq!(
            state.registry.ids(state.reachable_filter()),
            vec![PeerId::new("R-1")]
        );
    }

    #[test]
    fn test_snapshot_marks_near_stations() {
        let state = EngineState::new(&ChatboxConfig::testing().with_proximity(10.0));
        let snapshot = state.snapshot(5.0);
        let near: Vec<&str> = snapshot
            .stations
            .iter()
            .filter(|view| view.near)
            .map(|view| view.station.id.as_str())
            .collect();
        assert_eq!(near, vec!["ST-002"]);
    }
}
