//! Centralized Configuration Management
//!
//! Everything the engine needs at construction time: who we are, how the
//! simulation behaves and which stations exist. Values that change at runtime
//! (the proximity parameter) start here and are updated only through engine
//! commands.

use core::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{ChatboxError, ChatboxResult};
use crate::telemetry::BikeStation;
use crate::types::Mode;

// ----------------------------------------------------------------------------
// Identity Configuration
// ----------------------------------------------------------------------------

/// How this node presents itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Advertised name, also used as sender on our own messages
    pub display_name: String,
    /// Service id the real transport advertises and discovers
    pub service_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let host = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "local".to_string());
        let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
        Self {
            display_name: format!("Node-{}-{}", host.replace(' ', "_"), suffix),
            service_id: "com.example.chatbox.nearby".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Engine Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mode activated when the engine starts
    pub initial_mode: Mode,
    /// Buffer size for the command channel (UI → engine)
    pub command_buffer_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_mode: Mode::Simulated,
            command_buffer_size: 64,
        }
    }
}

// ----------------------------------------------------------------------------
// Simulation Configuration
// ----------------------------------------------------------------------------

/// One synthetic peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedPeerConfig {
    pub id: String,
    pub name: String,
}

impl SimulatedPeerConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Behaviour of the simulated transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub peers: Vec<SimulatedPeerConfig>,
    pub public_replies: Vec<String>,
    pub direct_replies: Vec<String>,
    pub public_reply_min_ms: u64,
    pub public_reply_max_ms: u64,
    pub direct_reply_min_ms: u64,
    pub direct_reply_max_ms: u64,
    /// Fixed RNG seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            peers: vec![
                SimulatedPeerConfig::new("SIM-A", "Laura"),
                SimulatedPeerConfig::new("SIM-B", "Nico"),
                SimulatedPeerConfig::new("SIM-C", "Sara"),
            ],
            public_replies: ["ok!", "jajaja", "probando 😄", "hola!", "nice"]
                .into_iter()
                .map(String::from)
                .collect(),
            direct_replies: ["dale", "te leo", "ok", "funciona"]
                .into_iter()
                .map(String::from)
                .collect(),
            public_reply_min_ms: 500,
            public_reply_max_ms: 900,
            direct_reply_min_ms: 400,
            direct_reply_max_ms: 800,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn public_delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.public_reply_min_ms),
            Duration::from_millis(self.public_reply_max_ms),
        )
    }

    pub fn direct_delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.direct_reply_min_ms),
            Duration::from_millis(self.direct_reply_max_ms),
        )
    }
}

// ----------------------------------------------------------------------------
// Telemetry Configuration
// ----------------------------------------------------------------------------

/// One station as configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub available: u32,
    pub position: f32,
}

impl StationConfig {
    pub fn to_station(&self) -> BikeStation {
        BikeStation::new(
            self.id.clone(),
            self.name.clone(),
            self.capacity,
            self.available,
            self.position,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub tick_interval_ms: u64,
    /// Stations strictly closer than this receive updates
    pub proximity_threshold: f32,
    /// Largest step applied per tick, in either direction
    pub max_perturbation: i32,
    pub proximity_min: f32,
    pub proximity_max: f32,
    /// Initial proximity parameter
    pub proximity: f32,
    pub stations: Vec<StationConfig>,
    pub seed: Option<u64>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let station = |id: &str, name: &str, capacity, available, position| StationConfig {
            id: id.to_string(),
            name: name.to_string(),
            capacity,
            available,
            position,
        };
        Self {
            tick_interval_ms: 2500,
            proximity_threshold: 5.0,
            max_perturbation: 2,
            proximity_min: 0.0,
            proximity_max: 30.0,
            proximity: 15.0,
            stations: vec![
                station("ST-001", "Gare Centrale", 18, 6, 0.0),
                station("ST-002", "Campus IMT", 22, 14, 12.0),
                station("ST-003", "Centre Ville", 12, 3, 25.0),
            ],
            seed: None,
        }
    }
}

impl TelemetryConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Clamp a requested proximity into the configured range
    pub fn clamp_proximity(&self, value: f32) -> Option<f32> {
        value
            .is_finite()
            .then(|| value.clamp(self.proximity_min, self.proximity_max))
    }
}

// ----------------------------------------------------------------------------
// Top-level Configuration
// ----------------------------------------------------------------------------

/// Complete configuration handed to the engine at construction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatboxConfig {
    pub identity: IdentityConfig,
    pub engine: EngineConfig,
    pub simulation: SimulationConfig,
    pub telemetry: TelemetryConfig,
}

impl ChatboxConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed name and seeds, suitable for tests
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.identity.display_name = "Node-test-0000".to_string();
        config.simulation.seed = Some(1);
        config.telemetry.seed = Some(2);
        config
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.identity.display_name = name.into();
        self
    }

    pub fn with_initial_mode(mut self, mode: Mode) -> Self {
        self.engine.initial_mode = mode;
        self
    }

    pub fn with_proximity(mut self, proximity: f32) -> Self {
        self.telemetry.proximity = proximity;
        self
    }

    pub fn with_stations(mut self, stations: Vec<StationConfig>) -> Self {
        self.telemetry.stations = stations;
        self
    }

    pub fn with_simulated_peers(mut self, peers: Vec<SimulatedPeerConfig>) -> Self {
        self.simulation.peers = peers;
        self
    }

    /// Reject internally inconsistent values
    pub fn validate(&self) -> ChatboxResult<()> {
        if self.identity.display_name.trim().is_empty() {
            return Err(ChatboxError::configuration("display_name must not be empty"));
        }
        if self.identity.display_name.contains(crate::wire::DELIMITER) {
            return Err(ChatboxError::configuration(
                "display_name must not contain the wire delimiter",
            ));
        }
        if self.engine.command_buffer_size == 0 {
            return Err(ChatboxError::configuration(
                "command_buffer_size must be greater than zero",
            ));
        }

        let sim = &self.simulation;
        if sim.peers.is_empty() {
            return Err(ChatboxError::configuration(
                "simulation needs at least one peer",
            ));
        }
        let mut ids: Vec<&str> = sim.peers.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != sim.peers.len() {
            return Err(ChatboxError::configuration(
                "simulated peer ids must be unique",
            ));
        }
        if sim.public_replies.is_empty() || sim.direct_replies.is_empty() {
            return Err(ChatboxError::configuration("reply pools must not be empty"));
        }
        if sim.public_reply_min_ms > sim.public_reply_max_ms
            || sim.direct_reply_min_ms > sim.direct_reply_max_ms
        {
            return Err(ChatboxError::configuration(
                "reply delay lower bound exceeds upper bound",
            ));
        }

        let telemetry = &self.telemetry;
        if telemetry.tick_interval_ms == 0 {
            return Err(ChatboxError::configuration(
                "tick_interval_ms must be greater than zero",
            ));
        }
        if telemetry.max_perturbation < 0 {
            return Err(ChatboxError::configuration(
                "max_perturbation must not be negative",
            ));
        }
        if !(telemetry.proximity_min <= telemetry.proximity_max) {
            return Err(ChatboxError::configuration("invalid proximity range"));
        }
        if !telemetry.proximity_threshold.is_finite() || telemetry.proximity_threshold < 0.0 {
            return Err(ChatboxError::configuration(
                "proximity_threshold must be a non-negative number",
            ));
        }
        if let Some(station) = telemetry
            .stations
            .iter()
            .find(|s| s.available > s.capacity)
        {
            return Err(ChatboxError::configuration(format!(
                "station {} has more bikes available than capacity",
                station.id
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChatboxConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.identity.display_name.starts_with("Node-"));
        assert_eq!(config.simulation.peers.len(), 3);
        assert_eq!(config.telemetry.stations.len(), 3);
    }

    #[test]
    fn test_validation_catches_bad_values() {
        let mut config = ChatboxConfig::testing();
        config.simulation.public_reply_min_ms = 1000;
        config.simulation.public_reply_max_ms = 10;
        assert!(config.validate().is_err());

        let config = ChatboxConfig::testing().with_simulated_peers(vec![]);
        assert!(config.validate().is_err());

        let mut config = ChatboxConfig::testing();
        config.telemetry.stations[0].available = 99;
        assert!(config.validate().is_err());

        let config = ChatboxConfig::testing().with_display_name("bad|name");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_max_perturbation_is_rejected() {
        let mut config = ChatboxConfig::testing();
        config.telemetry.max_perturbation = i32::MIN;
        assert!(matches!(
            config.validate(),
            Err(ChatboxError::Configuration { .. })
        ));

        config.telemetry.max_perturbation = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clamp_proximity() {
        let telemetry = TelemetryConfig::default();
        assert_eq!(telemetry.clamp_proximity(42.0), Some(30.0));
        assert_eq!(telemetry.clamp_proximity(-1.0), Some(0.0));
        assert_eq!(telemetry.clamp_proximity(f32::NAN), None);
    }
}
