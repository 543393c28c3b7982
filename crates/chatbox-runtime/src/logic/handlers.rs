//! Routing Engine Command and Event Handlers
//!
//! Contains the command, transport event and telemetry handling logic of the
//! routing engine. Every handler runs on the engine task; none of them
//! propagates an error. Transport failures become notices, malformed input is
//! dropped.

use tracing::{debug, info, warn};

use chatbox_core::telemetry;
use chatbox_core::wire::WireRecord;
use chatbox_core::{
    ChatMessage, MessageId, Mode, PeerFilter, PeerId, PeerState, Scope, StampedEvent,
    TransportError, TransportEvent,
};

use super::task::RoutingEngine;
use crate::channel::{Command, CommandOutcome};
use crate::telemetry::TelemetryTicker;

impl RoutingEngine {
    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Apply one command and report what happened
    pub(crate) async fn process_command(&mut self, command: Command) -> CommandOutcome {
        self.state.stats.commands_processed += 1;
        debug!("Processing command {:?}", command);

        let (label, outcome) = match command {
            Command::SendPublic { text } => ("SendPublic", self.handle_send_public(&text).await),
            Command::SendDirect { peer_id, text } => {
                ("SendDirect", self.handle_send_direct(&peer_id, &text).await)
            }
            Command::SetMode { mode } => ("SetMode", self.handle_set_mode(mode).await),
            Command::StartTransport => ("StartTransport", self.handle_start_transport().await),
            Command::StopTransport => ("StopTransport", self.handle_stop_transport().await),
            Command::SetProximity { value } => ("SetProximity", self.handle_set_proximity(value)),
            Command::Shutdown => ("Shutdown", self.handle_shutdown().await),
        };

        Self::log_outcome(label, &outcome);
        outcome
    }

    async fn handle_send_public(&mut self, text: &str) -> CommandOutcome {
        let text = text.trim();
        if text.is_empty() {
            return CommandOutcome::Ignored;
        }

        let id = MessageId::generate();
        let echo = ChatMessage::local_with_id(id.clone(), self.state.display_name.as_str(), text);
        self.state.conversations.push_public(echo);

        let targets = self.state.registry.ids(self.state.reachable_filter());
        if targets.is_empty() {
            if self.state.mode == Mode::Real {
                return CommandOutcome::Notified(self.state.notice("No connected peers"));
            }
            debug!("No simulated peers to answer public message {}", id);
            return CommandOutcome::Applied;
        }

        self.transmit(&targets, WireRecord::public(id, text)).await
    }

    async fn handle_send_direct(&mut self, peer_id: &PeerId, text: &str) -> CommandOutcome {
        let text = text.trim();
        if text.is_empty() {
            return CommandOutcome::Ignored;
        }
        let Some(peer) = self.state.registry.get(peer_id).cloned() else {
            debug!("Direct message to unknown peer {} dropped", peer_id);
            return CommandOutcome::Ignored;
        };

        let id = MessageId::generate();
        let echo = ChatMessage::local_with_id(id.clone(), self.state.display_name.as_str(), text);
        self.state.conversations.push_direct(peer_id, echo);

        // Simulated peers are always reachable
        if self.state.mode == Mode::Real && !peer.is_connected() {
            return CommandOutcome::Notified(
                self.state.notice(format!("{} is not connected", peer.name)),
            );
        }

        self.transmit(&[peer.id.clone()], WireRecord::direct(peer.id, id, text))
            .await
    }

    async fn handle_set_mode(&mut self, target: Mode) -> CommandOutcome {
        if target == self.state.mode {
            return CommandOutcome::Ignored;
        }
        if target == Mode::Real {
            if let Err(e) = self.real_mode_available() {
                warn!("Refusing to enter real mode: {}", e);
                return CommandOutcome::Notified(self.state.notice(Self::unavailable_notice(&e)));
            }
        }

        info!("Switching mode {} -> {}", self.state.mode, target);
        self.deactivate().await;

        let exiting_simulated = self.state.mode.is_simulated();
        let purged = self
            .state
            .registry
            .remove_where(|peer| peer.simulated == exiting_simulated);
        debug!("Purged {} peers of the exited mode", purged);

        self.state.mode = target;
        self.activate().await;
        CommandOutcome::Applied
    }

    async fn handle_start_transport(&mut self) -> CommandOutcome {
        if self.state.mode != Mode::Real {
            return CommandOutcome::Ignored;
        }
        if let Err(e) = self.real_mode_available() {
            warn!("Refusing to restart real transport: {}", e);
            return CommandOutcome::Notified(self.state.notice(Self::unavailable_notice(&e)));
        }

        self.deactivate().await;
        self.activate().await;
        CommandOutcome::Applied
    }

    async fn handle_stop_transport(&mut self) -> CommandOutcome {
        if self.state.mode != Mode::Real || !self.state.transport_active {
            return CommandOutcome::Ignored;
        }
        self.deactivate().await;
        CommandOutcome::Applied
    }

    fn handle_set_proximity(&mut self, value: f32) -> CommandOutcome {
        match self.config.telemetry.clamp_proximity(value) {
            Some(proximity) if proximity != self.state.proximity => {
                debug!("Proximity set to {} (requested {})", proximity, value);
                self.state.proximity = proximity;
                CommandOutcome::Applied
            }
            Some(_) => CommandOutcome::Ignored,
            None => {
                warn!("Ignoring non-finite proximity {}", value);
                CommandOutcome::Ignored
            }
        }
    }

    async fn handle_shutdown(&mut self) -> CommandOutcome {
        info!("Shutdown requested");
        self.teardown().await;
        self.running = false;
        CommandOutcome::Applied
    }

    // ------------------------------------------------------------------------
    // Transport Lifecycle
    // ------------------------------------------------------------------------

    /// Begin the adapter of the current mode
    pub(crate) async fn activate(&mut self) {
        let sink = self.event_sink();
        let mode = self.state.mode;
        let Some(transport) = self.active_transport() else {
            self.state.notice("No real transport available");
            return;
        };
        let name = transport.name();

        match transport.begin(sink).await {
            Ok(()) => {
                info!("Transport {} started (generation {})", name, self.state.generation);
                self.state.transport_active = true;
                match mode {
                    Mode::Simulated => {
                        self.ticker = Some(TelemetryTicker::spawn(
                            self.state.generation,
                            self.config.telemetry.tick_interval(),
                            self.tick_sender.clone(),
                        ));
                        self.state.notice("Simulation ON");
                    }
                    Mode::Real => {
                        self.state.notice("Auto-network: advertising + discovery");
                    }
                }
            }
            Err(e) => {
                warn!("Transport {} failed to start: {}", name, e);
                self.state.transport_active = false;
                self.state.notice(format!("Could not start network: {}", e));
            }
        }
    }

    /// End the adapter of the current mode and invalidate its pending work
    ///
    /// Real peers are marked disconnected: their links ended with the
    /// transport, and the old transport's own reports are now stale.
    pub(crate) async fn deactivate(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        let was_active = self.state.transport_active;
        let mode = self.state.mode;

        if let Some(transport) = self.active_transport() {
            let name = transport.name();
            if let Err(e) = transport.end().await {
                warn!("Transport {} did not stop cleanly: {}", name, e);
            }
        }
        self.state.bump_generation();
        self.state.transport_active = false;

        if mode == Mode::Real {
            for id in self.state.registry.ids(PeerFilter::all().real()) {
                self.state.registry.mark_disconnected(&id);
            }
        }

        if was_active {
            match mode {
                Mode::Simulated => self.state.notice("Simulation OFF"),
                Mode::Real => self.state.notice("Real network stopped"),
            };
        }
    }

    /// Stop everything before the engine exits
    pub(crate) async fn teardown(&mut self) {
        self.deactivate().await;
        if let Some(real) = self.real.as_mut() {
            if real.is_active() {
                if let Err(e) = real.end().await {
                    warn!("Real transport did not stop cleanly: {}", e);
                }
            }
        }
    }

    /// Hand a record to the active transport, downgrading failure to a notice
    async fn transmit(&mut self, targets: &[PeerId], record: WireRecord) -> CommandOutcome {
        let payload = record.encode();
        let result = match self.active_transport() {
            Some(transport) => transport.send(targets, payload).await,
            None => Err(TransportError::Unavailable {
                reason: "no transport for the current mode".to_string(),
            }),
        };

        match result {
            Ok(()) => {
                self.state.stats.messages_sent += 1;
                CommandOutcome::Applied
            }
            Err(e) => {
                warn!("Send of {} to {} peer(s) failed: {}", record.id, targets.len(), e);
                self.state.stats.send_failures += 1;
                CommandOutcome::Notified(self.state.notice(format!("Send failed: {}", e)))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Transport Events
    // ------------------------------------------------------------------------

    /// Apply one transport event unless it belongs to a stale generation
    pub(crate) async fn process_event(&mut self, stamped: StampedEvent) {
        if stamped.generation != self.state.generation {
            self.state.stats.stale_events_dropped += 1;
            debug!(
                "Dropping event for {} from stale generation {} (current {})",
                stamped.event.peer_id(),
                stamped.generation,
                self.state.generation
            );
            return;
        }
        self.state.stats.events_processed += 1;

        match stamped.event {
            TransportEvent::PeerFound { peer_id, name } => {
                self.handle_peer_found(peer_id, name).await
            }
            TransportEvent::PeerLost { peer_id } => {
                debug!("Peer lost: {}", peer_id);
                self.state.registry.mark_disconnected(&peer_id);
            }
            TransportEvent::ConnectionRequested { peer_id, name } => {
                self.handle_connection_requested(peer_id, name).await
            }
            TransportEvent::ConnectionResult {
                peer_id,
                success,
                reason,
            } => self.handle_connection_result(peer_id, success, reason),
            TransportEvent::Disconnected { peer_id } => {
                if self.state.registry.mark_disconnected(&peer_id) {
                    let name = self.state.registry.display_name(&peer_id);
                    self.state.notice(format!("Disconnected: {}", name));
                }
            }
            TransportEvent::PayloadReceived { from, payload } => {
                self.handle_payload(from, &payload)
            }
        }
    }

    async fn handle_peer_found(&mut self, peer_id: PeerId, name: String) {
        let simulated = self.state.mode.is_simulated();
        let state = match self.state.registry.get(&peer_id).map(|peer| peer.state) {
            // Rediscovery never downgrades a live connection
            Some(live @ (PeerState::Connecting | PeerState::Connected)) => {
                self.state.registry.upsert(peer_id, name, live, simulated);
                return;
            }
            _ => PeerState::Discovered,
        };
        self.state
            .registry
            .upsert(peer_id.clone(), name, state, simulated);
        debug!("Peer found: {}", peer_id);

        if simulated {
            return;
        }
        if let Some(real) = self.real.as_mut() {
            if let Err(e) = real.request_connection(&peer_id).await {
                warn!("Connection request to {} failed: {}", peer_id, e);
                let name = self.state.registry.display_name(&peer_id);
                self.state
                    .notice(format!("Connection request to {} failed", name));
            }
        }
    }

    async fn handle_connection_requested(&mut self, peer_id: PeerId, name: String) {
        let simulated = self.state.mode.is_simulated();
        self.state
            .registry
            .upsert(peer_id.clone(), name, PeerState::Connecting, simulated);

        let Some(transport) = self.active_transport() else {
            return;
        };
        if let Err(e) = transport.accept_connection(&peer_id).await {
            warn!("Accepting {} failed: {}", peer_id, e);
            let name = self.state.registry.display_name(&peer_id);
            self.state.notice(format!("Could not accept {}", name));
        }
    }

    fn handle_connection_result(&mut self, peer_id: PeerId, success: bool, reason: Option<String>) {
        let name = self.state.registry.display_name(&peer_id);

        if success {
            let simulated = self.state.mode.is_simulated();
            self.state
                .registry
                .upsert(peer_id.clone(), name.as_str(), PeerState::Connected, simulated);
            debug!("Connected to {}", peer_id);
            if !simulated {
                self.state.notice(format!("Connected: {}", name));
            }
            return;
        }

        let connected = self
            .state
            .registry
            .get(&peer_id)
            .is_some_and(|peer| peer.is_connected());
        if !connected {
            self.state.registry.mark_disconnected(&peer_id);
        }
        let notice = match reason {
            Some(reason) => format!("Connection failed: {} ({})", name, reason),
            None => format!("Connection failed: {}", name),
        };
        self.state.notice(notice);
    }

    fn handle_payload(&mut self, from: PeerId, payload: &[u8]) {
        let Some(record) = WireRecord::try_decode(payload) else {
            self.state.stats.malformed_payloads_dropped += 1;
            return;
        };

        let sender = self.state.registry.display_name(&from);
        let message = ChatMessage::remote(record.id, sender, record.body);
        let stored = match record.scope {
            Scope::Public => self.state.conversations.push_public(message),
            Scope::Direct => self.state.conversations.push_direct(&from, message),
        };
        if stored {
            self.state.stats.messages_received += 1;
        }
    }

    // ------------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------------

    /// Run one telemetry step if the tick belongs to the running simulation
    pub(crate) fn process_tick(&mut self, generation: u64) {
        if generation != self.state.generation || !self.state.mode.is_simulated() {
            self.state.stats.stale_events_dropped += 1;
            debug!("Dropping stale telemetry tick (generation {})", generation);
            return;
        }

        let touched = telemetry::tick(
            &mut self.state.stations,
            self.state.proximity,
            self.config.telemetry.proximity_threshold,
            self.config.telemetry.max_perturbation,
            self.telemetry_chooser.as_mut(),
        );
        self.state.stats.telemetry_ticks += 1;
        debug!("Telemetry tick updated {} station(s)", touched.len());
    }
}
