//! Routing Engine Task Implementation
//!
//! Contains the `RoutingEngine` struct and its coordination loop.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use chatbox_core::{
    CapabilityCheck, ChatboxConfig, ChatboxError, ChatboxResult, Chooser, EventSink, Mode,
    StampedEvent, TransportAdapter, TransportError,
};

use super::state::{EngineState, EngineStats};
use crate::channel::{CommandOutcome, Request};
use crate::snapshot::EngineSnapshot;
use crate::telemetry::TelemetryTicker;

// ----------------------------------------------------------------------------
// Routing Engine
// ----------------------------------------------------------------------------

/// The task that owns all engine state and processes every input in order
pub struct RoutingEngine {
    /// Registry, conversations, stations and mode
    pub(crate) state: EngineState,
    pub(crate) config: ChatboxConfig,
    /// Adapter driven while in simulated mode
    pub(crate) simulated: Box<dyn TransportAdapter>,
    /// Adapter driven while in real mode, if one was provided
    pub(crate) real: Option<Box<dyn TransportAdapter>>,
    /// Consulted before the real transport is started
    pub(crate) capability: Arc<dyn CapabilityCheck>,
    /// Randomness for station perturbations
    pub(crate) telemetry_chooser: Box<dyn Chooser>,
    pub(crate) ticker: Option<TelemetryTicker>,
    /// Kept so transports can be handed fresh sinks
    event_sender: mpsc::UnboundedSender<StampedEvent>,
    event_receiver: mpsc::UnboundedReceiver<StampedEvent>,
    pub(crate) tick_sender: mpsc::UnboundedSender<u64>,
    tick_receiver: mpsc::UnboundedReceiver<u64>,
    /// Commands from engine handles
    command_receiver: mpsc::Receiver<Request>,
    snapshot_sender: watch::Sender<Arc<EngineSnapshot>>,
    /// Whether the task should continue running
    pub(crate) running: bool,
}

impl RoutingEngine {
    pub fn new(
        config: ChatboxConfig,
        simulated: Box<dyn TransportAdapter>,
        real: Option<Box<dyn TransportAdapter>>,
        capability: Arc<dyn CapabilityCheck>,
        telemetry_chooser: Box<dyn Chooser>,
        command_receiver: mpsc::Receiver<Request>,
        snapshot_sender: watch::Sender<Arc<EngineSnapshot>>,
    ) -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let (tick_sender, tick_receiver) = mpsc::unbounded_channel();

        Self {
            state: EngineState::new(&config),
            config,
            simulated,
            real,
            capability,
            telemetry_chooser,
            ticker: None,
            event_sender,
            event_receiver,
            tick_sender,
            tick_receiver,
            command_receiver,
            snapshot_sender,
            running: true,
        }
    }

    /// Activate the configured initial mode and publish the first snapshot
    ///
    /// A real initial mode that cannot be activated falls back to simulation.
    pub async fn start(&mut self) {
        let initial = self.state.mode;
        info!("Routing engine starting in {} mode", initial);

        if initial == Mode::Real {
            if let Err(e) = self.real_mode_available() {
                warn!("Falling back to simulation: {}", e);
                self.state.notice(Self::unavailable_notice(&e));
                self.state.mode = Mode::Simulated;
            }
        }
        self.activate().await;
        self.drain_events().await;
        self.publish();
    }

    /// Run the coordination loop until shutdown or until every handle is gone
    pub async fn run(mut self) -> ChatboxResult<()> {
        info!("Routing engine running (generation {})", self.state.generation);

        while self.running {
            tokio::select! {
                biased;

                // Transport events first so a command never overtakes the
                // events that preceded it
                Some(stamped) = self.event_receiver.recv() => {
                    self.process_event(stamped).await;
                    self.publish();
                }

                Some(generation) = self.tick_receiver.recv() => {
                    self.process_tick(generation);
                    self.publish();
                }

                request = self.command_receiver.recv() => {
                    match request {
                        Some(Request { command, ack }) => {
                            let outcome = self.process_command(command).await;
                            self.drain_events().await;
                            self.publish();
                            if ack.send(outcome).is_err() {
                                debug!("Command caller went away before acknowledgement");
                            }
                        }
                        None => {
                            info!("Command channel closed, shutting down");
                            self.teardown().await;
                            self.publish();
                            break;
                        }
                    }
                }
            }
        }

        info!(
            "Routing engine stopped after {} commands and {} events",
            self.state.stats.commands_processed, self.state.stats.events_processed
        );
        Ok(())
    }

    /// Apply every transport event already queued
    pub(crate) async fn drain_events(&mut self) {
        while let Ok(stamped) = self.event_receiver.try_recv() {
            self.process_event(stamped).await;
        }
    }

    /// Fresh sink stamped with the current generation
    pub(crate) fn event_sink(&self) -> EventSink {
        EventSink::new(self.state.generation, self.event_sender.clone())
    }

    /// Publish a snapshot if anything observable changed
    pub(crate) fn publish(&self) {
        let snapshot = self
            .state
            .snapshot(self.config.telemetry.proximity_threshold);
        self.snapshot_sender.send_if_modified(|current| {
            if **current == snapshot {
                false
            } else {
                *current = Arc::new(snapshot);
                true
            }
        });
    }

    /// Initial snapshot for a watch channel, before the engine exists
    pub fn initial_snapshot(config: &ChatboxConfig) -> Arc<EngineSnapshot> {
        Arc::new(EngineState::new(config).snapshot(config.telemetry.proximity_threshold))
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.state.stats
    }

    /// The adapter for the current mode
    pub(crate) fn active_transport(&mut self) -> Option<&mut Box<dyn TransportAdapter>> {
        match self.state.mode {
            Mode::Simulated => Some(&mut self.simulated),
            Mode::Real => self.real.as_mut(),
        }
    }

    /// Ok when real mode may be entered
    pub(crate) fn real_mode_available(&self) -> ChatboxResult<()> {
        if !self.capability.is_granted() {
            return Err(ChatboxError::CapabilityDenied { mode: Mode::Real });
        }
        if self.real.is_none() {
            return Err(TransportError::Unavailable {
                reason: "no real transport configured".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Notice shown when real mode cannot be entered
    pub(crate) fn unavailable_notice(error: &ChatboxError) -> &'static str {
        match error {
            ChatboxError::CapabilityDenied { .. } => "Permission denied: real network unavailable",
            _ => "No real transport available",
        }
    }

    /// Acknowledge a command outcome in the log
    pub(crate) fn log_outcome(command: &str, outcome: &CommandOutcome) {
        match outcome {
            CommandOutcome::Applied => debug!("{} applied", command),
            CommandOutcome::Ignored => debug!("{} ignored", command),
            CommandOutcome::Notified(notice) => debug!("{} answered with notice: {}", command, notice),
        }
    }
}
