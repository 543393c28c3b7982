//! Engine Builder API
//!
//! Provides a builder-style API for consumers (CLI, tests) to assemble the
//! routing engine with its transports and randomness sources, and the
//! [`EngineHandle`] through which they drive and observe it.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use chatbox_core::{
    AlwaysGranted, CapabilityCheck, ChatboxConfig, ChatboxError, ChatboxResult, Chooser, Mode,
    PeerId, RandomChooser, TransportAdapter,
};

use crate::channel::{Command, CommandOutcome, Request};
use crate::logic::RoutingEngine;
use crate::simulated::SimulatedTransport;
use crate::snapshot::EngineSnapshot;

// ----------------------------------------------------------------------------
// Engine Builder
// ----------------------------------------------------------------------------

/// Builder for the routing engine and its collaborators
pub struct EngineBuilder {
    config: ChatboxConfig,
    real_transport: Option<Box<dyn TransportAdapter>>,
    capability: Arc<dyn CapabilityCheck>,
    simulation_chooser: Option<Box<dyn Chooser>>,
    telemetry_chooser: Option<Box<dyn Chooser>>,
}

impl EngineBuilder {
    pub fn new(config: ChatboxConfig) -> Self {
        Self {
            config,
            real_transport: None,
            capability: Arc::new(AlwaysGranted),
            simulation_chooser: None,
            telemetry_chooser: None,
        }
    }

    /// Register the adapter driven in real mode
    pub fn with_real_transport<T>(mut self, transport: T) -> Self
    where
        T: TransportAdapter + 'static,
    {
        self.real_transport = Some(Box::new(transport));
        self
    }

    /// Predicate consulted before the real transport is started
    pub fn with_capability_check<C>(mut self, check: C) -> Self
    where
        C: CapabilityCheck + 'static,
    {
        self.capability = Arc::new(check);
        self
    }

    /// Randomness for simulated replies (defaults to the configured seed)
    pub fn with_simulation_chooser<C: Chooser>(mut self, chooser: C) -> Self {
        self.simulation_chooser = Some(Box::new(chooser));
        self
    }

    /// Randomness for station perturbations (defaults to the configured seed)
    pub fn with_telemetry_chooser<C: Chooser>(mut self, chooser: C) -> Self {
        self.telemetry_chooser = Some(Box::new(chooser));
        self
    }

    /// Validate the configuration, activate the initial mode and spawn the engine
    pub async fn build_and_start(self) -> ChatboxResult<EngineHandle> {
        self.config.validate()?;
        info!(
            "Building ChatBox engine for {} ({} simulated peers, {} stations)",
            self.config.identity.display_name,
            self.config.simulation.peers.len(),
            self.config.telemetry.stations.len()
        );

        let simulation_chooser = self.simulation_chooser.unwrap_or_else(|| {
            Box::new(RandomChooser::from_seed_option(self.config.simulation.seed))
        });
        let telemetry_chooser = self.telemetry_chooser.unwrap_or_else(|| {
            Box::new(RandomChooser::from_seed_option(self.config.telemetry.seed))
        });
        let simulated = SimulatedTransport::new(
            self.config.simulation.clone(),
            PeerId::new(self.config.identity.display_name.as_str()),
            simulation_chooser,
        );

        let (command_sender, command_receiver) =
            mpsc::channel(self.config.engine.command_buffer_size);
        let (snapshot_sender, snapshot_receiver) =
            watch::channel(RoutingEngine::initial_snapshot(&self.config));

        let mut engine = RoutingEngine::new(
            self.config,
            Box::new(simulated),
            self.real_transport,
            self.capability,
            telemetry_chooser,
            command_receiver,
            snapshot_sender,
        );
        engine.start().await;

        let task = tokio::spawn(engine.run());
        Ok(EngineHandle {
            commands: command_sender,
            snapshots: snapshot_receiver,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

// ----------------------------------------------------------------------------
// Engine Handle
// ----------------------------------------------------------------------------

/// Cloneable handle for driving and observing a running engine
///
/// Every command method resolves once the engine has applied the command, so
/// sequential calls are applied in call order. The engine stops on
/// [`EngineHandle::shutdown`] or once every handle has been dropped.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Request>,
    snapshots: watch::Receiver<Arc<EngineSnapshot>>,
    task: Arc<Mutex<Option<JoinHandle<ChatboxResult<()>>>>>,
}

impl EngineHandle {
    pub async fn send_public(&self, text: impl Into<String>) -> ChatboxResult<CommandOutcome> {
        self.request(Command::SendPublic { text: text.into() }).await
    }

    pub async fn send_direct(
        &self,
        peer_id: impl Into<PeerId>,
        text: impl Into<String>,
    ) -> ChatboxResult<CommandOutcome> {
        self.request(Command::SendDirect {
            peer_id: peer_id.into(),
            text: text.into(),
        })
        .await
    }

    pub async fn set_mode(&self, mode: Mode) -> ChatboxResult<CommandOutcome> {
        self.request(Command::SetMode { mode }).await
    }

    pub async fn start_transport(&self) -> ChatboxResult<CommandOutcome> {
        self.request(Command::StartTransport).await
    }

    pub async fn stop_transport(&self) -> ChatboxResult<CommandOutcome> {
        self.request(Command::StopTransport).await
    }

    pub async fn set_proximity(&self, value: f32) -> ChatboxResult<CommandOutcome> {
        self.request(Command::SetProximity { value }).await
    }

    /// Stop the engine and wait for its task to finish
    pub async fn shutdown(&self) -> ChatboxResult<()> {
        match self.request(Command::Shutdown).await {
            Ok(_) | Err(ChatboxError::EngineStopped) => {}
            Err(e) => return Err(e),
        }

        let task = self.task.lock().await.take();
        match task {
            Some(task) => task
                .await
                .map_err(|e| ChatboxError::channel(format!("engine task failed: {}", e)))?,
            None => Ok(()),
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<EngineSnapshot>> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies the predicate
    pub async fn wait_for<F>(&self, mut predicate: F) -> ChatboxResult<Arc<EngineSnapshot>>
    where
        F: FnMut(&EngineSnapshot) -> bool,
    {
        let mut receiver = self.snapshots.clone();
        let snapshot = receiver
            .wait_for(|snapshot| predicate(snapshot.as_ref()))
            .await
            .map_err(|_| ChatboxError::EngineStopped)?;
        Ok(Arc::clone(&snapshot))
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request(&self, command: Command) -> ChatboxResult<CommandOutcome> {
        let (request, ack) = Request::new(command);
        self.commands
            .send(request)
            .await
            .map_err(|_| ChatboxError::EngineStopped)?;
        ack.await.map_err(|_| ChatboxError::EngineStopped)
    }
}
