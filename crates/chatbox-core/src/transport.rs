//! Transport adapter contract
//!
//! The routing engine drives exactly one [`TransportAdapter`] at a time. The
//! real wireless stack and the simulated transport both implement it.
//! Lifecycle and payload occurrences flow back to the engine as
//! [`TransportEvent`]s through an [`EventSink`] handed over in `begin()`.
//!
//! Every event is stamped with the generation of the sink that carried it, so
//! the engine can discard anything emitted by a transport it has since torn
//! down.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::TransportError;
use crate::types::PeerId;

// ----------------------------------------------------------------------------
// Transport Events
// ----------------------------------------------------------------------------

/// Asynchronous occurrences reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An endpoint advertising our service was discovered
    PeerFound { peer_id: PeerId, name: String },
    /// A previously discovered endpoint is no longer visible
    PeerLost { peer_id: PeerId },
    /// A connection with this endpoint is being negotiated
    ConnectionRequested { peer_id: PeerId, name: String },
    /// Outcome of a connection negotiation
    ConnectionResult {
        peer_id: PeerId,
        success: bool,
        reason: Option<String>,
    },
    /// An established connection dropped
    Disconnected { peer_id: PeerId },
    /// A payload arrived from a connected endpoint
    PayloadReceived { from: PeerId, payload: Vec<u8> },
}

impl TransportEvent {
    /// Peer the event concerns
    pub fn peer_id(&self) -> &PeerId {
        match self {
            TransportEvent::PeerFound { peer_id, .. }
            | TransportEvent::PeerLost { peer_id }
            | TransportEvent::ConnectionRequested { peer_id, .. }
            | TransportEvent::ConnectionResult { peer_id, .. }
            | TransportEvent::Disconnected { peer_id } => peer_id,
            TransportEvent::PayloadReceived { from, .. } => from,
        }
    }
}

/// A transport event tagged with the generation that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampedEvent {
    pub generation: u64,
    pub event: TransportEvent,
}

// ----------------------------------------------------------------------------
// Event Sink
// ----------------------------------------------------------------------------

/// Generation-stamped sender handed to a transport when it begins
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    sender: mpsc::UnboundedSender<StampedEvent>,
}

impl EventSink {
    pub fn new(generation: u64, sender: mpsc::UnboundedSender<StampedEvent>) -> Self {
        Self { generation, sender }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver an event; returns `false` once the engine has gone away
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.sender
            .send(StampedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// ----------------------------------------------------------------------------
// Transport Adapter
// ----------------------------------------------------------------------------

/// Capabilities required of any transport the engine can drive
///
/// Implementations must not block: `send` is best-effort and returns as soon
/// as the payload is handed off. Failures are reported, never retried here.
#[async_trait]
pub trait TransportAdapter: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether `begin()` has been called without a matching `end()`
    fn is_active(&self) -> bool;

    /// Start advertising and discovery. Idempotent while active.
    async fn begin(&mut self, sink: EventSink) -> Result<(), TransportError>;

    /// Stop all activity and release resources. Idempotent.
    async fn end(&mut self) -> Result<(), TransportError>;

    /// Hand one payload to every listed peer
    async fn send(&mut self, peers: &[PeerId], payload: Vec<u8>) -> Result<(), TransportError>;

    /// Ask to connect to a discovered endpoint
    async fn request_connection(&mut self, _peer: &PeerId) -> Result<(), TransportError> {
        Ok(())
    }

    /// Accept an inbound connection request
    async fn accept_connection(&mut self, _peer: &PeerId) -> Result<(), TransportError> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Capability Check
// ----------------------------------------------------------------------------

/// Gate consulted before the real transport may be activated
pub trait CapabilityCheck: Send + Sync {
    fn is_granted(&self) -> bool;
}

/// Capability check that always passes
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl CapabilityCheck for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }
}

impl<F> CapabilityCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_granted(&self) -> bool {
        self()
    }
}
