//! Mock Transport for Testing
//!
//! A scriptable [`TransportAdapter`] standing in for the real wireless stack.
//! The [`MockTransportProbe`] returned alongside it lets a test inject
//! transport events, make calls fail, and inspect what the engine asked the
//! transport to do.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use chatbox_core::{EventSink, PeerId, TransportAdapter, TransportError, TransportEvent};

// ----------------------------------------------------------------------------
// Shared State
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockState {
    sink: Option<EventSink>,
    sent: Vec<(Vec<PeerId>, Vec<u8>)>,
    begins: usize,
    ends: usize,
    fail_begin: bool,
    fail_send: bool,
    fail_connect: bool,
    requested: Vec<PeerId>,
    accepted: Vec<PeerId>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    // A panicking test thread must not hide the recorded calls
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ----------------------------------------------------------------------------
// Mock Transport
// ----------------------------------------------------------------------------

/// Transport adapter whose behaviour is driven by a [`MockTransportProbe`]
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockTransportProbe) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockTransportProbe { state },
        )
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_active(&self) -> bool {
        lock(&self.state).sink.is_some()
    }

    async fn begin(&mut self, sink: EventSink) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.begins += 1;
        if state.fail_begin {
            return Err(TransportError::Unavailable {
                reason: "mock begin failure".to_string(),
            });
        }
        if state.sink.is_none() {
            debug!("Mock transport started (generation {})", sink.generation());
            state.sink = Some(sink);
        }
        Ok(())
    }

    async fn end(&mut self) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.ends += 1;
        state.sink = None;
        Ok(())
    }

    async fn send(&mut self, peers: &[PeerId], payload: Vec<u8>) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if state.fail_send {
            return Err(TransportError::SendFailed {
                peer_count: peers.len(),
                reason: "mock send failure".to_string(),
            });
        }
        state.sent.push((peers.to_vec(), payload));
        Ok(())
    }

    async fn request_connection(&mut self, peer: &PeerId) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state.requested.push(peer.clone());
        if state.fail_connect {
            return Err(TransportError::ConnectionFailed {
                peer_id: peer.to_string(),
                reason: "mock connect failure".to_string(),
            });
        }
        Ok(())
    }

    async fn accept_connection(&mut self, peer: &PeerId) -> Result<(), TransportError> {
        lock(&self.state).accepted.push(peer.clone());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Probe
// ----------------------------------------------------------------------------

/// Test-side view of a [`MockTransport`]
#[derive(Debug, Clone)]
pub struct MockTransportProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockTransportProbe {
    /// Deliver an event through the current sink; `false` when not started
    pub fn emit(&self, event: TransportEvent) -> bool {
        lock(&self.state)
            .sink
            .as_ref()
            .is_some_and(|sink| sink.emit(event))
    }

    /// Current sink; a clone keeps emitting after `end()` with its old generation
    pub fn sink(&self) -> Option<EventSink> {
        lock(&self.state).sink.clone()
    }

    pub fn sent(&self) -> Vec<(Vec<PeerId>, Vec<u8>)> {
        lock(&self.state).sent.clone()
    }

    pub fn begin_count(&self) -> usize {
        lock(&self.state).begins
    }

    pub fn end_count(&self) -> usize {
        lock(&self.state).ends
    }

    pub fn requested(&self) -> Vec<PeerId> {
        lock(&self.state).requested.clone()
    }

    pub fn accepted(&self) -> Vec<PeerId> {
        lock(&self.state).accepted.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).sink.is_some()
    }

    pub fn set_fail_begin(&self, fail: bool) {
        lock(&self.state).fail_begin = fail;
    }

    pub fn set_fail_send(&self, fail: bool) {
        lock(&self.state).fail_send = fail;
    }

    /// Make `request_connection` fail
    pub fn set_fail_connect(&self, fail: bool) {
        lock(&self.state).fail_connect = fail;
    }
}
