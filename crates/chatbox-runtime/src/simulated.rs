//! Simulated transport
//!
//! Stands in for the wireless stack with a static roster of synthetic peers.
//! `begin()` reports every roster peer as found and connected. Each send is
//! answered with one canned reply after a short delay: a public line is
//! answered by one randomly chosen recipient, a direct line by the peer it
//! was addressed to. `end()` aborts every pending reply.

use async_trait::async_trait;
use tokio::task::JoinHandle;

use chatbox_core::config::SimulationConfig;
use chatbox_core::wire::WireRecord;
use chatbox_core::{
    Chooser, EventSink, MessageId, PeerId, Scope, TransportAdapter, TransportError,
    TransportEvent,
};

/// Transport that fabricates peers and replies
pub struct SimulatedTransport {
    config: SimulationConfig,
    /// Our own id, used as the target of direct replies
    local_id: PeerId,
    chooser: Box<dyn Chooser>,
    sink: Option<EventSink>,
    pending: Vec<JoinHandle<()>>,
}

impl SimulatedTransport {
    pub fn new(config: SimulationConfig, local_id: PeerId, chooser: Box<dyn Chooser>) -> Self {
        Self {
            config,
            local_id,
            chooser,
            sink: None,
            pending: Vec::new(),
        }
    }

    /// Roster ids in configured order
    pub fn roster(&self) -> Vec<PeerId> {
        self.config
            .peers
            .iter()
            .map(|p| PeerId::new(p.id.as_str()))
            .collect()
    }

    /// Number of replies scheduled but not yet delivered
    pub fn pending_replies(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    fn schedule_reply(&mut self, sink: EventSink, from: PeerId, record: WireRecord, delay: std::time::Duration) {
        tracing::debug!(
            "Simulated reply from {} scheduled in {:?} (generation {})",
            from,
            delay,
            sink.generation()
        );
        let payload = record.encode();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !sink.emit(TransportEvent::PayloadReceived { from, payload }) {
                tracing::debug!("Engine gone before simulated reply could be delivered");
            }
        });
        self.pending.retain(|h| !h.is_finished());
        self.pending.push(handle);
    }
}

#[async_trait]
impl TransportAdapter for SimulatedTransport {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    async fn begin(&mut self, sink: EventSink) -> Result<(), TransportError> {
        if self.sink.is_some() {
            return Ok(());
        }

        for peer in &self.config.peers {
            let peer_id = PeerId::new(peer.id.as_str());
            sink.emit(TransportEvent::PeerFound {
                peer_id: peer_id.clone(),
                name: peer.name.clone(),
            });
            sink.emit(TransportEvent::ConnectionResult {
                peer_id,
                success: true,
                reason: None,
            });
        }

        tracing::info!(
            "Simulated transport started with {} peers (generation {})",
            self.config.peers.len(),
            sink.generation()
        );
        self.sink = Some(sink);
        Ok(())
    }

    async fn end(&mut self) -> Result<(), TransportError> {
        let aborted = self.pending_replies();
        for handle in self.pending.drain(..) {
            handle.abort();
        }
        if self.sink.take().is_some() {
            tracing::info!("Simulated transport stopped ({} pending replies aborted)", aborted);
        }
        Ok(())
    }

    async fn send(&mut self, peers: &[PeerId], payload: Vec<u8>) -> Result<(), TransportError> {
        let sink = self.sink.clone().ok_or_else(|| TransportError::Unavailable {
            reason: "simulation is not running".to_string(),
        })?;

        let record = WireRecord::decode(&payload).map_err(|e| TransportError::SendFailed {
            peer_count: peers.len(),
            reason: e.to_string(),
        })?;

        let roster = self.roster();
        let recipients: Vec<PeerId> = peers
            .iter()
            .filter(|id| roster.contains(id))
            .cloned()
            .collect();
        if recipients.is_empty() {
            return Err(TransportError::PeerNotFound {
                peer_id: peers
                    .first()
                    .map(PeerId::to_string)
                    .unwrap_or_else(|| "<none>".to_string()),
            });
        }

        let chooser = &mut self.chooser;
        let (from, pool, bounds) = match record.scope {
            Scope::Public => (
                recipients[chooser.index(recipients.len())].clone(),
                &self.config.public_replies,
                self.config.public_delay_bounds(),
            ),
            Scope::Direct => (
                record
                    .target
                    .clone()
                    .filter(|target| recipients.contains(target))
                    .unwrap_or_else(|| recipients[0].clone()),
                &self.config.direct_replies,
                self.config.direct_delay_bounds(),
            ),
        };
        let text = pool
            .get(chooser.index(pool.len()))
            .cloned()
            .ok_or_else(|| TransportError::SendFailed {
                peer_count: recipients.len(),
                reason: "no canned replies configured".to_string(),
            })?;
        let delay = chooser.delay(bounds.0, bounds.1);

        let reply = match record.scope {
            Scope::Public => WireRecord::public(MessageId::generate(), text),
            Scope::Direct => WireRecord::direct(self.local_id.clone(), MessageId::generate(), text),
        };
        self.schedule_reply(sink, from, reply, delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatbox_core::{FixedChooser, StampedEvent};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn transport(chooser: FixedChooser) -> SimulatedTransport {
        SimulatedTransport::new(
            SimulationConfig::default(),
            PeerId::new("Node-test"),
            Box::new(chooser),
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StampedEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(stamped) = rx.try_recv() {
            events.push(stamped.event);
        }
        events
    }

    #[tokio::test]
    async fn test_begin_reports_roster_connected() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sim = transport(FixedChooser::new());

        sim.begin(EventSink::new(1, tx.clone())).await.unwrap();
        // Second begin is a no-op
        sim.begin(EventSink::new(1, tx)).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 6);
        assert_eq!(
            events[0],
            TransportEvent::PeerFound {
                peer_id: PeerId::new("SIM-A"),
                name: "Laura".to_string(),
            }
        );
        assert!(matches!(
            events[1],
            TransportEvent::ConnectionResult { success: true, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_reply_comes_from_addressed_peer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sim = transport(FixedChooser::new().with_index(1));
        sim.begin(EventSink::new(4, tx)).await.unwrap();
        drain(&mut rx);

        let sim_b = PeerId::new("SIM-B");
        let record = WireRecord::direct(sim_b.clone(), MessageId::generate(), "hi");
        sim.send(&[sim_b.clone()], record.encode()).await.unwrap();

        let stamped = rx.recv().await.unwrap();
        assert_eq!(stamped.generation, 4);
        match stamped.event {
            TransportEvent::PayloadReceived { from, payload } => {
                assert_eq!(from, sim_b);
                let reply = WireRecord::decode(&payload).unwrap();
                assert_eq!(reply.scope, Scope::Direct);
                assert_eq!(reply.body, "te leo");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_aborts_pending_replies() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sim = transport(FixedChooser::new());
        sim.begin(EventSink::new(1, tx)).await.unwrap();
        drain(&mut rx);

        let record = WireRecord::public(MessageId::generate(), "hello");
        sim.send(&sim.roster(), record.encode()).await.unwrap();
        assert_eq!(sim.pending_replies(), 1);

        sim.end().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(drain(&mut rx).is_empty());
        assert!(!sim.is_active());
    }

    #[tokio::test]
    async fn test_send_requires_begin() {
        let mut sim = transport(FixedChooser::new());
        let record = WireRecord::public(MessageId::generate(), "hello");
        let result = sim.send(&sim.roster(), record.encode()).await;
        assert!(matches!(result, Err(TransportError::Unavailable { .. })));
    }
}
