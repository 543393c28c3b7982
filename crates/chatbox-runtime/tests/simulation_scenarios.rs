//! Integration Tests for Simulated Mode
//!
//! Drives a full engine with the simulated transport and the telemetry ticker.
//! Time is paused, so reply delays and ticks elapse deterministically as soon
//! as the runtime is otherwise idle.

use std::time::Duration;

use chatbox_core::config::SimulationConfig;
use chatbox_runtime::testing::MockTransport;
use chatbox_runtime::{
    ChatboxConfig, ChatboxError, CommandOutcome, EngineBuilder, EngineHandle, FixedChooser, Mode,
    PeerId, PeerState,
};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

const SIM_NAMES: [&str; 3] = ["Laura", "Nico", "Sara"];

async fn start_simulated() -> EngineHandle {
    EngineBuilder::new(ChatboxConfig::testing())
        .build_and_start()
        .await
        .expect("engine should start")
}

async fn start_fixed() -> EngineHandle {
    EngineBuilder::new(ChatboxConfig::testing())
        .with_simulation_chooser(FixedChooser::new())
        .with_telemetry_chooser(FixedChooser::new())
        .build_and_start()
        .await
        .expect("engine should start")
}

// ----------------------------------------------------------------------------
// Startup
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_engine_starts_with_connected_simulated_peers() {
    let handle = start_simulated().await;
    let snapshot = handle.snapshot();

    assert_eq!(snapshot.mode, Mode::Simulated);
    assert!(snapshot.transport_active);
    assert_eq!(snapshot.display_name, "Node-test-0000");

    let names: Vec<&str> = snapshot.peers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, SIM_NAMES);
    assert!(snapshot
        .peers
        .iter()
        .all(|p| p.simulated && p.state == PeerState::Connected));

    let notices: Vec<&str> = snapshot.notices().map(|m| m.body.as_str()).collect();
    assert_eq!(notices, vec!["Simulation ON"]);
    assert_eq!(snapshot.stations.len(), 3);
}

// ----------------------------------------------------------------------------
// Public and Direct Messages
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_public_message_gets_one_simulated_reply() {
    let handle = start_simulated().await;

    let outcome = handle.send_public("hello").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Applied);

    // Local echo is visible before any delay elapses
    let snapshot = handle.snapshot();
    let chat: Vec<_> = snapshot.public_chat().collect();
    assert_eq!(chat.len(), 1);
    assert_eq!(chat[0].body, "hello");
    assert_eq!(chat[0].sender, "Node-test-0000");
    assert!(chat[0].is_local());

    let snapshot = handle
        .wait_for(|s| s.public_chat().count() == 2)
        .await
        .unwrap();
    let reply = snapshot.public_chat().nth(1).unwrap();
    assert!(!reply.is_local());
    assert!(SIM_NAMES.contains(&reply.sender.as_str()));
    assert!(SimulationConfig::default()
        .public_replies
        .contains(&reply.body));

    // Exactly one reply, even after plenty of time
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.snapshot().public_chat().count(), 2);
    assert!(handle.snapshot().direct.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_direct_message_reply_stays_in_thread() {
    let handle = start_simulated().await;
    let sim_a = PeerId::new("SIM-A");

    let outcome = handle.send_direct("SIM-A", "hi").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Applied);

    let snapshot = handle.snapshot();
    let thread = snapshot.direct(&sim_a);
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].body, "hi");
    assert!(thread[0].is_local());

    let snapshot = handle
        .wait_for(|s| s.direct(&PeerId::new("SIM-A")).len() == 2)
        .await
        .unwrap();
    let reply = &snapshot.direct(&sim_a)[1];
    assert_eq!(reply.sender, "Laura");
    assert!(SimulationConfig::default()
        .direct_replies
        .contains(&reply.body));

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.direct.len(), 1);
    assert_eq!(snapshot.direct(&sim_a).len(), 2);
    assert_eq!(snapshot.public_chat().count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_chooser_picks_first_peer_and_reply() {
    let handle = start_fixed().await;
    handle.send_public("ping").await.unwrap();

    let snapshot = handle
        .wait_for(|s| s.public_chat().count() == 2)
        .await
        .unwrap();
    let reply = snapshot.public_chat().nth(1).unwrap();
    assert_eq!(reply.sender, "Laura");
    assert_eq!(reply.body, "ok!");
}

#[tokio::test(start_paused = true)]
async fn test_reply_arrives_after_configured_delay() {
    let handle = start_fixed().await;
    handle.send_public("ping").await.unwrap();

    // FixedChooser uses the lower bound of 500 ms
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert_eq!(handle.snapshot().public_chat().count(), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.snapshot().public_chat().count(), 2);
}

// ----------------------------------------------------------------------------
// Invalid Requests
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_blank_text_is_a_no_op() {
    let handle = start_simulated().await;
    let before = handle.snapshot();

    assert_eq!(handle.send_public("").await.unwrap(), CommandOutcome::Ignored);
    assert_eq!(
        handle.send_public("  \t ").await.unwrap(),
        CommandOutcome::Ignored
    );
    assert_eq!(
        handle.send_direct("SIM-A", "   ").await.unwrap(),
        CommandOutcome::Ignored
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    let after = handle.snapshot();
    assert_eq!(after.public, before.public);
    assert_eq!(after.direct, before.direct);
    assert_eq!(after.stats.messages_sent, 0);
}

#[tokio::test(start_paused = true)]
async fn test_direct_to_unknown_peer_creates_nothing() {
    let handle = start_simulated().await;

    let outcome = handle.send_direct("NOBODY", "hi").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Ignored);

    let snapshot = handle.snapshot();
    assert!(snapshot.direct.is_empty());
    assert_eq!(snapshot.notices().count(), 1);
}

// ----------------------------------------------------------------------------
// Mode Switching
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_set_mode_to_current_mode_changes_nothing() {
    let handle = start_simulated().await;
    let before = handle.snapshot();

    let outcome = handle.set_mode(Mode::Simulated).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Ignored);

    let after = handle.snapshot();
    assert_eq!(after.mode, before.mode);
    assert_eq!(after.generation, before.generation);
    assert_eq!(after.transport_active, before.transport_active);
    assert_eq!(after.peers, before.peers);
    assert_eq!(after.public, before.public);
}

#[tokio::test(start_paused = true)]
async fn test_pending_reply_is_discarded_after_mode_switch() {
    let (mock, probe) = MockTransport::new();
    let handle = EngineBuilder::new(ChatboxConfig::testing())
        .with_real_transport(mock)
        .build_and_start()
        .await
        .unwrap();

    handle.send_public("hello").await.unwrap();
    handle.set_mode(Mode::Real).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.mode, Mode::Real);
    assert_eq!(snapshot.public_chat().count(), 1);
    assert!(snapshot.peers.iter().all(|p| !p.simulated));
    assert!(probe.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_simulation_repopulates_peers() {
    let (mock, _probe) = MockTransport::new();
    let handle = EngineBuilder::new(ChatboxConfig::testing())
        .with_real_transport(mock)
        .build_and_start()
        .await
        .unwrap();

    handle.set_mode(Mode::Real).await.unwrap();
    assert!(handle.snapshot().peers.is_empty());

    handle.set_mode(Mode::Simulated).await.unwrap();
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.peers.len(), 3);
    assert!(snapshot.peers.iter().all(|p| p.simulated && p.is_connected()));

    let notices: Vec<&str> = snapshot.notices().map(|m| m.body.as_str()).collect();
    assert_eq!(
        notices,
        vec![
            "Simulation ON",
            "Simulation OFF",
            "Auto-network: advertising + discovery",
            "Real network stopped",
            "Simulation ON",
        ]
    );
}

// ----------------------------------------------------------------------------
// Telemetry
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_tick_perturbs_only_nearby_stations() {
    let handle = start_fixed().await;

    let outcome = handle.set_proximity(10.0).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Applied);

    let before = handle.snapshot();
    let near: Vec<&str> = before
        .stations
        .iter()
        .filter(|v| v.near)
        .map(|v| v.station.id.as_str())
        .collect();
    assert_eq!(near, vec!["ST-002"]);

    let after = handle
        .wait_for(|s| s.stats.telemetry_ticks == 1)
        .await
        .unwrap();
    let available: Vec<u32> = after.stations.iter().map(|v| v.station.available).collect();
    // FixedChooser steps by +1; only the station at 12 is within range of 10
    assert_eq!(available, vec![6, 15, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_tick_snapshot_shares_message_history() {
    let handle = start_fixed().await;
    handle.send_direct("SIM-A", "hi").await.unwrap();
    let before = handle
        .wait_for(|s| s.direct(&PeerId::new("SIM-A")).len() == 2)
        .await
        .unwrap();

    let ticks = before.stats.telemetry_ticks;
    let after = handle
        .wait_for(|s| s.stats.telemetry_ticks > ticks)
        .await
        .unwrap();

    assert!(std::sync::Arc::ptr_eq(&after.public, &before.public));
    assert!(std::sync::Arc::ptr_eq(
        &after.direct[&PeerId::new("SIM-A")],
        &before.direct[&PeerId::new("SIM-A")]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_stop_outside_simulation() {
    let (mock, _probe) = MockTransport::new();
    let handle = EngineBuilder::new(ChatboxConfig::testing().with_proximity(12.0))
        .with_real_transport(mock)
        .with_telemetry_chooser(FixedChooser::new())
        .build_and_start()
        .await
        .unwrap();

    handle.set_mode(Mode::Real).await.unwrap();
    let before = handle.snapshot();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let after = handle.snapshot();
    assert_eq!(after.stats.telemetry_ticks, 0);
    assert_eq!(after.stations, before.stations);
}

#[tokio::test(start_paused = true)]
async fn test_proximity_is_clamped_and_nan_ignored() {
    let handle = start_simulated().await;

    handle.set_proximity(99.0).await.unwrap();
    assert_eq!(handle.snapshot().proximity, 30.0);

    handle.set_proximity(-4.0).await.unwrap();
    assert_eq!(handle.snapshot().proximity, 0.0);

    let outcome = handle.set_proximity(f32::NAN).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Ignored);
    assert_eq!(handle.snapshot().proximity, 0.0);
}

// ----------------------------------------------------------------------------
// Shutdown
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_engine_and_pending_work() {
    let handle = start_simulated().await;
    handle.send_public("bye").await.unwrap();

    handle.shutdown().await.unwrap();
    assert!(!handle.is_running());

    let snapshot = handle.snapshot();
    assert!(!snapshot.transport_active);
    assert_eq!(snapshot.public_chat().count(), 1);

    let result = handle.send_public("anyone?").await;
    assert!(matches!(result, Err(ChatboxError::EngineStopped)));

    // A second shutdown is harmless
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_engine() {
    let handle = start_simulated().await;
    let mut updates = handle.subscribe();
    drop(handle);

    // The sender side goes away once the engine task has exited
    while updates.changed().await.is_ok() {}
    assert!(!updates.borrow().transport_active);
}
