//! Property-based tests for the registry and the wire codec
//!
//! These verify the identity invariants of the peer registry and that decoding
//! a well-formed record preserves every field, including bodies that contain
//! the delimiter, and that a well-formed raw record re-encodes to its own bytes.

use chatbox_core::{
    MessageId, PeerFilter, PeerId, PeerRegistry, PeerState, Scope, WireRecord,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn arb_peer_id() -> impl Strategy<Value = PeerId> {
    prop::string::string_regex("[A-Z0-9-]{1,6}")
        .unwrap()
        .prop_map(PeerId::new)
}

fn arb_state() -> impl Strategy<Value = PeerState> {
    prop_oneof![
        Just(PeerState::Discovered),
        Just(PeerState::Connecting),
        Just(PeerState::Connected),
        Just(PeerState::Disconnected),
    ]
}

/// Free text that may contain the delimiter
fn arb_body() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 |!?.]{0,64}").unwrap()
}

fn arb_message_id() -> impl Strategy<Value = MessageId> {
    prop::string::string_regex("[a-f0-9]{1,8}")
        .unwrap()
        .prop_map(MessageId::new)
}

/// Raw well-formed record text, built field by field
fn arb_raw_record() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("PUBLIC"), Just("DM")],
        prop_oneof![Just("*".to_string()), "[A-Z0-9-]{1,6}"],
        "[a-f0-9]{1,8}",
        arb_body(),
    )
        .prop_map(|(scope, target, id, body)| {
            format!("CHAT|{}|{}|{}|{}", scope, target, id, body)
        })
}

proptest! {
    /// Property: at most one record per id, whatever the upsert sequence
    #[test]
    fn registry_holds_one_record_per_id(
        ops in prop::collection::vec((arb_peer_id(), arb_state(), any::<bool>()), 0..64)
    ) {
        let mut registry = PeerRegistry::new();
        for (id, state, simulated) in &ops {
            registry.upsert(id.clone(), format!("name-{}", id), *state, *simulated);
        }

        let distinct: HashSet<&PeerId> = ops.iter().map(|(id, _, _)| id).collect();
        let ids = registry.ids(PeerFilter::all());
        let unique: HashSet<&PeerId> = ids.iter().collect();

        prop_assert_eq!(registry.len(), distinct.len());
        prop_assert_eq!(ids.len(), unique.len());
    }

    /// Property: the last upsert for an id wins
    #[test]
    fn registry_keeps_latest_fields(
        id in arb_peer_id(),
        first in arb_state(),
        second in arb_state(),
    ) {
        let mut registry = PeerRegistry::new();
        registry.upsert(id.clone(), "first", first, true);
        registry.upsert(id.clone(), "second", second, false);

        let peer = registry.get(&id).unwrap();
        prop_assert_eq!(&peer.name, "second");
        prop_assert_eq!(peer.state, second);
        prop_assert!(!peer.simulated);
    }

    /// Property: purging one origin leaves none of it behind
    #[test]
    fn purge_removes_every_matching_origin(
        ops in prop::collection::vec((arb_peer_id(), any::<bool>()), 0..32)
    ) {
        let mut registry = PeerRegistry::new();
        for (id, simulated) in &ops {
            registry.upsert(id.clone(), "p", PeerState::Connected, *simulated);
        }

        registry.remove_where(|p| p.simulated);
        prop_assert!(registry.query(PeerFilter::all().simulated()).is_empty());
        prop_assert_eq!(registry.len(), registry.query(PeerFilter::all().real()).len());
    }

    /// Property: decoding a well-formed public record preserves its fields
    #[test]
    fn public_record_fields_survive(id in arb_message_id(), body in arb_body()) {
        let record = WireRecord::public(id.clone(), body.clone());
        let decoded = WireRecord::decode(&record.encode()).unwrap();

        prop_assert_eq!(decoded.scope, Scope::Public);
        prop_assert_eq!(decoded.target, None);
        prop_assert_eq!(decoded.id, id);
        prop_assert_eq!(decoded.body, body);
    }

    /// Property: direct records keep their target
    #[test]
    fn direct_record_fields_survive(
        target in arb_peer_id(),
        id in arb_message_id(),
        body in arb_body(),
    ) {
        let record = WireRecord::direct(target.clone(), id, body);
        let decoded = WireRecord::decode(&record.encode()).unwrap();
        prop_assert_eq!(decoded, record);
    }

    /// Property: a well-formed raw record re-encodes to the same bytes
    #[test]
    fn raw_records_reencode_unchanged(raw in arb_raw_record()) {
        let decoded = WireRecord::decode(raw.as_bytes()).unwrap();
        prop_assert_eq!(decoded.encode(), raw.into_bytes());
    }

    /// Property: fewer than five fields never yields a record
    #[test]
    fn short_records_are_discarded(fields in prop::collection::vec("[A-Za-z0-9*]{0,6}", 0..4)) {
        let raw = fields.join("|");
        prop_assert!(WireRecord::try_decode(raw.as_bytes()).is_none());
    }
}
