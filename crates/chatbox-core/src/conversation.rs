//! Conversation stores
//!
//! One insertion-ordered public stream plus one insertion-ordered thread per
//! peer for direct messages. Every message lives in exactly one of them.
//! Nothing is evicted; the log lives as long as the process.
//!
//! Threads are held behind `Arc` so consumers can share them without copying.
//! Appending copies a thread only while an older snapshot still holds it, and
//! threads that did not change keep their allocation.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{ChatMessage, MessageCategory, MessageOrigin, PeerId};

/// Public stream and direct threads owned by the routing engine
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    public: Arc<Vec<ChatMessage>>,
    direct: BTreeMap<PeerId, Arc<Vec<ChatMessage>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the public stream
    ///
    /// Remote user messages whose id is already present are dropped. Returns
    /// whether the message was stored.
    pub fn push_public(&mut self, message: ChatMessage) -> bool {
        append(&mut self.public, message)
    }

    /// Append to one peer's direct thread, creating it on first use
    pub fn push_direct(&mut self, peer: &PeerId, message: ChatMessage) -> bool {
        let thread = self.direct.entry(peer.clone()).or_default();
        append(thread, message)
    }

    /// Append a locally generated notice to the public stream
    pub fn notice(&mut self, text: impl Into<String>) {
        Arc::make_mut(&mut self.public).push(ChatMessage::system(text));
    }

    pub fn public(&self) -> &[ChatMessage] {
        &self.public
    }

    pub fn direct(&self, peer: &PeerId) -> &[ChatMessage] {
        self.direct
            .get(peer)
            .map(|thread| thread.as_slice())
            .unwrap_or_default()
    }

    /// Shared handle to the public stream
    pub fn shared_public(&self) -> Arc<Vec<ChatMessage>> {
        Arc::clone(&self.public)
    }

    /// Shared handles to every direct thread, ordered by peer id
    pub fn shared_direct(&self) -> BTreeMap<PeerId, Arc<Vec<ChatMessage>>> {
        self.direct.clone()
    }

    /// Total number of stored messages across every thread
    pub fn len(&self) -> usize {
        self.public.len() + self.direct.values().map(|t| t.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn append(thread: &mut Arc<Vec<ChatMessage>>, message: ChatMessage) -> bool {
    let deduplicate =
        message.origin == MessageOrigin::Remote && message.category == MessageCategory::User;
    if deduplicate && thread.iter().any(|m| m.id == message.id) {
        tracing::debug!("Dropping duplicate message {}", message.id);
        return false;
    }
    Arc::make_mut(thread).push(message);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageId;

    #[test]
    fn test_messages_land_in_exactly_one_thread() {
        let mut store = ConversationStore::new();
        let laura = PeerId::new("SIM-A");
        let nico = PeerId::new("SIM-B");

        store.push_public(ChatMessage::local("Me", "hello all"));
        store.push_direct(&laura, ChatMessage::local("Me", "hi"));

        assert_eq!(store.public().len(), 1);
        assert_eq!(store.direct(&laura).len(), 1);
        assert!(store.direct(&nico).is_empty());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remote_duplicates_are_dropped() {
        let mut store = ConversationStore::new();
        let id = MessageId::new("dup00001");

        assert!(store.push_public(ChatMessage::remote(id.clone(), "Ana", "one")));
        assert!(!store.push_public(ChatMessage::remote(id, "Ana", "one again")));
        assert_eq!(store.public().len(), 1);
    }

    #[test]
    fn test_same_id_in_different_threads_is_kept() {
        let mut store = ConversationStore::new();
        let id = MessageId::new("shared01");

        assert!(store.push_direct(&PeerId::new("A"), ChatMessage::remote(id.clone(), "a", "x")));
        assert!(store.push_direct(&PeerId::new("B"), ChatMessage::remote(id, "b", "x")));
    }

    #[test]
    fn test_notices_go_to_public_stream() {
        let mut store = ConversationStore::new();
        store.notice("Simulation ON");
        assert!(store.public()[0].is_system());
        assert!(store.shared_direct().is_empty());
    }

    #[test]
    fn test_untouched_threads_keep_their_allocation() {
        let mut store = ConversationStore::new();
        let laura = PeerId::new("SIM-A");
        store.push_public(ChatMessage::local("Me", "hello"));
        store.push_direct(&laura, ChatMessage::local("Me", "hi"));

        let public = store.shared_public();
        let direct = store.shared_direct();
        store.push_direct(&laura, ChatMessage::local("Me", "again"));

        assert!(Arc::ptr_eq(&public, &store.shared_public()));
        assert!(!Arc::ptr_eq(&direct[&laura], &store.shared_direct()[&laura]));
        assert_eq!(direct[&laura].len(), 1);
        assert_eq!(store.direct(&laura).len(), 2);
    }
}
