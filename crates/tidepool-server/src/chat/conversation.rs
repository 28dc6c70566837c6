//! Direct-message threads, keyed by the canonical unordered username pair.
//!
//! Canonicalization is the invariant that gives exactly one thread per
//! pair regardless of who initiates: both directions land on `(min, max)`.

use std::collections::HashMap;

use super::event::ChatMessage;

/// Canonical unordered pair — always `(min, max)` lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                first: a.to_owned(),
                second: b.to_owned(),
            }
        } else {
            Self {
                first: b.to_owned(),
                second: a.to_owned(),
            }
        }
    }

    /// The `"a|b"` form used by the durable snapshot.
    pub fn storage_key(&self) -> String {
        format!("{}|{}", self.first, self.second)
    }

    /// Parse the `"a|b"` form back. `None` when the separator is missing.
    pub fn parse(key: &str) -> Option<Self> {
        let (a, b) = key.split_once('|')?;
        Some(Self::new(a, b))
    }
}

/// Per-pair direct-message histories. Threads are created implicitly on
/// first message and never destroyed.
#[derive(Debug, Default)]
pub struct ConversationStore {
    threads: HashMap<PairKey, Vec<ChatMessage>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, a: &str, b: &str, message: ChatMessage) {
        self.threads
            .entry(PairKey::new(a, b))
            .or_default()
            .push(message);
    }

    /// Ordered history for a pair. Absence of a thread is a normal state,
    /// not a fault — an empty slice, never an error.
    pub fn history(&self, a: &str, b: &str) -> &[ChatMessage] {
        self.threads
            .get(&PairKey::new(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn export(&self) -> HashMap<PairKey, Vec<ChatMessage>> {
        self.threads.clone()
    }

    pub fn restore(&mut self, threads: impl IntoIterator<Item = (PairKey, Vec<ChatMessage>)>) {
        self.threads = threads.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn msg(from: &str, text: &str) -> ChatMessage {
        ChatMessage {
            from: from.into(),
            message: text.into(),
            group: None,
            sent_at: Utc::now(),
        }
    }

    // ── Pair canonicalization ────────────────────────────────────

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(PairKey::new("alice", "bob"), PairKey::new("bob", "alice"));
    }

    #[test]
    fn storage_key_sorts_lexicographically() {
        assert_eq!(PairKey::new("bob", "alice").storage_key(), "alice|bob");
        assert_eq!(PairKey::new("alice", "bob").storage_key(), "alice|bob");
    }

    #[test]
    fn storage_key_roundtrip() {
        let key = PairKey::new("carol", "alice");
        assert_eq!(PairKey::parse(&key.storage_key()), Some(key));
        assert_eq!(PairKey::parse("no-separator"), None);
    }

    #[test]
    fn self_conversation_is_one_thread() {
        let key = PairKey::new("alice", "alice");
        assert_eq!(key.storage_key(), "alice|alice");
    }

    // ── Threads ──────────────────────────────────────────────────

    #[test]
    fn both_directions_share_one_thread() {
        let mut store = ConversationStore::new();
        store.append("alice", "bob", msg("alice", "hi"));
        store.append("bob", "alice", msg("bob", "hey"));

        let history = store.history("alice", "bob");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from, "alice");
        assert_eq!(history[1].from, "bob");

        // Same thread seen from the other side.
        assert_eq!(store.history("bob", "alice"), history);
    }

    #[test]
    fn missing_thread_reads_empty() {
        let store = ConversationStore::new();
        assert!(store.history("alice", "bob").is_empty());
    }

    #[test]
    fn append_preserves_send_order() {
        let mut store = ConversationStore::new();
        for i in 0..5 {
            store.append("alice", "bob", msg("alice", &format!("m{i}")));
        }
        let texts: Vec<&str> = store
            .history("alice", "bob")
            .iter()
            .map(|m| m.message.as_str())
            .collect();
        assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn threads_are_isolated_per_pair() {
        let mut store = ConversationStore::new();
        store.append("alice", "bob", msg("alice", "for bob"));
        store.append("alice", "carol", msg("alice", "for carol"));

        assert_eq!(store.history("alice", "bob").len(), 1);
        assert_eq!(store.history("alice", "carol").len(), 1);
        assert!(store.history("bob", "carol").is_empty());
    }

    #[test]
    fn export_restore_roundtrip() {
        let mut store = ConversationStore::new();
        store.append("alice", "bob", msg("alice", "hi"));
        store.append("carol", "alice", msg("carol", "yo"));

        let mut restored = ConversationStore::new();
        restored.restore(store.export());
        assert_eq!(restored.export(), store.export());
    }
}
