//! Durable chat snapshot — the full-state JSON blob and its writer task.
//!
//! The blob is rewritten in full after every mutating event; the round-trip
//! invariant is that reloading it exactly reconstructs the group directory
//! and conversation store. The coordinator never touches disk itself: it
//! enqueues [`PersistRequest`]s and a dedicated writer task applies them,
//! coalescing bursts of snapshot writes down to the latest state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::event::ChatMessage;
use super::group::Group;
use super::identity::IdentityDb;

/// Legacy identity entry. Older snapshots carried identities in the blob
/// before they moved to the relational store — still read for migration,
/// always written back empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyUser {
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The durable full-state blob.
///
/// `private_messages` keys are the two usernames sorted lexicographically
/// and joined with `|` (see `PairKey::storage_key`). `BTreeMap` keeps the
/// file output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    #[serde(default)]
    pub users: BTreeMap<String, LegacyUser>,
    #[serde(default)]
    pub groups: BTreeMap<String, Group>,
    #[serde(default)]
    pub private_messages: BTreeMap<String, Vec<ChatMessage>>,
}

/// Load the snapshot at `path`. A missing file is a fresh install; a
/// corrupt one is logged and treated as empty rather than aborting startup.
pub fn load(path: &Path) -> ChatSnapshot {
    if !path.exists() {
        return ChatSnapshot::default();
    }
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(snapshot) => {
                info!(path = %path.display(), "loaded chat snapshot");
                snapshot
            }
            Err(e) => {
                warn!("failed to parse {}: {e}", path.display());
                ChatSnapshot::default()
            }
        },
        Err(e) => {
            warn!("failed to read {}: {e}", path.display());
            ChatSnapshot::default()
        }
    }
}

/// Write the snapshot atomically: serialize to a tmp file, then rename
/// over the target. Failures are logged — in-memory state stays
/// authoritative, at the cost of losing the latest mutations on a crash
/// before the next successful write.
pub fn write(path: &Path, snapshot: &ChatSnapshot) {
    match serde_json::to_string_pretty(snapshot) {
        Ok(json) => {
            let tmp = path.with_extension("json.tmp");
            if let Err(e) = std::fs::write(&tmp, &json).and_then(|()| std::fs::rename(&tmp, path))
            {
                warn!("failed to write {}: {e}", path.display());
            }
        }
        Err(e) => warn!("failed to serialize chat snapshot: {e}"),
    }
}

/// A durable-write request, dispatched by the coordinator after the
/// corresponding in-memory mutation has committed.
#[derive(Debug)]
pub enum PersistRequest {
    /// Upsert one identity row.
    Identity { username: String, avatar: String },
    /// Rewrite the full snapshot blob.
    Snapshot(ChatSnapshot),
}

/// Cloneable sender side of the writer task.
#[derive(Debug, Clone)]
pub struct PersistHandle {
    tx: mpsc::UnboundedSender<PersistRequest>,
}

impl PersistHandle {
    pub fn identity(&self, username: &str, avatar: &str) {
        let _ = self.tx.send(PersistRequest::Identity {
            username: username.to_owned(),
            avatar: avatar.to_owned(),
        });
    }

    pub fn snapshot(&self, snapshot: ChatSnapshot) {
        let _ = self.tx.send(PersistRequest::Snapshot(snapshot));
    }
}

fn upsert_identity(db: &IdentityDb, username: &str, avatar: &str) {
    if let Err(e) = db.upsert(username, avatar) {
        warn!(%username, "identity upsert failed: {e}");
    }
}

/// Spawn the dedicated writer task.
///
/// Requests are applied in arrival order, with one exception: consecutive
/// pending snapshot rewrites collapse to the newest one, so a burst of N
/// mutations costs a single disk write. Identity upserts queued behind a
/// collapsed snapshot are applied right after it.
pub fn spawn_writer(snapshot_path: PathBuf, identities: IdentityDb) -> PersistHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<PersistRequest>();

    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            match request {
                PersistRequest::Identity { username, avatar } => {
                    upsert_identity(&identities, &username, &avatar);
                }
                PersistRequest::Snapshot(mut snapshot) => {
                    let mut deferred = Vec::new();
                    while let Ok(next) = rx.try_recv() {
                        match next {
                            PersistRequest::Snapshot(newer) => snapshot = newer,
                            other => deferred.push(other),
                        }
                    }
                    write(&snapshot_path, &snapshot);
                    for request in deferred {
                        if let PersistRequest::Identity { username, avatar } = request {
                            upsert_identity(&identities, &username, &avatar);
                        }
                    }
                }
            }
        }
    });

    PersistHandle { tx }
}
