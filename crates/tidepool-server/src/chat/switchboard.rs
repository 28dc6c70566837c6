//! Connection switchboard — outbound delivery handles and room membership.
//!
//! The coordinator routes every outbound event through here. Sends never
//! block: each connection holds an unbounded channel, and a send to a dead
//! receiver is ignored (the connection's disconnect event cleans it up).

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::event::ServerEvent;

/// Opaque id for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(Uuid);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing table: connection send-handles plus room membership.
#[derive(Debug, Default)]
pub struct Switchboard {
    conns: HashMap<ConnId, UnboundedSender<ServerEvent>>,
    rooms: HashMap<String, HashSet<ConnId>>,
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, conn: ConnId, tx: UnboundedSender<ServerEvent>) {
        self.conns.insert(conn, tx);
    }

    /// Remove a connection and its room subscriptions. Empty rooms are
    /// dropped.
    pub fn deregister(&mut self, conn: ConnId) {
        self.conns.remove(&conn);
        self.rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    pub fn join_room(&mut self, room: &str, conn: ConnId) {
        self.rooms.entry(room.to_owned()).or_default().insert(conn);
    }

    pub fn unicast(&self, conn: ConnId, event: &ServerEvent) {
        if let Some(tx) = self.conns.get(&conn) {
            let _ = tx.send(event.clone());
        }
    }

    /// Deliver to every registered connection, logged in or not.
    pub fn broadcast(&self, event: &ServerEvent) {
        for tx in self.conns.values() {
            let _ = tx.send(event.clone());
        }
    }

    /// Deliver to every connection subscribed to `room`.
    pub fn broadcast_room(&self, room: &str, event: &ServerEvent) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for conn in members {
            if let Some(tx) = self.conns.get(conn) {
                let _ = tx.send(event.clone());
            }
        }
    }
}
