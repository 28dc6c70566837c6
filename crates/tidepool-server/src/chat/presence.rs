//! Presence registry — which identity is live on which connection.
//!
//! Presence is ephemeral: it is never persisted and empties on restart.

use std::collections::HashMap;

use super::switchboard::ConnId;

/// Bidirectional username ↔ connection binding.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    by_user: HashMap<String, ConnId>,
    by_conn: HashMap<ConnId, String>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `conn` as the live session for `username`.
    ///
    /// Most-recent-login-wins: if the identity was already bound elsewhere,
    /// the previous connection is returned. It is not closed and gets no
    /// notice — it simply stops receiving routed traffic.
    pub fn bind(&mut self, username: &str, conn: ConnId) -> Option<ConnId> {
        // A connection re-logging-in under a new name releases its old one.
        if let Some(prev) = self.by_conn.insert(conn, username.to_owned()) {
            if prev != username && self.by_user.get(&prev) == Some(&conn) {
                self.by_user.remove(&prev);
            }
        }

        let displaced = self
            .by_user
            .insert(username.to_owned(), conn)
            .filter(|old| *old != conn);
        if let Some(old) = displaced {
            self.by_conn.remove(&old);
        }
        displaced
    }

    /// Clear the binding for `conn`, returning the username that was bound.
    /// Idempotent: a connection with no binding returns `None`.
    pub fn unbind(&mut self, conn: ConnId) -> Option<String> {
        let username = self.by_conn.remove(&conn)?;
        // Only clear the forward mapping if it still points at this
        // connection — a later login may have rebound the identity.
        if self.by_user.get(&username) == Some(&conn) {
            self.by_user.remove(&username);
        }
        Some(username)
    }

    pub fn connection_for(&self, username: &str) -> Option<ConnId> {
        self.by_user.get(username).copied()
    }

    pub fn username_for(&self, conn: ConnId) -> Option<&str> {
        self.by_conn.get(&conn).map(String::as_str)
    }

    /// Sorted usernames with a live connection.
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self.by_user.keys().cloned().collect();
        users.sort();
        users
    }
}
