//! SQLite-backed identity records.
//!
//! The coordinator only upserts and reads through this store; identities
//! outlive any live connection. Multiple connections to the same file are
//! fine — the writer task and the HTTP surface each open their own.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    avatar TEXT,
    created_at TEXT
);
";

/// One durable identity row. `created_at` is ISO-8601 text, set once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub username: String,
    pub avatar: String,
    pub created_at: String,
}

/// Handle to the identity database.
pub struct IdentityDb {
    conn: Connection,
}

impl IdentityDb {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// In-memory database (tests).
    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert if absent (stamping `created_at`), else overwrite the avatar
    /// only. The avatar is caller-authoritative, never merged.
    pub fn upsert(&self, username: &str, avatar: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO users (username, avatar, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET avatar = excluded.avatar",
            params![username, avatar, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Every known identity, newest first.
    pub fn all(&self) -> rusqlite::Result<Vec<IdentityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT username, avatar, created_at FROM users ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(IdentityRecord {
                username: row.get(0)?,
                avatar: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    pub fn get(&self, username: &str) -> rusqlite::Result<Option<IdentityRecord>> {
        self.conn
            .query_row(
                "SELECT username, avatar, created_at FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(IdentityRecord {
                        username: row.get(0)?,
                        avatar: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }
}
