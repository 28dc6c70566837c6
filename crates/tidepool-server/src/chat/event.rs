//! Chat wire events — JSON text frames, one tagged envelope per frame.
//!
//! The envelope tag is `event` rather than `type` because two payloads
//! (`get_history` / `chat_history`) carry a `type` field of their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar assigned to an identity that logs in without one.
pub const DEFAULT_USER_AVATAR: &str = "👤";
/// Avatar assigned to a group created without one.
pub const DEFAULT_GROUP_AVATAR: &str = "📢";

fn default_user_avatar() -> String {
    DEFAULT_USER_AVATAR.to_owned()
}

fn default_group_avatar() -> String {
    DEFAULT_GROUP_AVATAR.to_owned()
}

/// A stored chat message. Direct messages carry no `group` tag; group
/// messages record the room they were sent to. Immutable once appended —
/// `sent_at` is audit metadata, append order stays the ordering signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Which kind of history a `get_history` request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Private,
    Group,
}

/// Events a client sends to the coordinator.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum ClientEvent {
    #[serde(rename = "login")]
    Login {
        username: String,
        #[serde(default = "default_user_avatar")]
        avatar: String,
    },

    #[serde(rename = "create_group")]
    CreateGroup {
        group_name: String,
        #[serde(default = "default_group_avatar")]
        avatar: String,
        #[serde(default)]
        members: Vec<String>,
    },

    #[serde(rename = "private_message")]
    PrivateMessage { to: String, message: String },

    #[serde(rename = "group_message")]
    GroupMessage { group: String, message: String },

    #[serde(rename = "get_history")]
    GetHistory {
        target: String,
        #[serde(rename = "type")]
        kind: HistoryKind,
    },
}

/// One entry in the online-users payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub avatar: String,
}

/// One entry in the group-list payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub avatar: String,
}

/// Events the coordinator sends back out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum ServerEvent {
    /// Presence + group list. Broadcast to every connection whenever
    /// either changes.
    #[serde(rename = "user_list")]
    UserList {
        users: Vec<UserEntry>,
        groups: Vec<GroupEntry>,
    },

    #[serde(rename = "group_created")]
    GroupCreated { group: String },

    /// Unicast to the recipient's live connection only.
    #[serde(rename = "private_message")]
    PrivateMessage {
        from: String,
        message: String,
        sent_at: DateTime<Utc>,
    },

    /// Broadcast to the group's room.
    #[serde(rename = "group_message")]
    GroupMessage {
        from: String,
        message: String,
        group: String,
        sent_at: DateTime<Utc>,
    },

    /// Unicast reply to a `get_history` request.
    #[serde(rename = "chat_history")]
    ChatHistory {
        target: String,
        #[serde(rename = "type")]
        kind: HistoryKind,
        history: Vec<ChatMessage>,
    },
}
