//! The chat coordinator — single-writer owner of all runtime chat state.
//!
//! Connections never touch the stores directly: the gateway sends
//! [`ChatCommand`]s through a [`CoordinatorHandle`] and one task applies
//! them to completion, in arrival order across all connections. There is no
//! await point between reading and writing shared state, so a duplicate
//! login can never interleave with a presence read, and a group is always
//! observed fully constructed or absent. Outbound delivery and durable
//! writes are channel sends dispatched after each mutation commits — the
//! authoritative state never waits on I/O.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

use super::conversation::{ConversationStore, PairKey};
use super::error::ChatError;
use super::event::{
    ChatMessage, ClientEvent, DEFAULT_USER_AVATAR, GroupEntry, HistoryKind, ServerEvent, UserEntry,
};
use super::group::GroupDirectory;
use super::identity::IdentityDb;
use super::presence::PresenceRegistry;
use super::snapshot::{self, ChatSnapshot, PersistHandle};
use super::switchboard::{ConnId, Switchboard};

/// Snapshot blob filename inside the data directory.
pub const SNAPSHOT_FILE: &str = "data.json";
/// Identity database filename inside the data directory.
pub const IDENTITY_DB_FILE: &str = "users.db";

/// Commands consumed by the coordinator task.
#[derive(Debug)]
pub enum ChatCommand {
    /// A connection opened; `tx` is its outbound delivery handle.
    Connect {
        conn: ConnId,
        tx: UnboundedSender<ServerEvent>,
    },
    /// An inbound event from a connection.
    Event { conn: ConnId, event: ClientEvent },
    /// The connection closed (fired by the transport, not a wire frame).
    Disconnect { conn: ConnId },
}

/// Cloneable handle for feeding commands to the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: UnboundedSender<ChatCommand>,
}

impl CoordinatorHandle {
    pub fn connect(&self, conn: ConnId, tx: UnboundedSender<ServerEvent>) {
        let _ = self.tx.send(ChatCommand::Connect { conn, tx });
    }

    pub fn event(&self, conn: ConnId, event: ClientEvent) {
        let _ = self.tx.send(ChatCommand::Event { conn, event });
    }

    pub fn disconnect(&self, conn: ConnId) {
        let _ = self.tx.send(ChatCommand::Disconnect { conn });
    }
}

/// Load durable state from `data_dir` and spawn the coordinator task.
///
/// `data_dir` holds the snapshot blob (`data.json`) and the identity
/// database (`users.db`). The returned handle is the only way in.
pub fn spawn(data_dir: &Path) -> Result<CoordinatorHandle, Box<dyn std::error::Error + Send + Sync>> {
    let snapshot_path = data_dir.join(SNAPSHOT_FILE);
    let identities = IdentityDb::open(data_dir.join(IDENTITY_DB_FILE))?;

    let loaded = snapshot::load(&snapshot_path);

    // Migrate identities that older snapshots kept in the blob.
    for (username, user) in &loaded.users {
        if identities.get(username)?.is_none() {
            identities.upsert(username, user.avatar.as_deref().unwrap_or(DEFAULT_USER_AVATAR))?;
        }
    }

    let mut avatars = HashMap::new();
    for record in identities.all()? {
        avatars.insert(record.username, record.avatar);
    }

    let mut groups = GroupDirectory::new();
    groups.restore(loaded.groups);

    let mut conversations = ConversationStore::new();
    conversations.restore(loaded.private_messages.into_iter().filter_map(
        |(key, history)| match PairKey::parse(&key) {
            Some(pair) => Some((pair, history)),
            None => {
                warn!(%key, "skipping malformed conversation key in snapshot");
                None
            }
        },
    ));

    let persist = snapshot::spawn_writer(snapshot_path, identities);

    let mut coordinator = Coordinator {
        presence: PresenceRegistry::new(),
        groups,
        conversations,
        switchboard: Switchboard::new(),
        avatars,
        persist,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            coordinator.apply(command);
        }
    });

    Ok(CoordinatorHandle { tx })
}

struct Coordinator {
    presence: PresenceRegistry,
    groups: GroupDirectory,
    conversations: ConversationStore,
    switchboard: Switchboard,
    /// Cached view of identity avatars, seeded from the identity store at
    /// startup and overwritten on every login.
    avatars: HashMap<String, String>,
    persist: PersistHandle,
}

impl Coordinator {
    fn apply(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::Connect { conn, tx } => {
                debug!(%conn, "connection opened");
                self.switchboard.register(conn, tx);
            }
            ChatCommand::Event { conn, event } => {
                if let Err(err) = self.handle_event(conn, event) {
                    // Silent drop at the wire; observable server-side.
                    debug!(%conn, %err, "event rejected");
                }
            }
            ChatCommand::Disconnect { conn } => self.handle_disconnect(conn),
        }
    }

    fn handle_event(&mut self, conn: ConnId, event: ClientEvent) -> Result<(), ChatError> {
        match event {
            ClientEvent::Login { username, avatar } => self.handle_login(conn, username, avatar),
            ClientEvent::CreateGroup {
                group_name,
                avatar,
                members,
            } => self.handle_create_group(conn, group_name, avatar, members),
            ClientEvent::PrivateMessage { to, message } => {
                self.handle_private_message(conn, to, message)
            }
            ClientEvent::GroupMessage { group, message } => {
                self.handle_group_message(conn, group, message)
            }
            ClientEvent::GetHistory { target, kind } => {
                self.handle_get_history(conn, target, kind)
            }
        }
    }

    fn handle_login(
        &mut self,
        conn: ConnId,
        username: String,
        avatar: String,
    ) -> Result<(), ChatError> {
        if username.is_empty() {
            return Err(ChatError::MissingField("username"));
        }

        // Avatar is caller-authoritative: overwrite the cached view and
        // the durable row.
        self.avatars.insert(username.clone(), avatar.clone());
        self.persist.identity(&username, &avatar);

        if let Some(displaced) = self.presence.bind(&username, conn) {
            // Most-recent-login-wins: the prior connection keeps its socket
            // but no longer receives routed traffic.
            warn!(%username, %displaced, %conn, "login displaced a live session");
        }

        // Rejoin the rooms of every group this identity already belongs to.
        for group in self.groups.groups_of(&username) {
            self.switchboard.join_room(&group, conn);
        }

        self.persist.snapshot(self.snapshot());
        self.broadcast_user_list();
        info!(%username, %conn, "logged in");
        Ok(())
    }

    fn handle_disconnect(&mut self, conn: ConnId) {
        self.switchboard.deregister(conn);
        if let Some(username) = self.presence.unbind(conn) {
            // Presence is ephemeral — no durable write on disconnect.
            self.broadcast_user_list();
            info!(%username, %conn, "disconnected");
        } else {
            debug!(%conn, "anonymous connection closed");
        }
    }

    fn handle_create_group(
        &mut self,
        conn: ConnId,
        name: String,
        avatar: String,
        initial_members: Vec<String>,
    ) -> Result<(), ChatError> {
        let creator = self.logged_in(conn)?;
        if name.is_empty() {
            return Err(ChatError::MissingField("group_name"));
        }

        let members: Vec<String> = self
            .groups
            .create(&name, avatar, &creator, initial_members)?
            .members
            .iter()
            .cloned()
            .collect();

        // Subscribe every currently-online member, creator included.
        for member in &members {
            if let Some(member_conn) = self.presence.connection_for(member) {
                self.switchboard.join_room(&name, member_conn);
            }
        }

        self.persist.snapshot(self.snapshot());
        self.switchboard
            .broadcast(&ServerEvent::GroupCreated { group: name.clone() });
        self.broadcast_user_list();
        info!(group = %name, %creator, "group created");
        Ok(())
    }

    fn handle_private_message(
        &mut self,
        conn: ConnId,
        to: String,
        message: String,
    ) -> Result<(), ChatError> {
        let from = self.logged_in(conn)?;
        if to.is_empty() {
            return Err(ChatError::MissingField("to"));
        }
        if message.is_empty() {
            return Err(ChatError::MissingField("message"));
        }

        let msg = ChatMessage {
            from: from.clone(),
            message,
            group: None,
            sent_at: Utc::now(),
        };
        self.conversations.append(&from, &to, msg.clone());
        self.persist.snapshot(self.snapshot());

        // Deliver only when the recipient has a live connection; otherwise
        // the message waits in the durable thread for a history pull.
        if let Some(target) = self.presence.connection_for(&to) {
            self.switchboard.unicast(
                target,
                &ServerEvent::PrivateMessage {
                    from: msg.from,
                    message: msg.message,
                    sent_at: msg.sent_at,
                },
            );
        }
        Ok(())
    }

    fn handle_group_message(
        &mut self,
        conn: ConnId,
        group: String,
        message: String,
    ) -> Result<(), ChatError> {
        let from = self.logged_in(conn)?;
        if message.is_empty() {
            return Err(ChatError::MissingField("message"));
        }

        // Membership is not enforced on send — only that the group exists.
        let msg = ChatMessage {
            from,
            message,
            group: Some(group.clone()),
            sent_at: Utc::now(),
        };
        self.groups.append(&group, msg.clone())?;

        self.persist.snapshot(self.snapshot());
        self.switchboard.broadcast_room(
            &group,
            &ServerEvent::GroupMessage {
                from: msg.from,
                message: msg.message,
                group: group.clone(),
                sent_at: msg.sent_at,
            },
        );
        Ok(())
    }

    fn handle_get_history(
        &mut self,
        conn: ConnId,
        target: String,
        kind: HistoryKind,
    ) -> Result<(), ChatError> {
        let caller = self.logged_in(conn)?;
        if target.is_empty() {
            return Err(ChatError::MissingField("target"));
        }

        let history = match kind {
            HistoryKind::Private => self.conversations.history(&caller, &target).to_vec(),
            HistoryKind::Group => {
                // Requesting a group's history is a self-service join: the
                // caller becomes a member and starts receiving broadcasts.
                self.groups.add_member(&target, &caller)?;
                self.switchboard.join_room(&target, conn);
                self.persist.snapshot(self.snapshot());
                self.groups.history(&target)?.to_vec()
            }
        };

        self.switchboard.unicast(
            conn,
            &ServerEvent::ChatHistory {
                target,
                kind,
                history,
            },
        );
        Ok(())
    }

    fn logged_in(&self, conn: ConnId) -> Result<String, ChatError> {
        self.presence
            .username_for(conn)
            .map(str::to_owned)
            .ok_or(ChatError::NotLoggedIn)
    }

    fn broadcast_user_list(&self) {
        let users = self
            .presence
            .online_users()
            .into_iter()
            .map(|username| {
                let avatar = self
                    .avatars
                    .get(&username)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_USER_AVATAR.to_owned());
                UserEntry { username, avatar }
            })
            .collect();
        let groups = self
            .groups
            .listing()
            .into_iter()
            .map(|(name, avatar)| GroupEntry { name, avatar })
            .collect();
        self.switchboard
            .broadcast(&ServerEvent::UserList { users, groups });
    }

    /// The current durable view. Built after every mutation and handed to
    /// the writer task.
    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            users: BTreeMap::new(),
            groups: self.groups.export().into_iter().collect(),
            private_messages: self
                .conversations
                .export()
                .into_iter()
                .map(|(pair, history)| (pair.storage_key(), history))
                .collect(),
        }
    }
}
