//! Group directory — named rooms with membership sets and ordered history.
//!
//! Groups are never destroyed or renamed, membership only grows (there is
//! no leave operation), and histories are append-only.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::error::ChatError;
use super::event::ChatMessage;

/// A single group. The field shape is also the durable snapshot shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub avatar: String,
    pub members: BTreeSet<String>,
    pub history: Vec<ChatMessage>,
}

/// All groups, keyed by their immutable name.
#[derive(Debug, Default)]
pub struct GroupDirectory {
    groups: HashMap<String, Group>,
}

impl GroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group. The creator is always a member, whether or not the
    /// caller listed them.
    pub fn create(
        &mut self,
        name: &str,
        avatar: String,
        creator: &str,
        initial_members: Vec<String>,
    ) -> Result<&Group, ChatError> {
        if self.groups.contains_key(name) {
            return Err(ChatError::GroupExists(name.to_owned()));
        }

        let mut members: BTreeSet<String> = initial_members.into_iter().collect();
        members.insert(creator.to_owned());

        Ok(self.groups.entry(name.to_owned()).or_insert(Group {
            avatar,
            members,
            history: Vec::new(),
        }))
    }

    /// Add a member. Idempotent — returns whether the member was new.
    pub fn add_member(&mut self, name: &str, username: &str) -> Result<bool, ChatError> {
        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| ChatError::UnknownGroup(name.to_owned()))?;
        Ok(group.members.insert(username.to_owned()))
    }

    /// Append a message to a group's history.
    pub fn append(&mut self, name: &str, message: ChatMessage) -> Result<&ChatMessage, ChatError> {
        let group = self
            .groups
            .get_mut(name)
            .ok_or_else(|| ChatError::UnknownGroup(name.to_owned()))?;
        group.history.push(message);
        Ok(group.history.last().unwrap())
    }

    pub fn history(&self, name: &str) -> Result<&[ChatMessage], ChatError> {
        self.groups
            .get(name)
            .map(|group| group.history.as_slice())
            .ok_or_else(|| ChatError::UnknownGroup(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Names of the groups `username` belongs to (login-time room
    /// resubscription).
    pub fn groups_of(&self, username: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, group)| group.members.contains(username))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// `(name, avatar)` pairs for the presence payload, sorted by name.
    pub fn listing(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .groups
            .iter()
            .map(|(name, group)| (name.clone(), group.avatar.clone()))
            .collect();
        list.sort();
        list
    }

    pub fn export(&self) -> HashMap<String, Group> {
        self.groups.clone()
    }

    pub fn restore(&mut self, groups: impl IntoIterator<Item = (String, Group)>) {
        self.groups = groups.into_iter().collect();
    }
}
