//! Connection registry and group table.
//!
//! DashMap-backed so connection-handling tasks can mutate concurrently.
//! Groups and the user index exist only while non-empty: entries are
//! created lazily on first member and dropped when the last member leaves.

use crate::connection::HubConnection;
use dashmap::DashMap;
use hub_types::ConnectionId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Result of a group membership mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupUpdate {
    /// Whether the membership actually changed (false for a duplicate add,
    /// a remove of a non-member, or an unknown connection).
    pub applied: bool,
    /// Local member count of the group after the mutation.
    pub local_members: usize,
}

/// Everything the caller needs to clean up after a removal.
#[derive(Debug)]
pub struct RemovedConnection {
    pub connection: Arc<HubConnection>,
    /// Groups whose last local member was this connection.
    pub emptied_groups: Vec<String>,
    /// The user whose last local connection was this one, if any.
    pub emptied_user: Option<String>,
}

/// Per-process table of live connections, group members, and users.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<HubConnection>>,
    groups: DashMap<String, HashSet<ConnectionId>>,
    users: DashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, connection: Arc<HubConnection>) {
        debug!(connection = %connection.id(), "registering connection");
        if let Some(user) = connection.user_identifier() {
            self.users
                .entry(user)
                .or_default()
                .insert(connection.id().clone());
        }
        self.connections
            .insert(connection.id().clone(), connection);
    }

    /// Remove a connection, purging it from every group and the user index.
    ///
    /// The connection is aborted first so a concurrent broadcast observes
    /// the closed flag rather than writing into a dead transport.
    pub fn remove(&self, id: &ConnectionId) -> Option<RemovedConnection> {
        let (_, connection) = self.connections.remove(id)?;
        connection.abort();

        let mut emptied_groups = Vec::new();
        for group in connection.groups_snapshot() {
            connection.leave_group(&group);
            if self.detach_member(&group, id) {
                emptied_groups.push(group);
            }
        }

        let emptied_user = connection.user_identifier().filter(|user| {
            let emptied = self
                .users
                .get_mut(user)
                .map(|mut members| {
                    members.remove(id);
                    members.is_empty()
                })
                .unwrap_or(false);
            if emptied {
                self.users.remove_if(user, |_, members| members.is_empty());
            }
            emptied
        });

        debug!(connection = %id, groups = emptied_groups.len(), "connection removed");
        Some(RemovedConnection {
            connection,
            emptied_groups,
            emptied_user,
        })
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<HubConnection>> {
        self.connections.get(id).map(|entry| Arc::clone(&entry))
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of every registered connection.
    pub fn all_connections(&self) -> Vec<Arc<HubConnection>> {
        self.connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Record the authenticated user for a connection and index it.
    ///
    /// Returns true when this is the user's first local connection.
    pub fn set_user(&self, id: &ConnectionId, user: impl Into<String>) -> bool {
        let Some(connection) = self.get(id) else {
            return false;
        };
        let user = user.into();
        connection.set_user_identifier(user.clone());
        let mut members = self.users.entry(user).or_default();
        let first = members.is_empty();
        members.insert(id.clone());
        first
    }

    /// Add a connection to a group; idempotent, unknown ids are a no-op.
    pub fn add_to_group(&self, id: &ConnectionId, group: &str) -> GroupUpdate {
        let Some(connection) = self.get(id) else {
            return GroupUpdate {
                applied: false,
                local_members: self.group_len(group),
            };
        };
        connection.join_group(group);
        let mut members = self.groups.entry(group.to_string()).or_default();
        let applied = members.insert(id.clone());
        if applied {
            debug!(connection = %id, group, "added to group");
        }
        GroupUpdate {
            applied,
            local_members: members.len(),
        }
    }

    /// Remove a connection from a group; a non-member remove is a no-op.
    pub fn remove_from_group(&self, id: &ConnectionId, group: &str) -> GroupUpdate {
        if let Some(connection) = self.get(id) {
            connection.leave_group(group);
        }
        let Some(mut members) = self.groups.get_mut(group) else {
            return GroupUpdate {
                applied: false,
                local_members: 0,
            };
        };
        let applied = members.remove(id);
        let local_members = members.len();
        drop(members);
        if local_members == 0 {
            self.groups.remove_if(group, |_, members| members.is_empty());
        }
        if applied {
            debug!(connection = %id, group, "removed from group");
        }
        GroupUpdate {
            applied,
            local_members,
        }
    }

    /// Snapshot of the local members of a group.
    pub fn members_of(&self, group: &str) -> Vec<ConnectionId> {
        self.groups
            .get(group)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn group_len(&self, group: &str) -> usize {
        self.groups.get(group).map(|m| m.len()).unwrap_or(0)
    }

    /// Snapshot of the local connections of a user.
    pub fn connections_for_user(&self, user: &str) -> Vec<ConnectionId> {
        self.users
            .get(user)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a group member during a removal sweep, reporting whether the
    /// group is now empty (and dropping the empty entry).
    fn detach_member(&self, group: &str, id: &ConnectionId) -> bool {
        let Some(mut members) = self.groups.get_mut(group) else {
            return false;
        };
        members.remove(id);
        let emptied = members.is_empty();
        drop(members);
        if emptied {
            self.groups.remove_if(group, |_, members| members.is_empty());
        }
        emptied
    }
}
