//! Client-targeting expressions.
//!
//! A `SendTarget` names the logical recipients of one send call: a single
//! connection, a set, a named group, a user, or every connection, each with
//! optional exclusion lists. Targets are immutable values constructed per
//! call via the constructor functions below and never persisted.

use crate::ConnectionId;

/// Logical recipient set for a single send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// Every registered connection.
    All,
    /// Every registered connection except the listed ids.
    AllExcept(Vec<ConnectionId>),
    /// Exactly one connection; unknown ids are silently skipped.
    Connection(ConnectionId),
    /// An explicit connection set; unknown ids are silently skipped.
    Connections(Vec<ConnectionId>),
    /// All current members of a named group.
    Group(String),
    /// Union of members across several named groups.
    Groups(Vec<String>),
    /// Group members minus the listed ids.
    GroupExcept(String, Vec<ConnectionId>),
    /// Every connection whose user identifier matches.
    User(String),
    /// Union across several user identifiers.
    Users(Vec<String>),
    /// The connection that originated the current invocation.
    Caller(ConnectionId),
    /// Everyone except the caller.
    Others(ConnectionId),
    /// Group members except the caller.
    OthersInGroup(String, ConnectionId),
}

impl SendTarget {
    pub fn all() -> Self {
        Self::All
    }

    pub fn all_except(excluded: Vec<ConnectionId>) -> Self {
        Self::AllExcept(excluded)
    }

    pub fn connection(id: impl Into<ConnectionId>) -> Self {
        Self::Connection(id.into())
    }

    pub fn connections(ids: Vec<ConnectionId>) -> Self {
        Self::Connections(ids)
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::Group(name.into())
    }

    pub fn groups(names: Vec<String>) -> Self {
        Self::Groups(names)
    }

    pub fn group_except(name: impl Into<String>, excluded: Vec<ConnectionId>) -> Self {
        Self::GroupExcept(name.into(), excluded)
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn users(ids: Vec<String>) -> Self {
        Self::Users(ids)
    }

    pub fn caller(id: impl Into<ConnectionId>) -> Self {
        Self::Caller(id.into())
    }

    pub fn others(caller: impl Into<ConnectionId>) -> Self {
        Self::Others(caller.into())
    }

    pub fn others_in_group(name: impl Into<String>, caller: impl Into<ConnectionId>) -> Self {
        Self::OthersInGroup(name.into(), caller.into())
    }

    /// Whether this target can only ever resolve to local connections.
    ///
    /// `Caller` is local by construction: the invocation being answered
    /// arrived on a connection this process owns. Everything else may have
    /// matches on peer servers and needs a backplane publish.
    pub fn is_local_only(&self) -> bool {
        matches!(self, SendTarget::Caller(_))
    }

    /// Short form for log lines.
    pub fn target_string(&self) -> String {
        match self {
            SendTarget::All => "all".to_string(),
            SendTarget::AllExcept(ids) => format!("all-except({})", ids.len()),
            SendTarget::Connection(id) => format!("connection:{}", id),
            SendTarget::Connections(ids) => format!("connections({})", ids.len()),
            SendTarget::Group(name) => format!("group:{}", name),
            SendTarget::Groups(names) => format!("groups({})", names.len()),
            SendTarget::GroupExcept(name, ids) => {
                format!("group:{}-except({})", name, ids.len())
            }
            SendTarget::User(id) => format!("user:{}", id),
            SendTarget::Users(ids) => format!("users({})", ids.len()),
            SendTarget::Caller(id) => format!("caller:{}", id),
            SendTarget::Others(id) => format!("others-of:{}", id),
            SendTarget::OthersInGroup(name, id) => {
                format!("group:{}-others-of:{}", name, id)
            }
        }
    }
}

impl From<ConnectionId> for SendTarget {
    fn from(id: ConnectionId) -> Self {
        Self::Connection(id)
    }
}
