//! Per-connection session records owned by the relay
//!
//! A session ties a transport connection to the character hash the relay
//! assigned it and records which member of the room is its host. Host
//! references are held by connection id so a host change is a plain field
//! update on the affected sessions.

use std::time::{Duration, Instant};

/// Identifier the relay assigns to each accepted connection
pub type ConnectionId = u64;

/// Whether a session runs the authoritative simulation for its room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Member,
}

/// Relay-side state for one connection
#[derive(Debug)]
pub struct Session {
    /// Connection this session belongs to
    pub id: ConnectionId,
    /// Character hash assigned at join, immutable for the connection's lifetime
    pub hash: String,
    pub role: Role,
    /// Connection currently acting as host for this session. A host
    /// references itself.
    pub host: ConnectionId,
    pub joined_at: Instant,
}

impl Session {
    /// Creates a member session that follows `host`
    pub fn member(id: ConnectionId, hash: String, host: ConnectionId) -> Self {
        Self {
            id,
            hash,
            role: Role::Member,
            host,
            joined_at: Instant::now(),
        }
    }

    /// Creates a session that hosts its room
    pub fn host(id: ConnectionId, hash: String) -> Self {
        Self {
            id,
            hash,
            role: Role::Host,
            host: id,
            joined_at: Instant::now(),
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    /// Time since the connection joined its room
    pub fn connected_for(&self) -> Duration {
        self.joined_at.elapsed()
    }
}
