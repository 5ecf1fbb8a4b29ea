//! Room membership, host election and message routing for the relay
//!
//! This module holds every rule the relay applies to a room:
//! - Session setup and host election when a connection joins
//! - Forwarding member requests to the host and host broadcasts to members
//! - Departure handling, including tearing the room down when its host leaves
//!
//! Rooms never touch sockets. Every operation returns the deliveries it
//! produced and the network layer carries them out, which keeps all of the
//! routing logic testable without a transport.

use crate::session::{ConnectionId, Session};
use log::{debug, info, warn};
use rand::Rng;
use shared::{Character, ClientMessage, ServerMessage};
use std::collections::HashMap;
use std::fmt;

/// Name of a room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Something the network layer must do on behalf of a room
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Send a message to one connection
    Send {
        to: ConnectionId,
        message: ServerMessage,
    },
    /// Close a connection after everything queued for it has been sent
    Close { to: ConnectionId },
}

impl Delivery {
    fn send(to: ConnectionId, message: ServerMessage) -> Self {
        Delivery::Send { to, message }
    }
}

/// A shared session with exactly one host while non-empty
///
/// The host is elected on join and never migrates: when the host leaves,
/// every remaining member is disconnected and the room empties.
pub struct Room {
    id: RoomId,
    /// Sessions indexed by their connection
    sessions: HashMap<ConnectionId, Session>,
    /// Maximum number of concurrent members allowed
    max_members: usize,
}

impl Room {
    pub fn new(id: RoomId, max_members: usize) -> Self {
        Self {
            id,
            sessions: HashMap::new(),
            max_members,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Adds a connection to the room and elects a host if needed
    ///
    /// Returns None if the room is at capacity. Otherwise the new connection
    /// gets a fresh character under a unique hash. If the room has a host,
    /// the host is told about the newcomer with `HostAcknowledge`; if not,
    /// the newcomer is promoted and receives `HostConfirm`. Either way the
    /// newcomer finally receives its own character under `Joined`.
    pub fn join(&mut self, connection_id: ConnectionId) -> Option<Vec<Delivery>> {
        if self.sessions.len() >= self.max_members {
            return None;
        }

        let hash = self.generate_hash();
        let character = Character::new(hash.clone());
        let mut deliveries = Vec::new();

        let session = match self.current_host() {
            Some(host) => {
                let session = Session::member(connection_id, hash, host.id);
                deliveries.push(Delivery::send(
                    host.id,
                    ServerMessage::HostAcknowledge(character.clone()),
                ));
                info!(
                    "Connection {} joined room {} as {} (host {})",
                    connection_id, self.id, session.hash, host.hash
                );
                session
            }
            None => {
                if !self.sessions.is_empty() {
                    warn!(
                        "Room {} has {} members but no host; promoting connection {}",
                        self.id,
                        self.sessions.len(),
                        connection_id
                    );
                }
                let session = Session::host(connection_id, hash);
                deliveries.push(Delivery::send(connection_id, ServerMessage::HostConfirm));
                info!(
                    "Connection {} joined room {} as {} and hosts it",
                    connection_id, self.id, session.hash
                );
                session
            }
        };

        self.sessions.insert(connection_id, session);
        deliveries.push(Delivery::send(connection_id, ServerMessage::Joined(character)));

        Some(deliveries)
    }

    /// Applies the forwarding rules to one message from a member
    ///
    /// Member movement and attack requests are stamped with the sender's
    /// hash and go to the sender's host only. Host broadcasts and removal
    /// notices go to everyone else. Messages sent in the wrong role are
    /// dropped.
    pub fn route(&mut self, from: ConnectionId, message: ClientMessage) -> Vec<Delivery> {
        let Some(sender) = self.sessions.get(&from) else {
            warn!("Message from connection {} outside room {}", from, self.id);
            return Vec::new();
        };

        match message {
            ClientMessage::MovementUpdate(mut character) => {
                if sender.is_host() {
                    return Vec::new();
                }
                character.hash = sender.hash.clone();
                debug!("Forwarding movement of {} to host", sender.hash);
                vec![Delivery::send(
                    sender.host,
                    ServerMessage::MovementUpdate(character),
                )]
            }
            ClientMessage::Attack(mut attack) => {
                if sender.is_host() {
                    return Vec::new();
                }
                attack.hash = sender.hash.clone();
                debug!("Forwarding attack of {} to host", sender.hash);
                vec![Delivery::send(sender.host, ServerMessage::Attack(attack))]
            }
            ClientMessage::HostUpdatedMovement(character) => {
                if !sender.is_host() {
                    warn!(
                        "Dropping host movement broadcast from member {}",
                        sender.hash
                    );
                    return Vec::new();
                }
                self.broadcast_except(from, ServerMessage::UpdatedMovement(character))
            }
            ClientMessage::HostUpdatedAttack(attack) => {
                if !sender.is_host() {
                    warn!("Dropping host attack broadcast from member {}", sender.hash);
                    return Vec::new();
                }
                self.broadcast_except(from, ServerMessage::AttackUpdate(attack))
            }
            ClientMessage::RemovePlayer(hash) => {
                info!("Character {} was hit in room {}", hash, self.id);
                self.broadcast_except(from, ServerMessage::AttackHit(hash))
            }
        }
    }

    /// Removes a connection from the room
    ///
    /// Remaining members are told the character left. If the departing
    /// connection was the host, they are also told the host left and every
    /// one of them is disconnected, which empties the room. Returns nothing
    /// if the connection was not a member.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Vec<Delivery> {
        let Some(departed) = self.sessions.remove(&connection_id) else {
            return Vec::new();
        };

        info!(
            "Connection {} ({}) left room {} after {:.1?}",
            connection_id,
            departed.hash,
            self.id,
            departed.connected_for()
        );

        let mut deliveries =
            self.broadcast_except(connection_id, ServerMessage::Left(departed.hash.clone()));

        if departed.is_host() && !self.sessions.is_empty() {
            info!(
                "Host of room {} left; disconnecting {} members",
                self.id,
                self.sessions.len()
            );
            deliveries.extend(self.broadcast_except(connection_id, ServerMessage::HostLeft));
            deliveries.extend(
                self.sessions
                    .drain()
                    .map(|(id, _)| Delivery::Close { to: id }),
            );
        }

        deliveries
    }

    /// Returns the session flagged host, if any
    pub fn current_host(&self) -> Option<&Session> {
        self.sessions.values().find(|session| session.is_host())
    }

    pub fn session(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.sessions.contains_key(&connection_id)
    }

    /// Returns the number of current members
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if nobody is in the room
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn broadcast_except(&self, exclude: ConnectionId, message: ServerMessage) -> Vec<Delivery> {
        self.sessions
            .keys()
            .filter(|id| **id != exclude)
            .map(|id| Delivery::send(*id, message.clone()))
            .collect()
    }

    /// Random 64-bit hex hash, redrawn until no current member holds it
    fn generate_hash(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let hash = format!("{:016x}", rng.gen::<u64>());
            if !self.sessions.values().any(|session| session.hash == hash) {
                return hash;
            }
        }
    }
}

/// Every room on the relay and which room each connection belongs to
///
/// All membership changes for all rooms go through this registry, which is
/// owned by a single task. That serializes joins, departures and host
/// elections so two connections can never both become host of one room.
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    membership: HashMap<ConnectionId, RoomId>,
    max_members: usize,
}

impl RoomRegistry {
    pub fn new(max_members: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            membership: HashMap::new(),
            max_members,
        }
    }

    /// Joins a connection to a room, creating the room on first use
    ///
    /// Returns None if the room is full.
    pub fn join(&mut self, connection_id: ConnectionId, room_id: RoomId) -> Option<Vec<Delivery>> {
        let max_members = self.max_members;
        let room = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone(), max_members));

        let deliveries = room.join(connection_id)?;
        self.membership.insert(connection_id, room_id);
        Some(deliveries)
    }

    /// Routes a message within the sender's room
    pub fn route(&mut self, from: ConnectionId, message: ClientMessage) -> Vec<Delivery> {
        let Some(room_id) = self.membership.get(&from) else {
            debug!("Ignoring message from connection {} without a room", from);
            return Vec::new();
        };

        match self.rooms.get_mut(room_id) {
            Some(room) => room.route(from, message),
            None => Vec::new(),
        }
    }

    /// Removes a connection from its room and drops the room once empty
    pub fn leave(&mut self, connection_id: ConnectionId) -> Vec<Delivery> {
        let Some(room_id) = self.membership.remove(&connection_id) else {
            return Vec::new();
        };

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return Vec::new();
        };

        let deliveries = room.leave(connection_id);

        // members closed by a host departure no longer belong to the room
        for delivery in &deliveries {
            if let Delivery::Close { to } = delivery {
                self.membership.remove(to);
            }
        }

        if room.is_empty() {
            debug!("Room {} is empty, dropping it", room_id);
            self.rooms.remove(&room_id);
        }

        deliveries
    }

    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&RoomId> {
        self.membership.get(&connection_id)
    }

    /// Returns the number of rooms with at least one member
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
