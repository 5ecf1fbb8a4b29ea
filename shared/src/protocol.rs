//! Wire messages exchanged over a connection. Each WebSocket binary frame
//! carries exactly one bincode-encoded message.

use crate::character::{Attack, Character};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Messages a client sends to the relay.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ClientMessage {
    /// A member's predicted movement, for the host to validate.
    MovementUpdate(Character),
    /// The host's authoritative record for one character.
    HostUpdatedMovement(Character),
    /// A member's attack request. Carries no hitbox yet.
    Attack(Attack),
    /// An attack accepted by the host, hitbox included.
    HostUpdatedAttack(Attack),
    /// Hash of a character that was hit.
    RemovePlayer(String),
}

/// Messages the relay sends to a client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum ServerMessage {
    /// The receiver's own character, sent once after joining.
    Joined(Character),
    /// The receiver was elected host of its room.
    HostConfirm,
    /// Sent to the host when a new member joins.
    HostAcknowledge(Character),
    /// A member's movement forwarded to the host, sender hash stamped.
    MovementUpdate(Character),
    /// A member's attack request forwarded to the host, sender hash stamped.
    Attack(Attack),
    /// An authoritative movement record from the host.
    UpdatedMovement(Character),
    /// A host-accepted attack, for display only.
    AttackUpdate(Attack),
    AttackHit(String),
    Left(String),
    HostLeft,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(bincode::Error),
    #[error("failed to decode message: {0}")]
    Decode(bincode::Error),
}

pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(message).map_err(ProtocolError::Encode)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    bincode::deserialize(data).map_err(ProtocolError::Decode)
}
