use crate::room::RoomId;
use shared::DEFAULT_ROOM;

/// Runtime settings for the relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to
    pub bind_addr: String,
    /// Maximum number of members per room
    pub max_members: usize,
    /// Room joined by connections that do not name one
    pub default_room: RoomId,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_members: 32,
            default_room: RoomId::from(DEFAULT_ROOM),
        }
    }
}
