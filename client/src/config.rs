use std::time::Duration;

/// Runtime settings for a client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay WebSocket URL, as in `ws://127.0.0.1:8080`
    pub server_url: String,
    /// Room to join. The relay's default room when unset
    pub room: Option<String>,
    /// Collision sweep cadence while hosting
    pub sweep_interval: Duration,
    pub movement_interval: Duration,
    pub frame_interval: Duration,
    /// Simulated round-trip latency, split between receive and send
    pub fake_ping: Duration,
    /// Drive the character with random input
    pub wander: bool,
}

impl ClientConfig {
    /// URL including the room path
    pub fn url(&self) -> String {
        match &self.room {
            Some(room) => format!("{}/rooms/{}", self.server_url.trim_end_matches('/'), room),
            None => self.server_url.clone(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8080".to_string(),
            room: None,
            sweep_interval: Duration::from_millis(20),
            movement_interval: Duration::from_millis(16),
            frame_interval: Duration::from_millis(16),
            fake_ping: Duration::ZERO,
            wander: false,
        }
    }
}
