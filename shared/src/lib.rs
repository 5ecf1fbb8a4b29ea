pub mod character;
pub mod geometry;
pub mod protocol;

pub use character::{Attack, Character, Direction};
pub use geometry::{intersects, lerp, Point};
pub use protocol::{decode, encode, ClientMessage, ProtocolError, ServerMessage};

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const CHARACTER_WIDTH: f32 = 61.0;
pub const CHARACTER_HEIGHT: f32 = 121.0;
/// Long side of a slash hitbox.
pub const ATTACK_REACH: f32 = 183.0;
/// Short side of a slash hitbox.
pub const ATTACK_SPAN: f32 = 66.0;
pub const PLAY_FIELD_MIN: f32 = 0.0;
pub const PLAY_FIELD_MAX: f32 = 400.0;
/// Distance a destination moves per held axis per movement tick.
pub const MOVE_STEP: f32 = 2.0;
/// Blend factor a fresh destination restarts from, and the per-frame increment.
pub const ALPHA_STEP: f32 = 0.05;
/// Frames a remote attack stays on screen.
pub const ATTACK_DISPLAY_FRAMES: u32 = 30;
pub const DEFAULT_ROOM: &str = "room1";

/// Milliseconds since the Unix epoch.
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_box_covers_character() {
        assert!(ATTACK_SPAN > CHARACTER_WIDTH);
        assert!(ATTACK_REACH > CHARACTER_HEIGHT);
    }

    #[test]
    fn test_timestamp_advances() {
        let first = timestamp_ms();
        std::thread::sleep(Duration::from_millis(2));
        let second = timestamp_ms();
        assert!(second > first);
    }
}
