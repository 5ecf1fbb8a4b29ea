//! Authoritative simulation run by the client that hosts a room
//!
//! The host keeps the authoritative record of every character, validates
//! attack requests into hitboxes, and resolves collisions on a fixed tick.
//! Results leave as [`ClientMessage`] values for the relay to broadcast.

use log::{debug, info};
use shared::{
    Attack, Character, ClientMessage, Direction, ATTACK_REACH, ATTACK_SPAN, CHARACTER_HEIGHT,
    CHARACTER_WIDTH,
};
use std::collections::{HashMap, HashSet};

/// Attack box for one facing, relative to the attacker's anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

/// Hitbox for an attack facing `direction`. Diagonal attacks have none.
pub fn attack_hitbox(direction: Direction) -> Option<Hitbox> {
    match direction {
        Direction::Down => Some(Hitbox {
            width: ATTACK_SPAN,
            height: ATTACK_REACH,
            offset_x: 0.0,
            offset_y: CHARACTER_HEIGHT,
        }),
        Direction::Left => Some(Hitbox {
            width: ATTACK_REACH,
            height: ATTACK_SPAN,
            offset_x: -ATTACK_REACH,
            offset_y: 0.0,
        }),
        Direction::Right => Some(Hitbox {
            width: ATTACK_REACH,
            height: ATTACK_SPAN,
            offset_x: CHARACTER_WIDTH,
            offset_y: 0.0,
        }),
        Direction::Up => Some(Hitbox {
            width: ATTACK_SPAN,
            height: ATTACK_REACH,
            offset_x: 0.0,
            offset_y: -ATTACK_REACH,
        }),
        Direction::DownLeft | Direction::DownRight | Direction::UpLeft | Direction::UpRight => {
            None
        }
    }
}

/// Next authoritative timestamp for a record last stamped at `previous`.
///
/// Strictly greater than `previous` so two updates within one millisecond
/// are still ordered for the staleness check on receiving clients.
pub fn next_timestamp(previous: u64, now: u64) -> u64 {
    now.max(previous + 1)
}

#[derive(Debug, Default)]
pub struct HostSimulation {
    own_hash: Option<String>,
    /// Authoritative records keyed by hash.
    hosted: HashMap<String, Character>,
    /// Attacks awaiting the next collision sweep.
    pending: Vec<Attack>,
    /// Characters killed this session. Late updates from them are ignored.
    fallen: HashSet<String>,
}

impl HostSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the host's own character as authoritative.
    pub fn adopt_own(&mut self, character: Character) {
        self.own_hash = Some(character.hash.clone());
        self.hosted.insert(character.hash.clone(), character);
    }

    /// Adds a newly joined character to the authoritative and local sets.
    pub fn on_acknowledge(
        &mut self,
        character: Character,
        shadows: &mut HashMap<String, Character>,
    ) {
        info!("Hosting character {}", character.hash);
        shadows.insert(character.hash.clone(), character.clone());
        self.hosted.insert(character.hash.clone(), character);
    }

    /// Stamps the host's own freshly moved character and stores it.
    pub fn store_own(&mut self, character: &mut Character, now: u64) -> Character {
        let previous = self
            .hosted
            .get(&character.hash)
            .map(|record| record.last_update)
            .unwrap_or(character.last_update);
        character.last_update = next_timestamp(previous, now);
        self.hosted.insert(character.hash.clone(), character.clone());
        character.clone()
    }

    /// Takes a member's movement as the new authoritative record and returns
    /// the broadcast for everyone else.
    pub fn on_movement_update(
        &mut self,
        mut data: Character,
        now: u64,
        shadows: &mut HashMap<String, Character>,
    ) -> Option<ClientMessage> {
        if self.fallen.contains(&data.hash) {
            debug!("Ignoring movement from fallen character {}", data.hash);
            return None;
        }

        let previous = self
            .hosted
            .get(&data.hash)
            .map(|record| record.last_update)
            .unwrap_or(0);
        data.last_update = next_timestamp(previous, now);

        match shadows.get_mut(&data.hash) {
            Some(shadow) => shadow.merge_motion(&data),
            None => debug!("No local copy of {}, skipping animation", data.hash),
        }

        self.hosted.insert(data.hash.clone(), data.clone());
        Some(ClientMessage::HostUpdatedMovement(data))
    }

    /// Turns an attack request into a queued attack with a hitbox.
    ///
    /// Returns the accepted attack for broadcasting, or None for diagonal
    /// attacks, which are dropped without notice.
    pub fn on_attack_update(&mut self, mut attack: Attack) -> Option<Attack> {
        if self.fallen.contains(&attack.hash) {
            debug!("Ignoring attack from fallen character {}", attack.hash);
            return None;
        }

        let Some(hitbox) = attack_hitbox(attack.direction) else {
            debug!(
                "Rejecting {:?} attack from {}",
                attack.direction, attack.hash
            );
            return None;
        };

        attack.width = hitbox.width;
        attack.height = hitbox.height;
        attack.x += hitbox.offset_x;
        attack.y += hitbox.offset_y;

        self.pending.push(attack.clone());
        Some(attack)
    }

    /// One authoritative tick: resolves every pending attack against every
    /// living character and empties the pending buffer.
    ///
    /// Each hit produces a `RemovePlayer` notice and removes the victim. The
    /// host's own character is respawned in place instead of removed.
    pub fn sweep(
        &mut self,
        now: u64,
        shadows: &mut HashMap<String, Character>,
    ) -> Vec<ClientMessage> {
        let attacks = std::mem::take(&mut self.pending);
        let mut notices = Vec::new();

        for attack in &attacks {
            let victims: Vec<String> = self
                .hosted
                .values()
                .filter(|character| attack.hits(character))
                .map(|character| character.hash.clone())
                .collect();

            for hash in victims {
                let Some(victim) = self.hosted.remove(&hash) else {
                    continue;
                };
                shadows.remove(&hash);
                notices.push(ClientMessage::RemovePlayer(hash.clone()));

                if self.own_hash.as_deref() == Some(hash.as_str()) {
                    let fresh = victim.respawned(next_timestamp(victim.last_update, now));
                    info!("Host character {} was hit by {}, respawning", hash, attack.hash);
                    shadows.insert(hash.clone(), fresh.clone());
                    self.hosted.insert(hash, fresh);
                } else {
                    info!("Character {} was hit by {}", hash, attack.hash);
                    self.fallen.insert(hash);
                }
            }
        }

        notices
    }

    /// Forgets a character whose connection closed.
    pub fn on_left(&mut self, hash: &str, shadows: &mut HashMap<String, Character>) {
        self.hosted.remove(hash);
        self.fallen.remove(hash);
        shadows.remove(hash);
    }

    pub fn character(&self, hash: &str) -> Option<&Character> {
        self.hosted.get(hash)
    }

    pub fn pending_attacks(&self) -> &[Attack] {
        &self.pending
    }

    /// Returns the number of living characters
    pub fn len(&self) -> usize {
        self.hosted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character_at(hash: &str, x: f32, y: f32) -> Character {
        let mut character = Character::new(hash);
        character.x = x;
        character.y = y;
        character
    }

    fn request(hash: &str, x: f32, y: f32, direction: Direction) -> Attack {
        Attack {
            hash: hash.to_string(),
            x,
            y,
            width: 0.0,
            height: 0.0,
            direction,
            frames: 0,
        }
    }

    /// Host "h" at the origin plus the given members, all in both sets.
    fn hosted_room(members: &[Character]) -> (HostSimulation, HashMap<String, Character>) {
        let mut host = HostSimulation::new();
        let mut shadows = HashMap::new();
        let own = Character::new("h");
        shadows.insert("h".to_string(), own.clone());
        host.adopt_own(own);
        for member in members {
            host.on_acknowledge(member.clone(), &mut shadows);
        }
        (host, shadows)
    }

    #[test]
    fn test_hitbox_table() {
        assert_eq!(
            attack_hitbox(Direction::Down),
            Some(Hitbox {
                width: 66.0,
                height: 183.0,
                offset_x: 0.0,
                offset_y: 121.0,
            })
        );
        assert_eq!(
            attack_hitbox(Direction::Left),
            Some(Hitbox {
                width: 183.0,
                height: 66.0,
                offset_x: -183.0,
                offset_y: 0.0,
            })
        );
        assert_eq!(
            attack_hitbox(Direction::Right),
            Some(Hitbox {
                width: 183.0,
                height: 66.0,
                offset_x: 61.0,
                offset_y: 0.0,
            })
        );
        assert_eq!(
            attack_hitbox(Direction::Up),
            Some(Hitbox {
                width: 66.0,
                height: 183.0,
                offset_x: 0.0,
                offset_y: -183.0,
            })
        );
        for diagonal in [
            Direction::UpLeft,
            Direction::UpRight,
            Direction::DownLeft,
            Direction::DownRight,
        ] {
            assert_eq!(attack_hitbox(diagonal), None);
        }
    }

    #[test]
    fn test_down_attack_box() {
        let mut host = HostSimulation::new();
        let accepted = host
            .on_attack_update(request("m", 10.0, 10.0, Direction::Down))
            .unwrap();

        assert_eq!(accepted.width, 66.0);
        assert_eq!(accepted.height, 183.0);
        assert_eq!(accepted.x, 10.0);
        assert_eq!(accepted.y, 131.0);
        assert_eq!(host.pending_attacks(), &[accepted]);
    }

    #[test]
    fn test_diagonal_attack_is_not_queued() {
        let mut host = HostSimulation::new();
        assert!(host
            .on_attack_update(request("m", 10.0, 10.0, Direction::UpLeft))
            .is_none());
        assert!(host
            .on_attack_update(request("m", 10.0, 10.0, Direction::DownRight))
            .is_none());
        assert!(host.pending_attacks().is_empty());
    }

    #[test]
    fn test_movement_update_is_stamped_and_broadcast() {
        let (mut host, mut shadows) = hosted_room(&[Character::new("m")]);

        let mut update = Character::new("m");
        update.x = 500.0;
        update.dest_x = 2.0;
        update.move_right = true;
        update.direction = Direction::Right;

        let message = host
            .on_movement_update(update, 1_000, &mut shadows)
            .unwrap();
        let record = match message {
            ClientMessage::HostUpdatedMovement(record) => record,
            other => panic!("Unexpected message {:?}", other),
        };

        assert_eq!(record.last_update, 1_000);
        assert_eq!(host.character("m"), Some(&record));

        let shadow = &shadows["m"];
        assert_eq!(shadow.dest_x, 2.0);
        assert_eq!(shadow.direction, Direction::Right);
        // rendered position is left to interpolation
        assert_eq!(shadow.x, 0.0);
    }

    #[test]
    fn test_movement_timestamps_strictly_increase() {
        let (mut host, mut shadows) = hosted_room(&[Character::new("m")]);

        host.on_movement_update(Character::new("m"), 1_000, &mut shadows);
        host.on_movement_update(Character::new("m"), 1_000, &mut shadows);
        assert_eq!(host.character("m").unwrap().last_update, 1_001);
    }

    #[test]
    fn test_movement_without_shadow_is_still_stored() {
        let mut host = HostSimulation::new();
        let mut shadows = HashMap::new();

        let message = host.on_movement_update(Character::new("stranger"), 50, &mut shadows);
        assert!(message.is_some());
        assert!(host.character("stranger").is_some());
        assert!(shadows.is_empty());
    }

    #[test]
    fn test_sweep_removes_victim() {
        let (mut host, mut shadows) = hosted_room(&[character_at("m", 10.0, 131.0)]);

        host.on_attack_update(request("h", 10.0, 10.0, Direction::Down));
        let notices = host.sweep(2_000, &mut shadows);

        assert_eq!(notices, vec![ClientMessage::RemovePlayer("m".to_string())]);
        assert!(host.character("m").is_none());
        assert!(!shadows.contains_key("m"));
        assert!(host.pending_attacks().is_empty());
    }

    #[test]
    fn test_sweep_empties_buffer_on_miss() {
        let (mut host, mut shadows) = hosted_room(&[character_at("m", 390.0, 0.0)]);

        host.on_attack_update(request("h", 0.0, 200.0, Direction::Down));
        host.on_attack_update(request("h", 0.0, 200.0, Direction::Up));
        let notices = host.sweep(2_000, &mut shadows);

        assert!(notices.is_empty());
        assert!(host.pending_attacks().is_empty());
        assert_eq!(host.len(), 2);
    }

    #[test]
    fn test_attack_never_hits_its_owner() {
        let (mut host, mut shadows) = hosted_room(&[character_at("m", 300.0, 121.0)]);

        // owner stands inside its own hitbox
        host.on_attack_update(request("m", 300.0, 0.0, Direction::Down));
        let notices = host.sweep(2_000, &mut shadows);

        assert!(notices.is_empty());
        assert!(host.character("m").is_some());
    }

    #[test]
    fn test_every_queued_attack_is_evaluated() {
        let (mut host, mut shadows) = hosted_room(&[
            character_at("a", 300.0, 0.0),
            character_at("b", 0.0, 300.0),
        ]);

        // right of h reaches a, below h reaches b
        host.on_attack_update(request("h", 200.0, 0.0, Direction::Right));
        host.on_attack_update(request("h", 0.0, 150.0, Direction::Down));
        let mut notices = host.sweep(2_000, &mut shadows);
        notices.sort_by_key(|notice| format!("{:?}", notice));

        assert_eq!(
            notices,
            vec![
                ClientMessage::RemovePlayer("a".to_string()),
                ClientMessage::RemovePlayer("b".to_string()),
            ]
        );
        assert_eq!(host.len(), 1);
    }

    #[test]
    fn test_host_is_respawned_not_removed() {
        let (mut host, mut shadows) = hosted_room(&[Character::new("m")]);
        if let Some(own) = shadows.get_mut("h") {
            own.dest_x = 80.0;
            own.move_left = true;
            own.alpha = 0.7;
            own.last_update = 1_500;
            let mut record = own.clone();
            host.store_own(&mut record, 1_500);
        }

        host.on_attack_update(request("m", 0.0, -121.0, Direction::Down));
        let notices = host.sweep(2_000, &mut shadows);

        assert_eq!(notices, vec![ClientMessage::RemovePlayer("h".to_string())]);
        let respawned = host.character("h").unwrap();
        assert_eq!(respawned.hash, "h");
        assert_eq!(respawned.dest_x, 0.0);
        assert_eq!(respawned.alpha, 0.0);
        assert!(!respawned.is_moving());
        assert!(respawned.last_update > 1_500);
        assert_eq!(shadows.get("h"), Some(respawned));
    }

    #[test]
    fn test_fallen_character_cannot_come_back() {
        let (mut host, mut shadows) = hosted_room(&[character_at("m", 0.0, 121.0)]);
        host.on_attack_update(request("h", 0.0, 0.0, Direction::Down));
        host.sweep(2_000, &mut shadows);

        assert!(host
            .on_movement_update(Character::new("m"), 2_100, &mut shadows)
            .is_none());
        assert!(host
            .on_attack_update(request("m", 0.0, 0.0, Direction::Up))
            .is_none());
        assert!(host.character("m").is_none());
    }

    #[test]
    fn test_remove_departed_character() {
        let (mut host, mut shadows) = hosted_room(&[Character::new("m")]);
        host.on_left("m", &mut shadows);
        assert!(host.character("m").is_none());
        assert!(!shadows.contains_key("m"));
        assert_eq!(host.len(), 1);
    }
}
