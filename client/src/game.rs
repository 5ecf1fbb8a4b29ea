use crate::controller::{step_movement, KeyState};
use crate::host::HostSimulation;
use log::{debug, info, warn};
use shared::{Attack, Character, ClientMessage, Direction, ServerMessage};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Connected, own character not yet received
    Connecting,
    Playing,
    YouDied,
    HostLeft,
}

/// What the renderer needs for one character
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub hash: String,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub frame: u32,
    pub is_own: bool,
}

/// Client view of the room
///
/// Every client keeps a shadow copy of each character and eases it toward
/// the latest authoritative destination. The client elected host also runs
/// a [`HostSimulation`] that owns the authoritative records.
#[derive(Debug)]
pub struct ClientGameState {
    pub own_hash: Option<String>,
    pub characters: HashMap<String, Character>,
    /// Accepted attacks, kept only for display
    pub attacks: Vec<Attack>,
    pub host: Option<HostSimulation>,
    pub status: SessionStatus,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self {
            own_hash: None,
            characters: HashMap::new(),
            attacks: Vec::new(),
            host: None,
            status: SessionStatus::Connecting,
        }
    }

    pub fn is_host(&self) -> bool {
        self.host.is_some()
    }

    /// True once the session is over and the connection should be closed
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SessionStatus::YouDied | SessionStatus::HostLeft)
    }

    pub fn own_character(&self) -> Option<&Character> {
        self.own_hash
            .as_ref()
            .and_then(|hash| self.characters.get(hash))
    }

    /// Applies one relay message and returns what should be sent back.
    pub fn handle(&mut self, message: ServerMessage, now: u64) -> Vec<ClientMessage> {
        if self.is_terminal() {
            return Vec::new();
        }

        match message {
            ServerMessage::Joined(character) => {
                self.on_joined(character);
                Vec::new()
            }
            ServerMessage::HostConfirm => {
                self.on_host_confirm();
                Vec::new()
            }
            ServerMessage::HostAcknowledge(character) => {
                match self.host.as_mut() {
                    Some(host) => host.on_acknowledge(character, &mut self.characters),
                    None => warn!("Acknowledge for {} but not hosting", character.hash),
                }
                Vec::new()
            }
            ServerMessage::MovementUpdate(character) => match self.host.as_mut() {
                Some(host) => host
                    .on_movement_update(character, now, &mut self.characters)
                    .into_iter()
                    .collect(),
                None => {
                    warn!("Movement request for {} but not hosting", character.hash);
                    Vec::new()
                }
            },
            ServerMessage::Attack(attack) => match self.host.as_mut() {
                Some(host) => match host.on_attack_update(attack) {
                    Some(accepted) => {
                        self.attacks.push(accepted.clone());
                        vec![ClientMessage::HostUpdatedAttack(accepted)]
                    }
                    None => Vec::new(),
                },
                None => {
                    warn!("Attack request from {} but not hosting", attack.hash);
                    Vec::new()
                }
            },
            ServerMessage::UpdatedMovement(character) => {
                self.on_remote_update(character);
                Vec::new()
            }
            ServerMessage::AttackUpdate(attack) => {
                self.on_attack_broadcast(attack);
                Vec::new()
            }
            ServerMessage::AttackHit(hash) => {
                self.on_attack_hit(&hash);
                Vec::new()
            }
            ServerMessage::Left(hash) => {
                self.on_left(&hash);
                Vec::new()
            }
            ServerMessage::HostLeft => {
                self.on_host_left();
                Vec::new()
            }
        }
    }

    fn on_joined(&mut self, character: Character) {
        info!("Joined as {}", character.hash);
        self.own_hash = Some(character.hash.clone());
        if let Some(host) = self.host.as_mut() {
            host.adopt_own(character.clone());
        }
        self.characters.insert(character.hash.clone(), character);
        self.status = SessionStatus::Playing;
    }

    fn on_host_confirm(&mut self) {
        info!("Elected host of the room");
        let mut host = HostSimulation::new();
        if let Some(own) = self.own_character() {
            host.adopt_own(own.clone());
        }
        self.host = Some(host);
    }

    /// Reconciles an authoritative movement record with the local copy.
    pub fn on_remote_update(&mut self, data: Character) {
        if self.own_hash.as_deref() == Some(data.hash.as_str()) {
            return;
        }

        if !self.characters.contains_key(&data.hash) {
            debug!("Adopting unknown character {}", data.hash);
            self.characters.insert(data.hash.clone(), data);
            return;
        }
        let Some(local) = self.characters.get_mut(&data.hash) else {
            return;
        };

        if data.last_update <= local.last_update {
            debug!(
                "Discarding stale update for {} ({} <= {})",
                data.hash, data.last_update, local.last_update
            );
            return;
        }

        local.merge_motion(&data);
    }

    pub fn on_attack_hit(&mut self, hash: &str) {
        self.characters.remove(hash);
        if self.own_hash.as_deref() == Some(hash) {
            info!("You died");
            self.status = SessionStatus::YouDied;
        }
    }

    pub fn on_host_left(&mut self) {
        info!("Host left the room");
        self.status = SessionStatus::HostLeft;
    }

    pub fn on_left(&mut self, hash: &str) {
        debug!("Character {} left", hash);
        match self.host.as_mut() {
            Some(host) => host.on_left(hash, &mut self.characters),
            None => {
                self.characters.remove(hash);
            }
        }
    }

    pub fn on_attack_broadcast(&mut self, attack: Attack) {
        self.attacks.push(attack);
    }

    /// One movement tick for the local character.
    ///
    /// A host stores its own record as authoritative and broadcasts it; a
    /// member sends it to the host for validation.
    pub fn movement_tick(&mut self, keys: KeyState, now: u64) -> Option<ClientMessage> {
        if self.status != SessionStatus::Playing {
            return None;
        }
        let hash = self.own_hash.as_ref()?;
        let character = self.characters.get_mut(hash)?;

        step_movement(character, keys);

        match self.host.as_mut() {
            Some(host) => Some(ClientMessage::HostUpdatedMovement(
                host.store_own(character, now),
            )),
            None => Some(ClientMessage::MovementUpdate(character.clone())),
        }
    }

    /// Builds an attack from the local character's position and facing.
    pub fn attack(&mut self) -> Option<ClientMessage> {
        if self.status != SessionStatus::Playing {
            return None;
        }
        let request = Attack::from_owner(self.own_character()?);

        match self.host.as_mut() {
            Some(host) => {
                let accepted = host.on_attack_update(request)?;
                self.attacks.push(accepted.clone());
                Some(ClientMessage::HostUpdatedAttack(accepted))
            }
            None => Some(ClientMessage::Attack(request)),
        }
    }

    /// Runs the host's collision sweep. Members have nothing to do.
    pub fn sweep_tick(&mut self, now: u64) -> Vec<ClientMessage> {
        if self.is_terminal() {
            return Vec::new();
        }
        match self.host.as_mut() {
            Some(host) => host.sweep(now, &mut self.characters),
            None => Vec::new(),
        }
    }

    /// Per-frame interpolation and attack aging.
    pub fn advance_frame(&mut self) {
        for character in self.characters.values_mut() {
            character.interpolate();
        }

        for attack in &mut self.attacks {
            attack.age();
        }
        self.attacks.retain(|attack| !attack.is_expired());
    }

    /// Snapshot of every character for the renderer, ordered by hash
    pub fn drawables(&self) -> Vec<Drawable> {
        let mut drawables: Vec<Drawable> = self
            .characters
            .values()
            .map(|character| Drawable {
                hash: character.hash.clone(),
                x: character.x,
                y: character.y,
                direction: character.direction,
                frame: character.frame,
                is_own: self.own_hash.as_ref() == Some(&character.hash),
            })
            .collect();
        drawables.sort_by(|a, b| a.hash.cmp(&b.hash));
        drawables
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
