use crate::geometry::{intersects, lerp, Point};
use crate::{ALPHA_STEP, ATTACK_DISPLAY_FRAMES, CHARACTER_HEIGHT, CHARACTER_WIDTH};
use serde::{Deserialize, Serialize};

/// Facing of a character. The discriminants index sprite-sheet rows, so
/// their order is part of the wire contract.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    DownLeft = 0,
    #[default]
    Down = 1,
    DownRight = 2,
    Left = 3,
    UpLeft = 4,
    Right = 5,
    UpRight = 6,
    Up = 7,
}

impl Direction {
    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::DownLeft | Direction::DownRight | Direction::UpLeft | Direction::UpRight
        )
    }

    /// Resolves a facing from the four held intents.
    ///
    /// A diagonal pair wins over a single axis. When both members of a
    /// vertical or horizontal pair are held the later checks take priority
    /// (down over up, right over left), matching the order the keys are
    /// evaluated in. Returns `None` when no combination applies, which keeps
    /// the current facing.
    pub fn from_intents(up: bool, down: bool, left: bool, right: bool) -> Option<Direction> {
        let mut facing = None;

        if up && left {
            facing = Some(Direction::UpLeft);
        }
        if up && right {
            facing = Some(Direction::UpRight);
        }
        if down && left {
            facing = Some(Direction::DownLeft);
        }
        if down && right {
            facing = Some(Direction::DownRight);
        }
        if facing.is_some() {
            return facing;
        }

        if down && !(left || right) {
            facing = Some(Direction::Down);
        }
        if up && !(left || right) {
            facing = Some(Direction::Up);
        }
        if left && !(up || down) {
            facing = Some(Direction::Left);
        }
        if right && !(up || down) {
            facing = Some(Direction::Right);
        }
        facing
    }
}

/// A participant's character.
///
/// The host keeps the authoritative copy; every other client keeps a shadow
/// copy keyed by the same `hash` and animates it toward `dest_x`/`dest_y`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Character {
    pub hash: String,
    /// Milliseconds since the epoch of the last authoritative change.
    pub last_update: u64,
    pub x: f32,
    pub y: f32,
    pub prev_x: f32,
    pub prev_y: f32,
    pub dest_x: f32,
    pub dest_y: f32,
    pub width: f32,
    pub height: f32,
    pub alpha: f32,
    pub direction: Direction,
    pub frame: u32,
    pub frame_count: u32,
    pub move_left: bool,
    pub move_right: bool,
    pub move_down: bool,
    pub move_up: bool,
}

impl Character {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            last_update: 0,
            x: 0.0,
            y: 0.0,
            prev_x: 0.0,
            prev_y: 0.0,
            dest_x: 0.0,
            dest_y: 0.0,
            width: CHARACTER_WIDTH,
            height: CHARACTER_HEIGHT,
            alpha: 0.0,
            direction: Direction::default(),
            frame: 0,
            frame_count: 0,
            move_left: false,
            move_right: false,
            move_down: false,
            move_up: false,
        }
    }

    /// A fresh default record that keeps this character's identity.
    pub fn respawned(&self, now: u64) -> Self {
        let mut fresh = Character::new(self.hash.clone());
        fresh.last_update = now;
        fresh
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_moving(&self) -> bool {
        self.move_up || self.move_down || self.move_left || self.move_right
    }

    /// Takes motion from a newer record without touching the rendered
    /// position, then restarts the blend so the next frames ease toward the
    /// new destination.
    pub fn merge_motion(&mut self, update: &Character) {
        self.prev_x = update.prev_x;
        self.prev_y = update.prev_y;
        self.dest_x = update.dest_x;
        self.dest_y = update.dest_y;
        self.direction = update.direction;
        self.move_left = update.move_left;
        self.move_right = update.move_right;
        self.move_down = update.move_down;
        self.move_up = update.move_up;
        self.last_update = update.last_update;
        self.alpha = ALPHA_STEP;
    }

    /// One interpolation step of the render loop.
    pub fn interpolate(&mut self) {
        if self.alpha < 1.0 {
            self.alpha = (self.alpha + ALPHA_STEP).min(1.0);
        }
        self.x = lerp(self.prev_x, self.dest_x, self.alpha);
        self.y = lerp(self.prev_y, self.dest_y, self.alpha);
    }
}

/// A slash. Requests carry no box; the host fills `width`/`height` and
/// shifts the origin when it accepts the attack.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Attack {
    /// Hash of the owning character.
    pub hash: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub direction: Direction,
    /// Frames this attack has been displayed for.
    pub frames: u32,
}

impl Attack {
    pub fn from_owner(owner: &Character) -> Self {
        Self {
            hash: owner.hash.clone(),
            x: owner.x,
            y: owner.y,
            width: 0.0,
            height: 0.0,
            direction: owner.direction,
            frames: 0,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Attacks never hit their own owner.
    pub fn hits(&self, character: &Character) -> bool {
        if character.hash == self.hash {
            return false;
        }
        intersects(character.position(), self.origin(), self.width, self.height)
    }

    pub fn age(&mut self) {
        self.frames += 1;
    }

    pub fn is_expired(&self) -> bool {
        self.frames > ATTACK_DISPLAY_FRAMES
    }
}
