//! Local input handling and the per-tick movement step

use rand::Rng;
use shared::{Character, Direction, ALPHA_STEP, MOVE_STEP, PLAY_FIELD_MAX, PLAY_FIELD_MIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Attack,
}

/// Movement keys currently held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Collects key transitions into held movement intents and attack triggers
#[derive(Debug, Default)]
pub struct InputManager {
    keys: KeyState,
    attack_held: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.set(key, true);
    }

    /// Returns true when the release should fire an attack.
    pub fn release(&mut self, key: Key) -> bool {
        let fire = key == Key::Attack && self.attack_held;
        self.set(key, false);
        fire
    }

    pub fn keys(&self) -> KeyState {
        self.keys
    }

    fn set(&mut self, key: Key, held: bool) {
        match key {
            Key::Up => self.keys.up = held,
            Key::Down => self.keys.down = held,
            Key::Left => self.keys.left = held,
            Key::Right => self.keys.right = held,
            Key::Attack => self.attack_held = held,
        }
    }
}

/// Advances a character's destination by one movement tick.
///
/// The rendered position is untouched; the frame loop eases toward the new
/// destination starting from the current position.
pub fn step_movement(character: &mut Character, keys: KeyState) {
    character.prev_x = character.x;
    character.prev_y = character.y;

    character.move_up = keys.up;
    character.move_down = keys.down;
    character.move_left = keys.left;
    character.move_right = keys.right;

    if keys.up {
        character.dest_y = (character.dest_y - MOVE_STEP).max(PLAY_FIELD_MIN);
    }
    if keys.down {
        character.dest_y = (character.dest_y + MOVE_STEP).min(PLAY_FIELD_MAX);
    }
    if keys.left {
        character.dest_x = (character.dest_x - MOVE_STEP).max(PLAY_FIELD_MIN);
    }
    if keys.right {
        character.dest_x = (character.dest_x + MOVE_STEP).min(PLAY_FIELD_MAX);
    }

    if let Some(direction) = Direction::from_intents(keys.up, keys.down, keys.left, keys.right) {
        character.direction = direction;
    }

    character.alpha = ALPHA_STEP;
}

/// Drives an [`InputManager`] with random key presses for headless clients
#[derive(Debug)]
pub struct Wanderer {
    ticks_until_turn: u32,
    ticks_until_attack: u32,
}

impl Wanderer {
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            ticks_until_turn: 0,
            ticks_until_attack: rng.gen_range(60..180),
        }
    }

    /// Called once per movement tick. Returns true when an attack fired.
    pub fn drive(&mut self, input: &mut InputManager) -> bool {
        let mut rng = rand::thread_rng();

        if self.ticks_until_turn == 0 {
            self.ticks_until_turn = rng.gen_range(30..90);
            for key in [Key::Up, Key::Down, Key::Left, Key::Right] {
                input.release(key);
            }
            // single axis most of the time so attacks are not diagonal
            let keys = [Key::Up, Key::Down, Key::Left, Key::Right];
            input.press(keys[rng.gen_range(0..keys.len())]);
            if rng.gen_bool(0.25) {
                input.press(keys[rng.gen_range(0..keys.len())]);
            }
        } else {
            self.ticks_until_turn -= 1;
        }

        if self.ticks_until_attack == 0 {
            self.ticks_until_attack = rng.gen_range(60..180);
            input.press(Key::Attack);
            return input.release(Key::Attack);
        }
        self.ticks_until_attack -= 1;
        false
    }
}

impl Default for Wanderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(up: bool, down: bool, left: bool, right: bool) -> KeyState {
        KeyState {
            up,
            down,
            left,
            right,
        }
    }

    #[test]
    fn test_press_and_release() {
        let mut input = InputManager::new();
        input.press(Key::Left);
        input.press(Key::Up);
        assert_eq!(input.keys(), held(true, false, true, false));

        assert!(!input.release(Key::Left));
        assert_eq!(input.keys(), held(true, false, false, false));
    }

    #[test]
    fn test_attack_fires_on_release() {
        let mut input = InputManager::new();
        assert!(!input.release(Key::Attack));

        input.press(Key::Attack);
        assert!(input.release(Key::Attack));
        assert!(!input.release(Key::Attack));
    }

    #[test]
    fn test_step_moves_destination() {
        let mut character = Character::new("a");
        character.x = 10.0;
        character.y = 20.0;
        character.dest_x = 10.0;
        character.dest_y = 20.0;

        step_movement(&mut character, held(false, true, false, true));

        assert_eq!(character.prev_x, 10.0);
        assert_eq!(character.prev_y, 20.0);
        assert_eq!(character.dest_x, 12.0);
        assert_eq!(character.dest_y, 22.0);
        assert_eq!(character.direction, Direction::DownRight);
        assert_eq!(character.alpha, ALPHA_STEP);
        assert!(character.move_down && character.move_right);
        // rendered position waits for interpolation
        assert_eq!(character.x, 10.0);
    }

    #[test]
    fn test_step_clamps_to_play_field() {
        let mut character = Character::new("a");
        character.dest_x = 1.0;
        character.dest_y = 399.0;

        step_movement(&mut character, held(false, true, true, false));
        assert_eq!(character.dest_x, 0.0);
        assert_eq!(character.dest_y, 400.0);

        step_movement(&mut character, held(false, true, true, false));
        assert_eq!(character.dest_x, 0.0);
        assert_eq!(character.dest_y, 400.0);
    }

    #[test]
    fn test_idle_step_keeps_direction() {
        let mut character = Character::new("a");
        character.direction = Direction::Left;
        character.move_left = true;

        step_movement(&mut character, KeyState::default());

        assert_eq!(character.direction, Direction::Left);
        assert!(!character.is_moving());
        assert_eq!(character.dest_x, 0.0);
    }

    #[test]
    fn test_wanderer_eventually_attacks() {
        let mut wanderer = Wanderer::new();
        let mut input = InputManager::new();

        let fired = (0..200).filter(|_| wanderer.drive(&mut input)).count();
        assert!(fired >= 1);
        assert_ne!(input.keys(), KeyState::default());
    }
}
