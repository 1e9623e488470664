use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::movement::MoveInput;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    /// Accepts plain names (`W`, `Escape`) as well as DOM codes (`KeyW`, `ArrowUp`).
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let name = name.strip_prefix("Key").unwrap_or(name);
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphabetic() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Left" | "ArrowLeft" => Left,
        "Right" | "ArrowRight" => Right,
        "Up" | "ArrowUp" => Up,
        "Down" | "ArrowDown" => Down,
        "Escape" | "Esc" => Escape,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Non-character keys the game reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Escape,
}

/// Game meaning of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Forward,
    Backward,
    Left,
    Right,
    Crouch,
    Cancel,
}

/// Maps keys to actions. Defaults to WASD, arrows, `C` to crouch and Escape to cancel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    bindings: Vec<(KeyCode, Action)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                (KeyCode::Character('W'), Action::Forward),
                (KeyCode::Character('S'), Action::Backward),
                (KeyCode::Character('A'), Action::Left),
                (KeyCode::Character('D'), Action::Right),
                (KeyCode::Named(NamedKey::Up), Action::Forward),
                (KeyCode::Named(NamedKey::Down), Action::Backward),
                (KeyCode::Named(NamedKey::Left), Action::Left),
                (KeyCode::Named(NamedKey::Right), Action::Right),
                (KeyCode::Character('C'), Action::Crouch),
                (KeyCode::Named(NamedKey::Escape), Action::Cancel),
            ],
        }
    }
}

impl KeyBindings {
    pub fn action(&self, key: KeyCode) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, action)| *action)
    }

    fn keys_for(&self, action: Action) -> impl Iterator<Item = KeyCode> + '_ {
        self.bindings
            .iter()
            .filter(move |(_, bound)| *bound == action)
            .map(|(key, _)| *key)
    }
}

/// Discrete input delivered by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    /// Click or tap. Its meaning depends on the session phase.
    Trigger,
    /// Pointer movement in pixels while capture is active.
    Look { dx: f32, dy: f32 },
}

/// Held-key set shared between event listeners and the frame driver.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn is_action_held(&self, bindings: &KeyBindings, action: Action) -> bool {
        let keys = self.keys.read();
        bindings.keys_for(action).any(|key| keys.contains(&key))
    }

    /// Snapshot of the directional keys for one integration step.
    pub fn move_input(&self, bindings: &KeyBindings) -> MoveInput {
        MoveInput {
            forward: self.is_action_held(bindings, Action::Forward),
            backward: self.is_action_held(bindings, Action::Backward),
            left: self.is_action_held(bindings, Action::Left),
            right: self.is_action_held(bindings, Action::Right),
        }
    }

    pub fn clear(&self) {
        self.keys.write().clear();
    }
}
