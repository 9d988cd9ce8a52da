use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A movement intent the avatar understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
}

/// Raw key event from the host, carrying a DOM-style key code (`"KeyW"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
}

/// Maps host key codes to movement keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<String, MoveKey>);

impl Default for KeyBindings {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert("KeyW".to_string(), MoveKey::Forward);
        map.insert("KeyS".to_string(), MoveKey::Back);
        map.insert("KeyA".to_string(), MoveKey::Left);
        map.insert("KeyD".to_string(), MoveKey::Right);
        map.insert("ArrowUp".to_string(), MoveKey::Forward);
        map.insert("ArrowDown".to_string(), MoveKey::Back);
        map.insert("ArrowLeft".to_string(), MoveKey::Left);
        map.insert("ArrowRight".to_string(), MoveKey::Right);
        Self(map)
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn bind(&mut self, code: impl Into<String>, key: MoveKey) {
        self.0.insert(code.into(), key);
    }

    pub fn lookup(&self, code: &str) -> Option<MoveKey> {
        self.0.get(code).copied()
    }
}

/// Set of currently held movement keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    held: BTreeSet<MoveKey>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state with the given keys held. Mostly useful in tests.
    pub fn holding(keys: &[MoveKey]) -> Self {
        Self {
            held: keys.iter().copied().collect(),
        }
    }

    pub fn press(&mut self, key: MoveKey) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: MoveKey) {
        self.held.remove(&key);
    }

    pub fn is_held(&self, key: MoveKey) -> bool {
        self.held.contains(&key)
    }

    pub fn is_idle(&self) -> bool {
        self.held.is_empty()
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    /// Apply a raw event through the bindings. Unbound codes are ignored.
    /// Returns whether the event touched a movement key.
    pub fn apply(&mut self, event: &InputEvent, bindings: &KeyBindings) -> bool {
        match event {
            InputEvent::KeyDown(code) => match bindings.lookup(code) {
                Some(key) => {
                    self.press(key);
                    true
                }
                None => false,
            },
            InputEvent::KeyUp(code) => match bindings.lookup(code) {
                Some(key) => {
                    self.release(key);
                    true
                }
                None => false,
            },
        }
    }

    pub fn held(&self) -> impl Iterator<Item = MoveKey> + '_ {
        self.held.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_cover_wasd() {
        let b = KeyBindings::default();
        assert_eq!(b.lookup("KeyW"), Some(MoveKey::Forward));
        assert_eq!(b.lookup("KeyS"), Some(MoveKey::Back));
        assert_eq!(b.lookup("KeyA"), Some(MoveKey::Left));
        assert_eq!(b.lookup("KeyD"), Some(MoveKey::Right));
        assert_eq!(b.lookup("KeyQ"), None);
    }

    #[test]
    fn press_and_release() {
        let b = KeyBindings::default();
        let mut s = InputState::new();
        assert!(s.apply(&InputEvent::KeyDown("KeyW".into()), &b));
        assert!(s.is_held(MoveKey::Forward));
        assert!(s.apply(&InputEvent::KeyUp("KeyW".into()), &b));
        assert!(s.is_idle());
    }

    #[test]
    fn repeated_keydown_is_a_set_insert() {
        let b = KeyBindings::default();
        let mut s = InputState::new();
        s.apply(&InputEvent::KeyDown("KeyW".into()), &b);
        s.apply(&InputEvent::KeyDown("KeyW".into()), &b);
        assert_eq!(s.held().count(), 1);
        s.apply(&InputEvent::KeyUp("KeyW".into()), &b);
        assert!(s.is_idle());
    }

    #[test]
    fn unbound_codes_are_ignored() {
        let b = KeyBindings::default();
        let mut s = InputState::new();
        assert!(!s.apply(&InputEvent::KeyDown("Space".into()), &b));
        assert!(s.is_idle());
    }

    #[test]
    fn bindings_deserialize_from_a_plain_map() {
        let b: KeyBindings = serde_json::from_str(r#"{"KeyI":"forward"}"#).unwrap();
        assert_eq!(b.lookup("KeyI"), Some(MoveKey::Forward));
        assert_eq!(b.lookup("KeyW"), None);
    }
}
