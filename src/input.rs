//! Keyboard input: turns terminal key events into game commands

use crate::config::KeyBindings;
use crate::controller::{Command, Direction, Phase};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::warn;

/// Key bindings resolved to key codes, with several keys allowed per command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    pub move_left: Vec<KeyCode>,
    pub move_right: Vec<KeyCode>,
    pub move_down: Vec<KeyCode>,
    pub rotate: Vec<KeyCode>,
    pub toggle_pause: Vec<KeyCode>,
    pub new_game: Vec<KeyCode>,
}

impl KeyMap {
    /// Parse a key name such as `"Left"`, `"Space"` or `"p"`
    pub fn parse_key(s: &str) -> Option<KeyCode> {
        let lower = s.trim().to_lowercase();
        let code = match lower.as_str() {
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "space" => KeyCode::Char(' '),
            "enter" | "return" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "esc" | "escape" => KeyCode::Esc,
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return None,
                }
            }
        };
        Some(code)
    }

    /// Unknown key names are logged and skipped
    fn parse_keys(keys: &[String]) -> Vec<KeyCode> {
        keys.iter()
            .filter_map(|key| {
                let code = Self::parse_key(key);
                if code.is_none() {
                    warn!("ignoring unknown key binding {:?}", key);
                }
                code
            })
            .collect()
    }

    pub fn from_bindings(bindings: &KeyBindings) -> Self {
        Self {
            move_left: Self::parse_keys(&bindings.move_left),
            move_right: Self::parse_keys(&bindings.move_right),
            move_down: Self::parse_keys(&bindings.move_down),
            rotate: Self::parse_keys(&bindings.rotate),
            toggle_pause: Self::parse_keys(&bindings.toggle_pause),
            new_game: Self::parse_keys(&bindings.new_game),
        }
    }

    /// Command for a key event in the given phase.
    ///
    /// Events with Ctrl, Alt, Super or Meta held are ignored, as are key
    /// releases. Before a game starts and after it ends only the new-game
    /// keys do anything; during play a key bound to both pause and new game
    /// pauses.
    pub fn map_key(&self, event: &KeyEvent, phase: Phase) -> Option<Command> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let blocked = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER | KeyModifiers::META;
        if event.modifiers.intersects(blocked) {
            return None;
        }

        let code = normalize_key(event.code);
        if matches!(phase, Phase::Unstarted | Phase::Finished) {
            return self.new_game.contains(&code).then_some(Command::NewGame);
        }

        if self.toggle_pause.contains(&code) {
            Some(Command::TogglePause(None))
        } else if self.rotate.contains(&code) {
            Some(Command::Rotate)
        } else if self.move_left.contains(&code) {
            Some(Command::Move(Direction::Left))
        } else if self.move_right.contains(&code) {
            Some(Command::Move(Direction::Right))
        } else if self.move_down.contains(&code) {
            Some(Command::Move(Direction::Down))
        } else if self.new_game.contains(&code) {
            Some(Command::NewGame)
        } else {
            None
        }
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from_bindings(&KeyBindings::default())
    }
}

/// Letters match regardless of shift
fn normalize_key(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_parse_key_names() {
        assert_eq!(KeyMap::parse_key("Left"), Some(KeyCode::Left));
        assert_eq!(KeyMap::parse_key("SPACE"), Some(KeyCode::Char(' ')));
        assert_eq!(KeyMap::parse_key("P"), Some(KeyCode::Char('p')));
        assert_eq!(KeyMap::parse_key("Return"), Some(KeyCode::Enter));
        assert_eq!(KeyMap::parse_key("hyperdrive"), None);
        assert_eq!(KeyMap::parse_key(""), None);
    }

    #[test]
    fn test_default_bindings_during_play() {
        let keys = KeyMap::default();
        let phase = Phase::Running;
        assert_eq!(
            keys.map_key(&press(KeyCode::Left), phase),
            Some(Command::Move(Direction::Left))
        );
        assert_eq!(
            keys.map_key(&press(KeyCode::Right), phase),
            Some(Command::Move(Direction::Right))
        );
        assert_eq!(
            keys.map_key(&press(KeyCode::Down), phase),
            Some(Command::Move(Direction::Down))
        );
        assert_eq!(keys.map_key(&press(KeyCode::Char(' ')), phase), Some(Command::Rotate));
        assert_eq!(
            keys.map_key(&press(KeyCode::Enter), phase),
            Some(Command::TogglePause(None))
        );
        assert_eq!(keys.map_key(&press(KeyCode::Up), phase), None);
    }

    #[test]
    fn test_only_new_game_outside_play() {
        let keys = KeyMap::default();
        for phase in [Phase::Unstarted, Phase::Finished] {
            assert_eq!(keys.map_key(&press(KeyCode::Enter), phase), Some(Command::NewGame));
            assert_eq!(keys.map_key(&press(KeyCode::Left), phase), None);
            assert_eq!(keys.map_key(&press(KeyCode::Char(' ')), phase), None);
        }
    }

    #[test]
    fn test_modifiers_are_ignored() {
        let keys = KeyMap::default();
        for modifiers in [KeyModifiers::CONTROL, KeyModifiers::ALT, KeyModifiers::SUPER] {
            let event = KeyEvent::new(KeyCode::Left, modifiers);
            assert_eq!(keys.map_key(&event, Phase::Running), None);
        }
        let shifted = KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT);
        assert!(keys.map_key(&shifted, Phase::Running).is_some());
    }

    #[test]
    fn test_releases_are_ignored() {
        let keys = KeyMap::default();
        let release = KeyEvent::new_with_kind(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(keys.map_key(&release, Phase::Running), None);
    }

    #[test]
    fn test_custom_bindings() {
        let bindings = KeyBindings {
            rotate: vec!["x".to_string(), "Up".to_string()],
            toggle_pause: vec!["p".to_string(), "nonsense".to_string()],
            ..KeyBindings::default()
        };
        let keys = KeyMap::from_bindings(&bindings);
        assert_eq!(keys.toggle_pause, vec![KeyCode::Char('p')]);
        assert_eq!(keys.map_key(&press(KeyCode::Char('X')), Phase::Paused), Some(Command::Rotate));
        assert_eq!(keys.map_key(&press(KeyCode::Up), Phase::Paused), Some(Command::Rotate));
        // Enter now only starts a new game
        assert_eq!(keys.map_key(&press(KeyCode::Enter), Phase::Running), Some(Command::NewGame));
    }
}
