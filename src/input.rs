//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Tap the top coin under the cursor.
    Tap,
    Pause,
    Quit,
    Restart,
    NextLevel,
    None,
}

/// Map key event to game action. Supports both normal (arrows, Enter/Space) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p' | 'P') if no_mod => Action::Pause,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::Up,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::Down,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::Left,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::Right,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Tap,
        KeyCode::Char('r' | 'R') if no_mod => Action::Restart,
        KeyCode::Char('n' | 'N') if no_mod => Action::NextLevel,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        for (a, b) in [
            (KeyCode::Up, KeyCode::Char('k')),
            (KeyCode::Down, KeyCode::Char('j')),
            (KeyCode::Left, KeyCode::Char('h')),
            (KeyCode::Right, KeyCode::Char('l')),
            (KeyCode::Enter, KeyCode::Char(' ')),
        ] {
            assert_eq!(
                key_to_action(key(a, KeyModifiers::NONE)),
                key_to_action(key(b, KeyModifiers::NONE))
            );
        }
    }

    #[test]
    fn modifiers_filter_keys() {
        assert_eq!(
            key_to_action(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('h'), KeyModifiers::ALT)),
            Action::None
        );
        assert_eq!(
            key_to_action(key(KeyCode::Char('R'), KeyModifiers::SHIFT)),
            Action::Restart
        );
    }
}
