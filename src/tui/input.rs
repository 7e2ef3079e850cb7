// SPDX-License-Identifier: MIT
use crossterm::event::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    StartRecording,
    StartSensing,
    Stop,
    PanelUp,
    PanelDown,
    ToggleCollapse,
    None,
}

pub fn handle_key(key: KeyCode) -> Action {
    match key {
        KeyCode::Char('r' | 'R') => Action::StartRecording,
        KeyCode::Char('l' | 'L') => Action::StartSensing,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Stop,
        KeyCode::Up => Action::PanelUp,
        KeyCode::Down => Action::PanelDown,
        KeyCode::Right | KeyCode::Enter => Action::ToggleCollapse,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys() {
        assert_eq!(handle_key(KeyCode::Char('r')), Action::StartRecording);
        assert_eq!(handle_key(KeyCode::Char('l')), Action::StartSensing);
        assert_eq!(handle_key(KeyCode::Char('q')), Action::Stop);
        assert_eq!(handle_key(KeyCode::Esc), Action::Stop);
    }

    #[test]
    fn unknown_keys_do_nothing() {
        assert_eq!(handle_key(KeyCode::Char('x')), Action::None);
        assert_eq!(handle_key(KeyCode::Tab), Action::None);
    }
}
