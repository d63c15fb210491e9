use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mpx_core::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    /// Closes help when open, otherwise clears the selection.
    Dismiss,
    SelectFirst,
    Move(Step),
    Refresh,
    ToggleAutoRefresh,
    Back,
    Forward,
    ToggleHelp,
    ScrollDetail(i16),
}

pub fn action_for(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Esc => Some(Action::Dismiss),
        KeyCode::Enter => Some(Action::SelectFirst),
        KeyCode::Up | KeyCode::Left => Some(Action::Move(Step::Previous)),
        KeyCode::Down | KeyCode::Right => Some(Action::Move(Step::Next)),
        KeyCode::Char('r') => Some(Action::Refresh),
        KeyCode::Char('a') => Some(Action::ToggleAutoRefresh),
        KeyCode::Backspace | KeyCode::Char('[') => Some(Action::Back),
        KeyCode::Char(']') => Some(Action::Forward),
        KeyCode::Char('?') | KeyCode::F(1) => Some(Action::ToggleHelp),
        KeyCode::PageUp => Some(Action::ScrollDetail(-5)),
        KeyCode::PageDown => Some(Action::ScrollDetail(5)),
        KeyCode::Char(ch) => Step::from_alias(ch).map(Action::Move),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> Option<Action> {
        action_for(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn arrows_and_aliases_share_steps() {
        for code in [KeyCode::Up, KeyCode::Left, KeyCode::Char('k'), KeyCode::Char('h')] {
            assert_eq!(press(code), Some(Action::Move(Step::Previous)));
        }
        for code in [KeyCode::Down, KeyCode::Right, KeyCode::Char('j'), KeyCode::Char('l')] {
            assert_eq!(press(code), Some(Action::Move(Step::Next)));
        }
    }

    #[test]
    fn history_keys() {
        assert_eq!(press(KeyCode::Backspace), Some(Action::Back));
        assert_eq!(press(KeyCode::Char('[')), Some(Action::Back));
        assert_eq!(press(KeyCode::Char(']')), Some(Action::Forward));
    }

    #[test]
    fn unbound_keys_are_ignored() {
        assert_eq!(press(KeyCode::Char('z')), None);
        assert_eq!(press(KeyCode::Tab), None);
        assert_eq!(
            action_for(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn ctrl_c_quits() {
        assert_eq!(
            action_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }
}
