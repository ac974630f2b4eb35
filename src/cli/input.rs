//! Keystroke input handling using crossterm
//!
//! Features:
//! - Polling with a timeout so the game loop keeps its tick rate
//! - Space to start, Esc / Ctrl+C to quit
//! - H / A / N emotion injection for manual play

use crossterm::event::{self, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::Result as IoResult;
use std::time::Duration;

use crate::facs::EmotionLabel;

/// What a key press asks the host to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostAction {
    /// Start from the menu, or restart after game over
    Confirm,
    Quit,
    /// Manual emotion injection
    Inject(EmotionLabel),
}

/// Handles user input from terminal
pub struct InputHandler {
    /// Longest wait for a key within one tick
    poll_timeout: Duration,
}

impl InputHandler {
    /// Create input handler that waits at most `poll_timeout` per call
    pub fn new(poll_timeout: Duration) -> Self {
        InputHandler { poll_timeout }
    }

    /// Poll for one key press; `None` on timeout or non-key events
    pub fn read_key(&self, timeout: Duration) -> IoResult<Option<KeyEvent>> {
        if event::poll(timeout.min(self.poll_timeout))? {
            match event::read()? {
                event::Event::Key(key) if key.kind != KeyEventKind::Release => Ok(Some(key)),
                _ => Ok(None),
            }
        } else {
            Ok(None)
        }
    }

    /// Map a key to a host action
    pub fn action_for(key: &KeyEvent) -> Option<HostAction> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(HostAction::Quit)
            }
            KeyCode::Esc => Some(HostAction::Quit),
            KeyCode::Char(' ') | KeyCode::Enter => Some(HostAction::Confirm),
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'h' => Some(HostAction::Inject(EmotionLabel::Happy)),
                'a' => Some(HostAction::Inject(EmotionLabel::Angry)),
                'n' => Some(HostAction::Inject(EmotionLabel::Neutral)),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            InputHandler::action_for(&key(KeyCode::Char(' '))),
            Some(HostAction::Confirm)
        );
        assert_eq!(InputHandler::action_for(&key(KeyCode::Esc)), Some(HostAction::Quit));
        assert_eq!(
            InputHandler::action_for(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(HostAction::Quit)
        );
        assert_eq!(
            InputHandler::action_for(&key(KeyCode::Char('H'))),
            Some(HostAction::Inject(EmotionLabel::Happy))
        );
        assert_eq!(
            InputHandler::action_for(&key(KeyCode::Char('a'))),
            Some(HostAction::Inject(EmotionLabel::Angry))
        );
        assert_eq!(
            InputHandler::action_for(&key(KeyCode::Char('n'))),
            Some(HostAction::Inject(EmotionLabel::Neutral))
        );
        assert_eq!(InputHandler::action_for(&key(KeyCode::Char('x'))), None);
    }
}
