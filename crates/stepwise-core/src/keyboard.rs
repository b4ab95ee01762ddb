#![forbid(unsafe_code)]

//! Playback keyboard shortcuts.
//!
//! | Key | Precondition | Action |
//! |---|---|---|
//! | Right, Space | not complete | [`NavAction::Next`] |
//! | Left | not complete | [`NavAction::Prev`] |
//! | `r`, `R`, Home | | [`NavAction::Reset`] |
//! | End | | [`NavAction::JumpToEnd`] |
//! | Escape | complete | [`NavAction::Prev`] |
//!
//! Two independent gates suppress every key: focus inside a text input, and
//! an open modal. Table keys other than Escape consume the host's default
//! behavior even when their precondition blocks the action; any other key
//! is left alone. Chords with Ctrl, Alt or Super are never shortcuts.

use crate::event::{FocusTarget, KeyCode, KeyEvent, Modifiers};

/// Navigation command produced by a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavAction {
    Next,
    Prev,
    Reset,
    JumpToEnd,
}

/// Outcome of dispatching one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub action: Option<NavAction>,
    /// Host default behavior (scrolling, page reload, ...) must be suppressed.
    pub prevent_default: bool,
}

impl Dispatch {
    /// Key not handled; default preserved.
    pub const IGNORED: Self = Self {
        action: None,
        prevent_default: false,
    };

    const fn consumed(action: Option<NavAction>) -> Self {
        Self {
            action,
            prevent_default: true,
        }
    }
}

/// Shortcut table bound to a snapshot of player state.
///
/// The snapshot is the listener's dependency set: when it changes, the owner
/// re-attaches a new dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyboardDispatcher {
    /// Current step is terminal.
    pub is_complete: bool,
    /// A blocking dialog (prediction prompt, info panel) is open.
    pub modal_open: bool,
}

impl KeyboardDispatcher {
    #[must_use]
    pub const fn new(is_complete: bool, modal_open: bool) -> Self {
        Self {
            is_complete,
            modal_open,
        }
    }

    /// Map `key` to an action.
    #[must_use]
    pub fn dispatch(&self, key: &KeyEvent) -> Dispatch {
        if !key.is_press() || key.target == FocusTarget::TextInput || self.modal_open {
            return Dispatch::IGNORED;
        }
        if key
            .modifiers
            .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::SUPER)
        {
            return Dispatch::IGNORED;
        }

        let forward_allowed = !self.is_complete;
        match key.code {
            KeyCode::Right | KeyCode::Char(' ') => {
                Dispatch::consumed(forward_allowed.then_some(NavAction::Next))
            }
            KeyCode::Left => Dispatch::consumed(forward_allowed.then_some(NavAction::Prev)),
            KeyCode::Char('r' | 'R') | KeyCode::Home => Dispatch::consumed(Some(NavAction::Reset)),
            KeyCode::End => Dispatch::consumed(Some(NavAction::JumpToEnd)),
            KeyCode::Escape if self.is_complete => Dispatch {
                action: Some(NavAction::Prev),
                prevent_default: false,
            },
            _ => Dispatch::IGNORED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyEventKind;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code)
    }

    const OPEN: KeyboardDispatcher = KeyboardDispatcher::new(false, false);
    const COMPLETE: KeyboardDispatcher = KeyboardDispatcher::new(true, false);
    const MODAL: KeyboardDispatcher = KeyboardDispatcher::new(false, true);

    #[test]
    fn forward_and_back_keys() {
        assert_eq!(OPEN.dispatch(&press(KeyCode::Right)).action, Some(NavAction::Next));
        assert_eq!(OPEN.dispatch(&press(KeyCode::Char(' '))).action, Some(NavAction::Next));
        assert_eq!(OPEN.dispatch(&press(KeyCode::Left)).action, Some(NavAction::Prev));
    }

    #[test]
    fn reset_keys_are_case_variants_and_home() {
        for code in [KeyCode::Char('r'), KeyCode::Char('R'), KeyCode::Home] {
            assert_eq!(OPEN.dispatch(&press(code)).action, Some(NavAction::Reset));
            assert_eq!(COMPLETE.dispatch(&press(code)).action, Some(NavAction::Reset));
        }
        assert_eq!(OPEN.dispatch(&press(KeyCode::Char('x'))), Dispatch::IGNORED);
    }

    #[test]
    fn end_always_jumps() {
        assert_eq!(COMPLETE.dispatch(&press(KeyCode::End)).action, Some(NavAction::JumpToEnd));
        assert_eq!(OPEN.dispatch(&press(KeyCode::End)).action, Some(NavAction::JumpToEnd));
    }

    #[test]
    fn completion_blocks_arrows_but_still_consumes_them() {
        let d = COMPLETE.dispatch(&press(KeyCode::Right));
        assert_eq!(d.action, None);
        assert!(d.prevent_default);
        assert_eq!(COMPLETE.dispatch(&press(KeyCode::Left)).action, None);
    }

    #[test]
    fn escape_steps_back_only_when_complete() {
        let d = COMPLETE.dispatch(&press(KeyCode::Escape));
        assert_eq!(d.action, Some(NavAction::Prev));
        assert!(!d.prevent_default);
        assert_eq!(OPEN.dispatch(&press(KeyCode::Escape)), Dispatch::IGNORED);
    }

    #[test]
    fn modal_and_text_input_gate_everything() {
        for code in [KeyCode::Right, KeyCode::Home, KeyCode::End, KeyCode::Escape] {
            assert_eq!(MODAL.dispatch(&press(code)), Dispatch::IGNORED);
            let typed = press(code).with_target(FocusTarget::TextInput);
            assert_eq!(OPEN.dispatch(&typed), Dispatch::IGNORED);
            assert_eq!(COMPLETE.dispatch(&typed), Dispatch::IGNORED);
        }
    }

    #[test]
    fn unknown_keys_keep_default_behavior() {
        let d = OPEN.dispatch(&press(KeyCode::Tab));
        assert_eq!(d, Dispatch::IGNORED);
        assert!(!d.prevent_default);
    }

    #[test]
    fn releases_and_chords_are_ignored() {
        let release = press(KeyCode::Right).with_kind(KeyEventKind::Release);
        assert_eq!(OPEN.dispatch(&release), Dispatch::IGNORED);
        let ctrl_r = press(KeyCode::Char('r')).with_modifiers(Modifiers::CTRL);
        assert_eq!(OPEN.dispatch(&ctrl_r), Dispatch::IGNORED);
        let shift_r = press(KeyCode::Char('R')).with_modifiers(Modifiers::SHIFT);
        assert_eq!(OPEN.dispatch(&shift_r).action, Some(NavAction::Reset));
    }
}
