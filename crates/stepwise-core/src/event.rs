#![forbid(unsafe_code)]

//! Canonical input/event types.
//!
//! Hosts (the terminal loop, a browser shim, or a test simulator) translate
//! their native input into these types before handing it to the player.
//! All events derive `Clone`, `PartialEq`, and `Eq` for use in tests and
//! pattern matching.
//!
//! # Design Notes
//!
//! - `KeyEventKind` defaults to `Press` when not available from the host
//! - `Modifiers` use bitflags for easy combination
//! - Every key event records where keyboard focus was when it fired, so the
//!   dispatcher can ignore keys typed into text inputs

use bitflags::bitflags;
#[cfg(not(target_arch = "wasm32"))]
use crossterm::event as cte;

use crate::trace::EntityId;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A keyboard event.
    Key(KeyEvent),

    /// Pointer entered (`Some`) or left (`None`) a highlightable entity.
    Hover(Option<EntityId>),

    /// Keyboard focus moved into (`true`) or out of (`false`) a text input.
    InputFocus(bool),

    /// Host viewport was resized.
    Resize {
        /// New width in columns.
        width: u16,
        /// New height in rows.
        height: u16,
    },

    /// A tick event from the runtime.
    Tick,
}

impl Event {
    /// Convert a Crossterm event into a Stepwise [`Event`].
    #[must_use]
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_crossterm(event: cte::Event) -> Option<Self> {
        map_crossterm_event_internal(event)
    }
}

/// Where keyboard focus was when a key event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusTarget {
    /// Focus on the document body or a non-editable control.
    #[default]
    Document,

    /// Focus inside a text input or textarea.
    TextInput,
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// The key code that was pressed.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: Modifiers,

    /// The type of key event (press, repeat, or release).
    pub kind: KeyEventKind,

    /// Focus target at the time of the event.
    pub target: FocusTarget,
}

impl KeyEvent {
    /// Create a new key press with default modifiers, targeting the document.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
            kind: KeyEventKind::Press,
            target: FocusTarget::Document,
        }
    }

    /// Create a key event with modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Create a key event with a specific kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Create a key event fired while focus sat on `target`.
    #[must_use]
    pub const fn with_target(mut self, target: FocusTarget) -> Self {
        self.target = target;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }

    /// Check if Ctrl modifier is held.
    #[must_use]
    pub const fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    /// True for press and auto-repeat, false for release.
    #[must_use]
    pub const fn is_press(&self) -> bool {
        !matches!(self.kind, KeyEventKind::Release)
    }
}

/// Key codes for keyboard events.
///
/// Only the keys the player reacts to get named variants; everything else
/// arrives as `Char` or `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A regular character key. Space is `Char(' ')`.
    Char(char),

    /// Enter/Return key.
    Enter,

    /// Escape key.
    Escape,

    /// Backspace key.
    Backspace,

    /// Tab key.
    Tab,

    /// Home key.
    Home,

    /// End key.
    End,

    /// Up arrow key.
    Up,

    /// Down arrow key.
    Down,

    /// Left arrow key.
    Left,

    /// Right arrow key.
    Right,

    /// Function key (F1-F24).
    F(u8),

    /// Any key without a dedicated variant.
    Other,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    /// Key was pressed (default when not distinguishable).
    #[default]
    Press,

    /// Key is being held (repeat event).
    Repeat,

    /// Key was released.
    Release,
}

bitflags! {
    /// Modifier keys that can be held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// No modifiers.
        const NONE  = 0b0000;
        /// Shift key.
        const SHIFT = 0b0001;
        /// Alt/Option key.
        const ALT   = 0b0010;
        /// Control key.
        const CTRL  = 0b0100;
        /// Super/Meta/Command key.
        const SUPER = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn map_crossterm_event_internal(event: cte::Event) -> Option<Event> {
    match event {
        cte::Event::Key(key) => Some(Event::Key(map_key_event(key))),
        cte::Event::Resize(width, height) => Some(Event::Resize { width, height }),
        // Mouse, paste and terminal focus have no meaning for playback.
        cte::Event::Mouse(_)
        | cte::Event::Paste(_)
        | cte::Event::FocusGained
        | cte::Event::FocusLost => None,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn map_key_event(event: cte::KeyEvent) -> KeyEvent {
    let mut modifiers = map_modifiers(event.modifiers);
    // Terminals report Shift+Tab as its own key.
    if event.code == cte::KeyCode::BackTab {
        modifiers |= Modifiers::SHIFT;
    }
    KeyEvent::new(map_key_code(event.code))
        .with_modifiers(modifiers)
        .with_kind(map_key_kind(event.kind))
}

#[cfg(not(target_arch = "wasm32"))]
fn map_key_kind(kind: cte::KeyEventKind) -> KeyEventKind {
    match kind {
        cte::KeyEventKind::Press => KeyEventKind::Press,
        cte::KeyEventKind::Repeat => KeyEventKind::Repeat,
        cte::KeyEventKind::Release => KeyEventKind::Release,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn map_key_code(code: cte::KeyCode) -> KeyCode {
    match code {
        cte::KeyCode::Backspace => KeyCode::Backspace,
        cte::KeyCode::Enter => KeyCode::Enter,
        cte::KeyCode::Left => KeyCode::Left,
        cte::KeyCode::Right => KeyCode::Right,
        cte::KeyCode::Up => KeyCode::Up,
        cte::KeyCode::Down => KeyCode::Down,
        cte::KeyCode::Home => KeyCode::Home,
        cte::KeyCode::End => KeyCode::End,
        cte::KeyCode::Tab | cte::KeyCode::BackTab => KeyCode::Tab,
        cte::KeyCode::F(n) => KeyCode::F(n),
        cte::KeyCode::Char(c) => KeyCode::Char(c),
        cte::KeyCode::Esc => KeyCode::Escape,
        _ => KeyCode::Other,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn map_modifiers(modifiers: cte::KeyModifiers) -> Modifiers {
    let mut mapped = Modifiers::NONE;
    if modifiers.contains(cte::KeyModifiers::SHIFT) {
        mapped |= Modifiers::SHIFT;
    }
    if modifiers.contains(cte::KeyModifiers::ALT) {
        mapped |= Modifiers::ALT;
    }
    if modifiers.contains(cte::KeyModifiers::CONTROL) {
        mapped |= Modifiers::CTRL;
    }
    if modifiers.contains(cte::KeyModifiers::SUPER)
        || modifiers.contains(cte::KeyModifiers::HYPER)
        || modifiers.contains(cte::KeyModifiers::META)
    {
        mapped |= Modifiers::SUPER;
    }
    mapped
}
