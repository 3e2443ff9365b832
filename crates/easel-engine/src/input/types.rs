use std::fmt;

/// Keyboard key, mapped from the platform's logical key where possible.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Delete,

    Up,
    Down,
    Left,
    Right,

    Shift,
    Control,
    Alt,
    Meta,

    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Num0, Num1, Num2, Num3, Num4,
    Num5, Num6, Num7, Num8, Num9,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    /// Any other key, carrying the platform's scancode when one exists.
    Other(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Transition reported for a key or mouse button.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Action {
    Press,
    Release,
}

/// Anything a callback can be bound to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Button {
    Key(Key),
    Mouse(MouseButton),
}

impl From<Key> for Button {
    fn from(k: Key) -> Self {
        Button::Key(k)
    }
}

impl From<MouseButton> for Button {
    fn from(b: MouseButton) -> Self {
        Button::Mouse(b)
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Backend-agnostic input event.
///
/// Backends translate window-system events into these; the render loop
/// applies them to [`InputState`](super::InputState) and the binding table.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        key: Key,
        action: Action,
        modifiers: Modifiers,
        /// Auto-repeat; never dispatched to bindings.
        repeat: bool,
    },

    PointerButton {
        button: MouseButton,
        action: Action,
        modifiers: Modifiers,
    },

    /// Pointer position in window pixels, top-left origin.
    PointerMoved { x: f32, y: f32 },

    PointerLeft,

    /// Scroll offset in lines.
    Scroll { dx: f32, dy: f32 },

    ModifiersChanged(Modifiers),

    Focused(bool),

    /// The window system asked the window to close.
    CloseRequested,
}

impl InputEvent {
    /// Shorthand for a non-repeating key event without modifiers.
    pub fn key(key: Key, action: Action) -> Self {
        InputEvent::Key { key, action, modifiers: Modifiers::default(), repeat: false }
    }

    pub fn mouse(button: MouseButton, action: Action) -> Self {
        InputEvent::PointerButton { button, action, modifiers: Modifiers::default() }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Key(k) => write!(f, "key {k:?}"),
            Button::Mouse(b) => write!(f, "mouse {b:?}"),
        }
    }
}
