//! Input abstraction layer.
//!
//! Normalizes mouse, touch and keyboard events from the view layer into a
//! unified `InputEvent` consumed by the interaction controller. Pointer
//! coordinates are in screen space; the controller maps them through the
//! viewport.

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed (mouse down, touch start).
    PointerDown {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },

    PointerMove {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },

    PointerUp {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },

    DoubleClick { x: f32, y: f32 },

    /// Wheel / trackpad. `zoom` is a factor (1.0 = no change) anchored at `(x, y)`.
    Scroll {
        x: f32,
        y: f32,
        dx: f32,
        dy: f32,
        zoom: f32,
    },

    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Escape"`).
    Key { key: String, modifiers: Modifiers },

    /// The in-place text editor's current value.
    TextInput { text: String },

    /// The in-place text editor lost focus.
    Blur,
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract the screen position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::Scroll { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}
