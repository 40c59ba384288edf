//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. ⌘ on macOS and
//! Ctrl elsewhere are treated as the same command modifier.

use crate::input::Modifiers;
use crate::tools::ToolMode;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    Tool(ToolMode),

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    /// Abandon the gesture in progress, or clear the selection.
    Cancel,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,

    // ── Z-order ──
    SendToBack,
    BringToFront,
}

/// Resolves key events into shortcut actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                _ => None,
            };
        }

        if modifiers.alt {
            return None;
        }

        // ── Single keys ──
        match key {
            "v" | "V" => Some(ShortcutAction::Tool(ToolMode::Select)),
            "h" | "H" => Some(ShortcutAction::Tool(ToolMode::Pan)),
            "r" | "R" => Some(ShortcutAction::Tool(ToolMode::Rectangle)),
            "o" | "O" => Some(ShortcutAction::Tool(ToolMode::Circle)),
            "t" | "T" => Some(ShortcutAction::Tool(ToolMode::Text)),
            "n" | "N" => Some(ShortcutAction::Tool(ToolMode::Note)),
            "k" | "K" => Some(ShortcutAction::Tool(ToolMode::Task)),
            "i" | "I" => Some(ShortcutAction::Tool(ToolMode::Image)),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Cancel),
            _ => None,
        }
    }
}
