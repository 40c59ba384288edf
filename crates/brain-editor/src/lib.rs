pub mod commands;
pub mod config;
pub mod controller;
pub mod editor;
pub mod hit;
pub mod input;
pub mod shortcuts;
pub mod tools;
pub mod viewport;

pub use commands::CommandStack;
pub use config::EditorConfig;
pub use controller::{InteractionController, InteractionState, Selection};
pub use editor::CanvasEditor;
pub use hit::{HitTarget, hit_test};
pub use input::{InputEvent, Modifiers};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::ToolMode;
pub use viewport::Viewport;
